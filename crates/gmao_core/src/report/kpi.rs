//! Maintenance KPI arithmetic.
//!
//! All ratios return `None` on a zero denominator. Rounding happens only
//! when a `Kpis` projection is built.

use serde::Serialize;

/// Raw hour sums for one scope over one period.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoursTotals {
    /// Nominal hours: days x 24 x engin count.
    pub nho: f64,
    pub hrm: f64,
    pub him: f64,
    pub ni: i64,
}

impl HoursTotals {
    pub fn add(&mut self, other: &HoursTotals) {
        self.nho += other.nho;
        self.hrm += other.hrm;
        self.him += other.him;
        self.ni += other.ni;
    }

    pub fn kpis(&self) -> Kpis {
        Kpis {
            nho: round2(self.nho),
            hrm: round2(self.hrm),
            him: round2(self.him),
            hrd: round2(hrd(self.nho, self.hrm, self.him)),
            ni: self.ni,
            disp: disp(self.nho, self.him).map(round2),
            tdm: tdm(self.hrm, self.nho).map(round2),
            mtbf: mtbf(self.hrm, self.ni).map(round2),
            mttr: mttr(self.him, self.ni).map(round2),
            cu: cu(self.hrm, hrd(self.nho, self.hrm, self.him)).map(round2),
        }
    }
}

/// Presentation projection of `HoursTotals`, rounded to 2 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub nho: f64,
    pub hrm: f64,
    pub him: f64,
    pub hrd: f64,
    pub ni: i64,
    pub disp: Option<f64>,
    pub tdm: Option<f64>,
    pub mtbf: Option<f64>,
    pub mttr: Option<f64>,
    pub cu: Option<f64>,
}

pub fn nho(days: i64, engin_count: usize) -> f64 {
    days as f64 * 24.0 * engin_count as f64
}

/// Standby hours; never negative.
pub fn hrd(nho: f64, hrm: f64, him: f64) -> f64 {
    (nho - hrm - him).max(0.0)
}

/// Availability, percent.
pub fn disp(nho: f64, him: f64) -> Option<f64> {
    ratio(nho - him, nho).map(|value| value * 100.0)
}

/// Utilization, percent.
pub fn tdm(hrm: f64, nho: f64) -> Option<f64> {
    ratio(hrm, nho).map(|value| value * 100.0)
}

pub fn mtbf(hrm: f64, ni: i64) -> Option<f64> {
    ratio(hrm, ni as f64)
}

pub fn mttr(him: f64, ni: i64) -> Option<f64> {
    ratio(him, ni as f64)
}

/// Usage coefficient, percent.
pub fn cu(hrm: f64, hrd: f64) -> Option<f64> {
    ratio(hrm, hrm + hrd).map(|value| value * 100.0)
}

/// Specific lubricant consumption per running hour.
pub fn specific_consumption(qte: f64, hrm: f64) -> Option<f64> {
    ratio(qte, hrm)
}

pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        return None;
    }
    Some(numerator / denominator)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
