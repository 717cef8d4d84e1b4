//! Report building blocks and serializable report shapes.
//!
//! # Responsibility
//! - Provide period math, KPI formulas and Pareto ranking.
//! - Define the output structure of every report.
//!
//! Data gathering lives in `service::report_service`.

pub mod kpi;
pub mod pareto;
pub mod period;

pub use kpi::{HoursTotals, Kpis};
pub use pareto::{pareto, ParetoEntry};
pub use period::Period;

use crate::model::anomalie::{AnomalieStatut, Priorite};
use crate::model::EntityId;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Daily equipment report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RjeReport {
    pub date: NaiveDate,
    pub rows: Vec<RjeRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RjeRow {
    pub engin_id: EntityId,
    pub engin_name: String,
    pub parc_name: String,
    pub site_name: String,
    pub day: Kpis,
    pub month: Kpis,
    pub year: Kpis,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HourPair {
    pub hrm: f64,
    pub him: f64,
}

impl HourPair {
    pub(crate) fn add(&mut self, hrm: f64, him: f64) {
        self.hrm += hrm;
        self.him += him;
    }

    pub(crate) fn rounded(self) -> Self {
        Self {
            hrm: kpi::round2(self.hrm),
            him: kpi::round2(self.him),
        }
    }
}

/// Physical units report: hours per parc and site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitePhysiqueReport {
    pub year: i32,
    pub month: u32,
    pub parcs: Vec<UnitePhysiqueParc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitePhysiqueParc {
    pub parc_id: EntityId,
    pub parc_name: String,
    pub typeparc_name: String,
    pub sites: Vec<UnitePhysiqueSite>,
    pub total_month: HourPair,
    pub total_year: HourPair,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitePhysiqueSite {
    pub site_id: EntityId,
    pub site_name: String,
    pub month: HourPair,
    pub year: HourPair,
}

/// Targets copied from the parc-wide objectif of the report year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ObjectifTargets {
    pub dispo: Option<f64>,
    pub mtbf: Option<f64>,
    pub tdm: Option<f64>,
}

/// Monthly status report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtatMensuelReport {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<EtatMensuelRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtatMensuelRow {
    pub parc_id: EntityId,
    pub parc_name: String,
    pub typeparc_name: String,
    pub engin_count: usize,
    pub month: Kpis,
    pub year: Kpis,
    pub objectif: Option<ObjectifTargets>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DowntimeTotals {
    pub him: f64,
    pub ni: i64,
}

/// Downtime per panne for one parc.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndispoParcReport {
    pub parc_id: EntityId,
    pub parc_name: String,
    pub year: i32,
    pub month: u32,
    pub rows: Vec<IndispoRow>,
    pub total_month: DowntimeTotals,
    pub total_year: DowntimeTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndispoRow {
    pub panne_id: EntityId,
    pub panne_name: String,
    pub typepanne_name: String,
    pub month: DowntimeTotals,
    pub year: DowntimeTotals,
    /// Share of the parc's month HIM, percent.
    pub month_share: Option<f64>,
    /// Share of the parc's year-to-date HIM, percent.
    pub year_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuresChassisReport {
    pub date: NaiveDate,
    pub rows: Vec<HeuresChassisRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuresChassisRow {
    pub engin_id: EntityId,
    pub engin_name: String,
    pub parc_name: String,
    pub site_name: String,
    pub active: bool,
    pub initial_heure_chassis: f64,
    pub cumulative_hrm: f64,
    pub heure_chassis: f64,
}

/// Specific lubricant consumption for one parc over one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecLubReport {
    pub parc_id: EntityId,
    pub parc_name: String,
    pub year: i32,
    pub months: Vec<SpecLubMonth>,
    pub total: SpecLubTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecLubMonth {
    pub month: u32,
    #[serde(flatten)]
    pub totals: SpecLubTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpecLubTotals {
    pub hrm: f64,
    pub lubricants: Vec<SpecLubLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecLubLine {
    pub typelubrifiant_id: EntityId,
    pub typelubrifiant_name: String,
    pub qte: f64,
    pub specific: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParetoMetric {
    Him,
    Ni,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoReport {
    pub parc_id: EntityId,
    pub parc_name: String,
    pub period: Period,
    pub metric: ParetoMetric,
    pub total: f64,
    pub entries: Vec<ParetoEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MtbfEvolutionReport {
    pub typeparc_id: EntityId,
    pub typeparc_name: String,
    pub year: i32,
    pub parcs: Vec<MtbfParc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MtbfParc {
    pub parc_id: EntityId,
    pub parc_name: String,
    /// Twelve entries, January first.
    pub months: Vec<MtbfMonth>,
    pub year_mtbf: Option<f64>,
    pub objectif_mtbf: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MtbfMonth {
    pub month: u32,
    pub hrm: f64,
    pub ni: i64,
    pub mtbf: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalieStats {
    pub site_id: Option<EntityId>,
    pub total: i64,
    pub by_statut: BTreeMap<AnomalieStatut, i64>,
    pub by_priorite: BTreeMap<Priorite, i64>,
    pub open_by_priorite: BTreeMap<Priorite, i64>,
    /// Anomalies not yet executed.
    pub open_backlog: i64,
}
