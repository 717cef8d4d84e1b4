//! Pareto ranking of contributions to a total.

use super::kpi::round2;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoEntry {
    pub id: i64,
    pub label: String,
    pub value: f64,
    /// Share of the total, percent.
    pub percent: f64,
    /// Running share including this entry; the last full-list entry is 100.
    pub cumulative_percent: f64,
}

/// Ranks `(id, label, value)` items descending by value, ties by label.
///
/// Non-positive values are dropped. Percentages are always relative to the
/// full total, so `top_n` truncation leaves a cumulative below 100.
pub fn pareto(items: Vec<(i64, String, f64)>, top_n: Option<usize>) -> Vec<ParetoEntry> {
    let mut items: Vec<_> = items
        .into_iter()
        .filter(|(_, _, value)| *value > 0.0 && value.is_finite())
        .collect();
    items.sort_by(|left, right| {
        right
            .2
            .total_cmp(&left.2)
            .then_with(|| left.1.to_lowercase().cmp(&right.1.to_lowercase()))
            .then_with(|| left.0.cmp(&right.0))
    });

    let total: f64 = items.iter().map(|(_, _, value)| value).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let count = items.len();
    let mut running = 0.0;
    let mut entries = Vec::with_capacity(count);
    for (index, (id, label, value)) in items.into_iter().enumerate() {
        running += value;
        let cumulative = if index + 1 == count {
            100.0
        } else {
            round2(running / total * 100.0)
        };
        entries.push(ParetoEntry {
            id,
            label,
            value: round2(value),
            percent: round2(value / total * 100.0),
            cumulative_percent: cumulative,
        });
    }

    if let Some(limit) = top_n {
        entries.truncate(limit);
    }
    entries
}
