//! Report assembly over aggregate queries.
//!
//! # Invariants
//! - Fleet KPIs only count active engins: both their hours and their
//!   nominal hours. `heures_chassis` lists every engin.
//! - Nominal hours are `days x 24` per engin for the period at hand.
//! - Reports never divide by zero; undefined ratios are `None`.

use super::{ServiceError, ServiceResult};
use crate::model::EntityId;
use crate::report::kpi::{self, round2};
use crate::report::{
    pareto, DowntimeTotals, EtatMensuelReport, EtatMensuelRow, HeuresChassisReport,
    HeuresChassisRow, HourPair, HoursTotals, IndispoParcReport, IndispoRow, MtbfEvolutionReport,
    MtbfMonth, MtbfParc, ObjectifTargets, ParetoMetric, ParetoReport, Period, RjeReport, RjeRow,
    SpecLubLine, SpecLubMonth, SpecLubReport, SpecLubTotals, UnitePhysiqueParc,
    UnitePhysiqueReport, UnitePhysiqueSite,
};
use crate::repo::objectif_repo::ObjectifRepository;
use crate::repo::report_repo::{EnginHours, EnginScope, ParcLabel, ReportRepository, ScopeFilter};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

pub struct ReportService<R: ReportRepository, O: ObjectifRepository> {
    reports: R,
    objectifs: O,
}

impl<R: ReportRepository, O: ObjectifRepository> ReportService<R, O> {
    pub fn new(reports: R, objectifs: O) -> Self {
        Self { reports, objectifs }
    }

    /// Daily equipment report: day, month-to-date and year-to-date KPIs.
    pub fn rje(&self, date: NaiveDate) -> ServiceResult<RjeReport> {
        let scope = self.active_scope(&ScopeFilter::default())?;
        let day = Period::day(date);
        let month = Period::month_to_date(date);
        let year = Period::year_to_date(date);
        let day_hours = self.totals_by_engin(day)?;
        let month_hours = self.totals_by_engin(month)?;
        let year_hours = self.totals_by_engin(year)?;

        let rows = scope
            .iter()
            .map(|engin| RjeRow {
                engin_id: engin.engin_id,
                engin_name: engin.engin_name.clone(),
                parc_name: engin.parc_name.clone(),
                site_name: engin.site_name.clone(),
                day: engin_totals(&day_hours, engin.engin_id, day).kpis(),
                month: engin_totals(&month_hours, engin.engin_id, month).kpis(),
                year: engin_totals(&year_hours, engin.engin_id, year).kpis(),
            })
            .collect();
        Ok(RjeReport { date, rows })
    }

    /// Hours per parc and site for a month and year-to-date.
    pub fn unite_physique(&self, year: i32, month: u32) -> ServiceResult<UnitePhysiqueReport> {
        let month_period = Period::month(year, month)?;
        let ytd_period = Period::year_to_date(month_period.to);
        let scope = self.active_scope(&ScopeFilter::default())?;
        let engin_parc: HashMap<EntityId, EntityId> = scope
            .iter()
            .map(|engin| (engin.engin_id, engin.parc_id))
            .collect();
        let site_names: HashMap<EntityId, String> =
            self.reports.site_names()?.into_iter().collect();

        // parc -> site -> (month, year)
        let mut grid: BTreeMap<EntityId, BTreeMap<EntityId, (HourPair, HourPair)>> =
            BTreeMap::new();
        for engin in &scope {
            grid.entry(engin.parc_id)
                .or_default()
                .entry(engin.site_id)
                .or_default();
        }
        for (period_index, period) in [month_period, ytd_period].into_iter().enumerate() {
            for hours in self.reports.hours_by_engin(period)? {
                let Some(parc_id) = engin_parc.get(&hours.engin_id) else {
                    continue;
                };
                let cell = grid
                    .entry(*parc_id)
                    .or_default()
                    .entry(hours.site_id)
                    .or_default();
                let target = if period_index == 0 {
                    &mut cell.0
                } else {
                    &mut cell.1
                };
                target.add(hours.hrm, hours.him);
            }
        }

        let mut parcs = Vec::new();
        for label in self.reports.parc_labels(None)? {
            let Some(site_cells) = grid.remove(&label.parc_id) else {
                continue;
            };
            let mut total_month = HourPair::default();
            let mut total_year = HourPair::default();
            let mut sites: Vec<UnitePhysiqueSite> = site_cells
                .into_iter()
                .map(|(site_id, (month_hours, year_hours))| {
                    total_month.add(month_hours.hrm, month_hours.him);
                    total_year.add(year_hours.hrm, year_hours.him);
                    UnitePhysiqueSite {
                        site_id,
                        site_name: site_names.get(&site_id).cloned().unwrap_or_default(),
                        month: month_hours.rounded(),
                        year: year_hours.rounded(),
                    }
                })
                .collect();
            sites.sort_by_key(|site| site.site_name.to_lowercase());
            parcs.push(UnitePhysiqueParc {
                parc_id: label.parc_id,
                parc_name: label.parc_name,
                typeparc_name: label.typeparc_name,
                sites,
                total_month: total_month.rounded(),
                total_year: total_year.rounded(),
            });
        }
        Ok(UnitePhysiqueReport {
            year,
            month,
            parcs,
        })
    }

    /// Monthly and year-to-date KPIs per parc, next to the parc targets.
    pub fn etat_mensuel(&self, year: i32, month: u32) -> ServiceResult<EtatMensuelReport> {
        let month_period = Period::month(year, month)?;
        let ytd_period = Period::year_to_date(month_period.to);
        let scope = self.active_scope(&ScopeFilter::default())?;
        let month_hours = self.totals_by_engin(month_period)?;
        let ytd_hours = self.totals_by_engin(ytd_period)?;

        let mut rows: Vec<EtatMensuelRow> = Vec::new();
        for (label, engins) in group_by_parc(&scope) {
            let mut month_totals = HoursTotals::default();
            let mut ytd_totals = HoursTotals::default();
            for engin in &engins {
                month_totals.add(&engin_totals(&month_hours, engin.engin_id, month_period));
                ytd_totals.add(&engin_totals(&ytd_hours, engin.engin_id, ytd_period));
            }
            let objectif = self
                .objectifs
                .find(year, label.parc_id, None)?
                .map(|objectif| ObjectifTargets {
                    dispo: objectif.dispo,
                    mtbf: objectif.mtbf,
                    tdm: objectif.tdm,
                });
            rows.push(EtatMensuelRow {
                parc_id: label.parc_id,
                parc_name: label.parc_name,
                typeparc_name: label.typeparc_name,
                engin_count: engins.len(),
                month: month_totals.kpis(),
                year: ytd_totals.kpis(),
                objectif,
            });
        }
        Ok(EtatMensuelReport { year, month, rows })
    }

    /// Downtime per panne for one parc, month and year-to-date.
    pub fn indispo_par_parc(
        &self,
        parc_id: EntityId,
        year: i32,
        month: u32,
    ) -> ServiceResult<IndispoParcReport> {
        let label = self.parc(parc_id)?;
        let month_period = Period::month(year, month)?;
        let ytd_period = Period::year_to_date(month_period.to);

        let mut rows: BTreeMap<EntityId, IndispoRow> = BTreeMap::new();
        let mut total_month = DowntimeTotals::default();
        let mut total_year = DowntimeTotals::default();
        for (is_month, period) in [(true, month_period), (false, ytd_period)] {
            for panne in self.reports.panne_totals(parc_id, period)? {
                let row = rows.entry(panne.panne_id).or_insert_with(|| IndispoRow {
                    panne_id: panne.panne_id,
                    panne_name: panne.panne_name.clone(),
                    typepanne_name: panne.typepanne_name.clone(),
                    month: DowntimeTotals::default(),
                    year: DowntimeTotals::default(),
                    month_share: None,
                    year_share: None,
                });
                let (cell, total) = if is_month {
                    (&mut row.month, &mut total_month)
                } else {
                    (&mut row.year, &mut total_year)
                };
                cell.him += panne.him;
                cell.ni += panne.ni;
                total.him += panne.him;
                total.ni += panne.ni;
            }
        }

        let mut rows: Vec<IndispoRow> = rows
            .into_values()
            .map(|mut row| {
                row.month_share = share(row.month.him, total_month.him);
                row.year_share = share(row.year.him, total_year.him);
                row.month.him = round2(row.month.him);
                row.year.him = round2(row.year.him);
                row
            })
            .collect();
        rows.sort_by(|left, right| {
            right
                .year
                .him
                .total_cmp(&left.year.him)
                .then_with(|| left.panne_name.to_lowercase().cmp(&right.panne_name.to_lowercase()))
        });
        total_month.him = round2(total_month.him);
        total_year.him = round2(total_year.him);

        Ok(IndispoParcReport {
            parc_id,
            parc_name: label.parc_name,
            year,
            month,
            rows,
            total_month,
            total_year,
        })
    }

    /// Chassis hour meter per engin: initial value plus cumulative `hrm`.
    pub fn heures_chassis(&self, date: NaiveDate) -> ServiceResult<HeuresChassisReport> {
        let scope = self.reports.engin_scope(&ScopeFilter::default())?;
        let cumulative: HashMap<EntityId, f64> =
            self.reports.cumulative_hrm(date)?.into_iter().collect();
        let rows = scope
            .into_iter()
            .map(|engin| {
                let cumulative_hrm = cumulative.get(&engin.engin_id).copied().unwrap_or(0.0);
                HeuresChassisRow {
                    engin_id: engin.engin_id,
                    engin_name: engin.engin_name,
                    parc_name: engin.parc_name,
                    site_name: engin.site_name,
                    active: engin.active,
                    initial_heure_chassis: round2(engin.initial_heure_chassis),
                    cumulative_hrm: round2(cumulative_hrm),
                    heure_chassis: round2(engin.initial_heure_chassis + cumulative_hrm),
                }
            })
            .collect();
        Ok(HeuresChassisReport { date, rows })
    }

    /// Lubricant quantity and specific consumption per month and type.
    pub fn spec_lub(&self, parc_id: EntityId, year: i32) -> ServiceResult<SpecLubReport> {
        let label = self.parc(parc_id)?;
        let filter = ScopeFilter {
            parc_id: Some(parc_id),
            active_only: true,
            ..ScopeFilter::default()
        };
        let mut hrm_by_month: BTreeMap<u32, f64> = BTreeMap::new();
        for hours in self.reports.monthly_hours(year, &filter)? {
            *hrm_by_month.entry(hours.month).or_default() += hours.hrm;
        }

        // month -> typelubrifiant -> (name, qte)
        let mut lub_by_month: BTreeMap<u32, BTreeMap<EntityId, (String, f64)>> = BTreeMap::new();
        let mut lub_year: BTreeMap<EntityId, (String, f64)> = BTreeMap::new();
        for line in self.reports.monthly_lubricant(year, &filter)? {
            let month_entry = lub_by_month
                .entry(line.month)
                .or_default()
                .entry(line.typelubrifiant_id)
                .or_insert_with(|| (line.typelubrifiant_name.clone(), 0.0));
            month_entry.1 += line.qte;
            let year_entry = lub_year
                .entry(line.typelubrifiant_id)
                .or_insert_with(|| (line.typelubrifiant_name.clone(), 0.0));
            year_entry.1 += line.qte;
        }

        let months = (1..=12)
            .map(|month| {
                let hrm = hrm_by_month.get(&month).copied().unwrap_or(0.0);
                let lines = lub_by_month.remove(&month).unwrap_or_default();
                SpecLubMonth {
                    month,
                    totals: spec_lub_totals(hrm, lines),
                }
            })
            .collect();
        let year_hrm: f64 = hrm_by_month.values().sum();
        Ok(SpecLubReport {
            parc_id,
            parc_name: label.parc_name,
            year,
            months,
            total: spec_lub_totals(year_hrm, lub_year),
        })
    }

    /// Pannes of one parc ranked by `metric` over `period`.
    pub fn pareto(
        &self,
        parc_id: EntityId,
        period: Period,
        metric: ParetoMetric,
        top_n: Option<usize>,
    ) -> ServiceResult<ParetoReport> {
        let label = self.parc(parc_id)?;
        let items: Vec<(i64, String, f64)> = self
            .reports
            .panne_totals(parc_id, period)?
            .into_iter()
            .map(|panne| {
                let value = match metric {
                    ParetoMetric::Him => panne.him,
                    ParetoMetric::Ni => panne.ni as f64,
                };
                (panne.panne_id, panne.panne_name, value)
            })
            .collect();
        let total = round2(items.iter().map(|(_, _, value)| value).sum());
        Ok(ParetoReport {
            parc_id,
            parc_name: label.parc_name,
            period,
            metric,
            total,
            entries: pareto(items, top_n),
        })
    }

    pub fn pareto_indispo(
        &self,
        parc_id: EntityId,
        period: Period,
        top_n: Option<usize>,
    ) -> ServiceResult<ParetoReport> {
        self.pareto(parc_id, period, ParetoMetric::Him, top_n)
    }

    pub fn pareto_ni(
        &self,
        parc_id: EntityId,
        period: Period,
        top_n: Option<usize>,
    ) -> ServiceResult<ParetoReport> {
        self.pareto(parc_id, period, ParetoMetric::Ni, top_n)
    }

    /// Monthly MTBF per parc of one typeparc.
    pub fn mtbf_evolution(
        &self,
        typeparc_id: EntityId,
        year: i32,
    ) -> ServiceResult<MtbfEvolutionReport> {
        let typeparc_name =
            self.reports
                .typeparc_name(typeparc_id)?
                .ok_or(ServiceError::NotFound {
                    entity: "typeparc",
                    id: typeparc_id,
                })?;
        let filter = ScopeFilter {
            typeparc_id: Some(typeparc_id),
            active_only: true,
            ..ScopeFilter::default()
        };
        let mut by_parc: HashMap<(EntityId, u32), (f64, i64)> = HashMap::new();
        for hours in self.reports.monthly_hours(year, &filter)? {
            let cell = by_parc.entry((hours.parc_id, hours.month)).or_default();
            cell.0 += hours.hrm;
            cell.1 += hours.ni;
        }

        let mut parcs = Vec::new();
        for label in self.reports.parc_labels(Some(typeparc_id))? {
            let months: Vec<MtbfMonth> = (1..=12)
                .map(|month| {
                    let (hrm, ni) = by_parc
                        .get(&(label.parc_id, month))
                        .copied()
                        .unwrap_or_default();
                    MtbfMonth {
                        month,
                        hrm: round2(hrm),
                        ni,
                        mtbf: kpi::mtbf(hrm, ni).map(round2),
                    }
                })
                .collect();
            let year_hrm: f64 = (1..=12)
                .filter_map(|month| by_parc.get(&(label.parc_id, month)))
                .map(|(hrm, _)| hrm)
                .sum();
            let year_ni: i64 = months.iter().map(|month| month.ni).sum();
            let objectif_mtbf = self
                .objectifs
                .find(year, label.parc_id, None)?
                .and_then(|objectif| objectif.mtbf);
            parcs.push(MtbfParc {
                parc_id: label.parc_id,
                parc_name: label.parc_name,
                months,
                year_mtbf: kpi::mtbf(year_hrm, year_ni).map(round2),
                objectif_mtbf,
            });
        }
        Ok(MtbfEvolutionReport {
            typeparc_id,
            typeparc_name,
            year,
            parcs,
        })
    }

    fn parc(&self, parc_id: EntityId) -> ServiceResult<ParcLabel> {
        self.reports
            .parc_label(parc_id)?
            .ok_or(ServiceError::NotFound {
                entity: "parc",
                id: parc_id,
            })
    }

    fn active_scope(&self, filter: &ScopeFilter) -> ServiceResult<Vec<EnginScope>> {
        let filter = ScopeFilter {
            active_only: true,
            ..filter.clone()
        };
        Ok(self.reports.engin_scope(&filter)?)
    }

    /// Hours per engin over `period`, summed across sites.
    fn totals_by_engin(&self, period: Period) -> ServiceResult<HashMap<EntityId, EnginHours>> {
        let mut totals: HashMap<EntityId, EnginHours> = HashMap::new();
        for hours in self.reports.hours_by_engin(period)? {
            totals
                .entry(hours.engin_id)
                .and_modify(|entry| {
                    entry.hrm += hours.hrm;
                    entry.him += hours.him;
                    entry.ni += hours.ni;
                })
                .or_insert(hours);
        }
        Ok(totals)
    }
}

fn engin_totals(
    hours: &HashMap<EntityId, EnginHours>,
    engin_id: EntityId,
    period: Period,
) -> HoursTotals {
    let recorded = hours.get(&engin_id);
    HoursTotals {
        nho: kpi::nho(period.days(), 1),
        hrm: recorded.map_or(0.0, |entry| entry.hrm),
        him: recorded.map_or(0.0, |entry| entry.him),
        ni: recorded.map_or(0, |entry| entry.ni),
    }
}

/// Groups an ordered engin scope by parc, keeping scope order.
fn group_by_parc(scope: &[EnginScope]) -> Vec<(ParcLabel, Vec<&EnginScope>)> {
    let mut groups: Vec<(ParcLabel, Vec<&EnginScope>)> = Vec::new();
    for engin in scope {
        match groups
            .iter_mut()
            .find(|(label, _)| label.parc_id == engin.parc_id)
        {
            Some((_, engins)) => engins.push(engin),
            None => groups.push((
                ParcLabel {
                    parc_id: engin.parc_id,
                    parc_name: engin.parc_name.clone(),
                    typeparc_id: engin.typeparc_id,
                    typeparc_name: engin.typeparc_name.clone(),
                },
                vec![engin],
            )),
        }
    }
    groups
}

fn share(value: f64, total: f64) -> Option<f64> {
    kpi::ratio(value, total).map(|ratio| round2(ratio * 100.0))
}

/// Specific consumptions are small per-hour ratios; keep 4 decimals.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn spec_lub_totals(hrm: f64, lines: BTreeMap<EntityId, (String, f64)>) -> SpecLubTotals {
    let mut lubricants: Vec<SpecLubLine> = lines
        .into_iter()
        .map(|(typelubrifiant_id, (name, qte))| SpecLubLine {
            typelubrifiant_id,
            typelubrifiant_name: name,
            qte: round2(qte),
            specific: kpi::specific_consumption(qte, hrm).map(round4),
        })
        .collect();
    lubricants.sort_by_key(|line| line.typelubrifiant_name.to_lowercase());
    SpecLubTotals {
        hrm: round2(hrm),
        lubricants,
    }
}
