//! Read-only aggregate queries backing the reports.
//!
//! # Responsibility
//! - Sum hours, interventions and lubricant quantities in SQL.
//! - Leave KPI arithmetic and presentation to `crate::report`.
//!
//! # Invariants
//! - Hour sums never double count: `him`/`ni` are pre-aggregated per daily
//!   entry before joining back to `saisiehrm`.
//! - Every period bound is inclusive.

use super::{int_to_bool, RepoResult};
use crate::model::EntityId;
use crate::report::Period;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;

/// One engin with the names of everything it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnginScope {
    pub engin_id: EntityId,
    pub engin_name: String,
    pub parc_id: EntityId,
    pub parc_name: String,
    pub typeparc_id: EntityId,
    pub typeparc_name: String,
    pub site_id: EntityId,
    pub site_name: String,
    pub active: bool,
    pub initial_heure_chassis: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeFilter {
    pub parc_id: Option<EntityId>,
    pub typeparc_id: Option<EntityId>,
    pub site_id: Option<EntityId>,
    pub active_only: bool,
}

/// Hours recorded for one engin on one site over a period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnginHours {
    pub engin_id: EntityId,
    pub site_id: EntityId,
    pub hrm: f64,
    pub him: f64,
    pub ni: i64,
}

/// Downtime attributed to one panne.
#[derive(Debug, Clone, PartialEq)]
pub struct PanneTotals {
    pub panne_id: EntityId,
    pub panne_name: String,
    pub typepanne_name: String,
    pub him: f64,
    pub ni: i64,
}

/// Hours for one parc in one calendar month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyHours {
    pub parc_id: EntityId,
    pub month: u32,
    pub hrm: f64,
    pub him: f64,
    pub ni: i64,
}

/// Parc with its typeparc, used to label report sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParcLabel {
    pub parc_id: EntityId,
    pub parc_name: String,
    pub typeparc_id: EntityId,
    pub typeparc_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyLubricant {
    pub month: u32,
    pub typelubrifiant_id: EntityId,
    pub typelubrifiant_name: String,
    pub qte: f64,
}

pub trait ReportRepository {
    fn parc_labels(&self, typeparc_id: Option<EntityId>) -> RepoResult<Vec<ParcLabel>>;
    fn parc_label(&self, parc_id: EntityId) -> RepoResult<Option<ParcLabel>>;
    fn typeparc_name(&self, typeparc_id: EntityId) -> RepoResult<Option<String>>;
    fn site_names(&self) -> RepoResult<Vec<(EntityId, String)>>;
    fn engin_scope(&self, filter: &ScopeFilter) -> RepoResult<Vec<EnginScope>>;
    /// Hours grouped by engin and by the site recorded on each daily entry.
    fn hours_by_engin(&self, period: Period) -> RepoResult<Vec<EnginHours>>;
    fn panne_totals(&self, parc_id: EntityId, period: Period) -> RepoResult<Vec<PanneTotals>>;
    /// Monthly hours per parc for one year, restricted by typeparc or parc.
    fn monthly_hours(&self, year: i32, filter: &ScopeFilter) -> RepoResult<Vec<MonthlyHours>>;
    /// Monthly lubricant quantities for one year, over the same engin scope
    /// as `monthly_hours`.
    fn monthly_lubricant(&self, year: i32, filter: &ScopeFilter)
        -> RepoResult<Vec<MonthlyLubricant>>;
    /// Total `hrm` per engin on every day up to and including `until`.
    fn cumulative_hrm(&self, until: NaiveDate) -> RepoResult<Vec<(EntityId, f64)>>;
}

pub struct SqliteReportRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReportRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const PARC_LABEL_SELECT_SQL: &str = "SELECT p.id, p.name, tp.id, tp.name
    FROM parcs p
    INNER JOIN typeparcs tp ON tp.id = p.typeparc_id";

const HIM_PER_ENTRY_SQL: &str = "SELECT saisiehrm_id, SUM(him) AS him, SUM(ni) AS ni
    FROM saisiehim
    GROUP BY saisiehrm_id";

impl ReportRepository for SqliteReportRepository<'_> {
    fn parc_labels(&self, typeparc_id: Option<EntityId>) -> RepoResult<Vec<ParcLabel>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARC_LABEL_SELECT_SQL}
             WHERE (?1 IS NULL OR p.typeparc_id = ?1)
             ORDER BY tp.name COLLATE NOCASE, p.name COLLATE NOCASE;"
        ))?;
        let rows = stmt.query_map([typeparc_id], parse_parc_label_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn parc_label(&self, parc_id: EntityId) -> RepoResult<Option<ParcLabel>> {
        let label = self
            .conn
            .query_row(
                &format!("{PARC_LABEL_SELECT_SQL} WHERE p.id = ?1;"),
                [parc_id],
                parse_parc_label_row,
            )
            .optional()?;
        Ok(label)
    }

    fn typeparc_name(&self, typeparc_id: EntityId) -> RepoResult<Option<String>> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM typeparcs WHERE id = ?1;",
                [typeparc_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    fn site_names(&self) -> RepoResult<Vec<(EntityId, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM sites ORDER BY name COLLATE NOCASE;")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn engin_scope(&self, filter: &ScopeFilter) -> RepoResult<Vec<EnginScope>> {
        let mut sql = String::from(
            "SELECT
                e.id,
                e.name,
                p.id,
                p.name,
                tp.id,
                tp.name,
                s.id,
                s.name,
                e.active,
                e.initial_heure_chassis
             FROM engins e
             INNER JOIN parcs p ON p.id = e.parc_id
             INNER JOIN typeparcs tp ON tp.id = p.typeparc_id
             INNER JOIN sites s ON s.id = e.site_id
             WHERE 1 = 1",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        push_scope_filter(filter, "e", "p", &mut sql, &mut bind_values);
        sql.push_str(" ORDER BY tp.name COLLATE NOCASE, p.name COLLATE NOCASE, e.name COLLATE NOCASE;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
        let mut scope = Vec::new();
        while let Some(row) = rows.next()? {
            scope.push(parse_scope_row(row)?);
        }
        Ok(scope)
    }

    fn hours_by_engin(&self, period: Period) -> RepoResult<Vec<EnginHours>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                h.engin_id,
                h.site_id,
                SUM(h.hrm),
                COALESCE(SUM(x.him), 0),
                COALESCE(SUM(x.ni), 0)
             FROM saisiehrm h
             LEFT JOIN ({HIM_PER_ENTRY_SQL}) x ON x.saisiehrm_id = h.id
             WHERE h.du BETWEEN ?1 AND ?2
             GROUP BY h.engin_id, h.site_id
             ORDER BY h.engin_id, h.site_id;"
        ))?;
        let rows = stmt.query_map(params![period.from, period.to], |row| {
            Ok(EnginHours {
                engin_id: row.get(0)?,
                site_id: row.get(1)?,
                hrm: row.get(2)?,
                him: row.get(3)?,
                ni: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn panne_totals(&self, parc_id: EntityId, period: Period) -> RepoResult<Vec<PanneTotals>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                pa.id,
                pa.name,
                tpa.name,
                SUM(x.him),
                SUM(x.ni)
             FROM saisiehim x
             INNER JOIN saisiehrm h ON h.id = x.saisiehrm_id
             INNER JOIN engins e ON e.id = h.engin_id
             INNER JOIN pannes pa ON pa.id = x.panne_id
             INNER JOIN typepannes tpa ON tpa.id = pa.typepanne_id
             WHERE e.parc_id = ?1
               AND h.du BETWEEN ?2 AND ?3
             GROUP BY pa.id, pa.name, tpa.name
             ORDER BY pa.name COLLATE NOCASE;",
        )?;
        let rows = stmt.query_map(params![parc_id, period.from, period.to], |row| {
            Ok(PanneTotals {
                panne_id: row.get(0)?,
                panne_name: row.get(1)?,
                typepanne_name: row.get(2)?,
                him: row.get(3)?,
                ni: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn monthly_hours(&self, year: i32, filter: &ScopeFilter) -> RepoResult<Vec<MonthlyHours>> {
        let period = Period::year(year)?;
        let mut sql = format!(
            "SELECT
                e.parc_id,
                CAST(strftime('%m', h.du) AS INTEGER) AS month,
                SUM(h.hrm),
                COALESCE(SUM(x.him), 0),
                COALESCE(SUM(x.ni), 0)
             FROM saisiehrm h
             INNER JOIN engins e ON e.id = h.engin_id
             INNER JOIN parcs p ON p.id = e.parc_id
             LEFT JOIN ({HIM_PER_ENTRY_SQL}) x ON x.saisiehrm_id = h.id
             WHERE h.du BETWEEN ? AND ?"
        );
        let mut bind_values = vec![
            Value::Text(period.from.to_string()),
            Value::Text(period.to.to_string()),
        ];
        push_scope_filter(filter, "e", "p", &mut sql, &mut bind_values);
        sql.push_str(" GROUP BY e.parc_id, month ORDER BY e.parc_id, month;");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values.iter()), |row| {
            Ok(MonthlyHours {
                parc_id: row.get(0)?,
                month: row.get(1)?,
                hrm: row.get(2)?,
                him: row.get(3)?,
                ni: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn monthly_lubricant(
        &self,
        year: i32,
        filter: &ScopeFilter,
    ) -> RepoResult<Vec<MonthlyLubricant>> {
        let period = Period::year(year)?;
        let mut sql = String::from(
            "SELECT
                CAST(strftime('%m', h.du) AS INTEGER) AS month,
                tl.id,
                tl.name,
                SUM(sl.qte)
             FROM saisielubrifiant sl
             INNER JOIN saisiehim x ON x.id = sl.saisiehim_id
             INNER JOIN saisiehrm h ON h.id = x.saisiehrm_id
             INNER JOIN engins e ON e.id = h.engin_id
             INNER JOIN parcs p ON p.id = e.parc_id
             INNER JOIN lubrifiants l ON l.id = sl.lubrifiant_id
             INNER JOIN typelubrifiants tl ON tl.id = l.typelubrifiant_id
             WHERE h.du BETWEEN ? AND ?",
        );
        let mut bind_values = vec![
            Value::Text(period.from.to_string()),
            Value::Text(period.to.to_string()),
        ];
        push_scope_filter(filter, "e", "p", &mut sql, &mut bind_values);
        sql.push_str(" GROUP BY month, tl.id, tl.name ORDER BY month, tl.name COLLATE NOCASE;");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values.iter()), |row| {
            Ok(MonthlyLubricant {
                month: row.get(0)?,
                typelubrifiant_id: row.get(1)?,
                typelubrifiant_name: row.get(2)?,
                qte: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn cumulative_hrm(&self, until: NaiveDate) -> RepoResult<Vec<(EntityId, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT engin_id, SUM(hrm)
             FROM saisiehrm
             WHERE du <= ?1
             GROUP BY engin_id
             ORDER BY engin_id;",
        )?;
        let rows = stmt.query_map([until], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn push_scope_filter(
    filter: &ScopeFilter,
    engin_alias: &str,
    parc_alias: &str,
    sql: &mut String,
    bind_values: &mut Vec<Value>,
) {
    if let Some(parc_id) = filter.parc_id {
        sql.push_str(&format!(" AND {engin_alias}.parc_id = ?"));
        bind_values.push(Value::Integer(parc_id));
    }
    if let Some(typeparc_id) = filter.typeparc_id {
        sql.push_str(&format!(" AND {parc_alias}.typeparc_id = ?"));
        bind_values.push(Value::Integer(typeparc_id));
    }
    if let Some(site_id) = filter.site_id {
        sql.push_str(&format!(" AND {engin_alias}.site_id = ?"));
        bind_values.push(Value::Integer(site_id));
    }
    if filter.active_only {
        sql.push_str(&format!(" AND {engin_alias}.active = 1"));
    }
}

fn parse_parc_label_row(row: &Row<'_>) -> rusqlite::Result<ParcLabel> {
    Ok(ParcLabel {
        parc_id: row.get(0)?,
        parc_name: row.get(1)?,
        typeparc_id: row.get(2)?,
        typeparc_name: row.get(3)?,
    })
}

fn parse_scope_row(row: &Row<'_>) -> RepoResult<EnginScope> {
    let active: i64 = row.get(8)?;
    Ok(EnginScope {
        engin_id: row.get(0)?,
        engin_name: row.get(1)?,
        parc_id: row.get(2)?,
        parc_name: row.get(3)?,
        typeparc_id: row.get(4)?,
        typeparc_name: row.get(5)?,
        site_id: row.get(6)?,
        site_name: row.get(7)?,
        active: int_to_bool(active, "engins.active")?,
        initial_heure_chassis: row.get(9)?,
    })
}
