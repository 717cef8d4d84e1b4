//! Anomaly backlog repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `(backlog_year, backlog_seq)` is unique.
//! - Sequences come from `backlog_sequences` and are never handed out
//!   twice, even after the anomaly that used one is deleted.
//! - Status is written only through `set_status`.

use super::{bool_to_int, expect_changed, int_to_bool, write_error, RepoError, RepoResult};
use crate::model::anomalie::{
    Anomalie, AnomalieFilter, AnomalieInput, AnomalieSource, AnomalieStatut, Priorite,
};
use crate::model::EntityId;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::BTreeMap;

const ANOMALIE_SELECT_SQL: &str = "SELECT
    id,
    numero_backlog,
    date_detection,
    description,
    source,
    priorite,
    besoin_pdr,
    quantite_pdr,
    reference_pdr,
    engin_id,
    site_id,
    statut,
    date_programmation,
    date_execution,
    observations
FROM anomalies";

/// Backlog number assignment for a new anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacklogNumber {
    pub year: i32,
    pub seq: i64,
    pub formatted: String,
}

/// Repository interface for anomalies.
pub trait AnomalieRepository {
    fn create(
        &self,
        input: &AnomalieInput,
        backlog: &BacklogNumber,
        statut: AnomalieStatut,
    ) -> RepoResult<EntityId>;
    fn update(&self, id: EntityId, input: &AnomalieInput) -> RepoResult<()>;
    fn set_status(
        &self,
        id: EntityId,
        statut: AnomalieStatut,
        date_programmation: Option<NaiveDate>,
        date_execution: Option<NaiveDate>,
    ) -> RepoResult<()>;
    fn get(&self, id: EntityId) -> RepoResult<Option<Anomalie>>;
    fn list(&self, filter: &AnomalieFilter) -> RepoResult<Vec<Anomalie>>;
    fn delete(&self, id: EntityId) -> RepoResult<()>;
    /// Reserves the next sequence for the given detection year (starts at 1).
    fn reserve_backlog_seq(&self, year: i32) -> RepoResult<i64>;
    fn count_by_statut(&self, site_id: Option<EntityId>)
        -> RepoResult<BTreeMap<AnomalieStatut, i64>>;
    /// Counts by priority; `open_only` leaves executed anomalies out.
    fn count_by_priorite(
        &self,
        site_id: Option<EntityId>,
        open_only: bool,
    ) -> RepoResult<BTreeMap<Priorite, i64>>;
}

/// SQLite-backed anomaly repository.
pub struct SqliteAnomalieRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAnomalieRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AnomalieRepository for SqliteAnomalieRepository<'_> {
    fn create(
        &self,
        input: &AnomalieInput,
        backlog: &BacklogNumber,
        statut: AnomalieStatut,
    ) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                "INSERT INTO anomalies (
                    numero_backlog,
                    backlog_year,
                    backlog_seq,
                    date_detection,
                    description,
                    source,
                    priorite,
                    besoin_pdr,
                    quantite_pdr,
                    reference_pdr,
                    engin_id,
                    site_id,
                    statut,
                    observations
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14);",
                params![
                    backlog.formatted.as_str(),
                    backlog.year,
                    backlog.seq,
                    input.date_detection,
                    input.description.trim(),
                    input.source.as_str(),
                    input.priorite.as_str(),
                    bool_to_int(input.besoin_pdr),
                    input.quantite_pdr,
                    input.reference_pdr.as_deref(),
                    input.engin_id,
                    input.site_id,
                    statut.as_str(),
                    input.observations.as_deref(),
                ],
            )
            .map_err(|err| write_error("anomalie", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: EntityId, input: &AnomalieInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE anomalies
                 SET
                    date_detection = ?1,
                    description = ?2,
                    source = ?3,
                    priorite = ?4,
                    besoin_pdr = ?5,
                    quantite_pdr = ?6,
                    reference_pdr = ?7,
                    engin_id = ?8,
                    site_id = ?9,
                    observations = ?10,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?11;",
                params![
                    input.date_detection,
                    input.description.trim(),
                    input.source.as_str(),
                    input.priorite.as_str(),
                    bool_to_int(input.besoin_pdr),
                    input.quantite_pdr,
                    input.reference_pdr.as_deref(),
                    input.engin_id,
                    input.site_id,
                    input.observations.as_deref(),
                    id,
                ],
            )
            .map_err(|err| write_error("anomalie", err))?;
        expect_changed(changed, "anomalie", id)
    }

    fn set_status(
        &self,
        id: EntityId,
        statut: AnomalieStatut,
        date_programmation: Option<NaiveDate>,
        date_execution: Option<NaiveDate>,
    ) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE anomalies
                 SET
                    statut = ?1,
                    date_programmation = ?2,
                    date_execution = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?4;",
                params![statut.as_str(), date_programmation, date_execution, id],
            )
            .map_err(|err| write_error("anomalie", err))?;
        expect_changed(changed, "anomalie", id)
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<Anomalie>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ANOMALIE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_anomalie_row(row)?));
        }
        Ok(None)
    }

    fn list(&self, filter: &AnomalieFilter) -> RepoResult<Vec<Anomalie>> {
        let mut sql = format!("{ANOMALIE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(statut) = filter.statut {
            sql.push_str(" AND statut = ?");
            bind_values.push(Value::Text(statut.as_str().to_string()));
        }
        if let Some(priorite) = filter.priorite {
            sql.push_str(" AND priorite = ?");
            bind_values.push(Value::Text(priorite.as_str().to_string()));
        }
        if let Some(engin_id) = filter.engin_id {
            sql.push_str(" AND engin_id = ?");
            bind_values.push(Value::Integer(engin_id));
        }
        if let Some(site_id) = filter.site_id {
            sql.push_str(" AND site_id = ?");
            bind_values.push(Value::Integer(site_id));
        }
        sql.push_str(" ORDER BY date_detection DESC, backlog_seq DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut anomalies = Vec::new();
        while let Some(row) = rows.next()? {
            anomalies.push(parse_anomalie_row(row)?);
        }
        Ok(anomalies)
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM anomalies WHERE id = ?1;", [id])
            .map_err(|err| write_error("anomalie", err))?;
        expect_changed(changed, "anomalie", id)
    }

    fn reserve_backlog_seq(&self, year: i32) -> RepoResult<i64> {
        let seq: i64 = self.conn.query_row(
            "INSERT INTO backlog_sequences (year, last_seq) VALUES (?1, 1)
             ON CONFLICT(year) DO UPDATE SET last_seq = last_seq + 1
             RETURNING last_seq;",
            [year],
            |row| row.get(0),
        )?;
        Ok(seq)
    }

    fn count_by_statut(
        &self,
        site_id: Option<EntityId>,
    ) -> RepoResult<BTreeMap<AnomalieStatut, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT statut, COUNT(*)
             FROM anomalies
             WHERE (?1 IS NULL OR site_id = ?1)
             GROUP BY statut;",
        )?;
        let mut rows = stmt.query([site_id])?;
        let mut counts: BTreeMap<AnomalieStatut, i64> =
            AnomalieStatut::ALL.iter().map(|statut| (*statut, 0)).collect();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            let statut = AnomalieStatut::parse(&text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid statut `{text}` in anomalies.statut"))
            })?;
            counts.insert(statut, row.get(1)?);
        }
        Ok(counts)
    }

    fn count_by_priorite(
        &self,
        site_id: Option<EntityId>,
        open_only: bool,
    ) -> RepoResult<BTreeMap<Priorite, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT priorite, COUNT(*)
             FROM anomalies
             WHERE (?1 = 0 OR statut <> 'EXECUTEE')
               AND (?2 IS NULL OR site_id = ?2)
             GROUP BY priorite;",
        )?;
        let mut rows = stmt.query(params![open_only, site_id])?;
        let mut counts: BTreeMap<Priorite, i64> =
            Priorite::ALL.iter().map(|priorite| (*priorite, 0)).collect();
        while let Some(row) = rows.next()? {
            let text: String = row.get(0)?;
            let priorite = Priorite::parse(&text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid priorite `{text}` in anomalies.priorite"))
            })?;
            counts.insert(priorite, row.get(1)?);
        }
        Ok(counts)
    }
}

fn parse_date(value: &str, column: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

fn parse_optional_date(value: Option<String>, column: &str) -> RepoResult<Option<NaiveDate>> {
    value.map(|text| parse_date(&text, column)).transpose()
}

fn parse_anomalie_row(row: &Row<'_>) -> RepoResult<Anomalie> {
    let source_text: String = row.get("source")?;
    let source = AnomalieSource::parse(&source_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid source `{source_text}` in anomalies.source"))
    })?;

    let priorite_text: String = row.get("priorite")?;
    let priorite = Priorite::parse(&priorite_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priorite `{priorite_text}` in anomalies.priorite"
        ))
    })?;

    let statut_text: String = row.get("statut")?;
    let statut = AnomalieStatut::parse(&statut_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid statut `{statut_text}` in anomalies.statut"))
    })?;

    let date_detection_text: String = row.get("date_detection")?;

    Ok(Anomalie {
        id: row.get("id")?,
        numero_backlog: row.get("numero_backlog")?,
        date_detection: parse_date(&date_detection_text, "anomalies.date_detection")?,
        description: row.get("description")?,
        source,
        priorite,
        besoin_pdr: int_to_bool(row.get("besoin_pdr")?, "anomalies.besoin_pdr")?,
        quantite_pdr: row.get("quantite_pdr")?,
        reference_pdr: row.get("reference_pdr")?,
        engin_id: row.get("engin_id")?,
        site_id: row.get("site_id")?,
        statut,
        date_programmation: parse_optional_date(
            row.get("date_programmation")?,
            "anomalies.date_programmation",
        )?,
        date_execution: parse_optional_date(
            row.get("date_execution")?,
            "anomalies.date_execution",
        )?,
        observations: row.get("observations")?,
    })
}
