//! Daily entry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist hrm/him/lubricant entries.
//! - Expose per-day used-hours sums for the capacity invariant.
//!
//! # Invariants
//! - `(engin_id, du)` and `(saisiehrm_id, panne_id)` are unique.
//! - Deleting a daily entry cascades to its him and lubricant rows.

use super::{expect_changed, write_error, RepoError, RepoResult};
use crate::model::saisie::{
    SaisieHim, SaisieHimInput, SaisieHrm, SaisieHrmFilter, SaisieHrmInput, SaisieLubrifiant,
    SaisieLubrifiantInput,
};
use crate::model::EntityId;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const HRM_SELECT_SQL: &str = "SELECT id, du, engin_id, site_id, hrm FROM saisiehrm";
const HIM_SELECT_SQL: &str = "SELECT id, saisiehrm_id, panne_id, him, ni, obs FROM saisiehim";
const LUB_SELECT_SQL: &str = "SELECT
    id,
    saisiehim_id,
    lubrifiant_id,
    typeconsommationlub_id,
    qte,
    obs
FROM saisielubrifiant";

/// Repository interface for daily entries.
pub trait SaisieRepository {
    fn create_hrm(&self, input: &SaisieHrmInput) -> RepoResult<EntityId>;
    fn update_hrm(&self, id: EntityId, input: &SaisieHrmInput) -> RepoResult<()>;
    fn get_hrm(&self, id: EntityId) -> RepoResult<Option<SaisieHrm>>;
    fn find_hrm(&self, engin_id: EntityId, du: NaiveDate) -> RepoResult<Option<SaisieHrm>>;
    fn list_hrm(&self, filter: &SaisieHrmFilter) -> RepoResult<Vec<SaisieHrm>>;
    fn delete_hrm(&self, id: EntityId) -> RepoResult<()>;

    fn create_him(&self, input: &SaisieHimInput) -> RepoResult<EntityId>;
    fn update_him(&self, id: EntityId, input: &SaisieHimInput) -> RepoResult<()>;
    fn get_him(&self, id: EntityId) -> RepoResult<Option<SaisieHim>>;
    fn list_him(&self, saisiehrm_id: EntityId) -> RepoResult<Vec<SaisieHim>>;
    fn delete_him(&self, id: EntityId) -> RepoResult<()>;
    /// Sum of `him` recorded on one daily entry, optionally skipping one row.
    fn sum_him(&self, saisiehrm_id: EntityId, excluding: Option<EntityId>) -> RepoResult<f64>;

    fn create_lubrifiant(&self, input: &SaisieLubrifiantInput) -> RepoResult<EntityId>;
    fn update_lubrifiant(&self, id: EntityId, input: &SaisieLubrifiantInput) -> RepoResult<()>;
    fn get_lubrifiant(&self, id: EntityId) -> RepoResult<Option<SaisieLubrifiant>>;
    fn list_lubrifiant(&self, saisiehim_id: EntityId) -> RepoResult<Vec<SaisieLubrifiant>>;
    fn delete_lubrifiant(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed daily entry repository.
pub struct SqliteSaisieRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSaisieRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SaisieRepository for SqliteSaisieRepository<'_> {
    fn create_hrm(&self, input: &SaisieHrmInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                "INSERT INTO saisiehrm (du, engin_id, site_id, hrm) VALUES (?1, ?2, ?3, ?4);",
                params![input.du, input.engin_id, input.site_id, input.hrm],
            )
            .map_err(|err| write_error("saisiehrm", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_hrm(&self, id: EntityId, input: &SaisieHrmInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE saisiehrm
                 SET
                    du = ?1,
                    engin_id = ?2,
                    site_id = ?3,
                    hrm = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?5;",
                params![input.du, input.engin_id, input.site_id, input.hrm, id],
            )
            .map_err(|err| write_error("saisiehrm", err))?;
        expect_changed(changed, "saisiehrm", id)
    }

    fn get_hrm(&self, id: EntityId) -> RepoResult<Option<SaisieHrm>> {
        let mut stmt = self.conn.prepare(&format!("{HRM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_hrm_row(row)?));
        }
        Ok(None)
    }

    fn find_hrm(&self, engin_id: EntityId, du: NaiveDate) -> RepoResult<Option<SaisieHrm>> {
        let mut stmt = self.conn.prepare(&format!(
            "{HRM_SELECT_SQL} WHERE engin_id = ?1 AND du = ?2;"
        ))?;
        let mut rows = stmt.query(params![engin_id, du])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_hrm_row(row)?));
        }
        Ok(None)
    }

    fn list_hrm(&self, filter: &SaisieHrmFilter) -> RepoResult<Vec<SaisieHrm>> {
        let mut sql = format!("{HRM_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(engin_id) = filter.engin_id {
            sql.push_str(" AND engin_id = ?");
            bind_values.push(Value::Integer(engin_id));
        }
        if let Some(site_id) = filter.site_id {
            sql.push_str(" AND site_id = ?");
            bind_values.push(Value::Integer(site_id));
        }
        if let Some(from) = filter.from {
            sql.push_str(" AND du >= ?");
            bind_values.push(Value::Text(from.to_string()));
        }
        if let Some(to) = filter.to {
            sql.push_str(" AND du <= ?");
            bind_values.push(Value::Text(to.to_string()));
        }
        sql.push_str(" ORDER BY du DESC, engin_id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_hrm_row(row)?);
        }
        Ok(entries)
    }

    fn delete_hrm(&self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM saisiehrm WHERE id = ?1;", [id])
            .map_err(|err| write_error("saisiehrm", err))?;
        expect_changed(changed, "saisiehrm", id)
    }

    fn create_him(&self, input: &SaisieHimInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                "INSERT INTO saisiehim (saisiehrm_id, panne_id, him, ni, obs)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    input.saisiehrm_id,
                    input.panne_id,
                    input.him,
                    input.ni,
                    input.obs.as_deref(),
                ],
            )
            .map_err(|err| write_error("saisiehim", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_him(&self, id: EntityId, input: &SaisieHimInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE saisiehim
                 SET
                    saisiehrm_id = ?1,
                    panne_id = ?2,
                    him = ?3,
                    ni = ?4,
                    obs = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?6;",
                params![
                    input.saisiehrm_id,
                    input.panne_id,
                    input.him,
                    input.ni,
                    input.obs.as_deref(),
                    id,
                ],
            )
            .map_err(|err| write_error("saisiehim", err))?;
        expect_changed(changed, "saisiehim", id)
    }

    fn get_him(&self, id: EntityId) -> RepoResult<Option<SaisieHim>> {
        let mut stmt = self.conn.prepare(&format!("{HIM_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_him_row(row)?));
        }
        Ok(None)
    }

    fn list_him(&self, saisiehrm_id: EntityId) -> RepoResult<Vec<SaisieHim>> {
        let mut stmt = self.conn.prepare(&format!(
            "{HIM_SELECT_SQL} WHERE saisiehrm_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([saisiehrm_id])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_him_row(row)?);
        }
        Ok(entries)
    }

    fn delete_him(&self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM saisiehim WHERE id = ?1;", [id])
            .map_err(|err| write_error("saisiehim", err))?;
        expect_changed(changed, "saisiehim", id)
    }

    fn sum_him(&self, saisiehrm_id: EntityId, excluding: Option<EntityId>) -> RepoResult<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(him), 0.0)
             FROM saisiehim
             WHERE saisiehrm_id = ?1
               AND (?2 IS NULL OR id <> ?2);",
            params![saisiehrm_id, excluding],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    fn create_lubrifiant(&self, input: &SaisieLubrifiantInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                "INSERT INTO saisielubrifiant (
                    saisiehim_id,
                    lubrifiant_id,
                    typeconsommationlub_id,
                    qte,
                    obs
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    input.saisiehim_id,
                    input.lubrifiant_id,
                    input.typeconsommationlub_id,
                    input.qte,
                    input.obs.as_deref(),
                ],
            )
            .map_err(|err| write_error("saisielubrifiant", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_lubrifiant(&self, id: EntityId, input: &SaisieLubrifiantInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE saisielubrifiant
                 SET
                    saisiehim_id = ?1,
                    lubrifiant_id = ?2,
                    typeconsommationlub_id = ?3,
                    qte = ?4,
                    obs = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?6;",
                params![
                    input.saisiehim_id,
                    input.lubrifiant_id,
                    input.typeconsommationlub_id,
                    input.qte,
                    input.obs.as_deref(),
                    id,
                ],
            )
            .map_err(|err| write_error("saisielubrifiant", err))?;
        expect_changed(changed, "saisielubrifiant", id)
    }

    fn get_lubrifiant(&self, id: EntityId) -> RepoResult<Option<SaisieLubrifiant>> {
        let entry = self
            .conn
            .query_row(
                &format!("{LUB_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_lubrifiant_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn list_lubrifiant(&self, saisiehim_id: EntityId) -> RepoResult<Vec<SaisieLubrifiant>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LUB_SELECT_SQL} WHERE saisiehim_id = ?1 ORDER BY id ASC;"
        ))?;
        let rows = stmt.query_map([saisiehim_id], parse_lubrifiant_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn delete_lubrifiant(&self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM saisielubrifiant WHERE id = ?1;", [id])
            .map_err(|err| write_error("saisielubrifiant", err))?;
        expect_changed(changed, "saisielubrifiant", id)
    }
}

fn parse_hrm_row(row: &Row<'_>) -> RepoResult<SaisieHrm> {
    let du_text: String = row.get("du")?;
    let du = NaiveDate::parse_from_str(&du_text, "%Y-%m-%d").map_err(|_| {
        RepoError::InvalidData(format!("invalid date `{du_text}` in saisiehrm.du"))
    })?;
    Ok(SaisieHrm {
        id: row.get("id")?,
        du,
        engin_id: row.get("engin_id")?,
        site_id: row.get("site_id")?,
        hrm: row.get("hrm")?,
    })
}

fn parse_him_row(row: &Row<'_>) -> RepoResult<SaisieHim> {
    let ni: i64 = row.get("ni")?;
    if ni < 1 {
        return Err(RepoError::InvalidData(format!(
            "invalid intervention count `{ni}` in saisiehim.ni"
        )));
    }
    Ok(SaisieHim {
        id: row.get("id")?,
        saisiehrm_id: row.get("saisiehrm_id")?,
        panne_id: row.get("panne_id")?,
        him: row.get("him")?,
        ni,
        obs: row.get("obs")?,
    })
}

fn parse_lubrifiant_row(row: &Row<'_>) -> rusqlite::Result<SaisieLubrifiant> {
    Ok(SaisieLubrifiant {
        id: row.get(0)?,
        saisiehim_id: row.get(1)?,
        lubrifiant_id: row.get(2)?,
        typeconsommationlub_id: row.get(3)?,
        qte: row.get(4)?,
        obs: row.get(5)?,
    })
}
