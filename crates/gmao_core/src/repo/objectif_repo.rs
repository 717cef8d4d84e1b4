//! KPI target repository.

use super::{expect_changed, write_error, RepoResult};
use crate::model::objectif::{Objectif, ObjectifInput};
use crate::model::EntityId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const OBJECTIF_SELECT_SQL: &str = "SELECT
    id,
    annee,
    parc_id,
    site_id,
    dispo,
    mtbf,
    tdm,
    spe_huile,
    spe_go,
    spe_graisse
FROM objectifs";

pub trait ObjectifRepository {
    fn create(&self, input: &ObjectifInput) -> RepoResult<EntityId>;
    fn update(&self, id: EntityId, input: &ObjectifInput) -> RepoResult<()>;
    fn get(&self, id: EntityId) -> RepoResult<Option<Objectif>>;
    /// Lists targets, optionally for one year, ordered by year then parc.
    fn list(&self, annee: Option<i32>) -> RepoResult<Vec<Objectif>>;
    /// Exact scope lookup; `site_id = None` means the parc-wide target.
    fn find(
        &self,
        annee: i32,
        parc_id: EntityId,
        site_id: Option<EntityId>,
    ) -> RepoResult<Option<Objectif>>;
    fn delete(&self, id: EntityId) -> RepoResult<()>;
}

pub struct SqliteObjectifRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObjectifRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ObjectifRepository for SqliteObjectifRepository<'_> {
    fn create(&self, input: &ObjectifInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                "INSERT INTO objectifs (
                    annee,
                    parc_id,
                    site_id,
                    dispo,
                    mtbf,
                    tdm,
                    spe_huile,
                    spe_go,
                    spe_graisse
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    input.annee,
                    input.parc_id,
                    input.site_id,
                    input.dispo,
                    input.mtbf,
                    input.tdm,
                    input.spe_huile,
                    input.spe_go,
                    input.spe_graisse,
                ],
            )
            .map_err(|err| write_error("objectif", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: EntityId, input: &ObjectifInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE objectifs
                 SET
                    annee = ?1,
                    parc_id = ?2,
                    site_id = ?3,
                    dispo = ?4,
                    mtbf = ?5,
                    tdm = ?6,
                    spe_huile = ?7,
                    spe_go = ?8,
                    spe_graisse = ?9,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?10;",
                params![
                    input.annee,
                    input.parc_id,
                    input.site_id,
                    input.dispo,
                    input.mtbf,
                    input.tdm,
                    input.spe_huile,
                    input.spe_go,
                    input.spe_graisse,
                    id,
                ],
            )
            .map_err(|err| write_error("objectif", err))?;
        expect_changed(changed, "objectif", id)
    }

    fn get(&self, id: EntityId) -> RepoResult<Option<Objectif>> {
        let objectif = self
            .conn
            .query_row(
                &format!("{OBJECTIF_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_objectif_row,
            )
            .optional()?;
        Ok(objectif)
    }

    fn list(&self, annee: Option<i32>) -> RepoResult<Vec<Objectif>> {
        let mut stmt = self.conn.prepare(&format!(
            "{OBJECTIF_SELECT_SQL}
             WHERE (?1 IS NULL OR annee = ?1)
             ORDER BY annee DESC, parc_id ASC, site_id ASC;"
        ))?;
        let rows = stmt.query_map([annee], parse_objectif_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn find(
        &self,
        annee: i32,
        parc_id: EntityId,
        site_id: Option<EntityId>,
    ) -> RepoResult<Option<Objectif>> {
        let objectif = self
            .conn
            .query_row(
                &format!(
                    "{OBJECTIF_SELECT_SQL}
                     WHERE annee = ?1
                       AND parc_id = ?2
                       AND site_id IS ?3;"
                ),
                params![annee, parc_id, site_id],
                parse_objectif_row,
            )
            .optional()?;
        Ok(objectif)
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM objectifs WHERE id = ?1;", [id])
            .map_err(|err| write_error("objectif", err))?;
        expect_changed(changed, "objectif", id)
    }
}

fn parse_objectif_row(row: &Row<'_>) -> rusqlite::Result<Objectif> {
    Ok(Objectif {
        id: row.get("id")?,
        annee: row.get("annee")?,
        parc_id: row.get("parc_id")?,
        site_id: row.get("site_id")?,
        dispo: row.get("dispo")?,
        mtbf: row.get("mtbf")?,
        tdm: row.get("tdm")?,
        spe_huile: row.get("spe_huile")?,
        spe_go: row.get("spe_go")?,
        spe_graisse: row.get("spe_graisse")?,
    })
}
