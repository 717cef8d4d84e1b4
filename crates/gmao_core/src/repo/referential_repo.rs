//! Referential repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - CRUD over sites, lookup tables, parcs, pannes, lubrifiants and engins.
//! - Name lookups used by imports and reports.
//!
//! # Invariants
//! - Names are persisted trimmed.
//! - Deleting a row still referenced elsewhere yields `Conflict`.

use super::{
    bool_to_int, expect_changed, int_to_bool, write_error, RepoError, RepoResult,
};
use crate::model::referential::{
    Engin, EnginFilter, EnginInput, LookupKind, Lubrifiant, LubrifiantInput, NameInput,
    NamedEntry, Panne, PanneInput, Parc, ParcInput, Site, SiteInput,
};
use crate::model::EntityId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const ENGIN_SELECT_SQL: &str = "SELECT
    id,
    name,
    parc_id,
    site_id,
    active,
    initial_heure_chassis
FROM engins";

/// Parent-linked catalog tables sharing the `(id, name, parent)` shape.
#[derive(Debug, Clone, Copy)]
struct ChildTable {
    entity: &'static str,
    table: &'static str,
    parent_column: &'static str,
}

const PARCS: ChildTable = ChildTable {
    entity: "parc",
    table: "parcs",
    parent_column: "typeparc_id",
};
const PANNES: ChildTable = ChildTable {
    entity: "panne",
    table: "pannes",
    parent_column: "typepanne_id",
};
const LUBRIFIANTS: ChildTable = ChildTable {
    entity: "lubrifiant",
    table: "lubrifiants",
    parent_column: "typelubrifiant_id",
};

/// Repository interface for referential data.
pub trait ReferentialRepository {
    fn create_lookup(&self, kind: LookupKind, input: &NameInput) -> RepoResult<EntityId>;
    fn update_lookup(&self, kind: LookupKind, id: EntityId, input: &NameInput) -> RepoResult<()>;
    fn get_lookup(&self, kind: LookupKind, id: EntityId) -> RepoResult<Option<NamedEntry>>;
    fn find_lookup_by_name(&self, kind: LookupKind, name: &str)
        -> RepoResult<Option<NamedEntry>>;
    fn list_lookups(&self, kind: LookupKind) -> RepoResult<Vec<NamedEntry>>;
    fn delete_lookup(&self, kind: LookupKind, id: EntityId) -> RepoResult<()>;

    fn create_site(&self, input: &SiteInput) -> RepoResult<EntityId>;
    fn update_site(&self, id: EntityId, input: &SiteInput) -> RepoResult<()>;
    fn get_site(&self, id: EntityId) -> RepoResult<Option<Site>>;
    fn find_site_by_name(&self, name: &str) -> RepoResult<Option<Site>>;
    fn list_sites(&self) -> RepoResult<Vec<Site>>;
    fn delete_site(&self, id: EntityId) -> RepoResult<()>;

    fn create_parc(&self, input: &ParcInput) -> RepoResult<EntityId>;
    fn update_parc(&self, id: EntityId, input: &ParcInput) -> RepoResult<()>;
    fn get_parc(&self, id: EntityId) -> RepoResult<Option<Parc>>;
    fn find_parc_by_name(&self, name: &str) -> RepoResult<Option<Parc>>;
    fn list_parcs(&self, typeparc_id: Option<EntityId>) -> RepoResult<Vec<Parc>>;
    fn delete_parc(&self, id: EntityId) -> RepoResult<()>;

    fn create_panne(&self, input: &PanneInput) -> RepoResult<EntityId>;
    fn update_panne(&self, id: EntityId, input: &PanneInput) -> RepoResult<()>;
    fn get_panne(&self, id: EntityId) -> RepoResult<Option<Panne>>;
    fn find_panne_by_name(&self, name: &str) -> RepoResult<Option<Panne>>;
    fn list_pannes(&self, typepanne_id: Option<EntityId>) -> RepoResult<Vec<Panne>>;
    fn delete_panne(&self, id: EntityId) -> RepoResult<()>;

    fn create_lubrifiant(&self, input: &LubrifiantInput) -> RepoResult<EntityId>;
    fn update_lubrifiant(&self, id: EntityId, input: &LubrifiantInput) -> RepoResult<()>;
    fn get_lubrifiant(&self, id: EntityId) -> RepoResult<Option<Lubrifiant>>;
    fn list_lubrifiants(&self, typelubrifiant_id: Option<EntityId>)
        -> RepoResult<Vec<Lubrifiant>>;
    fn delete_lubrifiant(&self, id: EntityId) -> RepoResult<()>;

    fn create_engin(&self, input: &EnginInput) -> RepoResult<EntityId>;
    fn update_engin(&self, id: EntityId, input: &EnginInput) -> RepoResult<()>;
    fn get_engin(&self, id: EntityId) -> RepoResult<Option<Engin>>;
    fn find_engin_by_name(&self, name: &str) -> RepoResult<Option<Engin>>;
    fn list_engins(&self, filter: &EnginFilter) -> RepoResult<Vec<Engin>>;
    fn delete_engin(&self, id: EntityId) -> RepoResult<()>;
}

/// SQLite-backed referential repository.
pub struct SqliteReferentialRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferentialRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn insert_child(&self, table: ChildTable, name: &str, parent_id: EntityId) -> RepoResult<EntityId> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO {} (name, {}) VALUES (?1, ?2);",
                    table.table, table.parent_column
                ),
                params![name.trim(), parent_id],
            )
            .map_err(|err| write_error(table.entity, err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_child(
        &self,
        table: ChildTable,
        id: EntityId,
        name: &str,
        parent_id: EntityId,
    ) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {}
                     SET
                        name = ?1,
                        {} = ?2,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?3;",
                    table.table, table.parent_column
                ),
                params![name.trim(), parent_id, id],
            )
            .map_err(|err| write_error(table.entity, err))?;
        expect_changed(changed, table.entity, id)
    }

    fn get_child(&self, table: ChildTable, id: EntityId) -> RepoResult<Option<ChildRow>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, name, {} FROM {} WHERE id = ?1;",
                    table.parent_column, table.table
                ),
                [id],
                parse_child_row,
            )
            .optional()?;
        Ok(row)
    }

    fn find_child(&self, table: ChildTable, name: &str) -> RepoResult<Option<ChildRow>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, name, {} FROM {} WHERE name = ?1 COLLATE NOCASE;",
                    table.parent_column, table.table
                ),
                [name.trim()],
                parse_child_row,
            )
            .optional()?;
        Ok(row)
    }

    fn list_children(
        &self,
        table: ChildTable,
        parent_id: Option<EntityId>,
    ) -> RepoResult<Vec<ChildRow>> {
        let mut sql = format!(
            "SELECT id, name, {} FROM {}",
            table.parent_column, table.table
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(parent_id) = parent_id {
            sql.push_str(&format!(" WHERE {} = ?", table.parent_column));
            bind_values.push(Value::Integer(parent_id));
        }
        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), parse_child_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn delete_row(&self, entity: &'static str, table: &str, id: EntityId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])
            .map_err(|err| write_error(entity, err))?;
        expect_changed(changed, entity, id)
    }
}

type ChildRow = (EntityId, String, EntityId);

fn parse_child_row(row: &Row<'_>) -> rusqlite::Result<ChildRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

impl ReferentialRepository for SqliteReferentialRepository<'_> {
    fn create_lookup(&self, kind: LookupKind, input: &NameInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                &format!("INSERT INTO {} (name) VALUES (?1);", kind.table()),
                [input.name.trim()],
            )
            .map_err(|err| write_error(kind.label(), err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_lookup(&self, kind: LookupKind, id: EntityId, input: &NameInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {}
                     SET
                        name = ?1,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?2;",
                    kind.table()
                ),
                params![input.name.trim(), id],
            )
            .map_err(|err| write_error(kind.label(), err))?;
        expect_changed(changed, kind.label(), id)
    }

    fn get_lookup(&self, kind: LookupKind, id: EntityId) -> RepoResult<Option<NamedEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT id, name FROM {} WHERE id = ?1;", kind.table()),
                [id],
                parse_named_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn find_lookup_by_name(
        &self,
        kind: LookupKind,
        name: &str,
    ) -> RepoResult<Option<NamedEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    "SELECT id, name FROM {} WHERE name = ?1 COLLATE NOCASE;",
                    kind.table()
                ),
                [name.trim()],
                parse_named_entry,
            )
            .optional()?;
        Ok(entry)
    }

    fn list_lookups(&self, kind: LookupKind) -> RepoResult<Vec<NamedEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM {} ORDER BY name COLLATE NOCASE ASC, id ASC;",
            kind.table()
        ))?;
        let rows = stmt.query_map([], parse_named_entry)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn delete_lookup(&self, kind: LookupKind, id: EntityId) -> RepoResult<()> {
        self.delete_row(kind.label(), kind.table(), id)
    }

    fn create_site(&self, input: &SiteInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                "INSERT INTO sites (name, active) VALUES (?1, ?2);",
                params![input.name.trim(), bool_to_int(input.active)],
            )
            .map_err(|err| write_error("site", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_site(&self, id: EntityId, input: &SiteInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE sites
                 SET
                    name = ?1,
                    active = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?3;",
                params![input.name.trim(), bool_to_int(input.active), id],
            )
            .map_err(|err| write_error("site", err))?;
        expect_changed(changed, "site", id)
    }

    fn get_site(&self, id: EntityId) -> RepoResult<Option<Site>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, name, active FROM sites WHERE id = ?1;",
                [id],
                parse_site_columns,
            )
            .optional()?;
        raw.map(site_from_columns).transpose()
    }

    fn find_site_by_name(&self, name: &str) -> RepoResult<Option<Site>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, name, active FROM sites WHERE name = ?1 COLLATE NOCASE;",
                [name.trim()],
                parse_site_columns,
            )
            .optional()?;
        raw.map(site_from_columns).transpose()
    }

    fn list_sites(&self) -> RepoResult<Vec<Site>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, active FROM sites ORDER BY name COLLATE NOCASE ASC;")?;
        let rows = stmt.query_map([], parse_site_columns)?;
        let mut sites = Vec::new();
        for raw in rows {
            sites.push(site_from_columns(raw?)?);
        }
        Ok(sites)
    }

    fn delete_site(&self, id: EntityId) -> RepoResult<()> {
        self.delete_row("site", "sites", id)
    }

    fn create_parc(&self, input: &ParcInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.insert_child(PARCS, &input.name, input.typeparc_id)
    }

    fn update_parc(&self, id: EntityId, input: &ParcInput) -> RepoResult<()> {
        input.validate()?;
        self.update_child(PARCS, id, &input.name, input.typeparc_id)
    }

    fn get_parc(&self, id: EntityId) -> RepoResult<Option<Parc>> {
        Ok(self.get_child(PARCS, id)?.map(parc_from_row))
    }

    fn find_parc_by_name(&self, name: &str) -> RepoResult<Option<Parc>> {
        Ok(self.find_child(PARCS, name)?.map(parc_from_row))
    }

    fn list_parcs(&self, typeparc_id: Option<EntityId>) -> RepoResult<Vec<Parc>> {
        Ok(self
            .list_children(PARCS, typeparc_id)?
            .into_iter()
            .map(parc_from_row)
            .collect())
    }

    fn delete_parc(&self, id: EntityId) -> RepoResult<()> {
        self.delete_row(PARCS.entity, PARCS.table, id)
    }

    fn create_panne(&self, input: &PanneInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.insert_child(PANNES, &input.name, input.typepanne_id)
    }

    fn update_panne(&self, id: EntityId, input: &PanneInput) -> RepoResult<()> {
        input.validate()?;
        self.update_child(PANNES, id, &input.name, input.typepanne_id)
    }

    fn get_panne(&self, id: EntityId) -> RepoResult<Option<Panne>> {
        Ok(self.get_child(PANNES, id)?.map(panne_from_row))
    }

    fn find_panne_by_name(&self, name: &str) -> RepoResult<Option<Panne>> {
        Ok(self.find_child(PANNES, name)?.map(panne_from_row))
    }

    fn list_pannes(&self, typepanne_id: Option<EntityId>) -> RepoResult<Vec<Panne>> {
        Ok(self
            .list_children(PANNES, typepanne_id)?
            .into_iter()
            .map(panne_from_row)
            .collect())
    }

    fn delete_panne(&self, id: EntityId) -> RepoResult<()> {
        self.delete_row(PANNES.entity, PANNES.table, id)
    }

    fn create_lubrifiant(&self, input: &LubrifiantInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.insert_child(LUBRIFIANTS, &input.name, input.typelubrifiant_id)
    }

    fn update_lubrifiant(&self, id: EntityId, input: &LubrifiantInput) -> RepoResult<()> {
        input.validate()?;
        self.update_child(LUBRIFIANTS, id, &input.name, input.typelubrifiant_id)
    }

    fn get_lubrifiant(&self, id: EntityId) -> RepoResult<Option<Lubrifiant>> {
        Ok(self.get_child(LUBRIFIANTS, id)?.map(lubrifiant_from_row))
    }

    fn list_lubrifiants(
        &self,
        typelubrifiant_id: Option<EntityId>,
    ) -> RepoResult<Vec<Lubrifiant>> {
        Ok(self
            .list_children(LUBRIFIANTS, typelubrifiant_id)?
            .into_iter()
            .map(lubrifiant_from_row)
            .collect())
    }

    fn delete_lubrifiant(&self, id: EntityId) -> RepoResult<()> {
        self.delete_row(LUBRIFIANTS.entity, LUBRIFIANTS.table, id)
    }

    fn create_engin(&self, input: &EnginInput) -> RepoResult<EntityId> {
        input.validate()?;
        self.conn
            .execute(
                "INSERT INTO engins (
                    name,
                    parc_id,
                    site_id,
                    active,
                    initial_heure_chassis
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    input.name.trim(),
                    input.parc_id,
                    input.site_id,
                    bool_to_int(input.active),
                    input.initial_heure_chassis,
                ],
            )
            .map_err(|err| write_error("engin", err))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_engin(&self, id: EntityId, input: &EnginInput) -> RepoResult<()> {
        input.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE engins
                 SET
                    name = ?1,
                    parc_id = ?2,
                    site_id = ?3,
                    active = ?4,
                    initial_heure_chassis = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?6;",
                params![
                    input.name.trim(),
                    input.parc_id,
                    input.site_id,
                    bool_to_int(input.active),
                    input.initial_heure_chassis,
                    id,
                ],
            )
            .map_err(|err| write_error("engin", err))?;
        expect_changed(changed, "engin", id)
    }

    fn get_engin(&self, id: EntityId) -> RepoResult<Option<Engin>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENGIN_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_engin_row(row)?));
        }
        Ok(None)
    }

    fn find_engin_by_name(&self, name: &str) -> RepoResult<Option<Engin>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENGIN_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"))?;
        let mut rows = stmt.query([name.trim()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_engin_row(row)?));
        }
        Ok(None)
    }

    fn list_engins(&self, filter: &EnginFilter) -> RepoResult<Vec<Engin>> {
        let mut sql = format!("{ENGIN_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(parc_id) = filter.parc_id {
            sql.push_str(" AND parc_id = ?");
            bind_values.push(Value::Integer(parc_id));
        }
        if let Some(site_id) = filter.site_id {
            sql.push_str(" AND site_id = ?");
            bind_values.push(Value::Integer(site_id));
        }
        if let Some(active) = filter.active {
            sql.push_str(" AND active = ?");
            bind_values.push(Value::Integer(bool_to_int(active)));
        }
        sql.push_str(" ORDER BY name COLLATE NOCASE ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut engins = Vec::new();
        while let Some(row) = rows.next()? {
            engins.push(parse_engin_row(row)?);
        }
        Ok(engins)
    }

    fn delete_engin(&self, id: EntityId) -> RepoResult<()> {
        self.delete_row("engin", "engins", id)
    }
}

fn parse_named_entry(row: &Row<'_>) -> rusqlite::Result<NamedEntry> {
    Ok(NamedEntry {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

type SiteColumns = (EntityId, String, i64);

fn parse_site_columns(row: &Row<'_>) -> rusqlite::Result<SiteColumns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn site_from_columns((id, name, active): SiteColumns) -> RepoResult<Site> {
    Ok(Site {
        id,
        name,
        active: int_to_bool(active, "sites.active")?,
    })
}

fn parc_from_row((id, name, typeparc_id): ChildRow) -> Parc {
    Parc {
        id,
        name,
        typeparc_id,
    }
}

fn panne_from_row((id, name, typepanne_id): ChildRow) -> Panne {
    Panne {
        id,
        name,
        typepanne_id,
    }
}

fn lubrifiant_from_row((id, name, typelubrifiant_id): ChildRow) -> Lubrifiant {
    Lubrifiant {
        id,
        name,
        typelubrifiant_id,
    }
}

fn parse_engin_row(row: &Row<'_>) -> RepoResult<Engin> {
    let initial_heure_chassis: f64 = row.get("initial_heure_chassis")?;
    if !initial_heure_chassis.is_finite() || initial_heure_chassis < 0.0 {
        return Err(RepoError::InvalidData(format!(
            "invalid initial_heure_chassis `{initial_heure_chassis}` in engins"
        )));
    }
    Ok(Engin {
        id: row.get("id")?,
        name: row.get("name")?,
        parc_id: row.get("parc_id")?,
        site_id: row.get("site_id")?,
        active: int_to_bool(row.get("active")?, "engins.active")?,
        initial_heure_chassis,
    })
}
