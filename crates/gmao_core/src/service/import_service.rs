//! Bulk import of spreadsheet rows posted as JSON objects.
//!
//! # Responsibility
//! - Match column headers case- and accent-insensitively.
//! - Resolve referenced names (parc, site, engin, panne) to ids.
//! - Apply all rows in one transaction, or none of them.
//!
//! # Invariants
//! - Any failing row aborts the whole import; every failing row is
//!   reported with its 1-based row number.
//! - `dry_run` validates and writes inside the transaction, then rolls
//!   back.
//! - Entry rows go through `SaisieService`, so the daily capacity check
//!   applies to imports too.

use super::saisie_service::SaisieService;
use super::{ServiceError, ServiceResult};
use crate::model::referential::{EnginInput, LookupKind, PanneInput};
use crate::model::saisie::{SaisieHimInput, SaisieHrmInput};
use crate::model::EntityId;
use crate::repo::referential_repo::{ReferentialRepository, SqliteReferentialRepository};
use crate::repo::saisie_repo::{SaisieRepository, SqliteSaisieRepository};
use chrono::{Duration, NaiveDate};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

static HEADER_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid header separator regex"));

/// Spreadsheet day zero (serial 0), as used by Excel's 1900 date system.
const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Engins,
    Pannes,
    Saisiehrm,
    Saisiehim,
}

impl ImportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Engins => "engins",
            Self::Pannes => "pannes",
            Self::Saisiehrm => "saisiehrm",
            Self::Saisiehim => "saisiehim",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "engins" => Some(Self::Engins),
            "pannes" => Some(Self::Pannes),
            "saisiehrm" => Some(Self::Saisiehrm),
            "saisiehim" => Some(Self::Saisiehim),
            _ => None,
        }
    }
}

/// One rejected row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based position in the submitted array.
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub kind: ImportKind,
    pub rows: usize,
    pub created: usize,
    pub updated: usize,
    pub dry_run: bool,
}

enum RowOutcome {
    Created,
    Updated,
}

pub struct ImportService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ImportService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn import(
        &self,
        kind: ImportKind,
        rows: &[Value],
        dry_run: bool,
    ) -> ServiceResult<ImportReport> {
        let started_at = Instant::now();
        let tx = self.conn.unchecked_transaction()?;
        let referential = SqliteReferentialRepository::new(&tx);
        let saisies = SaisieService::new(SqliteSaisieRepository::new(&tx));
        let saisie_repo = SqliteSaisieRepository::new(&tx);

        let mut report = ImportReport {
            kind,
            rows: rows.len(),
            created: 0,
            updated: 0,
            dry_run,
        };
        let mut errors = Vec::new();

        for (index, raw) in rows.iter().enumerate() {
            let outcome = ImportRow::from_json(raw).and_then(|row| match kind {
                ImportKind::Engins => import_engin(&referential, &row),
                ImportKind::Pannes => import_panne(&referential, &row),
                ImportKind::Saisiehrm => {
                    import_hrm(&referential, &saisies, &saisie_repo, &row)
                }
                ImportKind::Saisiehim => {
                    import_him(&referential, &saisies, &saisie_repo, &row)
                }
            });
            match outcome {
                Ok(RowOutcome::Created) => report.created += 1,
                Ok(RowOutcome::Updated) => report.updated += 1,
                Err(message) => errors.push(RowError {
                    row: index + 1,
                    message,
                }),
            }
        }

        if !errors.is_empty() {
            info!(
                "event=import module=service status=rejected kind={} rows={} errors={}",
                kind.as_str(),
                rows.len(),
                errors.len()
            );
            // Dropping the transaction rolls it back.
            return Err(ServiceError::ImportRejected(errors));
        }

        if dry_run {
            tx.rollback()?;
        } else {
            tx.commit()?;
        }
        info!(
            "event=import module=service status=ok kind={} rows={} created={} updated={} dry_run={} duration_ms={}",
            kind.as_str(),
            report.rows,
            report.created,
            report.updated,
            dry_run,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }
}

fn import_engin<R: ReferentialRepository>(repo: &R, row: &ImportRow) -> Result<RowOutcome, String> {
    let name = row.text(&["engin", "nom", "name", "code"])?;
    let parc_name = row.text(&["parc"])?;
    let site_name = row.text(&["site"])?;
    let parc = repo
        .find_parc_by_name(&parc_name)
        .map_err(display)?
        .ok_or_else(|| format!("unknown parc `{parc_name}`"))?;
    let site = repo
        .find_site_by_name(&site_name)
        .map_err(display)?
        .ok_or_else(|| format!("unknown site `{site_name}`"))?;

    // Columns missing from the row keep the stored values.
    let existing = repo.find_engin_by_name(&name).map_err(display)?;
    let mut input = EnginInput::new(name, parc.id, site.id);
    if let Some(stored) = &existing {
        input.active = stored.active;
        input.initial_heure_chassis = stored.initial_heure_chassis;
    }
    if let Some(active) = row.optional_bool(&["actif", "active"])? {
        input.active = active;
    }
    if let Some(hours) =
        row.optional_number(&["initial_heure_chassis", "heures_chassis", "heure_chassis", "hc"])?
    {
        input.initial_heure_chassis = hours;
    }

    match existing {
        Some(stored) => {
            repo.update_engin(stored.id, &input).map_err(display)?;
            Ok(RowOutcome::Updated)
        }
        None => {
            repo.create_engin(&input).map_err(display)?;
            Ok(RowOutcome::Created)
        }
    }
}

fn import_panne<R: ReferentialRepository>(repo: &R, row: &ImportRow) -> Result<RowOutcome, String> {
    let name = row.text(&["panne", "nom", "name"])?;
    let type_name = row.text(&["type_panne", "typepanne", "type"])?;
    let typepanne = repo
        .find_lookup_by_name(LookupKind::TypePanne, &type_name)
        .map_err(display)?
        .ok_or_else(|| format!("unknown type de panne `{type_name}`"))?;
    let input = PanneInput {
        name: name.clone(),
        typepanne_id: typepanne.id,
    };
    match repo.find_panne_by_name(&name).map_err(display)? {
        Some(existing) => {
            repo.update_panne(existing.id, &input).map_err(display)?;
            Ok(RowOutcome::Updated)
        }
        None => {
            repo.create_panne(&input).map_err(display)?;
            Ok(RowOutcome::Created)
        }
    }
}

fn import_hrm<R: ReferentialRepository, S: SaisieRepository>(
    repo: &R,
    saisies: &SaisieService<S>,
    saisie_repo: &S,
    row: &ImportRow,
) -> Result<RowOutcome, String> {
    let du = row.date(&["du", "date", "jour"])?;
    let (engin_id, default_site) = resolve_engin(repo, row)?;
    let site_id = match row.optional_text(&["site"])? {
        Some(site_name) => {
            repo.find_site_by_name(&site_name)
                .map_err(display)?
                .ok_or_else(|| format!("unknown site `{site_name}`"))?
                .id
        }
        None => default_site,
    };
    let hrm = row.number(&["hrm", "heures_marche"])?;
    let existed = saisie_repo
        .find_hrm(engin_id, du)
        .map_err(display)?
        .is_some();
    saisies
        .upsert_hrm(&SaisieHrmInput {
            du,
            engin_id,
            site_id,
            hrm,
        })
        .map_err(display)?;
    Ok(if existed {
        RowOutcome::Updated
    } else {
        RowOutcome::Created
    })
}

fn import_him<R: ReferentialRepository, S: SaisieRepository>(
    repo: &R,
    saisies: &SaisieService<S>,
    saisie_repo: &S,
    row: &ImportRow,
) -> Result<RowOutcome, String> {
    let du = row.date(&["du", "date", "jour"])?;
    let (engin_id, _) = resolve_engin(repo, row)?;
    let panne_name = row.text(&["panne"])?;
    let panne = repo
        .find_panne_by_name(&panne_name)
        .map_err(display)?
        .ok_or_else(|| format!("unknown panne `{panne_name}`"))?;
    let hrm = saisie_repo
        .find_hrm(engin_id, du)
        .map_err(display)?
        .ok_or_else(|| format!("no saisiehrm for this engin on {du}"))?;

    let input = SaisieHimInput {
        saisiehrm_id: hrm.id,
        panne_id: panne.id,
        him: row.number(&["him", "heures_immobilisation"])?,
        ni: row
            .optional_integer(&["ni", "nombre_interventions", "nombre_d_interventions"])?
            .unwrap_or(1),
        obs: row.optional_text(&["obs", "observation", "observations"])?,
    };
    let existing = saisie_repo
        .list_him(hrm.id)
        .map_err(display)?
        .into_iter()
        .find(|him| him.panne_id == panne.id);
    match existing {
        Some(existing) => {
            saisies.update_him(existing.id, &input).map_err(display)?;
            Ok(RowOutcome::Updated)
        }
        None => {
            saisies.create_him(&input).map_err(display)?;
            Ok(RowOutcome::Created)
        }
    }
}

/// Returns the engin id and its home site.
fn resolve_engin<R: ReferentialRepository>(
    repo: &R,
    row: &ImportRow,
) -> Result<(EntityId, EntityId), String> {
    let engin_name = row.text(&["engin", "code_engin"])?;
    let engin = repo
        .find_engin_by_name(&engin_name)
        .map_err(display)?
        .ok_or_else(|| format!("unknown engin `{engin_name}`"))?;
    Ok((engin.id, engin.site_id))
}

fn display(err: impl std::fmt::Display) -> String {
    err.to_string()
}

/// Lowercases, folds accents and collapses separators to `_`.
pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw.trim().to_lowercase().chars().map(fold_accent).collect();
    HEADER_SEPARATOR_RE
        .replace_all(&folded, "_")
        .trim_matches('_')
        .to_string()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// One JSON object keyed by normalized header.
struct ImportRow<'a> {
    fields: HashMap<String, &'a Value>,
}

impl<'a> ImportRow<'a> {
    fn from_json(raw: &'a Value) -> Result<Self, String> {
        let object = raw
            .as_object()
            .ok_or_else(|| "row must be a JSON object".to_string())?;
        let fields = object
            .iter()
            .filter(|(_, value)| !is_blank(value))
            .map(|(key, value)| (normalize_header(key), value))
            .collect();
        Ok(Self { fields })
    }

    fn lookup(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .find_map(|alias| self.fields.get(*alias).copied())
    }

    fn text(&self, aliases: &[&str]) -> Result<String, String> {
        self.optional_text(aliases)?
            .ok_or_else(|| missing_column(aliases))
    }

    fn optional_text(&self, aliases: &[&str]) -> Result<Option<String>, String> {
        match self.lookup(aliases) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
            Some(Value::Number(number)) => Ok(Some(number.to_string())),
            Some(other) => Err(format!("column `{}` expects text, got {other}", aliases[0])),
        }
    }

    fn number(&self, aliases: &[&str]) -> Result<f64, String> {
        self.optional_number(aliases)?
            .ok_or_else(|| missing_column(aliases))
    }

    fn optional_number(&self, aliases: &[&str]) -> Result<Option<f64>, String> {
        match self.lookup(aliases) {
            None => Ok(None),
            Some(Value::Number(number)) => number
                .as_f64()
                .map(Some)
                .ok_or_else(|| format!("column `{}` is not a finite number", aliases[0])),
            Some(Value::String(text)) => parse_decimal(text)
                .map(Some)
                .ok_or_else(|| format!("column `{}` expects a number, got `{text}`", aliases[0])),
            Some(other) => Err(format!("column `{}` expects a number, got {other}", aliases[0])),
        }
    }

    fn optional_integer(&self, aliases: &[&str]) -> Result<Option<i64>, String> {
        match self.optional_number(aliases)? {
            None => Ok(None),
            Some(value) if value.fract() == 0.0 => Ok(Some(value as i64)),
            Some(value) => Err(format!(
                "column `{}` expects a whole number, got {value}",
                aliases[0]
            )),
        }
    }

    fn optional_bool(&self, aliases: &[&str]) -> Result<Option<bool>, String> {
        let Some(value) = self.lookup(aliases) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            Value::String(text) => match normalize_header(text).as_str() {
                "1" | "true" | "oui" | "yes" | "actif" => Some(true),
                "0" | "false" | "non" | "no" | "inactif" => Some(false),
                _ => None,
            },
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| format!("column `{}` expects a yes/no value", aliases[0]))
    }

    fn date(&self, aliases: &[&str]) -> Result<NaiveDate, String> {
        let value = self.lookup(aliases).ok_or_else(|| missing_column(aliases))?;
        let parsed = match value {
            Value::String(text) => parse_date_text(text.trim()),
            Value::Number(number) => number.as_f64().and_then(serial_to_date),
            _ => None,
        };
        parsed.ok_or_else(|| format!("column `{}` expects a date, got {value}", aliases[0]))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn missing_column(aliases: &[&str]) -> String {
    format!("missing column `{}`", aliases[0])
}

/// Accepts `8.5` and `8,5`.
fn parse_decimal(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Converts a spreadsheet serial day number to a date.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let (year, month, day) = SPREADSHEET_EPOCH;
    NaiveDate::from_ymd_opt(year, month, day)
        .map(|epoch| epoch + Duration::days(serial.trunc() as i64))
}
