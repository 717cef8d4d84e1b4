//! Referential records: sites, fleets, equipment, failure and lubricant
//! catalogs.
//!
//! # Invariants
//! - Names are unique per table, compared case-insensitively.
//! - Engins always belong to exactly one parc and one site.
//! - `initial_heure_chassis` is never negative.

use super::{validate_id, validate_name, validate_range, EntityId, ValidationError};
use serde::{Deserialize, Serialize};

/// Simple name-only lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    TypeParc,
    TypePanne,
    TypeLubrifiant,
    TypeConsommationLub,
}

impl LookupKind {
    pub const ALL: [LookupKind; 4] = [
        LookupKind::TypeParc,
        LookupKind::TypePanne,
        LookupKind::TypeLubrifiant,
        LookupKind::TypeConsommationLub,
    ];

    /// Backing SQLite table.
    pub fn table(self) -> &'static str {
        match self {
            Self::TypeParc => "typeparcs",
            Self::TypePanne => "typepannes",
            Self::TypeLubrifiant => "typelubrifiants",
            Self::TypeConsommationLub => "typeconsommationlubs",
        }
    }

    /// Singular label used in error messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::TypeParc => "typeparc",
            Self::TypePanne => "typepanne",
            Self::TypeLubrifiant => "typelubrifiant",
            Self::TypeConsommationLub => "typeconsommationlub",
        }
    }
}

/// Row of a name-only lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntry {
    pub id: EntityId,
    pub name: String,
}

/// Write input for a name-only lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameInput {
    pub name: String,
}

impl NameInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)
    }
}

/// Operating site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: EntityId,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInput {
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl SiteInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)
    }
}

/// Fleet of same-model engins, grouped under a parc type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parc {
    pub id: EntityId,
    pub name: String,
    pub typeparc_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcInput {
    pub name: String,
    pub typeparc_id: EntityId,
}

impl ParcInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)?;
        validate_id("typeparc_id", self.typeparc_id)
    }
}

/// Failure catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panne {
    pub id: EntityId,
    pub name: String,
    pub typepanne_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanneInput {
    pub name: String,
    pub typepanne_id: EntityId,
}

impl PanneInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)?;
        validate_id("typepanne_id", self.typepanne_id)
    }
}

/// Lubricant product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lubrifiant {
    pub id: EntityId,
    pub name: String,
    pub typelubrifiant_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LubrifiantInput {
    pub name: String,
    pub typelubrifiant_id: EntityId,
}

impl LubrifiantInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)?;
        validate_id("typelubrifiant_id", self.typelubrifiant_id)
    }
}

/// Piece of fleet equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engin {
    pub id: EntityId,
    pub name: String,
    pub parc_id: EntityId,
    pub site_id: EntityId,
    pub active: bool,
    /// Counter reading when the engin entered the system.
    pub initial_heure_chassis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnginInput {
    pub name: String,
    pub parc_id: EntityId,
    pub site_id: EntityId,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub initial_heure_chassis: f64,
}

impl EnginInput {
    pub fn new(name: impl Into<String>, parc_id: EntityId, site_id: EntityId) -> Self {
        Self {
            name: name.into(),
            parc_id,
            site_id,
            active: true,
            initial_heure_chassis: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("name", &self.name)?;
        validate_id("parc_id", self.parc_id)?;
        validate_id("site_id", self.site_id)?;
        validate_range(
            "initial_heure_chassis",
            self.initial_heure_chassis,
            0.0,
            f64::MAX,
        )
    }
}

/// List filter for engins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EnginFilter {
    pub parc_id: Option<EntityId>,
    pub site_id: Option<EntityId>,
    pub active: Option<bool>,
}

fn default_active() -> bool {
    true
}
