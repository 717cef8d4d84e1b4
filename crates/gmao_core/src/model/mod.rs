//! Domain model for fleet maintenance management.
//!
//! # Responsibility
//! - Define canonical records for referential data, daily entries,
//!   anomalies, targets and users.
//! - Own field-level validation shared by repositories and services.
//!
//! # Invariants
//! - Every persisted record is identified by a SQLite integer id.
//! - Write inputs are validated before any SQL mutation.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod anomalie;
pub mod objectif;
pub mod referential;
pub mod saisie;
pub mod user;

/// Row identifier for every persisted record.
pub type EntityId = i64;

/// Maximum length, in chars, of referential names.
pub const NAME_MAX_CHARS: usize = 100;

/// Maximum length, in chars, of free-text observations.
pub const TEXT_MAX_CHARS: usize = 2_000;

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooLong { field: &'static str, max: usize },
    OutOfRange { field: &'static str, detail: String },
    Invalid { field: &'static str, detail: String },
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyField(field)
            | Self::TooLong { field, .. }
            | Self::OutOfRange { field, .. }
            | Self::Invalid { field, .. } => field,
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
            Self::TooLong { field, max } => {
                write!(f, "`{field}` exceeds the maximum of {max} characters")
            }
            Self::OutOfRange { field, detail } => write!(f, "`{field}` out of range: {detail}"),
            Self::Invalid { field, detail } => write!(f, "`{field}` is invalid: {detail}"),
        }
    }
}

impl Error for ValidationError {}

/// Checks a referential name: trimmed value must be non-empty and short.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().count() > NAME_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field,
            max: NAME_MAX_CHARS,
        });
    }
    Ok(())
}

/// Checks optional free text length.
pub fn validate_text(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(text) if text.chars().count() > TEXT_MAX_CHARS => Err(ValidationError::TooLong {
            field,
            max: TEXT_MAX_CHARS,
        }),
        _ => Ok(()),
    }
}

/// Checks that `value` is finite and within `min..=max`.
pub fn validate_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::Invalid {
            field,
            detail: "value must be a finite number".to_string(),
        });
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            detail: format!("{value} not in [{min}, {max}]"),
        });
    }
    Ok(())
}

/// Checks that a foreign key looks like a persisted id.
pub fn validate_id(field: &'static str, value: EntityId) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::Invalid {
            field,
            detail: format!("id must be positive, got {value}"),
        });
    }
    Ok(())
}
