//! Daily usage, immobilization and lubricant entries.
//!
//! # Invariants
//! - One `SaisieHrm` per engin and day.
//! - One `SaisieHim` per daily entry and panne.
//! - For one engin-day, `hrm + sum(him)` never exceeds 24 hours; the
//!   service layer enforces this across rows.

use super::{validate_id, validate_range, validate_text, EntityId, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar hours in one day.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Daily running-hours entry ("heures réelles de marche").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaisieHrm {
    pub id: EntityId,
    pub du: NaiveDate,
    pub engin_id: EntityId,
    pub site_id: EntityId,
    pub hrm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaisieHrmInput {
    pub du: NaiveDate,
    pub engin_id: EntityId,
    pub site_id: EntityId,
    pub hrm: f64,
}

impl SaisieHrmInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("engin_id", self.engin_id)?;
        validate_id("site_id", self.site_id)?;
        validate_range("hrm", self.hrm, 0.0, HOURS_PER_DAY)
    }
}

/// Immobilization entry for one panne on one engin-day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaisieHim {
    pub id: EntityId,
    pub saisiehrm_id: EntityId,
    pub panne_id: EntityId,
    pub him: f64,
    /// Number of interventions.
    pub ni: i64,
    pub obs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaisieHimInput {
    pub saisiehrm_id: EntityId,
    pub panne_id: EntityId,
    pub him: f64,
    #[serde(default = "default_ni")]
    pub ni: i64,
    #[serde(default)]
    pub obs: Option<String>,
}

impl SaisieHimInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("saisiehrm_id", self.saisiehrm_id)?;
        validate_id("panne_id", self.panne_id)?;
        validate_range("him", self.him, 0.0, HOURS_PER_DAY)?;
        if self.him <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "him",
                detail: "immobilization hours must be positive".to_string(),
            });
        }
        if self.ni < 1 {
            return Err(ValidationError::OutOfRange {
                field: "ni",
                detail: format!("at least one intervention expected, got {}", self.ni),
            });
        }
        validate_text("obs", self.obs.as_deref())
    }
}

/// Lubricant consumed during an immobilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaisieLubrifiant {
    pub id: EntityId,
    pub saisiehim_id: EntityId,
    pub lubrifiant_id: EntityId,
    pub typeconsommationlub_id: Option<EntityId>,
    pub qte: f64,
    pub obs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaisieLubrifiantInput {
    pub saisiehim_id: EntityId,
    pub lubrifiant_id: EntityId,
    #[serde(default)]
    pub typeconsommationlub_id: Option<EntityId>,
    pub qte: f64,
    #[serde(default)]
    pub obs: Option<String>,
}

impl SaisieLubrifiantInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id("saisiehim_id", self.saisiehim_id)?;
        validate_id("lubrifiant_id", self.lubrifiant_id)?;
        if let Some(id) = self.typeconsommationlub_id {
            validate_id("typeconsommationlub_id", id)?;
        }
        validate_range("qte", self.qte, 0.0, f64::MAX)?;
        if self.qte <= 0.0 {
            return Err(ValidationError::OutOfRange {
                field: "qte",
                detail: "quantity must be positive".to_string(),
            });
        }
        validate_text("obs", self.obs.as_deref())
    }
}

/// List filter for daily entries. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SaisieHrmFilter {
    pub engin_id: Option<EntityId>,
    pub site_id: Option<EntityId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn default_ni() -> i64 {
    1
}

#[cfg(test)]
mod tests {
    use super::{SaisieHimInput, SaisieHrmInput, SaisieLubrifiantInput};
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn hrm_is_bounded_by_one_day() {
        let mut input = SaisieHrmInput {
            du: day(),
            engin_id: 1,
            site_id: 1,
            hrm: 0.0,
        };
        assert!(input.validate().is_ok());
        input.hrm = 24.01;
        assert_eq!(input.validate().unwrap_err().field(), "hrm");
    }

    #[test]
    fn him_requires_positive_hours_and_interventions() {
        let mut input = SaisieHimInput {
            saisiehrm_id: 1,
            panne_id: 1,
            him: 0.0,
            ni: 1,
            obs: None,
        };
        assert_eq!(input.validate().unwrap_err().field(), "him");
        input.him = 2.5;
        input.ni = 0;
        assert_eq!(input.validate().unwrap_err().field(), "ni");
    }

    #[test]
    fn him_input_defaults_ni_to_one() {
        let input: SaisieHimInput =
            serde_json::from_str(r#"{"saisiehrm_id":4,"panne_id":2,"him":1.5}"#).unwrap();
        assert_eq!(input.ni, 1);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn lubricant_quantity_must_be_positive() {
        let input = SaisieLubrifiantInput {
            saisiehim_id: 1,
            lubrifiant_id: 1,
            typeconsommationlub_id: None,
            qte: 0.0,
            obs: None,
        };
        assert_eq!(input.validate().unwrap_err().field(), "qte");
    }
}
