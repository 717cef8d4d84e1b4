//! Yearly KPI targets per parc (and optionally per site).

use super::{validate_id, validate_range, EntityId, ValidationError};
use serde::{Deserialize, Serialize};

const YEAR_MIN: i32 = 2000;
const YEAR_MAX: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objectif {
    pub id: EntityId,
    pub annee: i32,
    pub parc_id: EntityId,
    pub site_id: Option<EntityId>,
    /// Target availability, percent.
    pub dispo: Option<f64>,
    /// Target mean time between failures, hours.
    pub mtbf: Option<f64>,
    /// Target utilization, percent.
    pub tdm: Option<f64>,
    pub spe_huile: Option<f64>,
    pub spe_go: Option<f64>,
    pub spe_graisse: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectifInput {
    pub annee: i32,
    pub parc_id: EntityId,
    #[serde(default)]
    pub site_id: Option<EntityId>,
    #[serde(default)]
    pub dispo: Option<f64>,
    #[serde(default)]
    pub mtbf: Option<f64>,
    #[serde(default)]
    pub tdm: Option<f64>,
    #[serde(default)]
    pub spe_huile: Option<f64>,
    #[serde(default)]
    pub spe_go: Option<f64>,
    #[serde(default)]
    pub spe_graisse: Option<f64>,
}

impl ObjectifInput {
    pub fn new(annee: i32, parc_id: EntityId) -> Self {
        Self {
            annee,
            parc_id,
            site_id: None,
            dispo: None,
            mtbf: None,
            tdm: None,
            spe_huile: None,
            spe_go: None,
            spe_graisse: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(YEAR_MIN..=YEAR_MAX).contains(&self.annee) {
            return Err(ValidationError::OutOfRange {
                field: "annee",
                detail: format!("{} not in [{YEAR_MIN}, {YEAR_MAX}]", self.annee),
            });
        }
        validate_id("parc_id", self.parc_id)?;
        if let Some(site_id) = self.site_id {
            validate_id("site_id", site_id)?;
        }

        let percents = [("dispo", self.dispo), ("tdm", self.tdm)];
        for (field, value) in percents {
            if let Some(value) = value {
                validate_range(field, value, 0.0, 100.0)?;
            }
        }

        let non_negative = [
            ("mtbf", self.mtbf),
            ("spe_huile", self.spe_huile),
            ("spe_go", self.spe_go),
            ("spe_graisse", self.spe_graisse),
        ];
        for (field, value) in non_negative {
            if let Some(value) = value {
                validate_range(field, value, 0.0, f64::MAX)?;
            }
        }
        Ok(())
    }
}
