//! Anomaly backlog model and lifecycle rules.
//!
//! # Responsibility
//! - Define anomaly records with their PDR (spare part) needs.
//! - Own the status transition table.
//!
//! # Invariants
//! - `numero_backlog` is `BL-{year}-{seq:04}`, unique, never reused.
//! - `Executee` is terminal.
//! - `date_execution`, when set, is not earlier than `date_detection`.

use super::{validate_id, validate_text, EntityId, ValidationError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// How the anomaly was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalieSource {
    /// Scheduled inspection round ("visite systématique").
    Vs,
    /// Reported by the operator.
    Opg,
    Inspection,
    Autre,
}

impl AnomalieSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vs => "VS",
            Self::Opg => "OPG",
            Self::Inspection => "INSPECTION",
            Self::Autre => "AUTRE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "VS" => Some(Self::Vs),
            "OPG" => Some(Self::Opg),
            "INSPECTION" => Some(Self::Inspection),
            "AUTRE" => Some(Self::Autre),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priorite {
    Elevee,
    Moyenne,
    Faible,
}

impl Priorite {
    pub const ALL: [Priorite; 3] = [Priorite::Elevee, Priorite::Moyenne, Priorite::Faible];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elevee => "ELEVEE",
            Self::Moyenne => "MOYENNE",
            Self::Faible => "FAIBLE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ELEVEE" => Some(Self::Elevee),
            "MOYENNE" => Some(Self::Moyenne),
            "FAIBLE" => Some(Self::Faible),
            _ => None,
        }
    }
}

/// Backlog lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalieStatut {
    /// Waiting for spare parts.
    AttentePdr,
    /// Spare parts available, not scheduled yet.
    PdrPret,
    NonProgrammee,
    Programmee,
    Executee,
}

impl AnomalieStatut {
    pub const ALL: [AnomalieStatut; 5] = [
        AnomalieStatut::AttentePdr,
        AnomalieStatut::PdrPret,
        AnomalieStatut::NonProgrammee,
        AnomalieStatut::Programmee,
        AnomalieStatut::Executee,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttentePdr => "ATTENTE_PDR",
            Self::PdrPret => "PDR_PRET",
            Self::NonProgrammee => "NON_PROGRAMMEE",
            Self::Programmee => "PROGRAMMEE",
            Self::Executee => "EXECUTEE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ATTENTE_PDR" => Some(Self::AttentePdr),
            "PDR_PRET" => Some(Self::PdrPret),
            "NON_PROGRAMMEE" => Some(Self::NonProgrammee),
            "PROGRAMMEE" => Some(Self::Programmee),
            "EXECUTEE" => Some(Self::Executee),
            _ => None,
        }
    }

    /// Status assigned on creation.
    pub fn initial(besoin_pdr: bool) -> Self {
        if besoin_pdr {
            Self::AttentePdr
        } else {
            Self::NonProgrammee
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Executee
    }

    /// Returns whether the lifecycle allows `self -> next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::AttentePdr, Self::PdrPret)
                | (Self::PdrPret, Self::Programmee)
                | (Self::NonProgrammee, Self::Programmee)
                | (Self::Programmee, Self::Executee)
                | (Self::Programmee, Self::NonProgrammee)
        )
    }
}

/// Persisted anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomalie {
    pub id: EntityId,
    pub numero_backlog: String,
    pub date_detection: NaiveDate,
    pub description: String,
    pub source: AnomalieSource,
    pub priorite: Priorite,
    pub besoin_pdr: bool,
    pub quantite_pdr: Option<i64>,
    pub reference_pdr: Option<String>,
    pub engin_id: EntityId,
    pub site_id: EntityId,
    pub statut: AnomalieStatut,
    pub date_programmation: Option<NaiveDate>,
    pub date_execution: Option<NaiveDate>,
    pub observations: Option<String>,
}

/// Editable anomaly fields. Status moves only through transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalieInput {
    pub date_detection: NaiveDate,
    pub description: String,
    pub source: AnomalieSource,
    pub priorite: Priorite,
    #[serde(default)]
    pub besoin_pdr: bool,
    #[serde(default)]
    pub quantite_pdr: Option<i64>,
    #[serde(default)]
    pub reference_pdr: Option<String>,
    pub engin_id: EntityId,
    pub site_id: EntityId,
    #[serde(default)]
    pub observations: Option<String>,
}

impl AnomalieInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyField("description"));
        }
        validate_text("description", Some(self.description.as_str()))?;
        validate_id("engin_id", self.engin_id)?;
        validate_id("site_id", self.site_id)?;
        if let Some(quantite) = self.quantite_pdr {
            if quantite < 1 {
                return Err(ValidationError::OutOfRange {
                    field: "quantite_pdr",
                    detail: format!("expected at least 1, got {quantite}"),
                });
            }
            if !self.besoin_pdr {
                return Err(ValidationError::Invalid {
                    field: "quantite_pdr",
                    detail: "set only when besoin_pdr is true".to_string(),
                });
            }
        }
        validate_text("reference_pdr", self.reference_pdr.as_deref())?;
        validate_text("observations", self.observations.as_deref())
    }
}

/// Status change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRequest {
    pub statut: AnomalieStatut,
    #[serde(default)]
    pub date_programmation: Option<NaiveDate>,
    #[serde(default)]
    pub date_execution: Option<NaiveDate>,
}

/// List filter for anomalies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnomalieFilter {
    pub statut: Option<AnomalieStatut>,
    pub priorite: Option<Priorite>,
    pub engin_id: Option<EntityId>,
    pub site_id: Option<EntityId>,
}

/// Formats a backlog number from detection year and yearly sequence.
pub fn format_backlog_number(year: i32, seq: i64) -> String {
    format!("BL-{year}-{seq:04}")
}

/// Backlog year for a detection date.
pub fn backlog_year(date_detection: NaiveDate) -> i32 {
    date_detection.year()
}

#[cfg(test)]
mod tests {
    use super::{format_backlog_number, AnomalieStatut};

    #[test]
    fn backlog_number_is_zero_padded() {
        assert_eq!(format_backlog_number(2024, 7), "BL-2024-0007");
        assert_eq!(format_backlog_number(2025, 12345), "BL-2025-12345");
    }

    #[test]
    fn initial_status_depends_on_spare_part_need() {
        assert_eq!(AnomalieStatut::initial(true), AnomalieStatut::AttentePdr);
        assert_eq!(
            AnomalieStatut::initial(false),
            AnomalieStatut::NonProgrammee
        );
    }

    #[test]
    fn executed_is_terminal() {
        for next in AnomalieStatut::ALL {
            assert!(!AnomalieStatut::Executee.can_transition_to(next));
        }
    }

    #[test]
    fn cannot_skip_scheduling() {
        assert!(!AnomalieStatut::PdrPret.can_transition_to(AnomalieStatut::Executee));
        assert!(!AnomalieStatut::AttentePdr.can_transition_to(AnomalieStatut::Programmee));
        assert!(AnomalieStatut::Programmee.can_transition_to(AnomalieStatut::NonProgrammee));
    }

    #[test]
    fn status_round_trips_through_storage_strings() {
        for statut in AnomalieStatut::ALL {
            assert_eq!(AnomalieStatut::parse(statut.as_str()), Some(statut));
        }
    }
}
