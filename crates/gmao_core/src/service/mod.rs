//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce cross-row invariants repositories cannot see (daily capacity,
//!   anomaly lifecycle, session expiry).
//! - Keep the HTTP and CLI layers decoupled from storage details.

use crate::model::anomalie::AnomalieStatut;
use crate::model::{EntityId, ValidationError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod anomalie_service;
pub mod auth_service;
pub mod import_service;
pub mod objectif_service;
pub mod referential_service;
pub mod report_service;
pub mod saisie_service;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error shared by every use-case.
#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    NotFound {
        entity: &'static str,
        id: EntityId,
    },
    Conflict {
        entity: &'static str,
        detail: String,
    },
    /// Authenticated caller lacks the named permission.
    Forbidden(String),
    /// Missing, expired or rejected credentials.
    Unauthorized,
    InvalidTransition {
        from: AnomalieStatut,
        to: AnomalieStatut,
    },
    /// Bulk import aborted; every failing row is listed.
    ImportRejected(Vec<import_service::RowError>),
    Repo(RepoError),
    /// A write succeeded but the read-back did not find the row.
    InconsistentState(&'static str),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict { entity, detail } => write!(f, "{entity} conflict: {detail}"),
            Self::Forbidden(permission) => write!(f, "missing permission `{permission}`"),
            Self::Unauthorized => write!(f, "authentication required"),
            Self::InvalidTransition { from, to } => write!(
                f,
                "invalid statut transition {} -> {}",
                from.as_str(),
                to.as_str()
            ),
            Self::ImportRejected(errors) => {
                write!(f, "import rejected: {} row error(s)", errors.len())
            }
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict { entity, detail } => Self::Conflict { entity, detail },
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Converts a missing read into `NotFound`.
pub(crate) fn require_found<T>(
    value: Option<T>,
    entity: &'static str,
    id: EntityId,
) -> ServiceResult<T> {
    value.ok_or(ServiceError::NotFound { entity, id })
}

#[cfg(test)]
mod tests {
    use super::ServiceError;
    use crate::model::ValidationError;
    use crate::repo::RepoError;

    #[test]
    fn repo_semantic_errors_are_lifted() {
        let not_found = ServiceError::from(RepoError::NotFound {
            entity: "engin",
            id: 7,
        });
        assert!(matches!(
            not_found,
            ServiceError::NotFound {
                entity: "engin",
                id: 7
            }
        ));

        let validation = ServiceError::from(RepoError::Validation(ValidationError::EmptyField(
            "name",
        )));
        assert!(matches!(validation, ServiceError::Validation(_)));

        let invalid = ServiceError::from(RepoError::InvalidData("bad".to_string()));
        assert!(matches!(invalid, ServiceError::Repo(_)));
    }
}
