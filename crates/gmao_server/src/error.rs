//! HTTP error envelope.
//!
//! Every failure renders as `{"error": {"code": "...", "message": "..."}}`.
//! Storage and internal failures are logged and answered with a generic
//! message.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gmao_core::service::import_service::RowError;
use gmao_core::ServiceError;
use log::error;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// Malformed path, query or body.
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        Self::BadRequest(value.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<&'a [RowError]>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::Validation(_) | ServiceError::ImportRejected(_) => {
                    StatusCode::BAD_REQUEST
                }
                ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
                ServiceError::Conflict { .. } | ServiceError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                ServiceError::Repo(_) | ServiceError::InconsistentState(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Service(err) => match err {
                ServiceError::Validation(_) => "validation",
                ServiceError::ImportRejected(_) => "import_rejected",
                ServiceError::Unauthorized => "unauthorized",
                ServiceError::Forbidden(_) => "forbidden",
                ServiceError::NotFound { .. } => "not_found",
                ServiceError::Conflict { .. } => "conflict",
                ServiceError::InvalidTransition { .. } => "invalid_transition",
                ServiceError::Repo(_) | ServiceError::InconsistentState(_) => "internal",
            },
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("event=http_error module=server status=error error={self}");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let rows = match &self {
            Self::Service(ServiceError::ImportRejected(rows)) => Some(rows.as_slice()),
            _ => None,
        };
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message,
                rows,
            },
        };
        (status, Json(body)).into_response()
    }
}
