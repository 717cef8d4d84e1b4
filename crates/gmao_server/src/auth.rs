//! Bearer-token authentication for handlers.
//!
//! `CurrentUser` resolves `Authorization: Bearer <uuid>` into the caller
//! and their merged permissions. Any missing, malformed, unknown or
//! expired token is answered with the same 401.

use crate::error::ApiError;
use crate::state::{auth_service, AppState};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use gmao_core::service::auth_service::AuthenticatedUser;
use gmao_core::{Action, Resource, ServiceError};
use uuid::Uuid;

/// Raw session token from the `Authorization` header.
#[derive(Debug, Clone, Copy)]
pub struct BearerToken(pub Uuid);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(parts)
            .map(Self)
            .ok_or(ApiError::Service(ServiceError::Unauthorized))
    }
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

impl CurrentUser {
    pub fn require(&self, action: Action, resource: Resource) -> Result<(), ApiError> {
        self.0.require(action, resource).map_err(ApiError::from)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Service(ServiceError::Unauthorized))?;
        let user = state
            .run(move |conn, ttl| auth_service(conn, ttl).resolve_session(token))
            .await?;
        Ok(Self(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<Uuid> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Uuid::parse_str(token.trim()).ok()
}
