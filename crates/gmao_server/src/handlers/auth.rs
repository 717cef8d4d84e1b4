//! Login, logout and current identity.

use crate::auth::{BearerToken, CurrentUser};
use crate::error::ApiResult;
use crate::extract::AppJson;
use crate::state::{auth_service, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gmao_core::model::user::Session;
use gmao_core::service::auth_service::AuthenticatedUser;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> ApiResult<Json<Session>> {
    let session = state
        .run(move |conn, ttl| auth_service(conn, ttl).authenticate(&request.email, &request.password))
        .await?;
    Ok(Json(session))
}

/// Ends the presented session. The caller must still hold a live one.
pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    BearerToken(token): BearerToken,
) -> ApiResult<StatusCode> {
    state
        .run(move |conn, ttl| auth_service(conn, ttl).logout(token))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<AuthenticatedUser> {
    Json(user)
}
