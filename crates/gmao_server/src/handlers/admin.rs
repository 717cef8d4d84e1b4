//! User and role administration.

use super::created;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath};
use crate::state::{auth_service, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use gmao_core::model::user::{NewUser, Role, RoleInput, User};
use gmao_core::service::auth_service::RoleWithPermissions;
use gmao_core::{Action, EntityId, Permission, Resource};
use serde::Deserialize;

pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<User>>> {
    user.require(Action::Read, Resource::User)?;
    let users = state
        .run(|conn, ttl| auth_service(conn, ttl).list_users())
        .await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<NewUser>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::User)?;
    let created_user = state
        .run(move |conn, ttl| auth_service(conn, ttl).register_user(&input))
        .await?;
    Ok(created(created_user))
}

pub async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<User>> {
    user.require(Action::Read, Resource::User)?;
    let found = state
        .run(move |conn, ttl| auth_service(conn, ttl).get_user(id))
        .await?;
    Ok(Json(found))
}

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

/// Sessions of a deactivated user stop resolving.
pub async fn set_user_active(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(request): AppJson<ActiveRequest>,
) -> ApiResult<Json<User>> {
    user.require(Action::Update, Resource::User)?;
    let updated = state
        .run(move |conn, ttl| auth_service(conn, ttl).set_user_active(id, request.active))
        .await?;
    Ok(Json(updated))
}

pub async fn user_roles(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<Vec<Role>>> {
    user.require(Action::Read, Resource::User)?;
    let roles = state
        .run(move |conn, ttl| auth_service(conn, ttl).user_roles(id))
        .await?;
    Ok(Json(roles))
}

pub async fn assign_role(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath((user_id, role_id)): AppPath<(EntityId, EntityId)>,
) -> ApiResult<StatusCode> {
    user.require(Action::Update, Resource::User)?;
    state
        .run(move |conn, ttl| auth_service(conn, ttl).assign_role(user_id, role_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_role(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath((user_id, role_id)): AppPath<(EntityId, EntityId)>,
) -> ApiResult<StatusCode> {
    user.require(Action::Update, Resource::User)?;
    state
        .run(move |conn, ttl| auth_service(conn, ttl).revoke_role(user_id, role_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_roles(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<RoleWithPermissions>>> {
    user.require(Action::Read, Resource::Role)?;
    let roles = state
        .run(|conn, ttl| auth_service(conn, ttl).list_roles())
        .await?;
    Ok(Json(roles))
}

pub async fn create_role(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<RoleInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Role)?;
    let role = state
        .run(move |conn, ttl| auth_service(conn, ttl).create_role(&input))
        .await?;
    Ok(created(role))
}

/// Replaces the role's permission list.
pub async fn set_role_permissions(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(role_id): AppPath<EntityId>,
    AppJson(permissions): AppJson<Vec<Permission>>,
) -> ApiResult<Json<RoleWithPermissions>> {
    user.require(Action::Update, Resource::Role)?;
    let role = state
        .run(move |conn, ttl| auth_service(conn, ttl).set_role_permissions(role_id, &permissions))
        .await?;
    Ok(Json(role))
}
