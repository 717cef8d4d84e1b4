//! Daily entries: running hours, immobilizations and lubricant use.

use super::created;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use gmao_core::model::saisie::{
    SaisieHim, SaisieHimInput, SaisieHrm, SaisieHrmFilter, SaisieHrmInput, SaisieLubrifiant,
    SaisieLubrifiantInput,
};
use gmao_core::repo::saisie_repo::SqliteSaisieRepository;
use gmao_core::service::saisie_service::SaisieService;
use gmao_core::{Action, EntityId, Resource};
use serde::Deserialize;

fn service(conn: &rusqlite::Connection) -> SaisieService<SqliteSaisieRepository<'_>> {
    SaisieService::new(SqliteSaisieRepository::new(conn))
}

pub async fn list_hrm(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(filter): AppQuery<SaisieHrmFilter>,
) -> ApiResult<Json<Vec<SaisieHrm>>> {
    user.require(Action::Read, Resource::Saisiehrm)?;
    let entries = state
        .run(move |conn, _| service(conn).list_hrm(&filter))
        .await?;
    Ok(Json(entries))
}

pub async fn create_hrm(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<SaisieHrmInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Saisiehrm)?;
    let entry = state
        .run(move |conn, _| service(conn).create_hrm(&input))
        .await?;
    Ok(created(entry))
}

pub async fn get_hrm(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<SaisieHrm>> {
    user.require(Action::Read, Resource::Saisiehrm)?;
    Ok(Json(state.run(move |conn, _| service(conn).get_hrm(id)).await?))
}

pub async fn update_hrm(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<SaisieHrmInput>,
) -> ApiResult<Json<SaisieHrm>> {
    user.require(Action::Update, Resource::Saisiehrm)?;
    let entry = state
        .run(move |conn, _| service(conn).update_hrm(id, &input))
        .await?;
    Ok(Json(entry))
}

/// Also removes the day's immobilizations and their lubricant lines.
pub async fn delete_hrm(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Saisiehrm)?;
    state.run(move |conn, _| service(conn).delete_hrm(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct HimQuery {
    pub saisiehrm_id: EntityId,
}

pub async fn list_him(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<HimQuery>,
) -> ApiResult<Json<Vec<SaisieHim>>> {
    user.require(Action::Read, Resource::Saisiehim)?;
    let entries = state
        .run(move |conn, _| service(conn).list_him(query.saisiehrm_id))
        .await?;
    Ok(Json(entries))
}

pub async fn create_him(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<SaisieHimInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Saisiehim)?;
    let entry = state
        .run(move |conn, _| service(conn).create_him(&input))
        .await?;
    Ok(created(entry))
}

pub async fn get_him(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<SaisieHim>> {
    user.require(Action::Read, Resource::Saisiehim)?;
    Ok(Json(state.run(move |conn, _| service(conn).get_him(id)).await?))
}

pub async fn update_him(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<SaisieHimInput>,
) -> ApiResult<Json<SaisieHim>> {
    user.require(Action::Update, Resource::Saisiehim)?;
    let entry = state
        .run(move |conn, _| service(conn).update_him(id, &input))
        .await?;
    Ok(Json(entry))
}

pub async fn delete_him(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Saisiehim)?;
    state.run(move |conn, _| service(conn).delete_him(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LubrifiantQuery {
    pub saisiehim_id: EntityId,
}

pub async fn list_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<LubrifiantQuery>,
) -> ApiResult<Json<Vec<SaisieLubrifiant>>> {
    user.require(Action::Read, Resource::Saisielubrifiant)?;
    let lines = state
        .run(move |conn, _| service(conn).list_lubrifiant(query.saisiehim_id))
        .await?;
    Ok(Json(lines))
}

pub async fn create_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<SaisieLubrifiantInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Saisielubrifiant)?;
    let line = state
        .run(move |conn, _| service(conn).create_lubrifiant(&input))
        .await?;
    Ok(created(line))
}

pub async fn get_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<SaisieLubrifiant>> {
    user.require(Action::Read, Resource::Saisielubrifiant)?;
    let line = state
        .run(move |conn, _| service(conn).get_lubrifiant(id))
        .await?;
    Ok(Json(line))
}

pub async fn update_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<SaisieLubrifiantInput>,
) -> ApiResult<Json<SaisieLubrifiant>> {
    user.require(Action::Update, Resource::Saisielubrifiant)?;
    let line = state
        .run(move |conn, _| service(conn).update_lubrifiant(id, &input))
        .await?;
    Ok(Json(line))
}

pub async fn delete_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Saisielubrifiant)?;
    state
        .run(move |conn, _| service(conn).delete_lubrifiant(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
