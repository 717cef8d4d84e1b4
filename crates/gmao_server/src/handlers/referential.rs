//! Sites, parcs, engins, pannes and lubrifiants.

use super::created;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use gmao_core::model::referential::{
    Engin, EnginFilter, EnginInput, Lubrifiant, LubrifiantInput, Panne, PanneInput, Parc,
    ParcInput, Site, SiteInput,
};
use gmao_core::repo::referential_repo::SqliteReferentialRepository;
use gmao_core::service::referential_service::ReferentialService;
use gmao_core::{Action, EntityId, Resource};
use serde::Deserialize;

fn service(conn: &rusqlite::Connection) -> ReferentialService<SqliteReferentialRepository<'_>> {
    ReferentialService::new(SqliteReferentialRepository::new(conn))
}

pub async fn list_sites(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Site>>> {
    user.require(Action::Read, Resource::Site)?;
    Ok(Json(state.run(|conn, _| service(conn).list_sites()).await?))
}

pub async fn create_site(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<SiteInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Site)?;
    let site = state
        .run(move |conn, _| service(conn).create_site(&input))
        .await?;
    Ok(created(site))
}

pub async fn get_site(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<Site>> {
    user.require(Action::Read, Resource::Site)?;
    Ok(Json(state.run(move |conn, _| service(conn).get_site(id)).await?))
}

pub async fn update_site(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<SiteInput>,
) -> ApiResult<Json<Site>> {
    user.require(Action::Update, Resource::Site)?;
    let site = state
        .run(move |conn, _| service(conn).update_site(id, &input))
        .await?;
    Ok(Json(site))
}

pub async fn delete_site(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Site)?;
    state.run(move |conn, _| service(conn).delete_site(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct ParcQuery {
    pub typeparc_id: Option<EntityId>,
}

pub async fn list_parcs(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<ParcQuery>,
) -> ApiResult<Json<Vec<Parc>>> {
    user.require(Action::Read, Resource::Parc)?;
    let parcs = state
        .run(move |conn, _| service(conn).list_parcs(query.typeparc_id))
        .await?;
    Ok(Json(parcs))
}

pub async fn create_parc(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<ParcInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Parc)?;
    let parc = state
        .run(move |conn, _| service(conn).create_parc(&input))
        .await?;
    Ok(created(parc))
}

pub async fn get_parc(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<Parc>> {
    user.require(Action::Read, Resource::Parc)?;
    Ok(Json(state.run(move |conn, _| service(conn).get_parc(id)).await?))
}

pub async fn update_parc(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<ParcInput>,
) -> ApiResult<Json<Parc>> {
    user.require(Action::Update, Resource::Parc)?;
    let parc = state
        .run(move |conn, _| service(conn).update_parc(id, &input))
        .await?;
    Ok(Json(parc))
}

pub async fn delete_parc(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Parc)?;
    state.run(move |conn, _| service(conn).delete_parc(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_engins(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(filter): AppQuery<EnginFilter>,
) -> ApiResult<Json<Vec<Engin>>> {
    user.require(Action::Read, Resource::Engin)?;
    let engins = state
        .run(move |conn, _| service(conn).list_engins(&filter))
        .await?;
    Ok(Json(engins))
}

pub async fn create_engin(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<EnginInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Engin)?;
    let engin = state
        .run(move |conn, _| service(conn).create_engin(&input))
        .await?;
    Ok(created(engin))
}

pub async fn get_engin(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<Engin>> {
    user.require(Action::Read, Resource::Engin)?;
    Ok(Json(state.run(move |conn, _| service(conn).get_engin(id)).await?))
}

pub async fn update_engin(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<EnginInput>,
) -> ApiResult<Json<Engin>> {
    user.require(Action::Update, Resource::Engin)?;
    let engin = state
        .run(move |conn, _| service(conn).update_engin(id, &input))
        .await?;
    Ok(Json(engin))
}

pub async fn delete_engin(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Engin)?;
    state.run(move |conn, _| service(conn).delete_engin(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct PanneQuery {
    pub typepanne_id: Option<EntityId>,
}

pub async fn list_pannes(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<PanneQuery>,
) -> ApiResult<Json<Vec<Panne>>> {
    user.require(Action::Read, Resource::Panne)?;
    let pannes = state
        .run(move |conn, _| service(conn).list_pannes(query.typepanne_id))
        .await?;
    Ok(Json(pannes))
}

pub async fn create_panne(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<PanneInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Panne)?;
    let panne = state
        .run(move |conn, _| service(conn).create_panne(&input))
        .await?;
    Ok(created(panne))
}

pub async fn get_panne(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<Panne>> {
    user.require(Action::Read, Resource::Panne)?;
    Ok(Json(state.run(move |conn, _| service(conn).get_panne(id)).await?))
}

pub async fn update_panne(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<PanneInput>,
) -> ApiResult<Json<Panne>> {
    user.require(Action::Update, Resource::Panne)?;
    let panne = state
        .run(move |conn, _| service(conn).update_panne(id, &input))
        .await?;
    Ok(Json(panne))
}

pub async fn delete_panne(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Panne)?;
    state.run(move |conn, _| service(conn).delete_panne(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct LubrifiantQuery {
    pub typelubrifiant_id: Option<EntityId>,
}

pub async fn list_lubrifiants(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<LubrifiantQuery>,
) -> ApiResult<Json<Vec<Lubrifiant>>> {
    user.require(Action::Read, Resource::Lubrifiant)?;
    let lubrifiants = state
        .run(move |conn, _| service(conn).list_lubrifiants(query.typelubrifiant_id))
        .await?;
    Ok(Json(lubrifiants))
}

pub async fn create_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<LubrifiantInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Lubrifiant)?;
    let lubrifiant = state
        .run(move |conn, _| service(conn).create_lubrifiant(&input))
        .await?;
    Ok(created(lubrifiant))
}

pub async fn get_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<Lubrifiant>> {
    user.require(Action::Read, Resource::Lubrifiant)?;
    let lubrifiant = state
        .run(move |conn, _| service(conn).get_lubrifiant(id))
        .await?;
    Ok(Json(lubrifiant))
}

pub async fn update_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<LubrifiantInput>,
) -> ApiResult<Json<Lubrifiant>> {
    user.require(Action::Update, Resource::Lubrifiant)?;
    let lubrifiant = state
        .run(move |conn, _| service(conn).update_lubrifiant(id, &input))
        .await?;
    Ok(Json(lubrifiant))
}

pub async fn delete_lubrifiant(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Lubrifiant)?;
    state
        .run(move |conn, _| service(conn).delete_lubrifiant(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
