use super::created;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use gmao_core::model::objectif::{Objectif, ObjectifInput};
use gmao_core::repo::objectif_repo::SqliteObjectifRepository;
use gmao_core::service::objectif_service::ObjectifService;
use gmao_core::{Action, EntityId, Resource};
use serde::Deserialize;

fn service(conn: &rusqlite::Connection) -> ObjectifService<SqliteObjectifRepository<'_>> {
    ObjectifService::new(SqliteObjectifRepository::new(conn))
}

#[derive(Debug, Default, Deserialize)]
pub struct ObjectifQuery {
    pub annee: Option<i32>,
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<ObjectifQuery>,
) -> ApiResult<Json<Vec<Objectif>>> {
    user.require(Action::Read, Resource::Objectif)?;
    let objectifs = state
        .run(move |conn, _| service(conn).list(query.annee))
        .await?;
    Ok(Json(objectifs))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<ObjectifInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Objectif)?;
    let objectif = state
        .run(move |conn, _| service(conn).create(&input))
        .await?;
    Ok(created(objectif))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<Objectif>> {
    user.require(Action::Read, Resource::Objectif)?;
    Ok(Json(state.run(move |conn, _| service(conn).get(id)).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<ObjectifInput>,
) -> ApiResult<Json<Objectif>> {
    user.require(Action::Update, Resource::Objectif)?;
    let objectif = state
        .run(move |conn, _| service(conn).update(id, &input))
        .await?;
    Ok(Json(objectif))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Objectif)?;
    state.run(move |conn, _| service(conn).delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
