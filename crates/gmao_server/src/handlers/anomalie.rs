//! Anomaly backlog and its status transitions.

use super::created;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use gmao_core::model::anomalie::{Anomalie, AnomalieFilter, AnomalieInput, TransitionRequest};
use gmao_core::repo::anomalie_repo::SqliteAnomalieRepository;
use gmao_core::service::anomalie_service::AnomalieService;
use gmao_core::{Action, EntityId, Resource};

fn service(conn: &rusqlite::Connection) -> AnomalieService<SqliteAnomalieRepository<'_>> {
    AnomalieService::new(SqliteAnomalieRepository::new(conn))
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(filter): AppQuery<AnomalieFilter>,
) -> ApiResult<Json<Vec<Anomalie>>> {
    user.require(Action::Read, Resource::Anomalie)?;
    Ok(Json(state.run(move |conn, _| service(conn).list(&filter)).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<AnomalieInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::Anomalie)?;
    let anomalie = state
        .run(move |conn, _| service(conn).create(&input))
        .await?;
    Ok(created(anomalie))
}

pub async fn get(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<Anomalie>> {
    user.require(Action::Read, Resource::Anomalie)?;
    Ok(Json(state.run(move |conn, _| service(conn).get(id)).await?))
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<AnomalieInput>,
) -> ApiResult<Json<Anomalie>> {
    user.require(Action::Update, Resource::Anomalie)?;
    let anomalie = state
        .run(move |conn, _| service(conn).update(id, &input))
        .await?;
    Ok(Json(anomalie))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::Anomalie)?;
    state.run(move |conn, _| service(conn).delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A status change edits the anomaly, so it needs `update`.
pub async fn transition(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(id): AppPath<EntityId>,
    AppJson(request): AppJson<TransitionRequest>,
) -> ApiResult<Json<Anomalie>> {
    user.require(Action::Update, Resource::Anomalie)?;
    let anomalie = state
        .run(move |conn, _| service(conn).transition(id, &request))
        .await?;
    Ok(Json(anomalie))
}
