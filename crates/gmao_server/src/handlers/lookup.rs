//! Name-only lookup tables, shared by every `LookupKind`.

use super::created;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use gmao_core::model::referential::{LookupKind, NameInput, NamedEntry};
use gmao_core::repo::referential_repo::SqliteReferentialRepository;
use gmao_core::service::referential_service::ReferentialService;
use gmao_core::{Action, EntityId, Resource};

/// Routes for one lookup table, mounted under its collection path.
pub fn routes(kind: LookupKind) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |state: State<AppState>, user: CurrentUser| list(state, user, kind)).post(
                move |state: State<AppState>, user: CurrentUser, body: AppJson<NameInput>| {
                    create(state, user, kind, body)
                },
            ),
        )
        .route(
            "/:id",
            get(
                move |state: State<AppState>, user: CurrentUser, id: AppPath<EntityId>| {
                    fetch(state, user, kind, id)
                },
            )
            .put(
                move |state: State<AppState>,
                      user: CurrentUser,
                      id: AppPath<EntityId>,
                      body: AppJson<NameInput>| update(state, user, kind, id, body),
            )
            .delete(
                move |state: State<AppState>, user: CurrentUser, id: AppPath<EntityId>| {
                    remove(state, user, kind, id)
                },
            ),
        )
}

async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    kind: LookupKind,
) -> ApiResult<Json<Vec<NamedEntry>>> {
    user.require(Action::Read, Resource::from(kind))?;
    let entries = state
        .run(move |conn, _| service(conn).list_lookups(kind))
        .await?;
    Ok(Json(entries))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    kind: LookupKind,
    AppJson(input): AppJson<NameInput>,
) -> ApiResult<Response> {
    user.require(Action::Create, Resource::from(kind))?;
    let entry = state
        .run(move |conn, _| service(conn).create_lookup(kind, &input))
        .await?;
    Ok(created(entry))
}

async fn fetch(
    State(state): State<AppState>,
    user: CurrentUser,
    kind: LookupKind,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<Json<NamedEntry>> {
    user.require(Action::Read, Resource::from(kind))?;
    let entry = state
        .run(move |conn, _| service(conn).get_lookup(kind, id))
        .await?;
    Ok(Json(entry))
}

async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    kind: LookupKind,
    AppPath(id): AppPath<EntityId>,
    AppJson(input): AppJson<NameInput>,
) -> ApiResult<Json<NamedEntry>> {
    user.require(Action::Update, Resource::from(kind))?;
    let entry = state
        .run(move |conn, _| service(conn).update_lookup(kind, id, &input))
        .await?;
    Ok(Json(entry))
}

async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    kind: LookupKind,
    AppPath(id): AppPath<EntityId>,
) -> ApiResult<StatusCode> {
    user.require(Action::Delete, Resource::from(kind))?;
    state
        .run(move |conn, _| service(conn).delete_lookup(kind, id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn service(conn: &rusqlite::Connection) -> ReferentialService<SqliteReferentialRepository<'_>> {
    ReferentialService::new(SqliteReferentialRepository::new(conn))
}
