//! Bulk import of JSON rows.

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use gmao_core::service::import_service::{ImportKind, ImportReport, ImportService};
use gmao_core::{Action, Resource};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub dry_run: bool,
}

pub async fn import(
    State(state): State<AppState>,
    user: CurrentUser,
    AppPath(kind): AppPath<String>,
    AppQuery(query): AppQuery<ImportQuery>,
    AppJson(rows): AppJson<Vec<Value>>,
) -> ApiResult<Json<ImportReport>> {
    let kind = ImportKind::parse(&kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown import kind `{kind}`")))?;
    user.require(Action::Create, resource_of(kind))?;
    let report = state
        .run(move |conn, _| ImportService::new(conn).import(kind, &rows, query.dry_run))
        .await?;
    Ok(Json(report))
}

fn resource_of(kind: ImportKind) -> Resource {
    match kind {
        ImportKind::Engins => Resource::Engin,
        ImportKind::Pannes => Resource::Panne,
        ImportKind::Saisiehrm => Resource::Saisiehrm,
        ImportKind::Saisiehim => Resource::Saisiehim,
    }
}
