//! Read-only reports. Every route needs `read:report`.

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::extract::AppQuery;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use chrono::NaiveDate;
use gmao_core::report::{
    AnomalieStats, EtatMensuelReport, HeuresChassisReport, IndispoParcReport,
    MtbfEvolutionReport, ParetoReport, RjeReport, SpecLubReport, UnitePhysiqueReport,
};
use gmao_core::repo::anomalie_repo::SqliteAnomalieRepository;
use gmao_core::repo::objectif_repo::SqliteObjectifRepository;
use gmao_core::repo::report_repo::SqliteReportRepository;
use gmao_core::service::anomalie_service::AnomalieService;
use gmao_core::service::report_service::ReportService;
use gmao_core::{Action, EntityId, Period, Resource, ServiceResult};
use rusqlite::Connection;
use serde::Deserialize;

type SqliteReports<'conn> =
    ReportService<SqliteReportRepository<'conn>, SqliteObjectifRepository<'conn>>;

fn service(conn: &Connection) -> SqliteReports<'_> {
    ReportService::new(
        SqliteReportRepository::new(conn),
        SqliteObjectifRepository::new(conn),
    )
}

async fn build<T, F>(state: &AppState, user: &CurrentUser, work: F) -> ApiResult<Json<T>>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> ServiceResult<T> + Send + 'static,
{
    user.require(Action::Read, Resource::Report)?;
    Ok(Json(state.run(move |conn, _| work(conn)).await?))
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Deserialize)]
pub struct ParcMonthQuery {
    pub parc_id: EntityId,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Deserialize)]
pub struct ParcYearQuery {
    pub parc_id: EntityId,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct ParetoQuery {
    pub parc_id: EntityId,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TypeparcYearQuery {
    pub typeparc_id: EntityId,
    pub year: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SiteQuery {
    pub site_id: Option<EntityId>,
}

pub async fn rje(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<DateQuery>,
) -> ApiResult<Json<RjeReport>> {
    build(&state, &user, move |conn| service(conn).rje(query.date)).await
}

pub async fn unite_physique(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<MonthQuery>,
) -> ApiResult<Json<UnitePhysiqueReport>> {
    build(&state, &user, move |conn| {
        service(conn).unite_physique(query.year, query.month)
    })
    .await
}

pub async fn etat_mensuel(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<MonthQuery>,
) -> ApiResult<Json<EtatMensuelReport>> {
    build(&state, &user, move |conn| {
        service(conn).etat_mensuel(query.year, query.month)
    })
    .await
}

pub async fn indispo_parc(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<ParcMonthQuery>,
) -> ApiResult<Json<IndispoParcReport>> {
    build(&state, &user, move |conn| {
        service(conn).indispo_par_parc(query.parc_id, query.year, query.month)
    })
    .await
}

pub async fn heures_chassis(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<DateQuery>,
) -> ApiResult<Json<HeuresChassisReport>> {
    build(&state, &user, move |conn| service(conn).heures_chassis(query.date)).await
}

pub async fn spec_lub(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<ParcYearQuery>,
) -> ApiResult<Json<SpecLubReport>> {
    build(&state, &user, move |conn| {
        service(conn).spec_lub(query.parc_id, query.year)
    })
    .await
}

pub async fn pareto_indispo(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<ParetoQuery>,
) -> ApiResult<Json<ParetoReport>> {
    build(&state, &user, move |conn| {
        let period = Period::new(query.from, query.to)?;
        service(conn).pareto_indispo(query.parc_id, period, query.top_n)
    })
    .await
}

pub async fn pareto_ni(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<ParetoQuery>,
) -> ApiResult<Json<ParetoReport>> {
    build(&state, &user, move |conn| {
        let period = Period::new(query.from, query.to)?;
        service(conn).pareto_ni(query.parc_id, period, query.top_n)
    })
    .await
}

pub async fn mtbf_evolution(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<TypeparcYearQuery>,
) -> ApiResult<Json<MtbfEvolutionReport>> {
    build(&state, &user, move |conn| {
        service(conn).mtbf_evolution(query.typeparc_id, query.year)
    })
    .await
}

pub async fn anomalie_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    AppQuery(query): AppQuery<SiteQuery>,
) -> ApiResult<Json<AnomalieStats>> {
    build(&state, &user, move |conn| {
        AnomalieService::new(SqliteAnomalieRepository::new(conn)).stats(query.site_id)
    })
    .await
}
