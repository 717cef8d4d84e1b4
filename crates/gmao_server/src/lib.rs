//! REST surface of the GMAO backend.
//!
//! # Responsibility
//! - Map HTTP routes onto `gmao_core` services behind bearer sessions.
//! - Render every failure as a JSON error envelope.
//!
//! # Invariants
//! - Handlers check `action:resource` before touching the database.
//! - Database work runs on the blocking pool, one connection at a time.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use config::{CliOverrides, ConfigError, ServerConfig};
pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;
use gmao_core::model::referential::LookupKind;
use handlers::{admin, anomalie, auth as auth_handlers, health, import, lookup, objectif};
use handlers::{referential, report, saisie};
use log::{info, warn};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;

/// Builds the full application router.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth_handlers::login))
        .route("/auth/logout", post(auth_handlers::logout))
        .route("/auth/me", get(auth_handlers::me))
        .merge(referential_routes())
        .merge(saisie_routes())
        .merge(anomalie_routes())
        .merge(report_routes())
        .route("/import/:kind", post(import::import))
        .merge(admin_routes())
        .nest("/typeparcs", lookup::routes(LookupKind::TypeParc))
        .nest("/typepannes", lookup::routes(LookupKind::TypePanne))
        .nest("/typelubrifiants", lookup::routes(LookupKind::TypeLubrifiant))
        .nest(
            "/typeconsommationlubs",
            lookup::routes(LookupKind::TypeConsommationLub),
        );

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .with_state(state)
        .layer(middleware::from_fn(log_request))
        .layer(TimeoutLayer::new(request_timeout))
}

fn referential_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sites",
            get(referential::list_sites).post(referential::create_site),
        )
        .route(
            "/sites/:id",
            get(referential::get_site)
                .put(referential::update_site)
                .delete(referential::delete_site),
        )
        .route(
            "/parcs",
            get(referential::list_parcs).post(referential::create_parc),
        )
        .route(
            "/parcs/:id",
            get(referential::get_parc)
                .put(referential::update_parc)
                .delete(referential::delete_parc),
        )
        .route(
            "/engins",
            get(referential::list_engins).post(referential::create_engin),
        )
        .route(
            "/engins/:id",
            get(referential::get_engin)
                .put(referential::update_engin)
                .delete(referential::delete_engin),
        )
        .route(
            "/pannes",
            get(referential::list_pannes).post(referential::create_panne),
        )
        .route(
            "/pannes/:id",
            get(referential::get_panne)
                .put(referential::update_panne)
                .delete(referential::delete_panne),
        )
        .route(
            "/lubrifiants",
            get(referential::list_lubrifiants).post(referential::create_lubrifiant),
        )
        .route(
            "/lubrifiants/:id",
            get(referential::get_lubrifiant)
                .put(referential::update_lubrifiant)
                .delete(referential::delete_lubrifiant),
        )
}

fn saisie_routes() -> Router<AppState> {
    Router::new()
        .route("/saisiehrm", get(saisie::list_hrm).post(saisie::create_hrm))
        .route(
            "/saisiehrm/:id",
            get(saisie::get_hrm)
                .put(saisie::update_hrm)
                .delete(saisie::delete_hrm),
        )
        .route("/saisiehim", get(saisie::list_him).post(saisie::create_him))
        .route(
            "/saisiehim/:id",
            get(saisie::get_him)
                .put(saisie::update_him)
                .delete(saisie::delete_him),
        )
        .route(
            "/saisielubrifiant",
            get(saisie::list_lubrifiant).post(saisie::create_lubrifiant),
        )
        .route(
            "/saisielubrifiant/:id",
            get(saisie::get_lubrifiant)
                .put(saisie::update_lubrifiant)
                .delete(saisie::delete_lubrifiant),
        )
}

fn anomalie_routes() -> Router<AppState> {
    Router::new()
        .route("/anomalies", get(anomalie::list).post(anomalie::create))
        .route(
            "/anomalies/:id",
            get(anomalie::get)
                .put(anomalie::update)
                .delete(anomalie::delete),
        )
        .route("/anomalies/:id/transition", post(anomalie::transition))
        .route("/objectifs", get(objectif::list).post(objectif::create))
        .route(
            "/objectifs/:id",
            get(objectif::get)
                .put(objectif::update)
                .delete(objectif::delete),
        )
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/rje", get(report::rje))
        .route("/reports/unite-physique", get(report::unite_physique))
        .route("/reports/etat-mensuel", get(report::etat_mensuel))
        .route("/reports/indispo-parc", get(report::indispo_parc))
        .route("/reports/heures-chassis", get(report::heures_chassis))
        .route("/reports/spec-lub", get(report::spec_lub))
        .route("/reports/pareto-indispo", get(report::pareto_indispo))
        .route("/reports/pareto-ni", get(report::pareto_ni))
        .route("/reports/mtbf-evolution", get(report::mtbf_evolution))
        .route("/reports/anomalie-stats", get(report::anomalie_stats))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/:id", get(admin::get_user))
        .route("/users/:id/active", put(admin::set_user_active))
        .route("/users/:id/roles", get(admin::user_roles))
        .route(
            "/users/:id/roles/:role_id",
            post(admin::assign_role).delete(admin::revoke_role),
        )
        .route("/roles", get(admin::list_roles).post(admin::create_role))
        .route("/roles/:id/permissions", put(admin::set_role_permissions))
}

/// One log line per request: method, path, status and latency.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();
    let response = next.run(request).await;
    let status = response.status();
    let duration_ms = started_at.elapsed().as_millis();
    if status.is_server_error() {
        warn!(
            "event=http_request module=server status={} method={method} path={path} duration_ms={duration_ms}",
            status.as_u16()
        );
    } else {
        info!(
            "event=http_request module=server status={} method={method} path={path} duration_ms={duration_ms}",
            status.as_u16()
        );
    }
    response
}

/// Serves `router` on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, router: Router) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr().unwrap_or(addr);
    info!("event=server_start module=server status=ok addr={local_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=shutdown_signal module=server status=error error={err}");
        std::future::pending::<()>().await;
    }
}
