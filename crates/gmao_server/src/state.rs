//! Shared handler state.

use crate::error::{ApiError, ApiResult};
use gmao_core::repo::rbac_repo::SqliteRbacRepository;
use gmao_core::service::auth_service::AuthService;
use gmao_core::ServiceResult;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// One SQLite connection shared by every request.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    session_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(conn: Connection, session_ttl: chrono::Duration) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            session_ttl,
        }
    }

    /// Runs `work` against the connection on the blocking pool.
    pub async fn run<T, F>(&self, work: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, chrono::Duration) -> ServiceResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let session_ttl = self.session_ttl;
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ApiError::Internal("database mutex poisoned".to_string()))?;
            work(&conn, session_ttl).map_err(ApiError::from)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
    }
}

/// Auth service bound to `conn` with the configured session lifetime.
pub fn auth_service(conn: &Connection, session_ttl: chrono::Duration) -> AuthService<SqliteRbacRepository<'_>> {
    AuthService::with_session_ttl(SqliteRbacRepository::new(conn), session_ttl)
}
