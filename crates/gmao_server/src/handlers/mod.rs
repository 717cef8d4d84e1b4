//! Route handlers, one module per resource family.
//!
//! Each handler checks its permission first: `GET` needs `read`, `POST`
//! `create`, `PUT` `update` and `DELETE` `delete` on its resource.

pub mod admin;
pub mod anomalie;
pub mod auth;
pub mod health;
pub mod import;
pub mod lookup;
pub mod objectif;
pub mod referential;
pub mod report;
pub mod saisie;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `201 Created` with the stored record.
pub(crate) fn created<T: Serialize>(value: T) -> Response {
    (StatusCode::CREATED, Json(value)).into_response()
}
