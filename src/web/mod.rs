//! HTTP layer: routing, per-request auth resolution, handlers, and views.

use axum::http::StatusCode;

pub mod auth;
pub mod routes;
pub mod tasks;
pub mod views;

pub use routes::{serve, AppState};

/// Map a storage fault to an opaque 500. Application-level failures never
/// take this path; they become redirects or re-rendered forms.
pub(crate) fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    tracing::error!("internal error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal server error".to_string(),
    )
}
