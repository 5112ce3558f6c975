//! Health check handlers.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the backend does not answer its own
/// health check. Pages still render from the bundled catalog in that case,
/// but sign-in, payments and chat do not work.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.api().health().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Backend not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
