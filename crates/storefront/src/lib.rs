//! Ringside storefront library.
//!
//! Server-rendered boxing-training site: course catalog and player, merch
//! shop with cart and mock checkout, account pages and an AI coach chat.
//! All data comes from the Ringside REST backend, with a bundled catalog
//! used when the backend is unreachable.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod fallback;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::state::AppState;

/// Directory served under `/static`.
const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the storefront router with its middleware stack.
///
/// Sentry layers are added by the binary so tests run without a client.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());
    let client_ip = middleware::ClientIpKeyExtractor::new(state.config().trust_proxy_headers);

    Router::new()
        .merge(routes::routes(client_ip))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
