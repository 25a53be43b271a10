//! HTTP event ingress using Axum
//!
//! Each agent serves its own small router: transport events arrive as JSON
//! POSTs and are queued onto the agent's actor channel, and `/health`
//! reports liveness plus a state snapshot.

pub mod handlers;
mod routes;

pub use handlers::{CaptureApiState, SettlementApiState};
pub use routes::{capture_routes, settlement_routes};

use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::defaults::MAX_EVENT_BODY_BYTES;

/// Capture agent application with tracing and body limits.
pub fn create_capture_app(state: CaptureApiState) -> Router {
    with_layers(capture_routes(state))
}

/// Settlement agent application with tracing and body limits.
pub fn create_settlement_app(state: SettlementApiState) -> Router {
    with_layers(settlement_routes(state))
}

fn with_layers(router: Router) -> Router {
    router
        .layer(RequestBodyLimitLayer::new(MAX_EVENT_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
