//! Combined router for the passkey endpoints

use axum::{Router, routing::get};
use http::{HeaderValue, Method, header::CONTENT_TYPE, header::InvalidHeaderValue};
use std::sync::Arc;
use tower_http::LatencyUnit;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use passkey_bridge::PasskeyOrchestrator;

use crate::health::health;

/// Create a router serving the passkey flow and the health check
///
/// The endpoints are:
/// - `POST /auth/passkey/init`
/// - `POST /auth/passkey/verify`
/// - `GET /health`
pub fn passkey_bridge_router(orchestrator: Arc<PasskeyOrchestrator>) -> Router {
    passkey_bridge_router_no_trace(orchestrator).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`passkey_bridge_router`] without the HTTP tracing middleware.
pub fn passkey_bridge_router_no_trace(orchestrator: Arc<PasskeyOrchestrator>) -> Router {
    Router::new()
        .nest("/auth/passkey", super::passkey::router())
        .route("/health", get(health))
        .with_state(orchestrator)
}

/// CORS layer admitting JSON requests from `origin` only.
pub fn cors_for_origin(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    let origin = HeaderValue::from_str(origin)?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]))
}
