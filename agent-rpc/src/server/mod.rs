//! `server` exposes the inbound agent endpoint
use std::sync::Arc;
use std::time::Duration;

use rst_common::with_http_tokio::axum::routing::post;
use rst_common::with_http_tokio::axum::{self, Router};
use rst_common::with_http_tokio::tower_http::timeout::TimeoutLayer;
use rst_common::with_http_tokio::tower_http::trace::TraceLayer;
use rst_common::with_tokio::tokio::net::TcpListener;
use rst_common::with_tracing::tracing::info;

use prople_agent_core::agent::inbound::InboundAPI;

use crate::common::types::CommonError;
use crate::config::App;

pub mod inbound;

pub use inbound::{status_for, InboundState};

pub const INBOUND_PATH: &str = "/agent";

pub fn router(inbound: Arc<dyn InboundAPI>, timeout: Duration) -> Router {
    Router::new()
        .route(INBOUND_PATH, post(inbound::receive))
        .layer((TraceLayer::new_for_http(), TimeoutLayer::new(timeout)))
        .with_state(InboundState::new(inbound))
}

pub async fn serve(app: &App, router: Router) -> Result<(), CommonError> {
    let addr = app.get_address();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|err| CommonError::TransportError(err.to_string()))?;

    info!(addr = %addr, "listening for inbound messages");

    axum::serve(listener, router)
        .await
        .map_err(|err| CommonError::TransportError(err.to_string()))
}
