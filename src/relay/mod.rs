//! HTTP relay between the tutoring UI and the generation provider.

mod api;
mod error;
mod stream;

pub use error::ApiError;
pub use stream::relay_events;

use crate::provider::Provider;
use anyhow::Context;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct RelayState {
    pub provider: Arc<dyn Provider>,
    pub model: String,
}

impl RelayState {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

pub fn router(state: RelayState) -> Router {
    // The UI is served from its own origin and may send credentials.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(api::health))
        .route("/api/teach", post(api::teach))
        .route("/api/teach/stream", post(api::teach_stream))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: RelayState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        provider = state.provider.name(),
        model = %state.model,
        "relay listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("relay server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
