//! HTTP transport over the lifecycle engine.
//!
//! Thin glue: requests are translated into engine calls; the engine decides
//! whether a record exists, is visible, and how viewing mutates it. Routes
//! mirror the classic pastebin surface: a JSON API, a browser form, and a
//! readiness probe.

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::engine::PasteEngine;
use crate::storage::PasteStore;

/// Shared application state.
pub struct AppState {
    /// The lifecycle engine.
    pub engine: PasteEngine,
    /// The store handle, used directly only by the readiness probe.
    pub store: Arc<dyn PasteStore>,
    /// When set, requests may pin the reference timestamp via the
    /// `x-test-now-ms` header. Never enable in production.
    pub test_mode: bool,
}

impl AppState {
    /// Build state over an injected store.
    #[must_use]
    pub fn new(store: Arc<dyn PasteStore>, test_mode: bool) -> Self {
        Self {
            engine: PasteEngine::new(Arc::clone(&store)),
            store,
            test_mode,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home_page))
        .route("/create", post(handlers::create_form))
        .route("/p/:id", get(handlers::view_paste_html))
        .route("/api/pastes", post(handlers::create_paste))
        .route("/api/pastes/:id", get(handlers::fetch_paste))
        .route("/api/healthz", get(handlers::healthz))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn run(state: Arc<AppState>, bind: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}
