//! Session Server Library
//!
//! HTTP and WebSocket transport over a [`SessionController`]. Every session
//! lives in a checkpoint store between requests; a request loads it, plays
//! at most one ply on a blocking worker, and stores it again.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod ws;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware::from_fn, Router};
use chess_rules::StandardRules;
use chess_session::{
    CheckpointStore, SessionConfig, SessionController, SessionError, StrategyFactory,
};
use chess_strategies::StrategyRegistry;
use tower_http::cors::{Any, CorsLayer};

pub use config::ServerConfig;
pub use error::ApiError;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
    /// Strategy profiles sessions may name.
    pub strategies: Arc<StrategyRegistry>,
}

impl AppState {
    /// Builds a controller with the standard rules over `store`.
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        strategies: StrategyRegistry,
        defaults: SessionConfig,
    ) -> Self {
        let strategies = Arc::new(strategies);
        let factory: Arc<dyn StrategyFactory> = strategies.clone();
        let controller = SessionController::new(Arc::new(StandardRules), store, factory)
            .with_defaults(defaults);
        AppState {
            controller: Arc::new(controller),
            strategies,
        }
    }

    /// Runs `f` against the controller on the blocking thread pool.
    ///
    /// Strategies may wait on a subprocess or an HTTP call, so controller
    /// calls never run on the async workers.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&SessionController) -> Result<T, SessionError> + Send + 'static,
        T: Send + 'static,
    {
        let controller = Arc::clone(&self.controller);
        Ok(tokio::task::spawn_blocking(move || f(&controller)).await??)
    }
}

/// Health check endpoint.
///
/// Returns "ok" to indicate the server is running.
pub async fn health() -> &'static str {
    "ok"
}

/// The full router: REST API, browser WebSocket and health check.
pub fn app(state: AppState) -> Router {
    // CORS layer for cross-origin requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chess", get(ws::ws_handler))
        .route("/api/strategies", get(api::strategies::list_strategies))
        .route(
            "/api/sessions",
            get(api::sessions::list_sessions).post(api::sessions::start_session),
        )
        .route(
            "/api/sessions/:id",
            get(api::sessions::get_session).delete(api::sessions::discard_session),
        )
        .route("/api/sessions/:id/ledger", get(api::sessions::get_ledger))
        .route("/api/sessions/:id/moves", post(api::sessions::submit_move))
        .route("/api/sessions/:id/auto", post(api::sessions::automated_move))
        .with_state(state)
        .layer(from_fn(middleware::timing_layer))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_returns_ok() {
        let result = health().await;
        assert_eq!(result, "ok");
    }
}
