//! Strategy profile listing.

use axum::{extract::State, Json};

use crate::AppState;

/// List the strategy profile names sessions may use.
///
/// # Endpoint
///
/// `GET /api/strategies`
pub async fn list_strategies(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.strategies.names().map(str::to_string).collect())
}
