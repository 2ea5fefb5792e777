//! Operational stats endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::repos::{AgentRepo, ParsedPropertyRepo, PropertyRepo};
use crate::http::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
struct StatusResponse {
    total_properties: i64,
    parsed_properties: i64,
    agents: i64,
    /// Deal counts per sales manager, busiest first
    by_mop: Vec<MopCount>,
}

#[derive(Serialize)]
struct MopCount {
    mop: String,
    count: i64,
}

/// GET /status
async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    let property_stats = PropertyRepo::new(state.pool()).stats().await?;
    let parsed_count = ParsedPropertyRepo::new(state.pool()).count().await?;
    let agent_count = AgentRepo::new(state.pool()).count().await?;

    Ok(Json(StatusResponse {
        total_properties: property_stats.total,
        parsed_properties: parsed_count,
        agents: agent_count,
        by_mop: property_stats
            .by_mop
            .into_iter()
            .map(|(mop, count)| MopCount { mop, count })
            .collect(),
    }))
}

/// Status routes
pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(status))
}
