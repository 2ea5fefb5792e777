//! Liveness and readiness endpoints.
//!
//! Orchestrators poll these on the health port. `/health` reports component
//! booleans (database reachable, agent directory non-empty) and degrades to
//! 503 when any component is down; `/ready` gates traffic on the agent
//! directory being loaded.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::repos::AgentRepo;
use crate::state::AppState;

#[derive(Serialize)]
struct HealthComponents {
    database: bool,
    agents: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    components: HealthComponents,
}

#[derive(Serialize)]
struct ReadyChecks {
    database_loaded: bool,
    agents_count: i64,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: ReadyChecks,
}

/// GET /health
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = sqlx::query("SELECT 1").execute(state.pool()).await.is_ok();
    let agents = match AgentRepo::new(state.pool()).count().await {
        Ok(count) => count > 0,
        Err(_) => false,
    };

    let healthy = database && agents;
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        components: HealthComponents { database, agents },
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

/// GET /ready
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let agents_count = AgentRepo::new(state.pool()).count().await.unwrap_or(0);
    let loaded = agents_count > 0;

    let response = ReadyResponse {
        status: if loaded { "ready" } else { "not_ready" },
        checks: ReadyChecks {
            database_loaded: loaded,
            agents_count,
        },
    };

    let code = if loaded {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

/// Health routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}
