use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

use crate::handlers::AppState;

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub uptime_secs: u64,
    pub database: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_latency_ms: Option<u64>,
}

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Liveness plus a database ping. 503 when the database is unreachable.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_check_start = Instant::now();
    let db_result = crate::db::check_connection(&state.db).await;
    let latency = db_check_start.elapsed().as_millis() as u64;

    let (status, database, database_latency_ms) = match db_result {
        Ok(()) => (StatusCode::OK, ComponentStatus::Up, Some(latency)),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, ComponentStatus::Down, None),
    };

    let body = HealthResponse {
        status: database,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: get_uptime_secs(),
        database,
        database_latency_ms,
    };
    (status, Json(body))
}
