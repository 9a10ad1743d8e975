use crate::api::AppState;
use crate::pool::PoolStatus;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    status: String,
    message: String,
    timestamp: DateTime<Utc>,
    postgres_connected: bool,
    uptime_seconds: u64,
    pool: PoolStatus,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let postgres_connected = state.pool_manager.is_healthy().await;

    Json(HealthResponse {
        status: if postgres_connected {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        message: if postgres_connected {
            "Server is running".to_string()
        } else {
            "Server is running but PostgreSQL is unreachable".to_string()
        },
        timestamp: Utc::now(),
        postgres_connected,
        uptime_seconds: state.start_time.elapsed().as_secs(),
        pool: state.pool_manager.status(),
    })
}
