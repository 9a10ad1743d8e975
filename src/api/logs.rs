use crate::api::extract::ApiQuery;
use crate::api::AppState;
use crate::audit::AuditEntry;
use crate::error::Result;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_LOG_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct LogsResponse {
    logs: Vec<AuditEntry>,
    count: usize,
}

pub async fn recent_logs(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<LogsQuery>,
) -> Result<Json<LogsResponse>> {
    let logs = state
        .audit
        .read_recent(query.limit.unwrap_or(DEFAULT_LOG_LIMIT))
        .await?;

    Ok(Json(LogsResponse {
        count: logs.len(),
        logs,
    }))
}
