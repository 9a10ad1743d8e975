use crate::api::extract::JsonBody;
use crate::api::AppState;
use crate::error::{AdminError, Result};
use crate::schema::{MigrationResult, SchemaMigrator};
use crate::security::AuthenticatedUser;
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrateRequest {
    #[serde(default)]
    pub source_database: Option<String>,
    #[serde(default)]
    pub target_database: Option<String>,
}

impl MigrateRequest {
    fn names(&self) -> Result<(&str, &str)> {
        let source = self.source_database.as_deref().map(str::trim).unwrap_or("");
        let target = self.target_database.as_deref().map(str::trim).unwrap_or("");

        if source.is_empty() || target.is_empty() {
            return Err(AdminError::InvalidRequest {
                message: "Source and target required".to_string(),
            });
        }

        Ok((source, target))
    }
}

pub async fn migrate_database(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(request): JsonBody<MigrateRequest>,
) -> Result<Json<MigrationResult>> {
    let (source, target) = request.names()?;

    let outcome = SchemaMigrator::new()
        .migrate(state.pool_manager.pool(), source, target)
        .await;
    state.audit.database_migrated(
        source,
        target,
        &user.0,
        outcome.as_ref().map(|r| {
            json!({ "tablesCount": r.tables_count, "timestamp": r.timestamp })
        }),
    )
    .await;

    Ok(Json(outcome?))
}
