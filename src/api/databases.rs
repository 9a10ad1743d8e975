//! Schema endpoints
//!
//! - GET  /api/databases                  - list tenant schemas with sizes
//! - POST /api/databases                  - create and initialize a schema
//! - GET  /api/databases/:name/exists     - existence check
//! - POST /api/databases/:name/initialize - (re)create the base users table
//! - GET  /api/databases/:name/export     - full export document
//! - POST /api/databases/:name/import     - replace tables from an export document

use crate::api::extract::{ApiPath, JsonBody};
use crate::api::AppState;
use crate::error::{AdminError, Result};
use crate::schema::{
    validate_identifier, CatalogReader, ExportDocument, MigrationResult, SchemaExporter,
    SchemaImporter, SchemaInfo,
};
use crate::security::AuthenticatedUser;
use crate::tenant::{ProvisionResult, SchemaProvisioner};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CreateDatabaseRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct CreateDatabaseResponse {
    success: bool,
    message: String,
    database: String,
}

#[derive(Serialize)]
pub struct ExistsResponse {
    database: String,
    exists: bool,
}

pub async fn list_databases(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<SchemaInfo>>> {
    let outcome = CatalogReader::new()
        .list_schemas(state.pool_manager.pool())
        .await;
    state
        .audit
        .database_accessed("all", &user.0, outcome.as_ref().err())
        .await;

    Ok(Json(outcome?))
}

pub async fn create_database(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(request): JsonBody<CreateDatabaseRequest>,
) -> Result<impl IntoResponse> {
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AdminError::InvalidRequest {
            message: "Schema name is required".to_string(),
        })?;

    let outcome = SchemaProvisioner::new()
        .provision(state.pool_manager.pool(), name)
        .await;
    state
        .audit
        .database_created(name, &user.0, outcome.as_ref().err())
        .await;
    let created = outcome?;

    info!("Schema '{}' created by {}", name, user.0);

    Ok((
        StatusCode::CREATED,
        Json(CreateDatabaseResponse {
            success: true,
            message: created.message,
            database: name.to_string(),
        }),
    ))
}

pub async fn database_exists(
    State(state): State<Arc<AppState>>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<ExistsResponse>> {
    validate_identifier(&name)?;
    let exists = CatalogReader::new()
        .schema_exists(state.pool_manager.pool(), &name)
        .await?;

    Ok(Json(ExistsResponse {
        database: name,
        exists,
    }))
}

pub async fn initialize_database(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<ProvisionResult>> {
    let outcome = initialize(&state, &name).await;
    state
        .audit
        .database_accessed(&name, &user.0, outcome.as_ref().err())
        .await;

    Ok(Json(outcome?))
}

async fn initialize(state: &AppState, name: &str) -> Result<ProvisionResult> {
    let pool = state.pool_manager.pool();

    validate_identifier(name)?;
    CatalogReader::new().require_schema(pool, name).await?;
    SchemaProvisioner::new().initialize_schema(pool, name).await
}

pub async fn export_database(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<ExportDocument>> {
    let outcome = SchemaExporter::new()
        .export(state.pool_manager.pool(), &name)
        .await;
    state
        .audit
        .database_accessed(&name, &user.0, outcome.as_ref().err())
        .await;

    Ok(Json(outcome?))
}

pub async fn import_database(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(name): ApiPath<String>,
    JsonBody(document): JsonBody<ExportDocument>,
) -> Result<Json<MigrationResult>> {
    let outcome = SchemaImporter::new()
        .import(state.pool_manager.pool(), &name, &document)
        .await;
    state
        .audit
        .database_imported(
            &document.source_schema,
            &name,
            &user.0,
            outcome.as_ref().map(|r| r.tables_count),
        )
        .await;

    Ok(Json(outcome?))
}
