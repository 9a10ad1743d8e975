mod databases;
mod extract;
mod health;
mod logs;
mod migrate;
mod users;

pub use databases::{
    create_database, database_exists, export_database, import_database, initialize_database,
    list_databases, CreateDatabaseRequest,
};
pub use health::health_check;
pub use logs::recent_logs;
pub use migrate::{migrate_database, MigrateRequest};
pub use users::{create_user, delete_user, list_users, update_user};

use crate::audit::AuditLog;
use crate::pool::PoolManager;
use crate::security::{ApiKeyLayer, ApiKeyStore};
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Shared state handed to every handler
pub struct AppState {
    pub pool_manager: Arc<PoolManager>,
    pub audit: Arc<AuditLog>,
    pub api_keys: Arc<ApiKeyStore>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(pool_manager: Arc<PoolManager>, audit: Arc<AuditLog>, api_keys: Arc<ApiKeyStore>) -> Self {
        Self {
            pool_manager,
            audit,
            api_keys,
            start_time: Instant::now(),
        }
    }
}

/// Build the full router. Health is public; every other route requires an API key.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/databases", get(list_databases).post(create_database))
        .route("/api/databases/migrate", post(migrate_database))
        .route("/api/databases/:name/exists", get(database_exists))
        .route("/api/databases/:name/initialize", post(initialize_database))
        .route("/api/databases/:name/export", get(export_database))
        .route("/api/databases/:name/import", post(import_database))
        .route("/api/databases/:name/users", get(list_users).post(create_user))
        .route(
            "/api/databases/:name/users/:id",
            put(update_user).delete(delete_user),
        )
        .route("/api/logs", get(recent_logs))
        .route_layer(ApiKeyLayer::new(state.api_keys.clone()));

    Router::new()
        .route("/api/health", get(health_check))
        .merge(protected)
        .fallback(route_not_found)
        .with_state(state)
}

async fn route_not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Route not found" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use deadpool_postgres::{Config as PoolConfig, Runtime};
    use tempfile::TempDir;
    use tokio_postgres::NoTls;
    use tower::ServiceExt;

    // The pool is never connected: these requests are answered before any handler runs.
    fn test_app(dir: &TempDir) -> Router {
        let mut cfg = PoolConfig::new();
        cfg.url = Some("postgres://nobody@127.0.0.1:1/none".to_string());
        let pool = cfg.create_pool(Some(Runtime::Tokio1), NoTls).unwrap();

        let keys = ApiKeyStore::new();
        keys.register("secret", "alice");

        router(Arc::new(AppState::new(
            Arc::new(PoolManager::with_pool(pool)),
            Arc::new(AuditLog::new(dir.path().join("ops.log"))),
            Arc::new(keys),
        )))
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let dir = TempDir::new().unwrap();
        let response = test_app(&dir)
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Route not found");
    }

    #[tokio::test]
    async fn test_protected_routes_require_key() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        for uri in ["/api/databases", "/api/databases/shop/export", "/api/logs"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_logs_with_valid_key() {
        let dir = TempDir::new().unwrap();
        let response = test_app(&dir)
            .oneshot(
                Request::builder()
                    .uri("/api/logs?limit=5")
                    .header("X-API-Key", "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["count"], 0);
        assert!(value["logs"].as_array().unwrap().is_empty());
    }

    async fn json_error(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_json_error() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/databases/migrate")
            .header("X-API-Key", "secret")
            .header("content-type", "application/json")
            .body(Body::from("{bad"))
            .unwrap();

        let (status, value) = json_error(test_app(&dir), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "invalid_request");
        assert!(value["message"].as_str().unwrap().contains("JSON"));
    }

    #[tokio::test]
    async fn test_missing_content_type_is_json_error() {
        let dir = TempDir::new().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/databases")
            .header("X-API-Key", "secret")
            .body(Body::from(r#"{"name":"shop"}"#))
            .unwrap();

        let (status, value) = json_error(test_app(&dir), request).await;
        assert!(status.is_client_error());
        assert_eq!(value["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_bad_path_and_query_are_json_errors() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        let request = Request::builder()
            .method("PUT")
            .uri("/api/databases/shop/users/abc")
            .header("X-API-Key", "secret")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"Ann","email":"ann@x.com"}"#))
            .unwrap();
        let (status, value) = json_error(app.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "invalid_request");

        let request = Request::builder()
            .uri("/api/logs?limit=many")
            .header("X-API-Key", "secret")
            .body(Body::empty())
            .unwrap();
        let (status, value) = json_error(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "invalid_request");
    }
}
