//! Users endpoints inside one tenant schema
//!
//! - GET    /api/databases/:name/users
//! - POST   /api/databases/:name/users
//! - PUT    /api/databases/:name/users/:id
//! - DELETE /api/databases/:name/users/:id

use crate::api::extract::{ApiPath, JsonBody};
use crate::api::AppState;
use crate::error::Result;
use crate::security::AuthenticatedUser;
use crate::tenant::{NewUser, User, UserStore};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<Vec<User>>> {
    let outcome = UserStore::new().list(state.pool_manager.pool(), &name).await;
    state
        .audit
        .database_accessed(&name, &user.0, outcome.as_ref().err())
        .await;

    Ok(Json(outcome?))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(name): ApiPath<String>,
    JsonBody(body): JsonBody<NewUser>,
) -> Result<impl IntoResponse> {
    let outcome = UserStore::new()
        .create(state.pool_manager.pool(), &name, &body)
        .await;

    let details = match &outcome {
        Ok(created) => json!({ "database": name, "userId": created.id, "email": created.email }),
        Err(_) => json!({ "database": name, "email": body.email }),
    };
    state
        .audit
        .user_operation("create", details, &user.0, outcome.as_ref().err())
        .await;

    Ok((StatusCode::CREATED, Json(outcome?)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath((name, id)): ApiPath<(String, i32)>,
    JsonBody(body): JsonBody<NewUser>,
) -> Result<Json<User>> {
    let outcome = UserStore::new()
        .update(state.pool_manager.pool(), &name, id, &body)
        .await;

    state
        .audit
        .user_operation(
            "update",
            json!({ "database": name, "userId": id }),
            &user.0,
            outcome.as_ref().err(),
        )
        .await;

    Ok(Json(outcome?))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath((name, id)): ApiPath<(String, i32)>,
) -> Result<Json<JsonValue>> {
    let outcome = UserStore::new()
        .delete(state.pool_manager.pool(), &name, id)
        .await;

    state
        .audit
        .user_operation(
            "delete",
            json!({ "database": name, "userId": id }),
            &user.0,
            outcome.as_ref().err(),
        )
        .await;
    outcome?;

    Ok(Json(json!({
        "success": true,
        "message": format!("User {} deleted", id),
    })))
}
