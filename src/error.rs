use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    #[error("Schema not found: {schema}")]
    SchemaNotFound { schema: String },

    #[error("Schema '{schema}' already exists")]
    SchemaAlreadyExists { schema: String },

    #[error("Catalog query failed for schema {schema}: {cause}")]
    CatalogError { schema: String, cause: String },

    #[error("Import into {schema} failed at table {table}: {cause}")]
    ImportFailure {
        schema: String,
        table: String,
        cause: String,
    },

    #[error("Connection failed to {database}: {cause}")]
    ConnectionFailed { database: String, cause: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    pub fn invalid_identifier(name: &str, reason: impl Into<String>) -> Self {
        AdminError::InvalidIdentifier {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn catalog(schema: &str, err: impl std::fmt::Display) -> Self {
        AdminError::CatalogError {
            schema: schema.to_string(),
            cause: err.to_string(),
        }
    }

    pub fn import_failure(schema: &str, table: &str, err: impl std::fmt::Display) -> Self {
        AdminError::ImportFailure {
            schema: schema.to_string(),
            table: table.to_string(),
            cause: err.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::InvalidIdentifier { .. }
            | AdminError::InvalidRequest { .. }
            | AdminError::SchemaAlreadyExists { .. } => StatusCode::BAD_REQUEST,
            AdminError::SchemaNotFound { .. } | AdminError::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            AdminError::ConnectionFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AdminError::CatalogError { .. }
            | AdminError::ImportFailure { .. }
            | AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            schema: None,
            cause: None,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let error_response = match &self {
            AdminError::InvalidIdentifier { name, reason } => ErrorResponse {
                error: "invalid_identifier".to_string(),
                message: format!("Invalid name '{}': {}", name, reason),
                schema: None,
                cause: None,
            },
            AdminError::SchemaNotFound { schema } => ErrorResponse {
                error: "schema_not_found".to_string(),
                message: format!("Schema '{}' not found", schema),
                schema: Some(schema.clone()),
                cause: None,
            },
            AdminError::SchemaAlreadyExists { schema } => ErrorResponse {
                error: "schema_already_exists".to_string(),
                message: format!("Schema '{}' already exists.", schema),
                schema: Some(schema.clone()),
                cause: None,
            },
            AdminError::CatalogError { schema, cause } => ErrorResponse {
                error: "catalog_error".to_string(),
                message: format!("Failed to read catalog for schema '{}'", schema),
                schema: Some(schema.clone()),
                cause: Some(cause.clone()),
            },
            AdminError::ImportFailure {
                schema,
                table,
                cause,
            } => ErrorResponse {
                error: "import_failed".to_string(),
                message: format!(
                    "Import into '{}' failed at table '{}'; all changes were rolled back",
                    schema, table
                ),
                schema: Some(schema.clone()),
                cause: Some(cause.clone()),
            },
            AdminError::ConnectionFailed { database, cause } => ErrorResponse {
                error: "connection_failed".to_string(),
                message: format!("Failed to connect to database '{}'", database),
                schema: None,
                cause: Some(cause.clone()),
            },
            AdminError::InvalidRequest { message } => {
                ErrorResponse::new("invalid_request", message.clone())
            }
            AdminError::NotFound { message } => ErrorResponse::new("not_found", message.clone()),
            AdminError::Internal(msg) => ErrorResponse::new("internal_error", msg.clone()),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<tokio_postgres::Error> for AdminError {
    fn from(err: tokio_postgres::Error) -> Self {
        AdminError::Internal(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for AdminError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        AdminError::ConnectionFailed {
            database: "postgres".to_string(),
            cause: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AdminError {
    fn from(err: std::io::Error) -> Self {
        AdminError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        AdminError::Internal(format!("JSON error: {}", err))
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        AdminError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;

/// Server message plus detail when the error came from PostgreSQL
pub fn db_cause(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db_err) => match db_err.detail() {
            Some(detail) => format!("{} - {}", db_err.message(), detail),
            None => db_err.message().to_string(),
        },
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AdminError::invalid_identifier("1abc", "bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdminError::SchemaAlreadyExists {
                schema: "shop".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AdminError::SchemaNotFound {
                schema: "shop".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AdminError::import_failure("shop", "users", "boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AdminError::ConnectionFailed {
                database: "postgres".to_string(),
                cause: "refused".to_string()
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = AdminError::NotFound {
            message: "User 7 not found".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_response_skips_empty_fields() {
        let body = serde_json::to_value(ErrorResponse::new("invalid_request", "nope")).unwrap();
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["message"], "nope");
        assert!(body.get("schema").is_none());
        assert!(body.get("cause").is_none());
    }

    #[test]
    fn test_display_includes_table() {
        let err = AdminError::import_failure("shop_copy", "orders", "null value");
        assert_eq!(
            err.to_string(),
            "Import into shop_copy failed at table orders: null value"
        );
    }
}
