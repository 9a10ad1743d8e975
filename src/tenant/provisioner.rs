use crate::error::{db_cause, AdminError, Result};
use crate::pool::acquire;
use crate::schema::{create_schema_sql, qualified_name, quote_ident, validate_identifier};
use deadpool_postgres::Pool;
use serde::Serialize;
use tokio_postgres::error::SqlState;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionResult {
    pub success: bool,
    pub message: String,
}

/// Creates tenant schemas and their base `users` table
pub struct SchemaProvisioner;

impl SchemaProvisioner {
    pub fn new() -> Self {
        Self
    }

    /// Creates the schema, its users table and the email index in one
    /// transaction. Either all three exist afterwards or none do.
    pub async fn provision(&self, pool: &Pool, name: &str) -> Result<ProvisionResult> {
        let create_sql = create_schema_sql(name)?;

        let mut client = acquire(pool).await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| creation_error(name, e.code(), db_cause(&e)))?;

        let steps = [
            create_sql,
            users_table_sql(name),
            users_email_index_sql(name),
        ];
        let mut failure = None;
        for sql in &steps {
            if let Err(e) = transaction.execute(sql.as_str(), &[]).await {
                failure = Some(creation_error(name, e.code(), db_cause(&e)));
                break;
            }
        }

        if let Some(err) = failure {
            if let Err(rollback_err) = transaction.rollback().await {
                warn!("Rollback of provisioning '{}' failed: {}", name, rollback_err);
            }
            return Err(err);
        }

        transaction
            .commit()
            .await
            .map_err(|e| creation_error(name, e.code(), db_cause(&e)))?;

        info!("Provisioned schema '{}' with users table", name);

        Ok(ProvisionResult {
            success: true,
            message: format!("Schema '{}' created successfully.", name),
        })
    }

    /// Bare `CREATE SCHEMA` without the users table
    pub async fn create_schema(&self, pool: &Pool, name: &str) -> Result<ProvisionResult> {
        let sql = create_schema_sql(name)?;

        let client = acquire(pool).await?;
        client
            .execute(sql.as_str(), &[])
            .await
            .map_err(|e| creation_error(name, e.code(), db_cause(&e)))?;

        info!("Created schema: {}", name);

        Ok(ProvisionResult {
            success: true,
            message: format!("Schema '{}' created successfully.", name),
        })
    }

    /// Idempotent: existing table and index are left alone.
    pub async fn initialize_schema(&self, pool: &Pool, name: &str) -> Result<ProvisionResult> {
        validate_identifier(name)?;

        let client = acquire(pool).await?;

        client
            .execute(users_table_sql(name).as_str(), &[])
            .await
            .map_err(|e| {
                AdminError::Internal(format!("Failed to initialize schema '{}': {}", name, db_cause(&e)))
            })?;

        client
            .execute(users_email_index_sql(name).as_str(), &[])
            .await
            .map_err(|e| {
                AdminError::Internal(format!("Failed to index schema '{}': {}", name, db_cause(&e)))
            })?;

        info!("Schema '{}' initialized successfully", name);

        Ok(ProvisionResult {
            success: true,
            message: format!("Schema '{}' initialized successfully", name),
        })
    }
}

impl Default for SchemaProvisioner {
    fn default() -> Self {
        Self::new()
    }
}

/// A concurrent creator that commits first makes the loser fail with either
/// duplicate_schema or a unique violation on pg_namespace.
fn creation_error(name: &str, code: Option<&SqlState>, cause: String) -> AdminError {
    match code {
        Some(code) if *code == SqlState::DUPLICATE_SCHEMA || *code == SqlState::UNIQUE_VIOLATION => {
            AdminError::SchemaAlreadyExists {
                schema: name.to_string(),
            }
        }
        _ => AdminError::InvalidRequest {
            message: format!("Failed to create schema '{}': {}", name, cause),
        },
    }
}

fn users_table_sql(schema: &str) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(100) UNIQUE NOT NULL,
            age INTEGER CHECK (age > 0 AND age < 150),
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        qualified_name(schema, "users")
    )
}

fn users_email_index_sql(schema: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (email)",
        quote_ident(&format!("idx_{}_users_email", schema)),
        qualified_name(schema, "users")
    )
}
