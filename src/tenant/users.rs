//! CRUD over the `users` table of a tenant schema

use crate::error::{AdminError, Result};
use crate::pool::acquire;
use crate::schema::{qualified_name, validate_identifier};
use chrono::NaiveDateTime;
use deadpool_postgres::Pool;
use serde::{Deserialize, Serialize};
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use tracing::debug;

const USER_COLUMNS: &str = "id, name, email, age, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl User {
    /// Fails instead of panicking when an import replaced `users` with a
    /// different column layout or nullability.
    fn from_row(schema: &str, row: &Row) -> Result<Self> {
        let layout = |e: tokio_postgres::Error| {
            AdminError::Internal(format!(
                "users table in schema '{}' has an unexpected layout: {}",
                schema, e
            ))
        };

        Ok(Self {
            id: row.try_get(0).map_err(layout)?,
            name: row.try_get(1).map_err(layout)?,
            email: row.try_get(2).map_err(layout)?,
            age: row.try_get(3).map_err(layout)?,
            created_at: row.try_get(4).map_err(layout)?,
            updated_at: row.try_get(5).map_err(layout)?,
        })
    }
}

/// Body of create and update requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
}

impl NewUser {
    /// Name and email are required; an age of 0 means "not given".
    fn validated(&self) -> Result<(&str, &str, Option<i32>)> {
        let name = self.name.as_deref().map(str::trim).unwrap_or("");
        let email = self.email.as_deref().map(str::trim).unwrap_or("");

        if name.is_empty() || email.is_empty() {
            return Err(AdminError::InvalidRequest {
                message: "Name and email required".to_string(),
            });
        }

        Ok((name, email, self.age.filter(|a| *a != 0)))
    }
}

pub struct UserStore;

impl UserStore {
    pub fn new() -> Self {
        Self
    }

    pub async fn list(&self, pool: &Pool, schema: &str) -> Result<Vec<User>> {
        validate_identifier(schema)?;
        let client = acquire(pool).await?;

        let sql = format!(
            "SELECT {} FROM {} ORDER BY id",
            USER_COLUMNS,
            qualified_name(schema, "users")
        );
        let rows = client
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| map_user_error(schema, e))?;

        rows.iter().map(|row| User::from_row(schema, row)).collect()
    }

    pub async fn create(&self, pool: &Pool, schema: &str, user: &NewUser) -> Result<User> {
        validate_identifier(schema)?;
        let (name, email, age) = user.validated()?;
        let client = acquire(pool).await?;

        let sql = format!(
            "INSERT INTO {} (name, email, age) VALUES ($1, $2, $3) RETURNING {}",
            qualified_name(schema, "users"),
            USER_COLUMNS
        );
        let row = client
            .query_one(sql.as_str(), &[&name, &email, &age])
            .await
            .map_err(|e| map_user_error(schema, e))?;

        let created = User::from_row(schema, &row)?;
        debug!("Created user {} in {}", created.id, schema);
        Ok(created)
    }

    pub async fn update(&self, pool: &Pool, schema: &str, id: i32, user: &NewUser) -> Result<User> {
        validate_identifier(schema)?;
        let (name, email, age) = user.validated()?;
        let client = acquire(pool).await?;

        let sql = format!(
            "UPDATE {} SET name = $1, email = $2, age = $3, updated_at = CURRENT_TIMESTAMP \
             WHERE id = $4 RETURNING {}",
            qualified_name(schema, "users"),
            USER_COLUMNS
        );
        let row = client
            .query_opt(sql.as_str(), &[&name, &email, &age, &id])
            .await
            .map_err(|e| map_user_error(schema, e))?
            .ok_or_else(|| user_not_found(schema, id))?;

        User::from_row(schema, &row)
    }

    pub async fn delete(&self, pool: &Pool, schema: &str, id: i32) -> Result<()> {
        validate_identifier(schema)?;
        let client = acquire(pool).await?;

        let sql = format!("DELETE FROM {} WHERE id = $1", qualified_name(schema, "users"));
        let deleted = client
            .execute(sql.as_str(), &[&id])
            .await
            .map_err(|e| map_user_error(schema, e))?;

        if deleted == 0 {
            return Err(user_not_found(schema, id));
        }

        Ok(())
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn user_not_found(schema: &str, id: i32) -> AdminError {
    AdminError::NotFound {
        message: format!("User {} not found in schema '{}'", id, schema),
    }
}

fn map_user_error(schema: &str, err: tokio_postgres::Error) -> AdminError {
    let message = err
        .as_db_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| err.to_string());

    match err.code() {
        Some(code) if *code == SqlState::UNIQUE_VIOLATION => AdminError::InvalidRequest {
            message: "A user with this email already exists".to_string(),
        },
        Some(code) if *code == SqlState::CHECK_VIOLATION => AdminError::InvalidRequest {
            message: "Age must be between 1 and 149".to_string(),
        },
        Some(code) if *code == SqlState::UNDEFINED_TABLE => AdminError::NotFound {
            message: format!("Schema '{}' has no users table", schema),
        },
        _ => AdminError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_requires_name_and_email() {
        let missing = NewUser {
            name: Some("Ann".to_string()),
            email: None,
            age: None,
        };
        assert!(matches!(
            missing.validated(),
            Err(AdminError::InvalidRequest { .. })
        ));

        let blank = NewUser {
            name: Some("  ".to_string()),
            email: Some("ann@x.com".to_string()),
            age: None,
        };
        assert!(blank.validated().is_err());
    }

    #[test]
    fn test_new_user_zero_age_is_absent() {
        let user = NewUser {
            name: Some(" Ann ".to_string()),
            email: Some("ann@x.com".to_string()),
            age: Some(0),
        };
        assert_eq!(user.validated().unwrap(), ("Ann", "ann@x.com", None));

        let aged = NewUser {
            age: Some(30),
            ..user
        };
        assert_eq!(aged.validated().unwrap().2, Some(30));
    }

    #[test]
    fn test_new_user_deserializes_partial_body() {
        let user: NewUser = serde_json::from_str(r#"{"name":"Ann","email":"ann@x.com"}"#).unwrap();
        assert_eq!(user.age, None);
    }
}
