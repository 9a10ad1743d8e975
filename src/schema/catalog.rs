//! Catalog reader
//!
//! Read-only queries against `information_schema`. Every operation takes the
//! pool explicitly, acquires one connection for the duration of the call and
//! surfaces failures as `CatalogError` without retrying.
//!
//! `information_schema` columns are domain-typed (`sql_identifier`,
//! `character_data`, `cardinal_number`), so each one is cast to a base type
//! before decoding.

use crate::error::{AdminError, Result};
use crate::pool::acquire;
use crate::schema::document::{ColumnDescriptor, ConstraintDescriptor, Nullability};
use deadpool_postgres::Pool;
use serde::Serialize;
use tracing::debug;

/// One tenant schema. `size` is always 0: per-schema size is not cheap to get.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaInfo {
    #[serde(rename = "datname")]
    pub name: String,
    pub size: i64,
}

pub struct CatalogReader;

impl CatalogReader {
    pub fn new() -> Self {
        Self
    }

    pub async fn schema_exists(&self, pool: &Pool, schema: &str) -> Result<bool> {
        let client = acquire(pool).await?;

        let row = client
            .query_opt(
                "SELECT 1 FROM information_schema.schemata WHERE schema_name = $1",
                &[&schema],
            )
            .await
            .map_err(|e| AdminError::catalog(schema, e))?;

        Ok(row.is_some())
    }

    /// Fails with `SchemaNotFound` when the schema is absent.
    pub async fn require_schema(&self, pool: &Pool, schema: &str) -> Result<()> {
        if self.schema_exists(pool, schema).await? {
            Ok(())
        } else {
            Err(AdminError::SchemaNotFound {
                schema: schema.to_string(),
            })
        }
    }

    /// All non-system schemas, ordered by name
    pub async fn list_schemas(&self, pool: &Pool) -> Result<Vec<SchemaInfo>> {
        let client = acquire(pool).await?;

        let rows = client
            .query(
                r#"
                SELECT schema_name::text
                FROM information_schema.schemata
                WHERE schema_name <> 'information_schema'
                AND schema_name NOT LIKE 'pg\_%'
                ORDER BY schema_name
                "#,
                &[],
            )
            .await
            .map_err(|e| AdminError::catalog("*", e))?;

        Ok(rows
            .iter()
            .map(|row| SchemaInfo {
                name: row.get(0),
                size: 0,
            })
            .collect())
    }

    /// Base tables of a schema (views are not exported), ordered by name
    pub async fn list_tables(&self, pool: &Pool, schema: &str) -> Result<Vec<String>> {
        let client = acquire(pool).await?;

        let rows = client
            .query(
                r#"
                SELECT table_name::text
                FROM information_schema.tables
                WHERE table_schema = $1
                AND table_type = 'BASE TABLE'
                ORDER BY table_name
                "#,
                &[&schema],
            )
            .await
            .map_err(|e| AdminError::catalog(schema, e))?;

        let tables: Vec<String> = rows.iter().map(|r| r.get(0)).collect();
        debug!("Schema {} has {} tables", schema, tables.len());
        Ok(tables)
    }

    /// Columns in physical order
    pub async fn describe_columns(
        &self,
        pool: &Pool,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>> {
        let client = acquire(pool).await?;

        let rows = client
            .query(
                r#"
                SELECT column_name::text,
                       data_type::text,
                       character_maximum_length::int4,
                       is_nullable::text,
                       column_default::text
                FROM information_schema.columns
                WHERE table_schema = $1 AND table_name = $2
                ORDER BY ordinal_position
                "#,
                &[&schema, &table],
            )
            .await
            .map_err(|e| AdminError::catalog(schema, e))?;

        Ok(rows
            .iter()
            .map(|row| {
                let is_nullable: String = row.get(3);
                ColumnDescriptor {
                    column_name: row.get(0),
                    data_type: row.get(1),
                    character_maximum_length: row.get(2),
                    is_nullable: Nullability::from_catalog(&is_nullable),
                    column_default: row.get(4),
                }
            })
            .collect())
    }

    pub async fn list_constraints(
        &self,
        pool: &Pool,
        schema: &str,
        table: &str,
    ) -> Result<Vec<ConstraintDescriptor>> {
        let client = acquire(pool).await?;

        let rows = client
            .query(
                r#"
                SELECT constraint_name::text, constraint_type::text
                FROM information_schema.table_constraints
                WHERE table_schema = $1 AND table_name = $2
                ORDER BY constraint_name
                "#,
                &[&schema, &table],
            )
            .await
            .map_err(|e| AdminError::catalog(schema, e))?;

        Ok(rows
            .iter()
            .map(|row| ConstraintDescriptor {
                constraint_name: row.get(0),
                constraint_type: row.get(1),
            })
            .collect())
    }
}

impl Default for CatalogReader {
    fn default() -> Self {
        Self::new()
    }
}
