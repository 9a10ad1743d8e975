//! Schema importer
//!
//! Replays an [`ExportDocument`] into a target schema inside one transaction:
//! for each table in document order, drop any same-named table (cascading),
//! create it from the captured column metadata, then insert the captured rows.
//! Any failure rolls the whole transaction back, leaving the target exactly as
//! it was before the call.
//!
//! Captured constraints are not replayed. A recreated table carries only what
//! its column list implies (types, NOT NULL, defaults); primary keys, unique
//! and foreign keys are not reconstructed.

use crate::error::{db_cause, AdminError, Result};
use crate::pool::acquire;
use crate::schema::catalog::CatalogReader;
use crate::schema::document::{ExportDocument, MigrationResult, RowRecord, TableSnapshot};
use crate::schema::identifier::validate_identifier;
use crate::schema::statements::{create_table_sql, drop_table_sql, insert_sql};
use crate::schema::values::{ColumnKind, SqlParam};
use deadpool_postgres::{Pool, Transaction};
use postgres_types::ToSql;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Statements for one table, built and validated before any connection is used
#[derive(Debug)]
pub struct TablePlan<'a> {
    pub snapshot: &'a TableSnapshot,
    pub kinds: Vec<ColumnKind>,
    pub drop_sql: String,
    pub create_sql: String,
    pub insert_sql: String,
}

impl<'a> TablePlan<'a> {
    pub fn build(target: &str, snapshot: &'a TableSnapshot) -> Result<Self> {
        let create_sql = create_table_sql(target, snapshot)?;

        Ok(Self {
            snapshot,
            kinds: snapshot
                .columns
                .iter()
                .map(|c| ColumnKind::from_data_type(&c.data_type))
                .collect(),
            drop_sql: drop_table_sql(target, &snapshot.name),
            create_sql,
            insert_sql: insert_sql(target, &snapshot.name, &snapshot.columns),
        })
    }

    /// Parameters for one row in column order; absent columns bind NULL.
    pub fn bind_row(&self, target: &str, row: &RowRecord) -> Result<Vec<SqlParam>> {
        self.snapshot
            .columns
            .iter()
            .zip(&self.kinds)
            .map(|(column, kind)| {
                kind.bind(row.get(&column.column_name)).map_err(|cause| {
                    AdminError::import_failure(
                        target,
                        &self.snapshot.name,
                        format!("column {}: {}", column.column_name, cause),
                    )
                })
            })
            .collect()
    }
}

/// Validate the target and every table of the document, producing the
/// statements to run.
pub fn plan_import<'a>(target: &str, document: &'a ExportDocument) -> Result<Vec<TablePlan<'a>>> {
    validate_identifier(target)?;
    document
        .tables
        .iter()
        .map(|table| TablePlan::build(target, table))
        .collect()
}

pub struct SchemaImporter {
    catalog: CatalogReader,
}

impl SchemaImporter {
    pub fn new() -> Self {
        Self {
            catalog: CatalogReader::new(),
        }
    }

    pub async fn import(
        &self,
        pool: &Pool,
        target: &str,
        document: &ExportDocument,
    ) -> Result<MigrationResult> {
        let start_time = Instant::now();

        let plans = plan_import(target, document)?;
        self.catalog.require_schema(pool, target).await?;

        // One connection for the whole transaction; returned to the pool on drop
        let mut client = acquire(pool).await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| AdminError::import_failure(target, "BEGIN", e))?;

        let rows_imported = match apply_plans(&transaction, target, &plans).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Import into '{}' failed, rolling back: {}", target, e);
                if let Err(rollback_err) = transaction.rollback().await {
                    warn!("Rollback of import into '{}' failed: {}", target, rollback_err);
                }
                return Err(e);
            }
        };

        transaction
            .commit()
            .await
            .map_err(|e| AdminError::import_failure(target, "COMMIT", e))?;

        info!(
            "Imported {} tables ({} rows) from '{}' into '{}' in {}ms",
            plans.len(),
            rows_imported,
            document.source_schema,
            target,
            start_time.elapsed().as_millis()
        );

        Ok(MigrationResult {
            success: true,
            message: format!("Schema imported successfully to '{}'", target),
            tables_count: plans.len(),
            timestamp: document.timestamp,
        })
    }
}

impl Default for SchemaImporter {
    fn default() -> Self {
        Self::new()
    }
}

async fn apply_plans(
    transaction: &Transaction<'_>,
    target: &str,
    plans: &[TablePlan<'_>],
) -> Result<usize> {
    let mut rows_imported = 0;

    for plan in plans {
        let table = plan.snapshot.name.as_str();

        transaction
            .execute(plan.drop_sql.as_str(), &[])
            .await
            .map_err(|e| AdminError::import_failure(target, table, db_cause(&e)))?;

        transaction
            .execute(plan.create_sql.as_str(), &[])
            .await
            .map_err(|e| AdminError::import_failure(target, table, db_cause(&e)))?;

        if plan.snapshot.rows.is_empty() {
            debug!("Recreated {}.{} (no rows)", target, table);
            continue;
        }

        let statement = transaction
            .prepare(&plan.insert_sql)
            .await
            .map_err(|e| AdminError::import_failure(target, table, db_cause(&e)))?;

        for row in &plan.snapshot.rows {
            let params = plan.bind_row(target, row)?;
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();

            transaction
                .execute(&statement, &refs)
                .await
                .map_err(|e| AdminError::import_failure(target, table, db_cause(&e)))?;
        }

        rows_imported += plan.snapshot.rows.len();
        debug!(
            "Recreated {}.{} with {} rows",
            target,
            table,
            plan.snapshot.rows.len()
        );
    }

    Ok(rows_imported)
}
