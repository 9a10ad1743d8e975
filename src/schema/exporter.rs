//! Schema exporter
//!
//! Walks a schema's tables and captures columns, rows and constraints into an
//! [`ExportDocument`]. Each table is read on its own pooled connection and no
//! transaction spans the export, so a table written mid-export may be captured
//! at a different moment than its siblings. Callers that need a consistent
//! snapshot must quiesce writes to the source schema first.

use crate::error::{AdminError, Result};
use crate::pool::acquire;
use crate::schema::catalog::CatalogReader;
use crate::schema::document::{ExportDocument, RowRecord, TableSnapshot};
use crate::schema::identifier::validate_identifier;
use crate::schema::statements::select_rows_sql;
use crate::schema::values::ColumnKind;
use deadpool_postgres::Pool;
use std::time::Instant;
use tracing::{debug, info};

pub struct SchemaExporter {
    catalog: CatalogReader,
}

impl SchemaExporter {
    pub fn new() -> Self {
        Self {
            catalog: CatalogReader::new(),
        }
    }

    pub async fn export(&self, pool: &Pool, schema: &str) -> Result<ExportDocument> {
        let start_time = Instant::now();

        validate_identifier(schema)?;
        self.catalog.require_schema(pool, schema).await?;

        let mut document = ExportDocument::new(schema);

        for table in self.catalog.list_tables(pool, schema).await? {
            let snapshot = self.export_table(pool, schema, &table).await?;
            debug!(
                "Exported {}.{}: {} columns, {} rows",
                schema,
                table,
                snapshot.columns.len(),
                snapshot.rows.len()
            );
            document.tables.push(snapshot);
        }

        info!(
            "Exported schema '{}': {} tables, {} rows in {}ms",
            schema,
            document.table_count(),
            document.row_count(),
            start_time.elapsed().as_millis()
        );

        Ok(document)
    }

    async fn export_table(&self, pool: &Pool, schema: &str, table: &str) -> Result<TableSnapshot> {
        let columns = self.catalog.describe_columns(pool, schema, table).await?;
        let kinds: Vec<ColumnKind> = columns
            .iter()
            .map(|c| ColumnKind::from_data_type(&c.data_type))
            .collect();

        let client = acquire(pool).await?;
        let rows = client
            .query(&select_rows_sql(schema, table, &columns), &[])
            .await
            .map_err(|e| AdminError::catalog(schema, format!("reading {}: {}", table, e)))?;
        drop(client);

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut record = RowRecord::new();
            for (idx, (column, kind)) in columns.iter().zip(&kinds).enumerate() {
                let value = kind.read_cell(row, idx).map_err(|e| {
                    AdminError::catalog(
                        schema,
                        format!("decoding {}.{}: {}", table, column.column_name, e),
                    )
                })?;
                record.insert(column.column_name.clone(), value);
            }
            records.push(record);
        }

        let constraints = self.catalog.list_constraints(pool, schema, table).await?;

        Ok(TableSnapshot {
            name: table.to_string(),
            columns,
            rows: records,
            constraints,
        })
    }
}

impl Default for SchemaExporter {
    fn default() -> Self {
        Self::new()
    }
}
