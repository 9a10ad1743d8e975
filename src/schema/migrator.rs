//! Schema migrator: export the source, then import the document into the target.
//!
//! The two phases share nothing but the in-memory document. Export releases its
//! connections before import takes one, and a failed import leaves the source
//! untouched and the target rolled back.

use crate::error::{AdminError, Result};
use crate::schema::catalog::CatalogReader;
use crate::schema::document::MigrationResult;
use crate::schema::exporter::SchemaExporter;
use crate::schema::identifier::validate_identifier;
use crate::schema::importer::SchemaImporter;
use deadpool_postgres::Pool;
use tracing::info;

pub struct SchemaMigrator {
    catalog: CatalogReader,
    exporter: SchemaExporter,
    importer: SchemaImporter,
}

impl SchemaMigrator {
    pub fn new() -> Self {
        Self {
            catalog: CatalogReader::new(),
            exporter: SchemaExporter::new(),
            importer: SchemaImporter::new(),
        }
    }

    pub async fn migrate(&self, pool: &Pool, source: &str, target: &str) -> Result<MigrationResult> {
        validate_identifier(source)?;
        validate_identifier(target)?;

        if source == target {
            return Err(AdminError::InvalidRequest {
                message: "Source and target schemas must differ".to_string(),
            });
        }

        // Both must exist before anything is read or written
        self.catalog.require_schema(pool, source).await?;
        self.catalog.require_schema(pool, target).await?;

        let document = self.exporter.export(pool, source).await?;
        self.importer.import(pool, target, &document).await?;

        info!(
            "Migrated '{}' -> '{}': {} tables, {} rows",
            source,
            target,
            document.table_count(),
            document.row_count()
        );

        Ok(MigrationResult {
            success: true,
            message: format!(
                "Successfully migrated from '{}' to '{}'",
                source, target
            ),
            tables_count: document.table_count(),
            timestamp: document.timestamp,
        })
    }
}

impl Default for SchemaMigrator {
    fn default() -> Self {
        Self::new()
    }
}
