mod catalog;
mod document;
mod exporter;
mod identifier;
mod importer;
mod migrator;
mod statements;
mod values;

pub use catalog::{CatalogReader, SchemaInfo};
pub use document::{
    ColumnDescriptor, ConstraintDescriptor, ExportDocument, FieldValue, MigrationResult,
    Nullability, RowRecord, TableSnapshot,
};
pub use exporter::SchemaExporter;
pub use identifier::{
    is_valid_identifier, qualified_name, quote_ident, validate_data_type, validate_identifier,
    MAX_IDENTIFIER_LEN,
};
pub use importer::{plan_import, SchemaImporter, TablePlan};
pub use migrator::SchemaMigrator;
pub use statements::{
    column_definition, column_type, create_schema_sql, create_table_sql, drop_table_sql, insert_sql,
    select_rows_sql,
};
pub use values::{ColumnKind, SqlParam};
