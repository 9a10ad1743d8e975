//! Export document model
//!
//! The export document is a self-contained value: column metadata, row data and
//! constraints for every table of one schema, with no reference back to a live
//! connection. Its JSON form is
//!
//! ```json
//! {"database": "...", "timestamp": "...", "tables": [
//!   {"name": "...", "schema": [{"column_name", "data_type",
//!     "character_maximum_length", "is_nullable", "column_default"}],
//!    "data": [{...}], "constraints": [{"constraint_name", "constraint_type"}]}]}
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Catalog `is_nullable` flag, kept as the catalog spells it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nullability {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl Nullability {
    pub fn from_catalog(flag: &str) -> Self {
        if flag.eq_ignore_ascii_case("NO") {
            Nullability::No
        } else {
            Nullability::Yes
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub column_name: String,
    pub data_type: String,
    pub character_maximum_length: Option<i32>,
    pub is_nullable: Nullability,
    pub column_default: Option<String>,
}

impl ColumnDescriptor {
    pub fn is_nullable(&self) -> bool {
        self.is_nullable == Nullability::Yes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    pub constraint_name: String,
    pub constraint_type: String,
}

/// A single cell value.
///
/// Serialized untagged so rows read as plain JSON objects. On the way back in,
/// every JSON string becomes `Text`; the destination column's declared type
/// decides how it is bound, not the shape of the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(JsonValue),
}

impl FieldValue {
    /// Map a JSON value onto the tag set, keeping only arrays/objects as `Json`.
    pub fn from_json(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => n.as_f64().map(FieldValue::Float).unwrap_or(FieldValue::Null),
            },
            JsonValue::String(s) => FieldValue::Text(s),
            other => FieldValue::Json(other),
        }
    }

    /// JSON has no NaN or Infinity, so non-finite values travel as the text
    /// PostgreSQL prints for them and are parsed back on import.
    pub fn float(value: f64) -> Self {
        if value.is_finite() {
            FieldValue::Float(value)
        } else if value.is_nan() {
            FieldValue::Text("NaN".to_string())
        } else if value > 0.0 {
            FieldValue::Text("Infinity".to_string())
        } else {
            FieldValue::Text("-Infinity".to_string())
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text form accepted by PostgreSQL's input function for the value's type.
    pub fn to_sql_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Float(f) => Some(f.to_string()),
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Timestamp(ts) => Some(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            FieldValue::TimestampTz(ts) => Some(ts.to_rfc3339()),
            FieldValue::Json(v) => Some(v.to_string()),
        }
    }
}

/// Column name to value. Columns absent from a record import as NULL.
pub type RowRecord = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    #[serde(rename = "schema")]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(rename = "data", default)]
    pub rows: Vec<RowRecord>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(rename = "database")]
    pub source_schema: String,
    pub timestamp: DateTime<Utc>,
    pub tables: Vec<TableSnapshot>,
}

impl ExportDocument {
    pub fn new(source_schema: &str) -> Self {
        Self {
            source_schema: source_schema.to_string(),
            timestamp: Utc::now(),
            tables: Vec::new(),
        }
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }
}

/// Outcome of an import or migrate call, returned to the caller only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub success: bool,
    pub message: String,
    pub tables_count: usize,
    pub timestamp: DateTime<Utc>,
}
