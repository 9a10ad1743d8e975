//! Cell decoding and parameter binding driven by the column's declared type

use crate::schema::document::FieldValue;
use chrono::{DateTime, NaiveDateTime, Utc};
use postgres_types::ToSql;
use serde_json::Value as JsonValue;
use tokio_postgres::Row;

/// A bound statement parameter
pub type SqlParam = Box<dyn ToSql + Sync + Send>;

/// How a column is read on export and bound on import, derived from its
/// catalog `data_type`.
///
/// Types without a native mapping travel as text: exported through a `::text`
/// cast and imported through `CAST($n::text AS <data_type>)`, which lets
/// PostgreSQL's own input functions handle numeric, uuid, date, interval and
/// friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Json,
    Timestamp,
    TimestampTz,
    Text,
}

impl ColumnKind {
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => ColumnKind::Bool,
            "smallint" | "int2" => ColumnKind::Int2,
            "integer" | "int" | "int4" => ColumnKind::Int4,
            "bigint" | "int8" => ColumnKind::Int8,
            "real" | "float4" => ColumnKind::Float4,
            "double precision" | "float8" => ColumnKind::Float8,
            "json" | "jsonb" => ColumnKind::Json,
            "timestamp without time zone" | "timestamp" => ColumnKind::Timestamp,
            "timestamp with time zone" | "timestamptz" => ColumnKind::TimestampTz,
            _ => ColumnKind::Text,
        }
    }

    /// Exported with a `::text` cast in the select list
    pub fn reads_as_text(&self) -> bool {
        matches!(self, ColumnKind::Text)
    }

    /// Imported with a text parameter and an explicit cast to the column type
    pub fn binds_as_text(&self) -> bool {
        matches!(
            self,
            ColumnKind::Text | ColumnKind::Timestamp | ColumnKind::TimestampTz
        )
    }

    /// Decode one cell of an export row.
    pub fn read_cell(&self, row: &Row, idx: usize) -> Result<FieldValue, tokio_postgres::Error> {
        let value = match self {
            ColumnKind::Bool => row.try_get::<_, Option<bool>>(idx)?.map(FieldValue::Bool),
            ColumnKind::Int2 => row
                .try_get::<_, Option<i16>>(idx)?
                .map(|v| FieldValue::Integer(v.into())),
            ColumnKind::Int4 => row
                .try_get::<_, Option<i32>>(idx)?
                .map(|v| FieldValue::Integer(v.into())),
            ColumnKind::Int8 => row.try_get::<_, Option<i64>>(idx)?.map(FieldValue::Integer),
            ColumnKind::Float4 => row
                .try_get::<_, Option<f32>>(idx)?
                .map(|v| FieldValue::float(v as f64)),
            ColumnKind::Float8 => row.try_get::<_, Option<f64>>(idx)?.map(FieldValue::float),
            ColumnKind::Json => row
                .try_get::<_, Option<JsonValue>>(idx)?
                .map(FieldValue::from_json),
            ColumnKind::Timestamp => row
                .try_get::<_, Option<NaiveDateTime>>(idx)?
                .map(FieldValue::Timestamp),
            ColumnKind::TimestampTz => row
                .try_get::<_, Option<DateTime<Utc>>>(idx)?
                .map(FieldValue::TimestampTz),
            ColumnKind::Text => row.try_get::<_, Option<String>>(idx)?.map(FieldValue::Text),
        };

        Ok(value.unwrap_or(FieldValue::Null))
    }

    /// Turn a document value into a parameter of the column's wire type.
    ///
    /// Fails with a human-readable reason when the value cannot represent the
    /// column type (e.g. text that is not a number for an integer column).
    pub fn bind(&self, value: Option<&FieldValue>) -> Result<SqlParam, String> {
        let value = value.unwrap_or(&FieldValue::Null);

        let param: SqlParam = match self {
            ColumnKind::Bool => Box::new(to_bool(value)?),
            ColumnKind::Int2 => Box::new(
                to_i64(value)?
                    .map(|v| i16::try_from(v).map_err(|_| out_of_range(v, "smallint")))
                    .transpose()?,
            ),
            ColumnKind::Int4 => Box::new(
                to_i64(value)?
                    .map(|v| i32::try_from(v).map_err(|_| out_of_range(v, "integer")))
                    .transpose()?,
            ),
            ColumnKind::Int8 => Box::new(to_i64(value)?),
            ColumnKind::Float4 => Box::new(to_f64(value)?.map(|v| v as f32)),
            ColumnKind::Float8 => Box::new(to_f64(value)?),
            ColumnKind::Json => Box::new(to_json(value)),
            ColumnKind::Timestamp | ColumnKind::TimestampTz | ColumnKind::Text => {
                Box::new(value.to_sql_text())
            }
        };

        Ok(param)
    }
}

fn out_of_range(value: i64, type_name: &str) -> String {
    format!("value {} is out of range for {}", value, type_name)
}

fn to_bool(value: &FieldValue) -> Result<Option<bool>, String> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Bool(b) => Ok(Some(*b)),
        FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Ok(Some(true)),
            "false" | "f" | "no" | "n" | "off" | "0" => Ok(Some(false)),
            _ => Err(format!("'{}' is not a boolean", s)),
        },
        FieldValue::Integer(0) => Ok(Some(false)),
        FieldValue::Integer(1) => Ok(Some(true)),
        other => Err(format!("{:?} is not a boolean", other)),
    }
}

fn to_i64(value: &FieldValue) -> Result<Option<i64>, String> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Integer(i) => Ok(Some(*i)),
        FieldValue::Float(f) if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 => {
            Ok(Some(*f as i64))
        }
        FieldValue::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("'{}' is not an integer", s)),
        other => Err(format!("{:?} is not an integer", other)),
    }
}

fn to_f64(value: &FieldValue) -> Result<Option<f64>, String> {
    match value {
        FieldValue::Null => Ok(None),
        FieldValue::Integer(i) => Ok(Some(*i as f64)),
        FieldValue::Float(f) => Ok(Some(*f)),
        FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "nan" => Ok(Some(f64::NAN)),
            "infinity" | "inf" | "+infinity" => Ok(Some(f64::INFINITY)),
            "-infinity" | "-inf" => Ok(Some(f64::NEG_INFINITY)),
            trimmed => trimmed
                .parse::<f64>()
                .map(Some)
                .map_err(|_| format!("'{}' is not a number", s)),
        },
        other => Err(format!("{:?} is not a number", other)),
    }
}

fn to_json(value: &FieldValue) -> Option<JsonValue> {
    match value {
        FieldValue::Null => None,
        FieldValue::Bool(b) => Some(JsonValue::Bool(*b)),
        FieldValue::Integer(i) => Some(JsonValue::from(*i)),
        FieldValue::Float(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        FieldValue::Text(s) => Some(JsonValue::String(s.clone())),
        FieldValue::Json(v) => Some(v.clone()),
        other => other.to_sql_text().map(JsonValue::String),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_catalog_type() {
        assert_eq!(ColumnKind::from_data_type("integer"), ColumnKind::Int4);
        assert_eq!(ColumnKind::from_data_type("bigint"), ColumnKind::Int8);
        assert_eq!(ColumnKind::from_data_type("boolean"), ColumnKind::Bool);
        assert_eq!(ColumnKind::from_data_type("double precision"), ColumnKind::Float8);
        assert_eq!(ColumnKind::from_data_type("jsonb"), ColumnKind::Json);
        assert_eq!(
            ColumnKind::from_data_type("timestamp without time zone"),
            ColumnKind::Timestamp
        );
        assert_eq!(
            ColumnKind::from_data_type("timestamp with time zone"),
            ColumnKind::TimestampTz
        );
        assert_eq!(ColumnKind::from_data_type("character varying"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_data_type("numeric"), ColumnKind::Text);
        assert_eq!(ColumnKind::from_data_type("uuid"), ColumnKind::Text);
    }

    #[test]
    fn test_text_paths() {
        assert!(ColumnKind::Text.reads_as_text());
        assert!(!ColumnKind::Timestamp.reads_as_text());
        assert!(ColumnKind::Timestamp.binds_as_text());
        assert!(!ColumnKind::Int4.binds_as_text());
    }

    #[test]
    fn test_integer_binding() {
        assert_eq!(to_i64(&FieldValue::Integer(30)).unwrap(), Some(30));
        assert_eq!(to_i64(&FieldValue::Text(" 42 ".to_string())).unwrap(), Some(42));
        assert_eq!(to_i64(&FieldValue::Float(7.0)).unwrap(), Some(7));
        assert_eq!(to_i64(&FieldValue::Null).unwrap(), None);
        assert!(to_i64(&FieldValue::Float(7.5)).is_err());
        assert!(to_i64(&FieldValue::Text("abc".to_string())).is_err());

        assert!(ColumnKind::Int4.bind(Some(&FieldValue::Integer(30))).is_ok());
        assert!(ColumnKind::Int2.bind(Some(&FieldValue::Integer(70_000))).is_err());
        assert!(ColumnKind::Int4
            .bind(Some(&FieldValue::Integer(i64::from(i32::MAX) + 1)))
            .is_err());
        assert!(ColumnKind::Int8.bind(None).is_ok());
    }

    #[test]
    fn test_bool_binding() {
        assert_eq!(to_bool(&FieldValue::Bool(true)).unwrap(), Some(true));
        assert_eq!(to_bool(&FieldValue::Text("f".to_string())).unwrap(), Some(false));
        assert_eq!(to_bool(&FieldValue::Integer(1)).unwrap(), Some(true));
        assert!(to_bool(&FieldValue::Text("maybe".to_string())).is_err());
        assert!(to_bool(&FieldValue::Integer(5)).is_err());
    }

    #[test]
    fn test_float_binding() {
        assert_eq!(to_f64(&FieldValue::Integer(2)).unwrap(), Some(2.0));
        assert_eq!(to_f64(&FieldValue::Text("1.25".to_string())).unwrap(), Some(1.25));
        assert!(to_f64(&FieldValue::Bool(true)).is_err());
    }

    #[test]
    fn test_non_finite_floats_survive_json() {
        for original in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let value = FieldValue::float(original);
            let json = serde_json::to_string(&value).unwrap();
            assert_ne!(json, "null");

            let parsed: FieldValue = serde_json::from_str(&json).unwrap();
            let restored = to_f64(&parsed).unwrap().unwrap();
            if original.is_nan() {
                assert!(restored.is_nan());
            } else {
                assert_eq!(restored, original);
            }
            assert!(ColumnKind::Float4.bind(Some(&parsed)).is_ok());
        }

        assert_eq!(FieldValue::float(2.5), FieldValue::Float(2.5));
        assert_eq!(FieldValue::float(f64::NEG_INFINITY), FieldValue::Text("-Infinity".to_string()));
    }

    #[test]
    fn test_json_binding() {
        assert_eq!(to_json(&FieldValue::Null), None);
        assert_eq!(
            to_json(&FieldValue::Json(json!({"a": [1, 2]}))),
            Some(json!({"a": [1, 2]}))
        );
        assert_eq!(to_json(&FieldValue::Text("x".to_string())), Some(json!("x")));
        assert_eq!(to_json(&FieldValue::Integer(3)), Some(json!(3)));
    }

    #[test]
    fn test_text_binding_accepts_anything() {
        for value in [
            FieldValue::Text("12.50".to_string()),
            FieldValue::Integer(12),
            FieldValue::Bool(false),
            FieldValue::Json(json!([1])),
        ] {
            assert!(ColumnKind::Text.bind(Some(&value)).is_ok());
        }
    }
}
