//! SQL text builders
//!
//! Pure functions from descriptors to statement text, so generated DDL/DML can
//! be checked without a database. Identifiers are validated by the caller (or
//! here, for anything coming out of an export document) and always quoted.

use crate::error::Result;
use crate::schema::document::{ColumnDescriptor, TableSnapshot};
use crate::schema::identifier::{
    qualified_name, quote_ident, validate_data_type, validate_identifier,
};
use crate::schema::values::ColumnKind;

/// `"name" type[(len)] [NOT NULL] [DEFAULT expr]`
///
/// The default expression is copied verbatim from the catalog. It cannot be
/// validated as a name, but it is only ever executed as part of a single
/// `CREATE TABLE` through the extended protocol, which refuses multiple
/// statements.
pub fn column_definition(column: &ColumnDescriptor) -> Result<String> {
    validate_identifier(&column.column_name)?;
    validate_data_type(&column.data_type)?;

    let mut def = format!("{} {}", quote_ident(&column.column_name), column_type(column));

    if !column.is_nullable() {
        def.push_str(" NOT NULL");
    }

    if let Some(default) = column.column_default.as_deref() {
        if !default.trim().is_empty() {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
    }

    Ok(def)
}

/// Declared type with its length modifier. Without the length, `character`
/// and `bit` mean length 1 and an explicit cast would truncate or reject.
pub fn column_type(column: &ColumnDescriptor) -> String {
    match column.character_maximum_length {
        Some(len) => format!("{}({})", column.data_type, len),
        None => column.data_type.clone(),
    }
}

pub fn create_table_sql(schema: &str, table: &TableSnapshot) -> Result<String> {
    validate_identifier(schema)?;
    validate_identifier(&table.name)?;

    let columns = table
        .columns
        .iter()
        .map(column_definition)
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "CREATE TABLE {} ({})",
        qualified_name(schema, &table.name),
        columns.join(", ")
    ))
}

pub fn drop_table_sql(schema: &str, table: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", qualified_name(schema, table))
}

/// Positional insert for every column of the snapshot, in snapshot order.
pub fn insert_sql(schema: &str, table: &str, columns: &[ColumnDescriptor]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", qualified_name(schema, table));
    }

    let names: Vec<String> = columns.iter().map(|c| quote_ident(&c.column_name)).collect();

    let placeholders: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let kind = ColumnKind::from_data_type(&c.data_type);
            if kind.binds_as_text() {
                format!("CAST(${}::text AS {})", i + 1, column_type(c))
            } else {
                format!("${}", i + 1)
            }
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_name(schema, table),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Full-table read with one select expression per described column.
pub fn select_rows_sql(schema: &str, table: &str, columns: &[ColumnDescriptor]) -> String {
    let select_list: Vec<String> = columns
        .iter()
        .map(|c| {
            let name = quote_ident(&c.column_name);
            if ColumnKind::from_data_type(&c.data_type).reads_as_text() {
                format!("{}::text AS {}", name, name)
            } else {
                name
            }
        })
        .collect();

    format!(
        "SELECT {} FROM {}",
        select_list.join(", "),
        qualified_name(schema, table)
    )
}

pub fn create_schema_sql(schema: &str) -> Result<String> {
    validate_identifier(schema)?;
    Ok(format!("CREATE SCHEMA {}", quote_ident(schema)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::document::Nullability;

    fn column(
        name: &str,
        data_type: &str,
        len: Option<i32>,
        nullable: Nullability,
        default: Option<&str>,
    ) -> ColumnDescriptor {
        ColumnDescriptor {
            column_name: name.to_string(),
            data_type: data_type.to_string(),
            character_maximum_length: len,
            is_nullable: nullable,
            column_default: default.map(str::to_string),
        }
    }

    fn users_columns() -> Vec<ColumnDescriptor> {
        vec![
            column(
                "id",
                "integer",
                None,
                Nullability::No,
                Some("nextval('shop.users_id_seq'::regclass)"),
            ),
            column("name", "character varying", Some(100), Nullability::No, None),
            column("age", "integer", None, Nullability::Yes, None),
            column(
                "created_at",
                "timestamp without time zone",
                None,
                Nullability::Yes,
                Some("CURRENT_TIMESTAMP"),
            ),
        ]
    }

    #[test]
    fn test_column_definition() {
        let cols = users_columns();
        assert_eq!(
            column_definition(&cols[0]).unwrap(),
            "\"id\" integer NOT NULL DEFAULT nextval('shop.users_id_seq'::regclass)"
        );
        assert_eq!(
            column_definition(&cols[1]).unwrap(),
            "\"name\" character varying(100) NOT NULL"
        );
        assert_eq!(column_definition(&cols[2]).unwrap(), "\"age\" integer");
    }

    #[test]
    fn test_column_definition_rejects_bad_names() {
        let bad = column("na\"me", "text", None, Nullability::Yes, None);
        assert!(column_definition(&bad).is_err());

        let bad_type = column("x", "text); DROP TABLE y; --", None, Nullability::Yes, None);
        assert!(column_definition(&bad_type).is_err());
    }

    #[test]
    fn test_create_table_sql() {
        let table = TableSnapshot {
            name: "users".to_string(),
            columns: users_columns(),
            rows: Vec::new(),
            constraints: Vec::new(),
        };
        let sql = create_table_sql("shop_copy", &table).unwrap();
        assert!(sql.starts_with("CREATE TABLE \"shop_copy\".\"users\" (\"id\" integer NOT NULL"));
        assert!(sql.ends_with("\"created_at\" timestamp without time zone DEFAULT CURRENT_TIMESTAMP)"));
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_create_table_rejects_invalid_table() {
        let table = TableSnapshot {
            name: "users; drop".to_string(),
            columns: users_columns(),
            rows: Vec::new(),
            constraints: Vec::new(),
        };
        assert!(create_table_sql("shop", &table).is_err());
    }

    #[test]
    fn test_drop_table_sql() {
        assert_eq!(
            drop_table_sql("shop", "users"),
            "DROP TABLE IF EXISTS \"shop\".\"users\" CASCADE"
        );
    }

    #[test]
    fn test_insert_sql_placeholders() {
        let sql = insert_sql("shop", "users", &users_columns());
        assert_eq!(
            sql,
            "INSERT INTO \"shop\".\"users\" (\"id\", \"name\", \"age\", \"created_at\") \
             VALUES ($1, CAST($2::text AS character varying(100)), $3, \
             CAST($4::text AS timestamp without time zone))"
        );
    }

    #[test]
    fn test_insert_sql_keeps_length_in_casts() {
        let columns = vec![
            column("code", "character", Some(5), Nullability::No, None),
            column("flags", "bit", Some(4), Nullability::Yes, None),
            column("mask", "bit varying", Some(8), Nullability::Yes, None),
        ];
        assert_eq!(
            insert_sql("shop", "codes", &columns),
            "INSERT INTO \"shop\".\"codes\" (\"code\", \"flags\", \"mask\") \
             VALUES (CAST($1::text AS character(5)), CAST($2::text AS bit(4)), \
             CAST($3::text AS bit varying(8)))"
        );
        assert_eq!(column_definition(&columns[0]).unwrap(), "\"code\" character(5) NOT NULL");
    }

    #[test]
    fn test_insert_sql_without_columns() {
        assert_eq!(
            insert_sql("shop", "marker", &[]),
            "INSERT INTO \"shop\".\"marker\" DEFAULT VALUES"
        );
    }

    #[test]
    fn test_select_rows_sql() {
        let sql = select_rows_sql("shop", "users", &users_columns());
        assert_eq!(
            sql,
            "SELECT \"id\", \"name\"::text AS \"name\", \"age\", \"created_at\" FROM \"shop\".\"users\""
        );
    }

    #[test]
    fn test_create_schema_sql() {
        assert_eq!(create_schema_sql("shop").unwrap(), "CREATE SCHEMA \"shop\"");
        assert!(create_schema_sql("shop;drop").is_err());
    }
}
