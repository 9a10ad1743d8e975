//! Identifier validation and quoting
//!
//! Schema, table and column names are embedded directly into generated DDL/DML
//! text (PostgreSQL cannot bind identifiers as parameters). Every externally
//! supplied name goes through [`validate_identifier`] before it reaches a
//! statement builder, and every emitted identifier is wrapped by [`quote_ident`].

use crate::error::{AdminError, Result};

/// PostgreSQL truncates identifiers longer than NAMEDATALEN - 1 bytes
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Accept only `^[A-Za-z_][A-Za-z0-9_]*$` with at most 63 bytes.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AdminError::invalid_identifier(name, "name must not be empty"));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(AdminError::invalid_identifier(
            name,
            format!("name must be {} characters or less", MAX_IDENTIFIER_LEN),
        ));
    }

    let starts_ok = name
        .chars()
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_ok {
        return Err(AdminError::invalid_identifier(
            name,
            "name must start with a letter or underscore",
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AdminError::invalid_identifier(
            name,
            "use only alphanumeric characters and underscores",
        ));
    }

    Ok(())
}

pub fn is_valid_identifier(name: &str) -> bool {
    validate_identifier(name).is_ok()
}

/// Validate a catalog `data_type` before it is spliced into `CREATE TABLE`.
///
/// Catalog type names are words separated by single spaces
/// (`character varying`, `timestamp without time zone`). The catalog reports
/// arrays and user-defined types only as `ARRAY` / `USER-DEFINED`, which cannot
/// be turned back into a column type.
pub fn validate_data_type(data_type: &str) -> Result<()> {
    let upper = data_type.to_ascii_uppercase();
    if upper == "ARRAY" || upper == "USER-DEFINED" {
        return Err(AdminError::invalid_identifier(
            data_type,
            "array and user-defined column types cannot be recreated from catalog metadata",
        ));
    }

    let well_formed = !data_type.is_empty()
        && data_type.len() <= 128
        && data_type.split(' ').all(is_type_word);

    if !well_formed {
        return Err(AdminError::invalid_identifier(
            data_type,
            "column type must be a plain type name",
        ));
    }

    Ok(())
}

fn is_type_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Double-quote an identifier, doubling any embedded quote.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}
