//! Column attribute generation for SeaORM entities
//!
//! This module generates the #[sea_orm(...)] attributes for entity fields.

use crate::ir::StorageKind;
use crate::options::FieldOptions;

/// Generated SeaORM column attributes for a field
pub struct ColumnAttributes {
    /// The #[sea_orm(...)] attribute contents
    pub attributes: Vec<String>,
}

/// Generate column attributes from field options and the storage kind
pub fn generate_attributes(options: &FieldOptions, storage: StorageKind) -> ColumnAttributes {
    let mut attributes = Vec::new();

    // SeaORM defaults to auto_increment = true for primary keys
    if options.primary_key {
        if options.auto_increment {
            attributes.push("primary_key".to_string());
        } else {
            attributes.push("primary_key, auto_increment = false".to_string());
        }
    }

    if options.unique {
        attributes.push("unique".to_string());
    }

    if !options.column_name.is_empty() {
        attributes.push(format!("column_name = \"{}\"", options.column_name));
    }

    // Nested models, maps and message lists live in a JSON column
    if !options.column_type.is_empty() {
        let column_type = normalize_column_type(&options.column_type);
        attributes.push(format!("column_type = \"{}\"", column_type));
    } else if storage.is_json() {
        attributes.push("column_type = \"JsonBinary\"".to_string());
    }

    ColumnAttributes { attributes }
}

/// Normalize column type names for SeaORM 2.0
fn normalize_column_type(column_type: &str) -> &str {
    match column_type {
        "JsonB" | "Jsonb" | "jsonb" => "JsonBinary",
        other => other,
    }
}
