//! Intermediate Representation (IR) for storage models
//!
//! The IR is a backend-agnostic description of a storage struct: its fields,
//! their Rust types and how each is stored. Backends turn it into code.

use crate::options::FieldOptions;

/// A storage model ready for emission
#[derive(Debug, Clone)]
pub struct Model {
    /// Struct name (without any module prefix)
    pub name: String,

    /// Table or collection name, empty for embedded values
    pub table_name: String,

    /// Proto package the model was declared in
    pub package: String,

    /// Fields in declaration order
    pub fields: Vec<Field>,
}

impl Model {
    /// Whether this model is stored on its own (as opposed to embedded)
    pub fn is_table(&self) -> bool {
        !self.table_name.is_empty()
    }
}

/// A field of a storage model
#[derive(Debug, Clone)]
pub struct Field {
    /// Rust field name (snake_case, raw identifier if reserved)
    pub name: String,

    /// Original proto field name
    pub proto_name: String,

    /// Rust type, including `Option` when nullable
    pub rust_type: String,

    /// How the value is stored
    pub storage: StorageKind,

    /// Whether the field is nullable
    pub nullable: bool,

    /// `(persist.field)` options
    pub options: FieldOptions,
}

/// Storage representation of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Numbers, booleans, strings
    Scalar,
    /// A point in time
    Time,
    /// Opaque bytes
    Blob,
    /// A single nested model
    Embedded,
    /// A list of scalars
    ScalarList,
    /// Maps and lists of nested models
    Json,
}

impl StorageKind {
    /// Whether a relational store keeps this value as JSON
    pub fn is_json(self) -> bool {
        matches!(self, StorageKind::Embedded | StorageKind::Json)
    }
}
