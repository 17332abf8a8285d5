//! Type mapping from storage fields to Rust types
//!
//! Scalars map the way prost maps them. Well-known types have fixed storage
//! types, and references to other models use the referenced model's struct.

use crate::ir::StorageKind;
use crate::mapping::MessageRegistry;
use crate::mapping::kind::{self, FieldShape};
use crate::wellknown;
use prost_reflect::{FieldDescriptor, Kind};

/// A storage field's Rust type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    /// The Rust type, including `Option` when nullable
    pub rust_type: String,
    /// How the value is stored
    pub storage: StorageKind,
    /// Whether the field is nullable
    pub nullable: bool,
}

/// Map a storage field to its Rust type
pub fn map_field_type(
    field: &FieldDescriptor,
    messages: &dyn MessageRegistry,
    time_type: &str,
) -> MappedType {
    let nullable = kind::target_nullable(field);

    let (rust_type, storage) = match FieldShape::of(field) {
        FieldShape::Singular(kind) => element_type(&kind, messages, time_type),
        FieldShape::List(kind) => {
            let (element, storage) = element_type(&kind, messages, time_type);
            let storage = match storage {
                StorageKind::Scalar => StorageKind::ScalarList,
                _ => StorageKind::Json,
            };
            (format!("Vec<{}>", element), storage)
        }
        FieldShape::Map { key, value } => {
            let key = kind::rust_scalar_type(&key).unwrap_or("String");
            let (value, _) = element_type(&value, messages, time_type);
            (
                format!("::std::collections::HashMap<{}, {}>", key, value),
                StorageKind::Json,
            )
        }
    };

    MappedType {
        rust_type: if nullable {
            format!("Option<{}>", rust_type)
        } else {
            rust_type
        },
        storage,
        nullable,
    }
}

fn element_type(kind: &Kind, messages: &dyn MessageRegistry, time_type: &str) -> (String, StorageKind) {
    match kind {
        Kind::Message(message) => match wellknown::well_known(message) {
            Some(_) if wellknown::is_timestamp(message) => (time_type.to_string(), StorageKind::Time),
            Some(_) if wellknown::is_any(message) => ("Vec<u8>".to_string(), StorageKind::Blob),
            Some(wkt) => (wkt.rust_type.to_string(), StorageKind::Scalar),
            None => (messages.struct_name(message), StorageKind::Embedded),
        },
        Kind::Bytes => ("Vec<u8>".to_string(), StorageKind::Blob),
        other => (
            kind::rust_scalar_type(other).unwrap_or("String").to_string(),
            StorageKind::Scalar,
        ),
    }
}
