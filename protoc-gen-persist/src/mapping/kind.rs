//! Field kind classification
//!
//! Descriptor kinds are wrapped in [`FieldShape`] so the mapping code matches
//! on a closed set: a singular value, a list or a map.

use crate::wellknown;
use prost_reflect::{FieldDescriptor, Kind};
use prost_types::field_descriptor_proto::Label;

/// Shape of a field: singular, list or map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldShape {
    /// A single value
    Singular(Kind),
    /// `repeated T`
    List(Kind),
    /// `map<K, V>`
    Map {
        /// Key kind
        key: Kind,
        /// Value kind
        value: Kind,
    },
}

impl FieldShape {
    /// Classify a field
    pub fn of(field: &FieldDescriptor) -> Self {
        if field.is_map() {
            if let Kind::Message(entry) = field.kind() {
                return FieldShape::Map {
                    key: entry.map_entry_key_field().kind(),
                    value: entry.map_entry_value_field().kind(),
                };
            }
        }
        if field.is_list() {
            FieldShape::List(field.kind())
        } else {
            FieldShape::Singular(field.kind())
        }
    }

    /// Value kind: the field kind, the list element or the map value
    pub fn element(&self) -> &Kind {
        match self {
            FieldShape::Singular(kind) | FieldShape::List(kind) => kind,
            FieldShape::Map { value, .. } => value,
        }
    }

    /// Whether this is a singular field
    pub fn is_singular(&self) -> bool {
        matches!(self, FieldShape::Singular(_))
    }

    /// Whether this is a list
    pub fn is_list(&self) -> bool {
        matches!(self, FieldShape::List(_))
    }

    /// Whether this is a map
    pub fn is_map(&self) -> bool {
        matches!(self, FieldShape::Map { .. })
    }
}

/// Kind with scalar wrappers replaced by the scalar they carry
pub fn effective_kind(kind: &Kind) -> Kind {
    match kind {
        Kind::Message(message) => wellknown::wrapped_kind(message).unwrap_or_else(|| kind.clone()),
        other => other.clone(),
    }
}

/// Whether a kind is a message
pub fn is_message(kind: &Kind) -> bool {
    matches!(kind, Kind::Message(_))
}

/// Whether two kinds are the same non-message kind
pub fn is_same_scalar(a: &Kind, b: &Kind) -> bool {
    a == b && !is_message(a)
}

/// Whether two kinds share a Rust representation (e.g. `int32`, `sint32`
/// and enums are all `i32`)
pub fn same_rust_scalar(a: &Kind, b: &Kind) -> bool {
    is_same_scalar(a, b) || rust_scalar_type(a).is_some_and(|ty| rust_scalar_type(b) == Some(ty))
}

/// Whether a field was declared with explicit presence
///
/// proto3 `optional`, or any singular `optional` field in a proto2 file.
pub fn declared_optional(field: &FieldDescriptor) -> bool {
    let proto = field.field_descriptor_proto();
    if proto.proto3_optional() {
        return true;
    }
    let proto2 = matches!(
        field.parent_file().file_descriptor_proto().syntax.as_deref(),
        None | Some("") | Some("proto2")
    );
    proto2 && proto.label() == Label::Optional
}

/// Whether a storage field is an `Option`
///
/// Well-known types force their own nullability (timestamps never, wrappers
/// always); otherwise only declared-optional singular fields are nullable.
pub fn target_nullable(field: &FieldDescriptor) -> bool {
    match FieldShape::of(field) {
        FieldShape::Singular(Kind::Message(message)) => wellknown::well_known(&message)
            .and_then(|wkt| wkt.target_pointer)
            .unwrap_or_else(|| declared_optional(field)),
        FieldShape::Singular(_) => declared_optional(field),
        _ => false,
    }
}

/// Whether a kind is an integer or floating-point number
pub fn is_numeric(kind: &Kind) -> bool {
    matches!(
        kind,
        Kind::Double
            | Kind::Float
            | Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Fixed32
            | Kind::Fixed64
            | Kind::Sfixed32
            | Kind::Sfixed64
    )
}

/// Whether the Rust representation is `Copy`
pub fn is_copy(kind: &Kind) -> bool {
    is_numeric(kind) || matches!(kind, Kind::Bool | Kind::Enum(_))
}

/// Whether a kind is the timestamp message
pub fn is_timestamp(kind: &Kind) -> bool {
    matches!(kind, Kind::Message(m) if wellknown::is_timestamp(m))
}

/// Whether a kind is the dynamic payload message
pub fn is_any(kind: &Kind) -> bool {
    matches!(kind, Kind::Message(m) if wellknown::is_any(m))
}

/// Proto name of a scalar kind
pub fn scalar_name(kind: &Kind) -> &'static str {
    match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Enum(_) => "enum",
        Kind::Message(_) => "message",
    }
}

/// Type-mapping key for a kind on the source side
///
/// Messages are keyed by full name, scalars by proto kind name.
pub fn source_key(kind: &Kind) -> String {
    match kind {
        Kind::Message(message) => message.full_name().to_string(),
        other => scalar_name(other).to_string(),
    }
}

/// Type-mapping key for a kind on the target side
///
/// Well-known types are keyed by their storage representation.
pub fn target_key(kind: &Kind) -> String {
    match kind {
        Kind::Message(message) => wellknown::well_known(message)
            .map(|wkt| wkt.target_key.to_string())
            .unwrap_or_else(|| message.full_name().to_string()),
        other => scalar_name(other).to_string(),
    }
}

/// Human-readable kind name for diagnostics
pub fn describe(kind: &Kind) -> String {
    match kind {
        Kind::Message(message) => message.full_name().to_string(),
        Kind::Enum(en) => en.full_name().to_string(),
        other => scalar_name(other).to_string(),
    }
}

/// Human-readable shape for diagnostics
pub fn describe_shape(shape: &FieldShape) -> String {
    match shape {
        FieldShape::Singular(kind) => describe(kind),
        FieldShape::List(kind) => format!("repeated {}", describe(kind)),
        FieldShape::Map { key, value } => format!("map<{}, {}>", describe(key), describe(value)),
    }
}

/// Rust type of a scalar kind as prost emits it (enums are `i32`)
pub fn rust_scalar_type(kind: &Kind) -> Option<&'static str> {
    Some(match kind {
        Kind::Double => "f64",
        Kind::Float => "f32",
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 | Kind::Enum(_) => "i32",
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => "i64",
        Kind::Uint32 | Kind::Fixed32 => "u32",
        Kind::Uint64 | Kind::Fixed64 => "u64",
        Kind::Bool => "bool",
        Kind::String => "String",
        Kind::Bytes => "Vec<u8>",
        Kind::Message(_) => return None,
    })
}

/// Presence test for a non-optional value of the given kind
///
/// Used to decide whether a oneof member should be set when converting back
/// from storage: a zero value means "not chosen".
pub fn non_zero_check(kind: &Kind, expr: &str) -> String {
    match kind {
        Kind::String | Kind::Bytes => format!("!{}.is_empty()", expr),
        Kind::Bool => expr.to_string(),
        Kind::Double | Kind::Float => format!("{} != 0.0", expr),
        Kind::Message(_) => format!("{} != ::core::default::Default::default()", expr),
        _ => format!("{} != 0", expr),
    }
}
