//! Well-known protobuf types with a native storage representation
//!
//! Timestamps are stored as native times, dynamic payloads (`Any`) as
//! opaque bytes and wrappers as nullable scalars. Everything else that is a
//! message must be a declared storage model.

use once_cell::sync::Lazy;
use prost_reflect::{Kind, MessageDescriptor};
use std::collections::HashMap;

/// Fully qualified name of the timestamp type
pub const TIMESTAMP: &str = "google.protobuf.Timestamp";

/// Fully qualified name of the dynamic payload type
pub const ANY: &str = "google.protobuf.Any";

/// Storage treatment of a well-known type
#[derive(Debug, Clone)]
pub struct WellKnownType {
    /// Rust type used in storage structs
    pub rust_type: &'static str,
    /// Key used when this type appears on the target side of a type mapping
    pub target_key: &'static str,
    /// Nullability forced on target fields of this type
    pub target_pointer: Option<bool>,
    /// Whether this is a scalar wrapper (`google.protobuf.StringValue` etc.)
    pub wrapper: bool,
}

static WELL_KNOWN: Lazy<HashMap<&'static str, WellKnownType>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        TIMESTAMP,
        WellKnownType {
            rust_type: "::chrono::DateTime<::chrono::Utc>",
            target_key: TIMESTAMP,
            target_pointer: Some(false),
            wrapper: false,
        },
    );
    table.insert(
        ANY,
        WellKnownType {
            rust_type: "Vec<u8>",
            target_key: "bytes",
            target_pointer: None,
            wrapper: false,
        },
    );

    let wrappers = [
        ("google.protobuf.DoubleValue", "f64", "double"),
        ("google.protobuf.FloatValue", "f32", "float"),
        ("google.protobuf.Int64Value", "i64", "int64"),
        ("google.protobuf.UInt64Value", "u64", "uint64"),
        ("google.protobuf.Int32Value", "i32", "int32"),
        ("google.protobuf.UInt32Value", "u32", "uint32"),
        ("google.protobuf.BoolValue", "bool", "bool"),
        ("google.protobuf.StringValue", "String", "string"),
        ("google.protobuf.BytesValue", "Vec<u8>", "bytes"),
    ];
    for (name, rust_type, key) in wrappers {
        table.insert(
            name,
            WellKnownType {
                rust_type,
                target_key: key,
                target_pointer: Some(true),
                wrapper: true,
            },
        );
    }
    table
});

/// Look up a message by full name
pub fn well_known(message: &MessageDescriptor) -> Option<&'static WellKnownType> {
    WELL_KNOWN.get(message.full_name())
}

/// Whether a message is the dynamic payload type
pub fn is_any(message: &MessageDescriptor) -> bool {
    message.full_name() == ANY
}

/// Whether a message is the timestamp type
pub fn is_timestamp(message: &MessageDescriptor) -> bool {
    message.full_name() == TIMESTAMP
}

/// Scalar kind carried by a wrapper message
pub fn wrapped_kind(message: &MessageDescriptor) -> Option<Kind> {
    if !well_known(message)?.wrapper {
        return None;
    }
    message.get_field_by_name("value").map(|f| f.kind())
}
