//! Collection element inspection
//!
//! Lists and maps are converted element-wise when they hold messages and
//! assigned whole when they hold scalars.

use super::kind::FieldShape;
use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};

/// Whether a list's element is a scalar, and its message type otherwise
///
/// Non-list fields report `(false, None)`.
pub fn check_repeated_element_type(field: &FieldDescriptor) -> (bool, Option<MessageDescriptor>) {
    match FieldShape::of(field) {
        FieldShape::List(Kind::Message(message)) => (false, Some(message)),
        FieldShape::List(_) => (true, None),
        _ => (false, None),
    }
}

/// Whether a map's value is a scalar, and its message type otherwise
///
/// Non-map fields report `(false, None)`.
pub fn check_map_value_type(field: &FieldDescriptor) -> (bool, Option<MessageDescriptor>) {
    match FieldShape::of(field) {
        FieldShape::Map {
            value: Kind::Message(message),
            ..
        } => (false, Some(message)),
        FieldShape::Map { .. } => (true, None),
        _ => (false, None),
    }
}

/// Element message types of two list fields
pub fn extract_repeated_messages(
    source: &FieldDescriptor,
    target: &FieldDescriptor,
) -> (Option<MessageDescriptor>, Option<MessageDescriptor>) {
    (
        check_repeated_element_type(source).1,
        check_repeated_element_type(target).1,
    )
}

/// Value message types of two map fields
pub fn extract_map_messages(
    source: &FieldDescriptor,
    target: &FieldDescriptor,
) -> (Option<MessageDescriptor>, Option<MessageDescriptor>) {
    (check_map_value_type(source).1, check_map_value_type(target).1)
}

/// Key kind of a map field
pub fn map_key_kind(field: &FieldDescriptor) -> Option<Kind> {
    match FieldShape::of(field) {
        FieldShape::Map { key, .. } => Some(key),
        _ => None,
    }
}
