//! Type-mapping table
//!
//! Known conversions between a source kind and a target kind, keyed by
//! `(source_key, target_key)` as produced by [`super::kind::source_key`] and
//! [`super::kind::target_key`]. Templates are element transforms with an
//! `{in}` placeholder; the builder lifts them over nullability.

use super::model::ConversionType;
use std::collections::HashMap;

/// A known conversion between two kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    /// Source kind key
    pub source_key: String,
    /// Target kind key
    pub target_key: String,
    /// Template converting a source value to a target value
    pub to_target: String,
    /// Template converting a target value back
    pub from_target: String,
    /// Conversion classification, API to storage
    pub to_conversion: ConversionType,
    /// Conversion classification, storage to API
    pub from_conversion: ConversionType,
    /// Nullability forced on the target field, if any
    pub target_pointer: Option<bool>,
    /// The reverse template returns `Option` (it can yield "absent")
    pub from_yields_presence: bool,
}

impl TypeMapping {
    /// Instantiate both templates
    pub fn apply(&self, to_input: &str, from_input: &str) -> (String, String) {
        (
            self.to_target.replace("{in}", to_input),
            self.from_target.replace("{in}", from_input),
        )
    }
}

/// Registry of known conversions
#[derive(Debug, Clone, Default)]
pub struct TypeMappingTable {
    entries: HashMap<(String, String), TypeMapping>,
}

impl TypeMappingTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The conversions every build knows about
    pub fn builtin() -> Self {
        let mut table = Self::new();

        // Timestamp stored as epoch seconds
        table.register(TypeMapping {
            source_key: "google.protobuf.Timestamp".to_string(),
            target_key: "int64".to_string(),
            to_target: "::persist_runtime::timestamp_to_unix(&{in})".to_string(),
            from_target: "::persist_runtime::unix_to_timestamp(&{in})".to_string(),
            to_conversion: ConversionType::ByTransformer,
            from_conversion: ConversionType::ByTransformer,
            target_pointer: None,
            from_yields_presence: false,
        });

        // Timestamp stored as a native time; the zero time reads back as absent
        table.register(TypeMapping {
            source_key: "google.protobuf.Timestamp".to_string(),
            target_key: "google.protobuf.Timestamp".to_string(),
            to_target: "::persist_runtime::timestamp_to_datetime(&{in})".to_string(),
            from_target: "::persist_runtime::datetime_to_timestamp(&{in})".to_string(),
            to_conversion: ConversionType::ByTransformer,
            from_conversion: ConversionType::ByTransformer,
            target_pointer: Some(false),
            from_yields_presence: true,
        });

        // Dynamic payload stored as an opaque blob; an empty blob reads back as absent
        table.register(TypeMapping {
            source_key: "google.protobuf.Any".to_string(),
            target_key: "bytes".to_string(),
            to_target: "::persist_runtime::any_to_bytes(&{in})".to_string(),
            from_target: "::persist_runtime::bytes_to_any(&{in})".to_string(),
            to_conversion: ConversionType::ByTransformerWithError,
            from_conversion: ConversionType::ByTransformerWithError,
            target_pointer: None,
            from_yields_presence: true,
        });

        // Unsigned integers stored as decimal strings
        table.register(TypeMapping {
            source_key: "uint32".to_string(),
            target_key: "string".to_string(),
            to_target: "::persist_runtime::uint32_to_string(&{in})".to_string(),
            from_target: "::persist_runtime::string_to_uint32(&{in})".to_string(),
            to_conversion: ConversionType::ByTransformer,
            from_conversion: ConversionType::ByTransformerWithError,
            target_pointer: None,
            from_yields_presence: false,
        });

        table
    }

    /// Add or replace a mapping
    pub fn register(&mut self, mapping: TypeMapping) {
        let key = (mapping.source_key.clone(), mapping.target_key.clone());
        self.entries.insert(key, mapping);
    }

    /// Find the mapping for a key pair
    pub fn lookup(&self, source_key: &str, target_key: &str) -> Option<&TypeMapping> {
        self.entries
            .get(&(source_key.to_string(), target_key.to_string()))
    }

    /// Number of registered mappings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_uint32_to_string() {
        let table = TypeMappingTable::builtin();
        let mapping = table.lookup("uint32", "string").unwrap();
        assert_eq!(mapping.to_conversion, ConversionType::ByTransformer);
        assert_eq!(mapping.from_conversion, ConversionType::ByTransformerWithError);

        let (to, from) = mapping.apply("src.count", "src.count");
        assert_eq!(to, "::persist_runtime::uint32_to_string(&src.count)");
        assert_eq!(from, "::persist_runtime::string_to_uint32(&src.count)");
    }

    #[test]
    fn test_builtin_native_time_forces_non_null_target() {
        let table = TypeMappingTable::builtin();
        let mapping = table
            .lookup("google.protobuf.Timestamp", "google.protobuf.Timestamp")
            .unwrap();
        assert_eq!(mapping.target_pointer, Some(false));
        assert!(mapping.from_yields_presence);
    }

    #[test]
    fn test_lookup_is_directional() {
        let table = TypeMappingTable::builtin();
        assert!(table.lookup("string", "uint32").is_none());
        assert!(table.lookup("bytes", "google.protobuf.Any").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut table = TypeMappingTable::new();
        assert!(table.is_empty());
        let mapping = TypeMapping {
            source_key: "int64".to_string(),
            target_key: "string".to_string(),
            to_target: "{in}.to_string()".to_string(),
            from_target: "{in}.parse::<i64>()".to_string(),
            to_conversion: ConversionType::ByTransformer,
            from_conversion: ConversionType::ByTransformerWithIgnorableError,
            target_pointer: None,
            from_yields_presence: false,
        };
        table.register(mapping.clone());
        table.register(TypeMapping {
            to_target: "format!(\"{}\", {in})".to_string(),
            ..mapping
        });
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup("int64", "string").unwrap().to_target,
            "format!(\"{}\", {in})"
        );
    }
}
