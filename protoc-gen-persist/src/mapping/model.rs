//! Field mapping records
//!
//! A [`FieldMapping`] is the complete, direction-aware description of how one
//! storage field is filled from its API counterpart and back. The builder
//! produces it, the strategy resolver annotates it and the converter renderer
//! consumes it without looking at descriptors again.

use super::expr::Access;
use std::fmt;

/// How a value crosses from one side to the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionType {
    /// Never converted; left to a decorator
    Ignore,
    /// Plain assignment of compatible values
    #[default]
    ByAssignment,
    /// Infallible transformation
    ByTransformer,
    /// Transformation that may fail; the error is propagated
    ByTransformerWithError,
    /// Transformation that may fail; on failure the field keeps its default
    ByTransformerWithIgnorableError,
}

impl ConversionType {
    /// Whether the conversion returns a `Result`
    pub fn is_fallible(self) -> bool {
        matches!(
            self,
            ConversionType::ByTransformerWithError | ConversionType::ByTransformerWithIgnorableError
        )
    }
}

/// How the renderer emits a field in one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldRenderStrategy {
    /// Inside the struct literal
    #[default]
    InlineValue,
    /// `out.f = value;`
    SetterSimple,
    /// `out.f = transform(value);`
    SetterTransform,
    /// `out.f = transform(value)?;`
    SetterWithError,
    /// `if let Ok(v) = transform(value) { out.f = v; }`
    SetterIgnoreError,
    /// Element-wise loop over a list
    LoopRepeated,
    /// Entry-wise loop over a map
    LoopMap,
}

impl FieldRenderStrategy {
    /// Emitted inside the struct literal
    pub fn is_inline(self) -> bool {
        self == FieldRenderStrategy::InlineValue
    }

    /// Emitted as a loop after the setters
    pub fn is_loop(self) -> bool {
        matches!(
            self,
            FieldRenderStrategy::LoopRepeated | FieldRenderStrategy::LoopMap
        )
    }
}

/// A source field that is a member of a real oneof
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneofMember {
    /// Rust name of the oneof field on the API struct
    pub field: String,
    /// Path of the enum prost emits for the oneof
    pub enum_path: String,
    /// Variant carrying this member
    pub variant: String,
    /// Whether the member is a message (its value is boxed in `Option` on read)
    pub is_message: bool,
    /// Condition on the storage side that selects this member when
    /// converting back
    pub presence_guard: String,
}

/// The mapping between one API field and one storage field
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    /// API field name
    pub source_field: String,
    /// Storage field name
    pub target_field: String,

    /// Expression producing the storage value, when expressible inline
    pub to_target_code: String,
    /// Expression producing the API value, when expressible inline
    pub from_target_code: String,
    /// API to storage conversion
    pub to_target_conversion: ConversionType,
    /// Storage to API conversion
    pub from_target_conversion: ConversionType,
    /// API to storage render strategy
    pub to_target_strategy: FieldRenderStrategy,
    /// Storage to API render strategy
    pub from_target_strategy: FieldRenderStrategy,
    /// Converter function reference, when conversion goes through one
    pub to_target_converter: String,
    /// Reverse converter function reference
    pub from_target_converter: String,

    /// The API field is an `Option`
    pub source_is_pointer: bool,
    /// The storage field is an `Option`
    pub target_is_pointer: bool,
    /// The API field lives in a real oneof
    pub source_is_oneof: bool,
    /// Oneof details for the API field
    pub source_oneof: Option<OneofMember>,

    /// Both sides are lists
    pub is_repeated: bool,
    /// Both sides are maps
    pub is_map: bool,
    /// Proto name of the map key kind
    pub map_key_type: String,
    /// Storage element type (list element or map value)
    pub target_element_type: String,
    /// API element type (list element or map value)
    pub source_element_type: String,
    /// Rust path of the API package
    pub source_package: String,

    /// Read expression for the API side
    pub source_access: Access,
    /// Read expression for the storage side
    pub target_access: Access,
}

impl FieldMapping {
    /// Check the shape invariants the renderer relies on
    pub fn validate(&self) -> Result<(), String> {
        if self.is_repeated && self.is_map {
            return Err("field cannot be both repeated and a map".to_string());
        }
        if self.source_is_oneof != self.source_oneof.is_some() {
            return Err("oneof flag and oneof details disagree".to_string());
        }
        for (direction, code, converter, conversion) in [
            (
                "to storage",
                &self.to_target_code,
                &self.to_target_converter,
                self.to_target_conversion,
            ),
            (
                "from storage",
                &self.from_target_code,
                &self.from_target_converter,
                self.from_target_conversion,
            ),
        ] {
            if conversion == ConversionType::Ignore {
                return Err(format!("{} conversion is Ignore", direction));
            }
            if code.is_empty() == converter.is_empty() {
                return Err(format!(
                    "{} needs exactly one of an expression or a converter",
                    direction
                ));
            }
        }
        Ok(())
    }
}

/// A field that could not be converted and was left to a decorator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Storage model full name
    pub model: String,
    /// Storage field name
    pub field: String,
    /// API field type
    pub source_type: String,
    /// Storage field type
    pub target_type: String,
    /// Why no conversion was generated
    pub reason: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}: {} -> {}: {}",
            self.model, self.field, self.source_type, self.target_type, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned() -> FieldMapping {
        FieldMapping {
            source_field: "name".to_string(),
            target_field: "name".to_string(),
            to_target_code: "src.name.clone()".to_string(),
            from_target_code: "src.name.clone()".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_mapping() {
        assert_eq!(assigned().validate(), Ok(()));
    }

    #[test]
    fn test_code_and_converter_are_exclusive() {
        let mut mapping = assigned();
        mapping.to_target_converter = "UserToUserModel".to_string();
        assert!(mapping.validate().is_err());

        let mut mapping = assigned();
        mapping.from_target_code.clear();
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn test_repeated_and_map_are_exclusive() {
        let mut mapping = assigned();
        mapping.is_repeated = true;
        mapping.is_map = true;
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn test_fallible_conversions() {
        assert!(!ConversionType::ByAssignment.is_fallible());
        assert!(!ConversionType::ByTransformer.is_fallible());
        assert!(ConversionType::ByTransformerWithError.is_fallible());
        assert!(ConversionType::ByTransformerWithIgnorableError.is_fallible());
    }
}
