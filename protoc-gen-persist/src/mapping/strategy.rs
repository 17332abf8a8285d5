//! Render strategy resolution
//!
//! Picks, per direction, how a field is emitted: inline in the struct
//! literal, as a setter after it, or as a loop. The inputs are the resolved
//! conversion and the shape of the direction's input field.

use super::model::{ConversionType, FieldRenderStrategy};

/// Facts about one direction of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyInput {
    /// Resolved conversion for this direction
    pub conversion: ConversionType,
    /// The direction's input field is an `Option`
    pub is_pointer: bool,
    /// The field is a list
    pub is_repeated: bool,
    /// The field is a map
    pub is_map: bool,
    /// List elements or map values are messages
    pub has_message_elements: bool,
}

/// Resolve the render strategy for one direction
///
/// Returns `None` for ignored conversions, which are never rendered.
pub fn resolve(input: StrategyInput) -> Option<FieldRenderStrategy> {
    if input.conversion == ConversionType::Ignore {
        return None;
    }

    if input.has_message_elements {
        if input.is_map {
            return Some(FieldRenderStrategy::LoopMap);
        }
        if input.is_repeated {
            return Some(FieldRenderStrategy::LoopRepeated);
        }
    }

    Some(match input.conversion {
        ConversionType::Ignore => return None,
        ConversionType::ByTransformerWithError => FieldRenderStrategy::SetterWithError,
        ConversionType::ByTransformerWithIgnorableError => FieldRenderStrategy::SetterIgnoreError,
        ConversionType::ByTransformer if input.is_pointer => FieldRenderStrategy::SetterTransform,
        ConversionType::ByTransformer => FieldRenderStrategy::InlineValue,
        ConversionType::ByAssignment if input.is_pointer => FieldRenderStrategy::SetterSimple,
        ConversionType::ByAssignment => FieldRenderStrategy::InlineValue,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(conversion: ConversionType) -> StrategyInput {
        StrategyInput {
            conversion,
            is_pointer: false,
            is_repeated: false,
            is_map: false,
            has_message_elements: false,
        }
    }

    #[test]
    fn test_ignore_is_never_rendered() {
        assert_eq!(resolve(input(ConversionType::Ignore)), None);
    }

    #[test]
    fn test_assignment() {
        assert_eq!(
            resolve(input(ConversionType::ByAssignment)),
            Some(FieldRenderStrategy::InlineValue)
        );
        assert_eq!(
            resolve(StrategyInput {
                is_pointer: true,
                ..input(ConversionType::ByAssignment)
            }),
            Some(FieldRenderStrategy::SetterSimple)
        );
    }

    #[test]
    fn test_transformers() {
        assert_eq!(
            resolve(input(ConversionType::ByTransformer)),
            Some(FieldRenderStrategy::InlineValue)
        );
        assert_eq!(
            resolve(StrategyInput {
                is_pointer: true,
                ..input(ConversionType::ByTransformer)
            }),
            Some(FieldRenderStrategy::SetterTransform)
        );
        assert_eq!(
            resolve(input(ConversionType::ByTransformerWithError)),
            Some(FieldRenderStrategy::SetterWithError)
        );
        assert_eq!(
            resolve(input(ConversionType::ByTransformerWithIgnorableError)),
            Some(FieldRenderStrategy::SetterIgnoreError)
        );
    }

    #[test]
    fn test_message_collections_loop_regardless_of_conversion() {
        for conversion in [
            ConversionType::ByAssignment,
            ConversionType::ByTransformer,
            ConversionType::ByTransformerWithError,
        ] {
            let list = StrategyInput {
                is_repeated: true,
                has_message_elements: true,
                ..input(conversion)
            };
            assert_eq!(resolve(list), Some(FieldRenderStrategy::LoopRepeated));

            let map = StrategyInput {
                is_map: true,
                has_message_elements: true,
                ..input(conversion)
            };
            assert_eq!(resolve(map), Some(FieldRenderStrategy::LoopMap));
        }
    }

    #[test]
    fn test_scalar_collections_are_assigned_whole() {
        let list = StrategyInput {
            is_repeated: true,
            ..input(ConversionType::ByAssignment)
        };
        assert_eq!(resolve(list), Some(FieldRenderStrategy::InlineValue));
    }
}
