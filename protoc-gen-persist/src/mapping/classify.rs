//! Partition mappings into render groups
//!
//! Each direction is emitted in three passes: struct-literal fields, then
//! setters, then loops. Declaration order is kept within a group.

use super::model::{FieldMapping, FieldRenderStrategy};

/// Mappings grouped by how each direction renders them
#[derive(Debug, Default)]
pub struct ClassifiedFields<'a> {
    /// API to storage, struct literal
    pub to_target_inline: Vec<&'a FieldMapping>,
    /// API to storage, setters
    pub to_target_setter: Vec<&'a FieldMapping>,
    /// API to storage, loops
    pub to_target_loop: Vec<&'a FieldMapping>,
    /// Storage to API, struct literal
    pub from_target_inline: Vec<&'a FieldMapping>,
    /// Storage to API, setters
    pub from_target_setter: Vec<&'a FieldMapping>,
    /// Storage to API, loops
    pub from_target_loop: Vec<&'a FieldMapping>,
}

fn bucket<'b, 'a>(
    strategy: FieldRenderStrategy,
    inline: &'b mut Vec<&'a FieldMapping>,
    setter: &'b mut Vec<&'a FieldMapping>,
    looped: &'b mut Vec<&'a FieldMapping>,
) -> &'b mut Vec<&'a FieldMapping> {
    if strategy.is_inline() {
        inline
    } else if strategy.is_loop() {
        looped
    } else {
        setter
    }
}

/// Partition mappings by render strategy
pub fn classify(mappings: &[FieldMapping]) -> ClassifiedFields<'_> {
    let mut fields = ClassifiedFields::default();

    for mapping in mappings {
        bucket(
            mapping.to_target_strategy,
            &mut fields.to_target_inline,
            &mut fields.to_target_setter,
            &mut fields.to_target_loop,
        )
        .push(mapping);
        bucket(
            mapping.from_target_strategy,
            &mut fields.from_target_inline,
            &mut fields.from_target_setter,
            &mut fields.from_target_loop,
        )
        .push(mapping);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(
        name: &str,
        to: FieldRenderStrategy,
        from: FieldRenderStrategy,
    ) -> FieldMapping {
        FieldMapping {
            source_field: name.to_string(),
            target_field: name.to_string(),
            to_target_strategy: to,
            from_target_strategy: from,
            ..Default::default()
        }
    }

    fn names(group: &[&FieldMapping]) -> Vec<String> {
        group.iter().map(|m| m.target_field.clone()).collect()
    }

    #[test]
    fn test_directions_are_classified_independently() {
        let mappings = vec![
            mapping("id", FieldRenderStrategy::InlineValue, FieldRenderStrategy::InlineValue),
            mapping("email", FieldRenderStrategy::SetterSimple, FieldRenderStrategy::SetterSimple),
            mapping("count", FieldRenderStrategy::InlineValue, FieldRenderStrategy::SetterWithError),
            mapping("tags", FieldRenderStrategy::LoopRepeated, FieldRenderStrategy::LoopRepeated),
            mapping("name", FieldRenderStrategy::InlineValue, FieldRenderStrategy::InlineValue),
        ];
        let fields = classify(&mappings);

        assert_eq!(names(&fields.to_target_inline), vec!["id", "count", "name"]);
        assert_eq!(names(&fields.to_target_setter), vec!["email"]);
        assert_eq!(names(&fields.to_target_loop), vec!["tags"]);
        assert_eq!(names(&fields.from_target_inline), vec!["id", "name"]);
        assert_eq!(names(&fields.from_target_setter), vec!["email", "count"]);
        assert_eq!(names(&fields.from_target_loop), vec!["tags"]);
    }

    #[test]
    fn test_every_mapping_lands_once_per_direction() {
        let mappings = vec![
            mapping("a", FieldRenderStrategy::SetterIgnoreError, FieldRenderStrategy::LoopMap),
            mapping("b", FieldRenderStrategy::SetterTransform, FieldRenderStrategy::InlineValue),
        ];
        let fields = classify(&mappings);
        let to_total = fields.to_target_inline.len()
            + fields.to_target_setter.len()
            + fields.to_target_loop.len();
        let from_total = fields.from_target_inline.len()
            + fields.from_target_setter.len()
            + fields.from_target_loop.len();
        assert_eq!(to_total, 2);
        assert_eq!(from_total, 2);
    }
}
