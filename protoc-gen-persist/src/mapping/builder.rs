//! Field mapping builder
//!
//! Decides, for one (API field, storage field) pair, whether and how values
//! are converted in each direction. The stages run in a fixed order and the
//! first one that claims the pair wins:
//!
//! 1. `ignore` option
//! 2. maps, then lists (scalar collections are assigned whole, message
//!    collections need a converter)
//! 3. a user converter named by the `converter` option
//! 4. the type-mapping table
//! 5. same scalar representation
//! 6. nested messages (generated converters, dynamic payloads)
//! 7. numeric casts
//!
//! A pair nobody claims is reported as a [`Diagnostic`] and left to a
//! decorator.

use super::collection::{extract_map_messages, extract_repeated_messages, map_key_kind};
use super::expr::{self, Access, Transform};
use super::kind::{self, FieldShape};
use super::model::{ConversionType, Diagnostic, FieldMapping, FieldRenderStrategy, OneofMember};
use super::registry::{ConverterRegistry, MessageRegistry};
use super::strategy::{self, StrategyInput};
use super::table::TypeMappingTable;
use crate::naming::{SourcePaths, converter_names, field_access, join_path, rust_field_name, type_stem};
use crate::options::FieldOptions;
use crate::wellknown;
use heck::ToUpperCamelCase;
use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};

/// Element adapters for lists and maps of dynamic payloads
const ANY_ELEMENT_TO_BYTES: &str = "::persist_runtime::AnyElementToBytes";
const BYTES_ELEMENT_TO_ANY: &str = "::persist_runtime::BytesElementToAny";

/// Result of running the stages over a pair
enum Outcome {
    Claimed,
    Ignored,
    Unconvertible(String),
}

/// The pair under construction
struct Pair<'f> {
    source: &'f FieldDescriptor,
    target: &'f FieldDescriptor,
    source_shape: FieldShape,
    target_shape: FieldShape,
    options: FieldOptions,
}

/// Builds [`FieldMapping`]s for one backend and package
pub struct FieldMappingBuilder<'a> {
    table: &'a TypeMappingTable,
    messages: &'a dyn MessageRegistry,
    converters: &'a dyn ConverterRegistry,
    paths: &'a SourcePaths,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> FieldMappingBuilder<'a> {
    /// Create a builder over the given lookups
    pub fn new(
        table: &'a TypeMappingTable,
        messages: &'a dyn MessageRegistry,
        converters: &'a dyn ConverterRegistry,
        paths: &'a SourcePaths,
    ) -> Self {
        Self {
            table,
            messages,
            converters,
            paths,
            diagnostics: Vec::new(),
        }
    }

    /// Map an API field onto a storage field
    ///
    /// Returns `None` when the field is ignored or cannot be converted; the
    /// latter is recorded as a diagnostic.
    pub fn build(
        &mut self,
        source: &FieldDescriptor,
        target: &FieldDescriptor,
        options: Option<&FieldOptions>,
    ) -> Option<FieldMapping> {
        let pair = Pair {
            source,
            target,
            source_shape: FieldShape::of(source),
            target_shape: FieldShape::of(target),
            options: options.cloned().unwrap_or_default(),
        };
        let mut mapping = FieldMapping {
            source_field: source.name().to_string(),
            target_field: target.name().to_string(),
            source_package: self
                .paths
                .package_path(source.parent_message().package_name()),
            ..Default::default()
        };

        match self.resolve(&pair, &mut mapping) {
            Outcome::Claimed => {
                finish(&pair, &mut mapping);
                Some(mapping)
            }
            Outcome::Ignored => {
                tracing::debug!(
                    model = %target.parent_message().full_name(),
                    field = %target.name(),
                    "field ignored"
                );
                None
            }
            Outcome::Unconvertible(reason) => {
                self.report(&pair, reason);
                None
            }
        }
    }

    /// Diagnostics recorded so far
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take the recorded diagnostics
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn resolve(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Outcome {
        if pair.options.ignore {
            m.to_target_conversion = ConversionType::Ignore;
            m.from_target_conversion = ConversionType::Ignore;
            return Outcome::Ignored;
        }

        self.detect_oneof(pair, m);
        derive_pointers(pair, m);
        m.source_access = source_access(pair, m);
        m.target_access = Access::field(field_access("src", pair.target.name()), m.target_is_pointer);

        if pair.source_shape.is_map() != pair.target_shape.is_map()
            || pair.source_shape.is_list() != pair.target_shape.is_list()
        {
            return Outcome::Unconvertible("source and target differ in cardinality".to_string());
        }

        if let Some(outcome) = self
            .map_field(pair, m)
            .or_else(|| self.repeated_field(pair, m))
        {
            return outcome;
        }

        set_default_conversion(pair, m);
        self.custom_converter(pair, m)
            .or_else(|| self.type_mapping(pair, m))
            .or_else(|| self.same_scalar(pair, m))
            .or_else(|| self.message_conversion(pair, m))
            .or_else(|| self.numeric_cast(pair, m))
            .unwrap_or_else(|| {
                Outcome::Unconvertible(format!(
                    "no conversion from {} to {}",
                    kind::describe_shape(&pair.source_shape),
                    kind::describe_shape(&pair.target_shape)
                ))
            })
    }

    fn detect_oneof(&self, pair: &Pair<'_>, m: &mut FieldMapping) {
        let Some(oneof) = pair.source.containing_oneof() else {
            return;
        };
        // proto3 `optional` lives in a synthetic oneof; prost emits a plain Option
        if pair.source.field_descriptor_proto().proto3_optional() {
            return;
        }
        m.source_is_oneof = true;
        m.source_oneof = Some(OneofMember {
            field: rust_field_name(oneof.name()),
            enum_path: self.paths.oneof_enum_path(&oneof),
            variant: pair.source.name().to_upper_camel_case(),
            is_message: kind::is_message(pair.source_shape.element()),
            presence_guard: String::new(),
        });
    }

    /// Maps: scalar values are assigned whole, message values need a converter
    fn map_field(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Option<Outcome> {
        let (
            FieldShape::Map {
                key: source_key,
                value: source_value,
            },
            FieldShape::Map {
                value: target_value,
                ..
            },
        ) = (&pair.source_shape, &pair.target_shape)
        else {
            return None;
        };

        m.is_map = true;
        m.map_key_type = kind::scalar_name(source_key).to_string();
        m.source_element_type = self.source_element_type(source_value);
        m.target_element_type = self.target_element_type(target_value);

        if map_key_kind(pair.target).as_ref() != Some(source_key) {
            return Some(Outcome::Unconvertible("map key kinds differ".to_string()));
        }
        if has_converter_option(pair) {
            return None;
        }

        if let (Some(source_message), declared) = extract_map_messages(pair.source, pair.target) {
            if wellknown::is_any(&source_message) {
                return None;
            }
            if let Some(target_message) = self.target_message(&source_message, declared) {
                if self.set_converters(&source_message, &target_message, m) {
                    return Some(Outcome::Claimed);
                }
            }
            tracing::debug!(
                field = %pair.target.full_name(),
                "no converter for map values; continuing"
            );
            return None;
        }

        Some(collection_assignment(m, source_value, target_value, expr::cast_map_values))
    }

    /// Lists: scalar elements are assigned whole, message elements need a converter
    fn repeated_field(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Option<Outcome> {
        let (FieldShape::List(source_element), FieldShape::List(target_element)) =
            (&pair.source_shape, &pair.target_shape)
        else {
            return None;
        };

        m.is_repeated = true;
        m.source_element_type = self.source_element_type(source_element);
        m.target_element_type = self.target_element_type(target_element);
        if has_converter_option(pair) {
            return None;
        }

        if let (Some(source_message), declared) = extract_repeated_messages(pair.source, pair.target) {
            if wellknown::is_any(&source_message) {
                return None;
            }
            if let Some(target_message) = self.target_message(&source_message, declared) {
                if self.set_converters(&source_message, &target_message, m) {
                    return Some(Outcome::Claimed);
                }
            }
            tracing::debug!(
                field = %pair.target.full_name(),
                "no converter for list elements; continuing"
            );
            return None;
        }

        Some(collection_assignment(m, source_element, target_element, expr::cast_list))
    }

    /// `converter` option: user functions `to_target` and `from_target`
    fn custom_converter(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Option<Outcome> {
        let path = pair.options.converter.trim().trim_end_matches("::");
        if path.is_empty() {
            return None;
        }

        if m.is_repeated || m.is_map {
            // Applied per element
            m.to_target_converter = join_path(path, "to_target");
            m.from_target_converter = join_path(path, "from_target");
        } else {
            m.to_target_code = format!("{}::to_target(&{})", path, m.source_access.receiver());
            m.from_target_code = format!("{}::from_target(&{})", path, m.target_access.receiver());
        }
        m.to_target_conversion = ConversionType::ByTransformer;
        m.from_target_conversion = ConversionType::ByTransformer;
        Some(Outcome::Claimed)
    }

    /// Known conversions between singular kinds
    fn type_mapping(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Option<Outcome> {
        let (FieldShape::Singular(source_kind), FieldShape::Singular(target_kind)) =
            (&pair.source_shape, &pair.target_shape)
        else {
            return None;
        };
        let mapping = self
            .table
            .lookup(&kind::source_key(source_kind), &kind::target_key(target_kind))?;

        if let Some(pointer) = mapping.target_pointer {
            m.target_is_pointer = pointer;
            m.target_access.pointer = pointer;
        }
        m.to_target_conversion = mapping.to_conversion;
        m.from_target_conversion = mapping.from_conversion;

        m.to_target_code = expr::lift(
            &m.source_access,
            m.target_is_pointer,
            Transform {
                fallible: mapping.to_conversion.is_fallible(),
                yields_presence: false,
            },
            |input| mapping.apply(input, input).0,
        );
        m.from_target_code = expr::lift(
            &m.target_access,
            m.source_is_pointer,
            Transform {
                fallible: mapping.from_conversion.is_fallible(),
                yields_presence: mapping.from_yields_presence,
            },
            |input| mapping.apply(input, input).1,
        );
        Some(Outcome::Claimed)
    }

    /// Identical Rust representation on both sides
    fn same_scalar(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Option<Outcome> {
        let (FieldShape::Singular(source_kind), FieldShape::Singular(target_kind)) =
            (&pair.source_shape, &pair.target_shape)
        else {
            return None;
        };
        let source_kind = kind::effective_kind(source_kind);
        let target_kind = kind::effective_kind(target_kind);
        if !kind::same_rust_scalar(&source_kind, &target_kind) {
            return None;
        }

        let copy = kind::is_copy(&source_kind);
        m.to_target_code = expr::assign(&m.source_access, m.target_is_pointer, copy);
        m.from_target_code = expr::assign(&m.target_access, m.source_is_pointer, copy);
        m.to_target_conversion = ConversionType::ByAssignment;
        m.from_target_conversion = ConversionType::ByAssignment;
        Some(Outcome::Claimed)
    }

    /// Nested messages: generated converters, or byte blobs for dynamic payloads
    fn message_conversion(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Option<Outcome> {
        let Kind::Message(source_message) = pair.source_shape.element() else {
            return None;
        };
        let target_element = pair.target_shape.element();

        if wellknown::is_any(source_message) && kind::target_key(target_element) == "bytes" {
            return self.any_conversion(pair, m);
        }
        if wellknown::well_known(source_message).is_some() {
            return None;
        }

        let Kind::Message(declared) = target_element else {
            return Some(Outcome::Unconvertible(format!(
                "{} cannot be stored as {}",
                source_message.full_name(),
                kind::describe(target_element)
            )));
        };
        let target_message = self
            .target_message(source_message, Some(declared.clone()))
            .unwrap_or_else(|| declared.clone());
        if pair.source_shape.is_singular() && self.set_converters(source_message, &target_message, m) {
            return Some(Outcome::Claimed);
        }

        Some(Outcome::Unconvertible(missing_converter(source_message, declared)))
    }

    /// The storage message a source message converts to: the model declared
    /// for it, else the type the target field names
    fn target_message(
        &self,
        source: &MessageDescriptor,
        declared: Option<MessageDescriptor>,
    ) -> Option<MessageDescriptor> {
        self.messages.resolve_target(source).or(declared)
    }

    /// Casts between differing numeric kinds
    fn numeric_cast(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Option<Outcome> {
        let (FieldShape::Singular(source_kind), FieldShape::Singular(target_kind)) =
            (&pair.source_shape, &pair.target_shape)
        else {
            return None;
        };
        let source_kind = kind::effective_kind(source_kind);
        let target_kind = kind::effective_kind(target_kind);
        if !(kind::is_numeric(&source_kind) && kind::is_numeric(&target_kind)) {
            return None;
        }
        let source_type = kind::rust_scalar_type(&source_kind)?;
        let target_type = kind::rust_scalar_type(&target_kind)?;

        m.to_target_code = expr::cast(&m.source_access, m.target_is_pointer, target_type);
        m.from_target_code = expr::cast(&m.target_access, m.source_is_pointer, source_type);
        m.to_target_conversion = ConversionType::ByAssignment;
        m.from_target_conversion = ConversionType::ByAssignment;
        Some(Outcome::Claimed)
    }

    /// Dynamic payloads stored as bytes
    ///
    /// Singular payloads are claimed earlier by the type-mapping table;
    /// collections go element-wise through the runtime adapters.
    fn any_conversion(&self, pair: &Pair<'_>, m: &mut FieldMapping) -> Option<Outcome> {
        if pair.source_shape.is_singular() {
            return None;
        }
        m.to_target_converter = ANY_ELEMENT_TO_BYTES.to_string();
        m.from_target_converter = BYTES_ELEMENT_TO_ANY.to_string();
        m.to_target_conversion = ConversionType::ByTransformerWithError;
        m.from_target_conversion = ConversionType::ByTransformerWithError;
        Some(Outcome::Claimed)
    }

    /// Point the mapping at the generated converter pair, if one exists
    fn set_converters(
        &self,
        source: &MessageDescriptor,
        target: &MessageDescriptor,
        m: &mut FieldMapping,
    ) -> bool {
        if !self.converters.has_converter(source.full_name(), target.full_name()) {
            return false;
        }

        let (to, from) = converter_names(source, &type_stem(target));
        let (to, from) = match self.messages.converter_module(target) {
            Some(module) => (join_path(&module, &to), join_path(&module, &from)),
            None => (to, from),
        };
        m.to_target_converter = to;
        m.from_target_converter = from;
        m.to_target_conversion = ConversionType::ByTransformerWithError;
        m.from_target_conversion = ConversionType::ByTransformerWithError;
        true
    }

    fn source_element_type(&self, kind: &Kind) -> String {
        match kind {
            Kind::Message(message) => self.paths.type_path(message),
            other => kind::rust_scalar_type(other).unwrap_or_default().to_string(),
        }
    }

    fn target_element_type(&self, kind: &Kind) -> String {
        match kind {
            Kind::Message(message) => self.messages.struct_name(message),
            other => kind::rust_scalar_type(other).unwrap_or_default().to_string(),
        }
    }

    fn report(&mut self, pair: &Pair<'_>, reason: String) {
        let diagnostic = Diagnostic {
            model: pair.target.parent_message().full_name().to_string(),
            field: pair.target.name().to_string(),
            source_type: kind::describe_shape(&pair.source_shape),
            target_type: kind::describe_shape(&pair.target_shape),
            reason,
        };
        tracing::warn!(
            model = %diagnostic.model,
            field = %diagnostic.field,
            source_type = %diagnostic.source_type,
            target_type = %diagnostic.target_type,
            "field not converted, left to decorator: {}",
            diagnostic.reason
        );
        self.diagnostics.push(diagnostic);
    }
}

/// Nullability of both sides
///
/// Oneof members read as plain values, except messages which read as
/// `Option`. Storage fields follow [`kind::target_nullable`].
fn derive_pointers(pair: &Pair<'_>, m: &mut FieldMapping) {
    m.source_is_pointer = match &pair.source_shape {
        FieldShape::Singular(source_kind) if m.source_is_oneof => kind::is_message(source_kind),
        FieldShape::Singular(_) => pair.source.supports_presence(),
        _ => false,
    };
    m.target_is_pointer = kind::target_nullable(pair.target);
}

/// Read expression for the API side
///
/// Oneof members are read through a `match` on the oneof enum. The result
/// is an `Option` for message members and when the storage side is
/// nullable, so an unset oneof stays unset.
fn source_access(pair: &Pair<'_>, m: &FieldMapping) -> Access {
    let Some(member) = &m.source_oneof else {
        return Access::field(field_access("src", pair.source.name()), m.source_is_pointer);
    };

    let value = if kind::is_copy(pair.source_shape.element()) {
        "*v"
    } else {
        "v.clone()"
    };
    let pattern = format!("Some({}::{}(v))", member.enum_path, member.variant);
    if member.is_message || m.target_is_pointer {
        Access::computed(
            format!(
                "match &src.{} {{ {} => Some({}), _ => None }}",
                member.field, pattern, value
            ),
            true,
        )
    } else {
        Access::computed(
            format!(
                "match &src.{} {{ {} => {}, _ => ::core::default::Default::default() }}",
                member.field, pattern, value
            ),
            false,
        )
    }
}

/// A user converter replaces the built-in collection handling
fn has_converter_option(pair: &Pair<'_>) -> bool {
    !pair.options.converter.trim().is_empty()
}

/// Provisional conversion before the singular stages run
fn set_default_conversion(pair: &Pair<'_>, m: &mut FieldMapping) {
    let conversion = if kind::is_message(pair.source_shape.element())
        || kind::is_message(pair.target_shape.element())
    {
        ConversionType::ByTransformerWithError
    } else {
        ConversionType::ByAssignment
    };
    m.to_target_conversion = conversion;
    m.from_target_conversion = conversion;
}

/// Diagnostic reason for a message value with no generated converter
fn missing_converter(source: &MessageDescriptor, declared: &MessageDescriptor) -> String {
    format!(
        "no converter from {} to {}; declare a model for {} with (persist.model) so it gets one",
        source.full_name(),
        declared.full_name(),
        source.full_name()
    )
}

/// Whole-collection assignment for scalar lists and maps
fn collection_assignment(
    m: &mut FieldMapping,
    source: &Kind,
    target: &Kind,
    cast: fn(&Access, &str) -> String,
) -> Outcome {
    if kind::same_rust_scalar(source, target) {
        m.to_target_code = expr::assign(&m.source_access, false, false);
        m.from_target_code = expr::assign(&m.target_access, false, false);
        m.to_target_conversion = ConversionType::ByAssignment;
        m.from_target_conversion = ConversionType::ByAssignment;
        return Outcome::Claimed;
    }

    match (kind::rust_scalar_type(source), kind::rust_scalar_type(target)) {
        (Some(source_type), Some(target_type)) if kind::is_numeric(source) && kind::is_numeric(target) => {
            m.to_target_code = cast(&m.source_access, target_type);
            m.from_target_code = cast(&m.target_access, source_type);
            m.to_target_conversion = ConversionType::ByAssignment;
            m.from_target_conversion = ConversionType::ByAssignment;
            Outcome::Claimed
        }
        _ => Outcome::Unconvertible(format!(
            "collection elements {} and {} are not assignable",
            kind::describe(source),
            kind::describe(target)
        )),
    }
}

/// Resolve render strategies and the oneof presence guard
fn finish(pair: &Pair<'_>, m: &mut FieldMapping) {
    // Collections going through a converter are rendered element-wise
    let has_message_elements = !pair.source_shape.is_singular()
        && (kind::is_message(pair.source_shape.element()) || !m.to_target_converter.is_empty());

    m.to_target_strategy = strategy::resolve(StrategyInput {
        conversion: m.to_target_conversion,
        is_pointer: m.source_is_pointer,
        is_repeated: m.is_repeated,
        is_map: m.is_map,
        has_message_elements,
    })
    .unwrap_or_default();
    m.from_target_strategy = strategy::resolve(StrategyInput {
        conversion: m.from_target_conversion,
        is_pointer: m.target_is_pointer,
        is_repeated: m.is_repeated,
        is_map: m.is_map,
        has_message_elements,
    })
    .unwrap_or_default();

    if let Some(member) = m.source_oneof.as_mut() {
        // Setting a oneof is a statement, never a struct-literal field
        if m.from_target_strategy.is_inline() {
            m.from_target_strategy = FieldRenderStrategy::SetterSimple;
        }
        member.presence_guard = if m.target_access.pointer {
            format!("{}.is_some()", m.target_access.expr)
        } else {
            kind::non_zero_check(
                &kind::effective_kind(pair.target_shape.element()),
                &m.target_access.expr,
            )
        };
    }
}
