//! Options parsing for `persist` protobuf extensions
//!
//! This module handles `(persist.model)` on messages and `(persist.field)` on
//! fields, as declared in `proto/persist/options.proto`.
//!
//! Extension values survive only when the descriptors are decoded from raw
//! bytes with prost-reflect, so options are first read from the descriptor
//! pool's extension data. Descriptors built through `prost_types` (tests,
//! or protoc invocations that leave options uninterpreted) fall back to the
//! `uninterpreted_option` aggregates.
//!
//! The options file itself ships with the plugin in [`descriptor_pool`], so
//! annotated files resolve `(persist.model)` and `(persist.field)` even when
//! a request does not carry `persist/options.proto`.

use crate::error::GeneratorError;
use heck::ToLowerCamelCase;
use once_cell::sync::Lazy;
use prost_reflect::{
    DescriptorPool, DynamicMessage, FieldDescriptor, MessageDescriptor, ReflectMessage, Value,
};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, UninterpretedOption,
};
use std::collections::HashMap;

/// Rust types for `proto/persist/options.proto`
#[allow(missing_docs)]
pub mod persist {
    /// Storage backend a model is generated for
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Backend {
        Unspecified = 0,
        Seaorm = 1,
        Document = 2,
    }

    /// Message-level options
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ModelOptions {
        #[prost(string, tag = "1")]
        pub source: String,
        #[prost(enumeration = "Backend", tag = "2")]
        pub backend: i32,
        #[prost(string, tag = "3")]
        pub table: String,
        #[prost(bool, tag = "4")]
        pub skip: bool,
    }

    /// Field-level options
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct FieldOptions {
        #[prost(bool, tag = "1")]
        pub ignore: bool,
        #[prost(string, tag = "2")]
        pub source_field: String,
        #[prost(string, tag = "3")]
        pub converter: String,
        #[prost(bool, tag = "4")]
        pub primary_key: bool,
        #[prost(bool, tag = "5")]
        pub auto_increment: bool,
        #[prost(bool, tag = "6")]
        pub unique: bool,
        #[prost(string, tag = "7")]
        pub column_name: String,
        #[prost(string, tag = "8")]
        pub column_type: String,
        #[prost(string, tag = "9")]
        pub rename: String,
    }
}

pub use persist::{Backend, FieldOptions, ModelOptions};

/// Extension name for model options
pub const MODEL_EXTENSION_NAME: &str = "persist.model";

/// Extension name for field options
pub const FIELD_EXTENSION_NAME: &str = "persist.field";

/// Import path of the options file
pub const OPTIONS_FILE: &str = "persist/options.proto";

/// Lazily initialized descriptor pool with the well-known types and our
/// extension definitions
static DESCRIPTOR_POOL: Lazy<Result<DescriptorPool, String>> = Lazy::new(|| {
    let mut pool = DescriptorPool::global();
    pool.add_file_descriptor_proto(options_file())
        .map_err(|e| format!("failed to build {}: {}", OPTIONS_FILE, e))?;
    Ok(pool)
});

/// Base pool for request files: well-known types plus `persist/options.proto`
pub fn descriptor_pool() -> Result<DescriptorPool, GeneratorError> {
    DESCRIPTOR_POOL
        .as_ref()
        .map(DescriptorPool::clone)
        .map_err(|e| GeneratorError::DecodeError(e.clone()))
}

/// `persist/options.proto` as a descriptor
fn options_file() -> FileDescriptorProto {
    let enum_value = |name: &str, number: i32| EnumValueDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some(OPTIONS_FILE.to_string()),
        package: Some("persist".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        syntax: Some("proto3".to_string()),
        enum_type: vec![EnumDescriptorProto {
            name: Some("Backend".to_string()),
            value: vec![
                enum_value("BACKEND_UNSPECIFIED", 0),
                enum_value("BACKEND_SEAORM", 1),
                enum_value("BACKEND_DOCUMENT", 2),
            ],
            ..Default::default()
        }],
        message_type: vec![
            DescriptorProto {
                name: Some("ModelOptions".to_string()),
                field: vec![
                    option_field("source", 1, Type::String),
                    FieldDescriptorProto {
                        type_name: Some(".persist.Backend".to_string()),
                        ..option_field("backend", 2, Type::Enum)
                    },
                    option_field("table", 3, Type::String),
                    option_field("skip", 4, Type::Bool),
                ],
                ..Default::default()
            },
            DescriptorProto {
                name: Some("FieldOptions".to_string()),
                field: vec![
                    option_field("ignore", 1, Type::Bool),
                    option_field("source_field", 2, Type::String),
                    option_field("converter", 3, Type::String),
                    option_field("primary_key", 4, Type::Bool),
                    option_field("auto_increment", 5, Type::Bool),
                    option_field("unique", 6, Type::Bool),
                    option_field("column_name", 7, Type::String),
                    option_field("column_type", 8, Type::String),
                    option_field("rename", 9, Type::String),
                ],
                ..Default::default()
            },
        ],
        extension: vec![
            FieldDescriptorProto {
                extendee: Some(".google.protobuf.MessageOptions".to_string()),
                type_name: Some(".persist.ModelOptions".to_string()),
                ..option_field("model", 52100, Type::Message)
            },
            FieldDescriptorProto {
                extendee: Some(".google.protobuf.FieldOptions".to_string()),
                type_name: Some(".persist.FieldOptions".to_string()),
                ..option_field("field", 52101, Type::Message)
            },
        ],
        ..Default::default()
    }
}

fn option_field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(name.to_lower_camel_case()),
        ..Default::default()
    }
}

/// Options extracted from a descriptor pool
#[derive(Debug, Clone, Default)]
pub struct OptionsIndex {
    /// Model options keyed by message full name
    models: HashMap<String, ModelOptions>,
    /// Field options keyed by (message full name, field number)
    fields: HashMap<(String, u32), FieldOptions>,
}

impl OptionsIndex {
    /// Read extension data for every message and field in the pool
    pub fn from_pool(pool: &DescriptorPool) -> Self {
        let mut index = OptionsIndex::default();

        let model_ext = pool.get_extension_by_name(MODEL_EXTENSION_NAME);
        let field_ext = pool.get_extension_by_name(FIELD_EXTENSION_NAME);

        if model_ext.is_none() && field_ext.is_none() {
            tracing::debug!("no persist extensions in descriptor pool");
            return index;
        }

        for message in pool.all_messages() {
            if let Some(ext) = &model_ext {
                let options = message.options();
                if options.has_extension(ext) {
                    if let Some(model) = transcode::<ModelOptions>(&options.get_extension(ext)) {
                        index.models.insert(message.full_name().to_string(), model);
                    }
                }
            }

            if let Some(ext) = &field_ext {
                for field in message.fields() {
                    let options = field.options();
                    if options.has_extension(ext) {
                        if let Some(opts) = transcode::<FieldOptions>(&options.get_extension(ext)) {
                            index
                                .fields
                                .insert((message.full_name().to_string(), field.number()), opts);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            models = index.models.len(),
            fields = index.fields.len(),
            "read persist options from extension data"
        );
        index
    }

    /// Model options for a message
    pub fn model(&self, message: &MessageDescriptor) -> Option<ModelOptions> {
        self.models.get(message.full_name()).cloned().or_else(|| {
            message
                .descriptor_proto()
                .options
                .as_ref()
                .and_then(|o| parse_model_options_from_uninterpreted(&o.uninterpreted_option))
        })
    }

    /// Field options for a field
    pub fn field(&self, field: &FieldDescriptor) -> Option<FieldOptions> {
        let key = (field.parent_message().full_name().to_string(), field.number());
        self.fields.get(&key).cloned().or_else(|| {
            field
                .field_descriptor_proto()
                .options
                .as_ref()
                .and_then(|o| parse_field_options_from_uninterpreted(&o.uninterpreted_option))
        })
    }
}

fn transcode<T: prost::Message + Default>(value: &Value) -> Option<T> {
    let message: &DynamicMessage = value.as_message()?;
    match message.transcode_to::<T>() {
        Ok(options) => Some(options),
        Err(err) => {
            tracing::warn!(
                message = %message.descriptor().full_name(),
                error = %err,
                "failed to decode persist options"
            );
            None
        }
    }
}

// =============================================================================
// Uninterpreted option fallback
// =============================================================================

fn parse_model_options_from_uninterpreted(
    uninterpreted: &[UninterpretedOption],
) -> Option<ModelOptions> {
    let mut result = ModelOptions::default();
    let mut found = false;

    for opt in uninterpreted {
        if is_extension_option(opt, MODEL_EXTENSION_NAME) {
            found = true;
            apply_model_option(&mut result, opt);
        }
    }

    found.then_some(result)
}

fn parse_field_options_from_uninterpreted(
    uninterpreted: &[UninterpretedOption],
) -> Option<FieldOptions> {
    let mut result = FieldOptions::default();
    let mut found = false;

    for opt in uninterpreted {
        if is_extension_option(opt, FIELD_EXTENSION_NAME) {
            found = true;
            apply_field_option(&mut result, opt);
        }
    }

    found.then_some(result)
}

/// Whether an uninterpreted option targets the given extension
///
/// Matches both `(persist.model) = {...}` and `(persist.model).table = "x"`.
fn is_extension_option(opt: &UninterpretedOption, extension_name: &str) -> bool {
    opt.name
        .first()
        .is_some_and(|part| part.is_extension && part.name_part.trim_start_matches('.') == extension_name)
}

fn get_subfield_name(opt: &UninterpretedOption) -> Option<&str> {
    opt.name.get(1).map(|part| part.name_part.as_str())
}

fn apply_model_option(result: &mut ModelOptions, opt: &UninterpretedOption) {
    if let Some(aggregate) = opt.aggregate_value.as_ref() {
        for (key, value) in parse_aggregate(aggregate) {
            set_model_option(result, key, &value);
        }
    } else if let Some(field_name) = get_subfield_name(opt) {
        set_model_option(result, field_name, &scalar_value(opt));
    }
}

fn apply_field_option(result: &mut FieldOptions, opt: &UninterpretedOption) {
    if let Some(aggregate) = opt.aggregate_value.as_ref() {
        for (key, value) in parse_aggregate(aggregate) {
            set_field_option(result, key, &value);
        }
    } else if let Some(field_name) = get_subfield_name(opt) {
        set_field_option(result, field_name, &scalar_value(opt));
    }
}

fn set_model_option(result: &mut ModelOptions, key: &str, value: &str) {
    match key {
        "source" => result.source = value.trim_start_matches('.').to_string(),
        "backend" => result.backend = parse_backend(value) as i32,
        "table" => result.table = value.to_string(),
        "skip" => result.skip = value == "true",
        other => tracing::warn!(option = other, "unknown persist.model option"),
    }
}

fn set_field_option(result: &mut FieldOptions, key: &str, value: &str) {
    match key {
        "ignore" => result.ignore = value == "true",
        "source_field" => result.source_field = value.to_string(),
        "converter" => result.converter = value.to_string(),
        "primary_key" => result.primary_key = value == "true",
        "auto_increment" => result.auto_increment = value == "true",
        "unique" => result.unique = value == "true",
        "column_name" => result.column_name = value.to_string(),
        "column_type" => result.column_type = value.to_string(),
        "rename" => result.rename = value.to_string(),
        other => tracing::warn!(option = other, "unknown persist.field option"),
    }
}

fn parse_backend(value: &str) -> Backend {
    match value {
        "BACKEND_SEAORM" | "1" => Backend::Seaorm,
        "BACKEND_DOCUMENT" | "2" => Backend::Document,
        _ => Backend::Unspecified,
    }
}

/// Scalar value of a `(ext).field = value` option, as text
fn scalar_value(opt: &UninterpretedOption) -> String {
    if let Some(ref s) = opt.string_value {
        return String::from_utf8_lossy(s).to_string();
    }
    if let Some(ref s) = opt.identifier_value {
        return s.clone();
    }
    if let Some(v) = opt.positive_int_value {
        return v.to_string();
    }
    if let Some(v) = opt.negative_int_value {
        return v.to_string();
    }
    String::new()
}

/// Split a text-format aggregate into `key: value` pairs
///
/// protoc separates entries with whitespace; hand-written aggregates often
/// use commas or semicolons. Quoted values keep their inner whitespace.
fn parse_aggregate(aggregate: &str) -> Vec<(&str, String)> {
    let mut pairs = Vec::new();
    let mut rest = aggregate.trim();

    while !rest.is_empty() {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',' || c == ';');
        let Some((key, after_key)) = rest.split_once(':') else {
            break;
        };
        let key = key.trim();
        let after_key = after_key.trim_start();

        let (value, remaining) = if let Some(quote) = after_key.chars().next().filter(|c| *c == '"' || *c == '\'') {
            let body = &after_key[1..];
            match body.find(quote) {
                Some(end) => (body[..end].to_string(), &body[end + 1..]),
                None => (body.to_string(), ""),
            }
        } else {
            let end = after_key
                .find(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .unwrap_or(after_key.len());
            (after_key[..end].to_string(), &after_key[end..])
        };

        pairs.push((key, value));
        rest = remaining.trim_start();
    }

    pairs
}
