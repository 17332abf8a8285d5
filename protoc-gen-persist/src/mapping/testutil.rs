//! Descriptor builders for unit tests

pub use prost_types::field_descriptor_proto::{Label, Type};

use heck::ToUpperCamelCase;
use prost_reflect::{DescriptorPool, FieldDescriptor, MessageDescriptor};
use prost_types::uninterpreted_option::NamePart;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FieldOptions, FileDescriptorProto, FileDescriptorSet, MessageOptions, OneofDescriptorProto,
    UninterpretedOption,
};

const MAP_MARKER: &str = "#map";

/// A proto3 file importing the well-known types used in tests and the
/// persist options
pub fn file(name: &str, package: &str, messages: Vec<DescriptorProto>) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        dependency: vec![
            "google/protobuf/any.proto".to_string(),
            "google/protobuf/timestamp.proto".to_string(),
            "google/protobuf/wrappers.proto".to_string(),
            crate::options::OPTIONS_FILE.to_string(),
        ],
        message_type: messages
            .into_iter()
            .map(|m| finish_message(package, m))
            .collect(),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// Add imports to a file
pub fn with_deps(mut file: FileDescriptorProto, deps: &[&str]) -> FileDescriptorProto {
    file.dependency.extend(deps.iter().map(|d| d.to_string()));
    file
}

/// Add top-level enums to a file
pub fn with_enums(mut file: FileDescriptorProto, enums: Vec<EnumDescriptorProto>) -> FileDescriptorProto {
    file.enum_type.extend(enums);
    file
}

/// An enum with values numbered from zero
pub fn enum_type(name: &str, values: &[&str]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_string()),
        value: values
            .iter()
            .enumerate()
            .map(|(i, v)| EnumValueDescriptorProto {
                name: Some(v.to_string()),
                number: Some(i as i32),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// Resolve map placeholders and synthetic oneofs
fn finish_message(package: &str, mut message: DescriptorProto) -> DescriptorProto {
    let message_name = message.name().to_string();

    for field in &mut message.field {
        if field.type_name() != MAP_MARKER {
            continue;
        }
        let entry_name = format!("{}Entry", field.name().to_upper_camel_case());
        let key = field.extendee.take().unwrap_or_default();
        let value_type_name = field.default_value.take();
        let (key_type, value_type) = key.split_once(':').unwrap_or(("string", "string"));

        let mut value = scalar("value", 2, parse_type(value_type));
        value.type_name = value_type_name;
        message.nested_type.push(DescriptorProto {
            name: Some(entry_name.clone()),
            field: vec![scalar("key", 1, parse_type(key_type)), value],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        });
        field.type_name = Some(format!(".{}.{}.{}", package, message_name, entry_name));
    }

    let mut synthetic = Vec::new();
    for field in &mut message.field {
        if field.proto3_optional == Some(true) && field.oneof_index.is_none() {
            synthetic.push(format!("_{}", field.name()));
            field.oneof_index = Some((message.oneof_decl.len() + synthetic.len() - 1) as i32);
        }
    }
    message.oneof_decl.extend(synthetic.into_iter().map(|name| OneofDescriptorProto {
        name: Some(name),
        ..Default::default()
    }));

    message
}

fn type_name(ty: Type) -> &'static str {
    match ty {
        Type::Double => "double",
        Type::Float => "float",
        Type::Int64 => "int64",
        Type::Uint64 => "uint64",
        Type::Int32 => "int32",
        Type::Uint32 => "uint32",
        Type::Bool => "bool",
        Type::String => "string",
        Type::Bytes => "bytes",
        Type::Message => "message",
        Type::Enum => "enum",
        _ => "string",
    }
}

fn parse_type(name: &str) -> Type {
    match name {
        "double" => Type::Double,
        "float" => Type::Float,
        "int64" => Type::Int64,
        "uint64" => Type::Uint64,
        "int32" => Type::Int32,
        "uint32" => Type::Uint32,
        "bool" => Type::Bool,
        "bytes" => Type::Bytes,
        "message" => Type::Message,
        "enum" => Type::Enum,
        _ => Type::String,
    }
}

/// A message with the given fields
pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

/// A message declaring real oneofs, referenced by index from [`in_oneof`]
pub fn message_with_oneofs(
    name: &str,
    oneofs: &[&str],
    fields: Vec<FieldDescriptorProto>,
) -> DescriptorProto {
    DescriptorProto {
        oneof_decl: oneofs
            .iter()
            .map(|o| OneofDescriptorProto {
                name: Some(o.to_string()),
                ..Default::default()
            })
            .collect(),
        ..message(name, fields)
    }
}

/// A singular scalar field
pub fn scalar(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

/// A singular message field
pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

/// A singular enum field
pub fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Enum)
    }
}

/// Make a field repeated
pub fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

/// Make a field proto3 `optional`
pub fn optional(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.proto3_optional = Some(true);
    field
}

/// Place a field in a declared oneof
pub fn in_oneof(mut field: FieldDescriptorProto, index: i32) -> FieldDescriptorProto {
    field.oneof_index = Some(index);
    field
}

/// A map field; the entry message is generated by [`file`]
pub fn map_field(
    name: &str,
    number: i32,
    key: Type,
    value: Type,
    value_type_name: Option<&str>,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(MAP_MARKER.to_string()),
        // Scratch slots, consumed by `finish_message`
        extendee: Some(format!("{}:{}", type_name(key), type_name(value))),
        default_value: value_type_name.map(str::to_string),
        ..repeated(scalar(name, number, Type::Message))
    }
}

fn aggregate_option(extension: &str, aggregate: &str) -> UninterpretedOption {
    UninterpretedOption {
        name: vec![NamePart {
            name_part: extension.to_string(),
            is_extension: true,
        }],
        aggregate_value: Some(aggregate.to_string()),
        ..Default::default()
    }
}

/// Attach `(persist.model) = { ... }`
pub fn with_model(mut message: DescriptorProto, aggregate: &str) -> DescriptorProto {
    message
        .options
        .get_or_insert_with(Default::default)
        .uninterpreted_option
        .push(aggregate_option("persist.model", aggregate));
    message
}

/// Attach `[(persist.field) = { ... }]`
pub fn with_field(mut field: FieldDescriptorProto, aggregate: &str) -> FieldDescriptorProto {
    field
        .options
        .get_or_insert_with(FieldOptions::default)
        .uninterpreted_option
        .push(aggregate_option("persist.field", aggregate));
    field
}

/// A descriptor pool with the well-known types, the persist options and the
/// given files
pub struct Fixture {
    /// The pool
    pub pool: DescriptorPool,
}

impl Fixture {
    /// Build a pool, panicking on invalid descriptors
    pub fn new(files: Vec<FileDescriptorProto>) -> Self {
        let mut pool = crate::options::descriptor_pool().expect("bundled options");
        pool.add_file_descriptor_set(FileDescriptorSet { file: files })
            .expect("valid test descriptors");
        Self { pool }
    }

    /// Look up a message
    pub fn message(&self, name: &str) -> MessageDescriptor {
        self.pool
            .get_message_by_name(name)
            .unwrap_or_else(|| panic!("message {} not found", name))
    }

    /// Look up a field
    pub fn field(&self, message: &str, field: &str) -> FieldDescriptor {
        self.message(message)
            .get_field_by_name(field)
            .unwrap_or_else(|| panic!("field {}.{} not found", message, field))
    }
}
