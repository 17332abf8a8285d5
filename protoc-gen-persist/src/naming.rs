//! Rust names and paths for protobuf elements
//!
//! Mirrors the names prost gives generated API types so converters can refer
//! to them: packages become nested modules, nested messages live in a module
//! named after their parent, oneofs become enums in the message module.

use heck::{ToSnakeCase, ToUpperCamelCase};
use prost_reflect::{MessageDescriptor, OneofDescriptor};

/// Rust keywords that need a raw identifier when used as field names
const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv",
    "try", "typeof", "unsized", "virtual", "yield",
];

/// Whether a name is reserved in Rust
pub fn is_rust_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Struct field name for a proto field name
pub fn rust_field_name(proto_name: &str) -> String {
    let snake = proto_name.to_snake_case();
    if is_rust_keyword(&snake) {
        format!("r#{}", snake)
    } else {
        snake
    }
}

/// `base.field` with the field name escaped
pub fn field_access(base: &str, proto_name: &str) -> String {
    format!("{}.{}", base, rust_field_name(proto_name))
}

/// Message names from the package root down, e.g. `["User", "Address"]`
fn message_chain(message: &MessageDescriptor) -> Vec<String> {
    let package = message.package_name();
    let relative = message
        .full_name()
        .strip_prefix(package)
        .unwrap_or(message.full_name())
        .trim_start_matches('.');
    relative.split('.').map(str::to_string).collect()
}

/// Flattened type name used for model structs and converter names
///
/// `example.v1.User.Address` becomes `UserAddress`.
pub fn type_stem(message: &MessageDescriptor) -> String {
    message_chain(message)
        .iter()
        .map(|part| part.to_upper_camel_case())
        .collect()
}

/// Module path segments for a package, e.g. `example.v1` -> `example::v1`
pub fn package_modules(package: &str) -> String {
    package
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_snake_case())
        .collect::<Vec<_>>()
        .join("::")
}

/// Output directory for a package, e.g. `example.v1` -> `example/v1`
pub fn package_dir(package: &str) -> String {
    package
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_snake_case())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a module prefix and a relative path
pub fn join_path(prefix: &str, rest: &str) -> String {
    match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{}::{}", prefix, rest),
    }
}

/// Function name for a converter reference
///
/// References are stored as `{Source}To{Target}` (optionally module
/// qualified); the emitted function is its snake_case form.
pub fn converter_fn_path(reference: &str) -> String {
    match reference.rsplit_once("::") {
        Some((module, name)) => format!("{}::{}", module, name.to_snake_case()),
        None => reference.to_snake_case(),
    }
}

/// Converter references for a source/target pair
///
/// Returns `({Source}To{Target}, {Source}From{Target})`.
pub fn converter_names(source: &MessageDescriptor, target_stem: &str) -> (String, String) {
    let source = type_stem(source);
    (
        format!("{}To{}", source, target_stem),
        format!("{}From{}", source, target_stem),
    )
}

/// Paths to the prost-generated API types
#[derive(Debug, Clone)]
pub struct SourcePaths {
    source_module: String,
}

impl SourcePaths {
    /// Paths rooted at `source_module` (e.g. `crate` or `crate::pb`)
    pub fn new(source_module: impl Into<String>) -> Self {
        Self {
            source_module: source_module.into(),
        }
    }

    /// Module holding a package's types
    pub fn package_path(&self, package: &str) -> String {
        join_path(&self.source_module, &package_modules(package))
    }

    /// Module holding a message's nested types (its oneof enums)
    pub fn message_module(&self, message: &MessageDescriptor) -> String {
        let modules = message_chain(message)
            .iter()
            .map(|part| part.to_snake_case())
            .collect::<Vec<_>>()
            .join("::");
        join_path(&self.package_path(message.package_name()), &modules)
    }

    /// Full path of a message type
    pub fn type_path(&self, message: &MessageDescriptor) -> String {
        let chain = message_chain(message);
        let (name, parents) = chain.split_last().map_or(("", &[][..]), |(n, p)| (n.as_str(), p));
        let mut path = self.package_path(message.package_name());
        for parent in parents {
            path = join_path(&path, &parent.to_snake_case());
        }
        join_path(&path, &name.to_upper_camel_case())
    }

    /// Full path of the enum prost emits for a oneof
    pub fn oneof_enum_path(&self, oneof: &OneofDescriptor) -> String {
        join_path(
            &self.message_module(&oneof.parent_message()),
            &oneof.name().to_upper_camel_case(),
        )
    }
}
