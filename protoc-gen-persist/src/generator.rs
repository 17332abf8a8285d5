//! Code generation orchestration
//!
//! Builds the descriptor pool, reads the persist options, then for every
//! enabled backend emits one file per package holding the storage structs
//! and the converters between them and the API messages.

use crate::backends::{Backend, BackendKind, get_backend, types};
use crate::codegen::convert::{ConverterSpec, render_converters};
use crate::codegen::format_code;
use crate::config::Config;
use crate::error::GeneratorError;
use crate::ir;
use crate::mapping::{
    FieldMapping, FieldMappingBuilder, PackageScope, TargetModel, TargetRegistry,
    TypeMappingTable,
};
use crate::naming::{SourcePaths, converter_names, package_dir, rust_field_name, type_stem};
use crate::options::{self, OptionsIndex};
use crate::package;
use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::compiler::code_generator_response::File;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use quote::quote;
use std::collections::{BTreeMap, HashSet};

/// `CodeGeneratorRequest` with the descriptors left encoded, so that
/// extension options survive decoding
#[derive(Clone, PartialEq, prost::Message)]
struct RawRequest {
    #[prost(string, repeated, tag = "1")]
    file_to_generate: Vec<String>,
    #[prost(string, optional, tag = "2")]
    parameter: Option<String>,
    #[prost(bytes = "vec", repeated, tag = "15")]
    proto_file: Vec<Vec<u8>>,
}

/// `FileDescriptorSet` over already encoded files
#[derive(Clone, PartialEq, prost::Message)]
struct RawFileSet {
    #[prost(bytes = "vec", repeated, tag = "1")]
    file: Vec<Vec<u8>>,
}

/// Generate storage code from a decoded request
///
/// Options must be present as uninterpreted options here, since
/// `prost-types` drops extension data. They are interpreted against the
/// bundled `persist/options.proto` while the pool is built.
pub fn generate(request: CodeGeneratorRequest) -> Result<CodeGeneratorResponse, GeneratorError> {
    let config = Config::parse(request.parameter.as_deref().unwrap_or(""))?;
    let pool = pool_from_files(request.proto_file)?;
    respond(generate_files(&pool, &request.file_to_generate, &config)?)
}

/// Generate storage code from raw request bytes
///
/// This entry point keeps extension data by letting prost-reflect decode the
/// file descriptors.
pub fn generate_from_bytes(bytes: &[u8]) -> Result<CodeGeneratorResponse, GeneratorError> {
    let request =
        RawRequest::decode(bytes).map_err(|e| GeneratorError::DecodeError(e.to_string()))?;
    let config = Config::parse(request.parameter.as_deref().unwrap_or(""))?;

    let set = RawFileSet {
        file: request.proto_file,
    }
    .encode_to_vec();
    let mut pool = options::descriptor_pool()?;
    pool.decode_file_descriptor_set(set.as_slice())
        .map_err(|e| GeneratorError::DecodeError(e.to_string()))?;

    respond(generate_files(&pool, &request.file_to_generate, &config)?)
}

fn respond(files: Vec<File>) -> Result<CodeGeneratorResponse, GeneratorError> {
    Ok(CodeGeneratorResponse {
        file: files,
        error: None,
        supported_features: Some(1), // FEATURE_PROTO3_OPTIONAL
    })
}

/// Descriptor pool over the request files, on top of the well-known types
/// and `persist/options.proto`
///
/// Files the base pool already holds are skipped, so requests may or may not
/// carry those imports.
fn pool_from_files(files: Vec<FileDescriptorProto>) -> Result<DescriptorPool, GeneratorError> {
    let mut pool = options::descriptor_pool()?;
    pool.add_file_descriptor_set(FileDescriptorSet { file: files })
        .map_err(|e| GeneratorError::DecodeError(e.to_string()))?;
    Ok(pool)
}

/// Generate every output file for the requested proto files
pub fn generate_files(
    pool: &DescriptorPool,
    files_to_generate: &[String],
    config: &Config,
) -> Result<Vec<File>, GeneratorError> {
    let options = OptionsIndex::from_pool(pool);
    let table = TypeMappingTable::builtin();
    let paths = SourcePaths::new(config.source_module.clone());
    let requested: HashSet<&str> = files_to_generate.iter().map(String::as_str).collect();

    let mut files = Vec::new();
    let mut layout = package::Layout::default();

    for &kind in &config.backends {
        let backend = get_backend(kind);
        let registry = TargetRegistry::build(pool, &options, backend.as_ref(), config)?;

        let mut by_package: BTreeMap<&str, Vec<&TargetModel>> = BTreeMap::new();
        for model in registry.models() {
            if requested.contains(model.descriptor.parent_file().name()) {
                by_package.entry(model.package()).or_default().push(model);
            }
        }

        for (package, models) in by_package {
            let context = Context {
                backend: backend.as_ref(),
                scope: registry.scope(package),
                options: &options,
                table: &table,
                paths: &paths,
            };
            files.push(context.generate(package, &models)?);
            layout.add(package, kind);
        }
    }

    files.extend(layout.generate()?);
    Ok(files)
}

/// Everything needed to generate one backend file
struct Context<'a> {
    backend: &'a dyn Backend,
    scope: PackageScope<'a>,
    options: &'a OptionsIndex,
    table: &'a TypeMappingTable,
    paths: &'a SourcePaths,
}

impl Context<'_> {
    /// `{package}/{backend}.rs`
    fn generate(&self, package: &str, models: &[&TargetModel]) -> Result<File, GeneratorError> {
        let kind = self.backend.kind();
        let mut builder = FieldMappingBuilder::new(self.table, &self.scope, &self.scope, self.paths);
        let mut items = Vec::new();

        for model in models {
            items.push(self.backend.generate_model(&self.model_ir(model))?);

            let mappings = self.map_fields(&mut builder, model);
            let (to_name, from_name) = converter_names(&model.source, &type_stem(&model.descriptor));
            items.push(render_converters(&ConverterSpec {
                source_name: model.source.full_name().to_string(),
                target_name: model.full_name().to_string(),
                source_type: self.paths.type_path(&model.source),
                target_type: model.struct_name.clone(),
                to_name,
                from_name,
                mappings: &mappings,
            })?);
        }

        let skipped = builder.diagnostics().len();
        if skipped > 0 {
            tracing::info!(
                package = %package,
                backend = %kind,
                skipped,
                "some fields are left to decorators"
            );
        }

        let doc = format!(
            " {} storage models for the `{}` package.\n\n @generated by protoc-gen-persist. Do not edit.",
            kind, package
        );
        let preamble = self.backend.preamble();
        let code = quote! {
            #![doc = #doc]
            #![allow(unused_imports, clippy::all)]

            #preamble

            #(#items)*
        };

        Ok(File {
            name: Some(format!("{}/{}.rs", package_dir(package), kind.name())),
            content: Some(format_code(code)?),
            ..Default::default()
        })
    }

    /// Storage struct description for a model
    fn model_ir(&self, model: &TargetModel) -> ir::Model {
        let fields = model
            .descriptor
            .fields()
            .map(|field| {
                let mapped =
                    types::map_field_type(&field, &self.scope, self.backend.time_type());
                ir::Field {
                    name: rust_field_name(field.name()),
                    proto_name: field.name().to_string(),
                    rust_type: mapped.rust_type,
                    storage: mapped.storage,
                    nullable: mapped.nullable,
                    options: self.options.field(&field).unwrap_or_default(),
                }
            })
            .collect();

        ir::Model {
            name: type_stem(&model.descriptor),
            table_name: model.options.table.clone(),
            package: model.package().to_string(),
            fields,
        }
    }

    /// Pair every storage field with its API field and map it
    fn map_fields(&self, builder: &mut FieldMappingBuilder<'_>, model: &TargetModel) -> Vec<FieldMapping> {
        let mut mappings = Vec::new();
        for target in model.descriptor.fields() {
            let options = self.options.field(&target);
            let source_name = options
                .as_ref()
                .map(|o| o.source_field.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(target.name());

            let Some(source) = model.source.get_field_by_name(source_name) else {
                tracing::debug!(
                    model = %model.full_name(),
                    field = %target.name(),
                    source = %source_name,
                    "no API field to map from"
                );
                continue;
            };

            if let Some(mapping) = builder.build(&source, &target, options.as_ref()) {
                mappings.push(mapping);
            }
        }
        mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::testutil::*;

    fn request(files: Vec<FileDescriptorProto>, parameter: &str) -> CodeGeneratorRequest {
        CodeGeneratorRequest {
            file_to_generate: files.iter().filter_map(|f| f.name.clone()).collect(),
            parameter: Some(parameter.to_string()),
            proto_file: files,
            ..Default::default()
        }
    }

    fn user_file() -> FileDescriptorProto {
        file(
            "user.proto",
            "example.v1",
            vec![
                message(
                    "User",
                    vec![scalar("id", 1, Type::String), scalar("age", 2, Type::Uint32)],
                ),
                with_model(
                    message(
                        "UserModel",
                        vec![scalar("id", 1, Type::String), scalar("age", 2, Type::String)],
                    ),
                    "table: \"users\"",
                ),
            ],
        )
    }

    fn content<'a>(response: &'a CodeGeneratorResponse, name: &str) -> &'a str {
        response
            .file
            .iter()
            .find(|f| f.name.as_deref() == Some(name))
            .and_then(|f| f.content.as_deref())
            .unwrap_or_else(|| panic!("no file {}", name))
    }

    #[test]
    fn test_one_file_per_package_and_backend() {
        let response = generate(request(vec![user_file()], "backends=seaorm")).unwrap();
        let mut names: Vec<_> = response.file.iter().filter_map(|f| f.name.as_deref()).collect();
        names.sort();
        assert_eq!(names, vec!["example/mod.rs", "example/v1/mod.rs", "example/v1/seaorm.rs"]);
        assert_eq!(response.supported_features, Some(1));
    }

    #[test]
    fn test_backend_file_holds_models_and_converters() {
        let response = generate(request(vec![user_file()], "backends=seaorm")).unwrap();
        let code = content(&response, "example/v1/seaorm.rs");
        assert!(code.contains("@generated"));
        assert!(code.contains("use sea_orm::entity::prelude::*;"));
        assert!(code.contains("pub mod user_model"));
        assert!(code.contains("pub fn user_to_user_model("));
        assert!(code.contains("pub fn user_from_user_model("));
        assert!(code.contains("::persist_runtime::uint32_to_string"));
    }

    #[test]
    fn test_unrequested_files_are_not_generated() {
        let mut req = request(vec![user_file()], "backends=document");
        req.file_to_generate.clear();
        let response = generate(req).unwrap();
        assert!(response.file.is_empty());
    }

    #[test]
    fn test_bad_parameter_is_an_error() {
        let err = generate(request(vec![user_file()], "colour=blue")).unwrap_err();
        assert!(matches!(err, GeneratorError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_bytes_matches_decoded_request() {
        let bundled = options::descriptor_pool().unwrap();
        let mut files: Vec<FileDescriptorProto> = [
            "google/protobuf/descriptor.proto",
            "google/protobuf/any.proto",
            "google/protobuf/timestamp.proto",
            "google/protobuf/wrappers.proto",
            options::OPTIONS_FILE,
        ]
        .iter()
        .map(|name| bundled.get_file_by_name(name).unwrap().file_descriptor_proto().clone())
        .collect();
        files.push(user_file());
        let mut req = request(files, "backends=document");
        req.file_to_generate = vec!["user.proto".to_string()];

        let bytes = req.encode_to_vec();
        let from_bytes = generate_from_bytes(&bytes).unwrap();
        let decoded = generate(req).unwrap();
        assert_eq!(from_bytes.file, decoded.file);
    }

    #[test]
    fn test_request_without_imports_uses_bundled_options() {
        let response = generate(request(vec![user_file()], "")).unwrap();
        assert!(content(&response, "example/v1/seaorm.rs").contains("table_name = \"users\""));
    }

    #[test]
    fn test_interpreted_extension_options_from_bytes() {
        // Descriptors as protoc sends them: options encoded as extension
        // fields, nothing left uninterpreted
        let fx = Fixture::new(vec![user_file()]);
        let user = fx.pool.get_file_by_name("user.proto").unwrap();

        let raw = RawRequest {
            file_to_generate: vec!["user.proto".to_string()],
            parameter: None,
            proto_file: vec![user.encode_to_vec()],
        };
        let response = generate_from_bytes(&raw.encode_to_vec()).unwrap();
        assert!(content(&response, "example/v1/seaorm.rs").contains("table_name = \"users\""));
    }
}
