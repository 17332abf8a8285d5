//! Target registry
//!
//! Collects the storage models of one backend, resolves each model's API
//! (source) message and answers the two questions the mapping builder asks:
//! which storage struct represents a message, and whether a converter
//! exists for a pair of messages. Every model gets a converter pair, so a
//! converter exists exactly when the target is a model of the source.

use crate::backends::{Backend, BackendKind};
use crate::config::Config;
use crate::error::GeneratorError;
use crate::mapping::kind::FieldShape;
use crate::naming::{join_path, package_modules, type_stem};
use crate::options::{ModelOptions, OptionsIndex};
use crate::wellknown;
use prost_reflect::{DescriptorPool, Kind, MessageDescriptor};
use std::collections::HashMap;

/// Resolves messages to storage structs
pub trait MessageRegistry {
    /// The storage message declared for an API message
    fn resolve_target(&self, source: &MessageDescriptor) -> Option<MessageDescriptor>;

    /// Rust name of the struct for a storage message, as seen from the
    /// package being generated
    ///
    /// An API message with a model resolves to that model's struct.
    fn struct_name(&self, message: &MessageDescriptor) -> String;

    /// Module holding a storage message's converters, when it is not the
    /// module being generated
    fn converter_module(&self, target: &MessageDescriptor) -> Option<String>;
}

/// Answers whether converters exist
pub trait ConverterRegistry {
    /// Whether `{source}To{target}` and its reverse are generated
    fn has_converter(&self, source: &str, target: &str) -> bool;
}

/// A storage model and its API message
#[derive(Debug, Clone)]
pub struct TargetModel {
    /// The storage message
    pub descriptor: MessageDescriptor,
    /// The API message
    pub source: MessageDescriptor,
    /// `(persist.model)` options
    pub options: ModelOptions,
    /// Rust struct name relative to the backend module
    pub struct_name: String,
}

impl TargetModel {
    /// Fully qualified storage message name
    pub fn full_name(&self) -> &str {
        self.descriptor.full_name()
    }

    /// Proto package of the storage message
    pub fn package(&self) -> &str {
        self.descriptor.package_name()
    }

    /// Whether the model has its own table or collection
    pub fn is_table(&self) -> bool {
        !self.options.table.is_empty()
    }
}

/// All models of one backend
#[derive(Debug)]
pub struct TargetRegistry {
    backend: BackendKind,
    target_module: String,
    models: Vec<TargetModel>,
    by_name: HashMap<String, usize>,
    by_source: HashMap<String, usize>,
}

impl TargetRegistry {
    /// Collect and validate the models for `backend`
    ///
    /// Fails when a model's source message cannot be found, or when a model
    /// field references a message that is neither well-known nor a model of
    /// this backend.
    pub fn build(
        pool: &DescriptorPool,
        options: &OptionsIndex,
        backend: &dyn Backend,
        config: &Config,
    ) -> Result<Self, GeneratorError> {
        let kind = backend.kind();
        let mut registry = TargetRegistry {
            backend: kind,
            target_module: config.target_module.clone(),
            models: Vec::new(),
            by_name: HashMap::new(),
            by_source: HashMap::new(),
        };

        for message in pool.all_messages() {
            let Some(model_options) = options.model(&message) else {
                continue;
            };
            if model_options.skip {
                tracing::debug!(model = %message.full_name(), "skipping model");
                continue;
            }
            let model_backend =
                BackendKind::from_option(model_options.backend()).unwrap_or(config.default_backend);
            if model_backend != kind {
                continue;
            }

            let source = resolve_source(pool, &message, &model_options, kind)?;
            let struct_name = backend.struct_name(&type_stem(&message), !model_options.table.is_empty());

            let index = registry.models.len();
            registry.by_name.insert(message.full_name().to_string(), index);
            match registry.by_source.get(source.full_name()) {
                Some(&first) => tracing::debug!(
                    source = %source.full_name(),
                    model = %message.full_name(),
                    first = %registry.models[first].full_name(),
                    "source already has a model; keeping the first for resolution"
                ),
                None => {
                    registry
                        .by_source
                        .insert(source.full_name().to_string(), index);
                }
            }

            registry.models.push(TargetModel {
                descriptor: message,
                source,
                options: model_options,
                struct_name,
            });
        }

        registry.validate(options)?;

        tracing::debug!(
            backend = %kind,
            models = registry.models.len(),
            "built target registry"
        );
        Ok(registry)
    }

    /// Every field referencing a message must reference a well-known type, a
    /// model of this backend, or an API message that has such a model
    fn validate(&self, options: &OptionsIndex) -> Result<(), GeneratorError> {
        for model in &self.models {
            for field in model.descriptor.fields() {
                if options.field(&field).is_some_and(|o| o.ignore) {
                    continue;
                }
                let Kind::Message(referenced) = FieldShape::of(&field).element().clone() else {
                    continue;
                };
                if wellknown::well_known(&referenced).is_some()
                    || self.by_name.contains_key(referenced.full_name())
                    || self.by_source.contains_key(referenced.full_name())
                {
                    continue;
                }
                return Err(GeneratorError::MissingTarget {
                    model: model.full_name().to_string(),
                    field: field.name().to_string(),
                    type_name: referenced.full_name().to_string(),
                    backend: self.backend.to_string(),
                });
            }
        }
        Ok(())
    }

    /// All models in declaration order
    pub fn models(&self) -> &[TargetModel] {
        &self.models
    }

    /// Look up a model by storage message name
    pub fn get(&self, full_name: &str) -> Option<&TargetModel> {
        self.by_name.get(full_name).map(|&i| &self.models[i])
    }

    /// View from one package, for name qualification
    pub fn scope<'a>(&'a self, package: &'a str) -> PackageScope<'a> {
        PackageScope {
            registry: self,
            package,
        }
    }

    /// Module holding the generated code for a package
    pub fn module_path(&self, package: &str) -> String {
        join_path(
            &join_path(&self.target_module, &package_modules(package)),
            self.backend.name(),
        )
    }
}

/// Resolve the API message for a model
fn resolve_source(
    pool: &DescriptorPool,
    message: &MessageDescriptor,
    options: &ModelOptions,
    backend: BackendKind,
) -> Result<MessageDescriptor, GeneratorError> {
    let source_name = if options.source.is_empty() {
        match message.full_name().strip_suffix(backend.model_suffix()) {
            Some(stem) if !stem.is_empty() && !stem.ends_with('.') => stem.to_string(),
            _ => message.full_name().to_string(),
        }
    } else {
        options.source.trim_start_matches('.').to_string()
    };

    match pool.get_message_by_name(&source_name) {
        Some(source) if source.full_name() != message.full_name() => Ok(source),
        _ => Err(GeneratorError::MissingSource {
            model: message.full_name().to_string(),
            source_name,
        }),
    }
}

/// A registry viewed from the package being generated
#[derive(Debug, Clone, Copy)]
pub struct PackageScope<'a> {
    registry: &'a TargetRegistry,
    package: &'a str,
}

impl PackageScope<'_> {
    fn qualified(&self, model: &TargetModel) -> String {
        match self.converter_module(&model.descriptor) {
            Some(module) => join_path(&module, &model.struct_name),
            None => model.struct_name.clone(),
        }
    }
}

impl MessageRegistry for PackageScope<'_> {
    fn resolve_target(&self, source: &MessageDescriptor) -> Option<MessageDescriptor> {
        self.registry
            .by_source
            .get(source.full_name())
            .map(|&i| self.registry.models[i].descriptor.clone())
    }

    fn struct_name(&self, message: &MessageDescriptor) -> String {
        if let Some(model) = self.registry.get(message.full_name()) {
            return self.qualified(model);
        }
        if let Some(wkt) = wellknown::well_known(message) {
            return wkt.rust_type.to_string();
        }
        // An API message stands for the model declared for it
        match self.registry.by_source.get(message.full_name()) {
            Some(&i) => self.qualified(&self.registry.models[i]),
            None => type_stem(message),
        }
    }

    fn converter_module(&self, target: &MessageDescriptor) -> Option<String> {
        let package = target.package_name();
        (package != self.package).then(|| self.registry.module_path(package))
    }
}

impl ConverterRegistry for PackageScope<'_> {
    fn has_converter(&self, source: &str, target: &str) -> bool {
        self.registry
            .get(target)
            .is_some_and(|model| model.source.full_name() == source)
    }
}
