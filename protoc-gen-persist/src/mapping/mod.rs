//! Field mapping between API messages and storage models
//!
//! For every storage field the builder works out how its value is produced
//! from the API message and how it is read back. The results are plain
//! records ([`FieldMapping`]) that the converter renderer turns into code.

pub mod builder;
pub mod classify;
pub mod collection;
pub mod expr;
pub mod kind;
pub mod model;
pub mod registry;
pub mod strategy;
pub mod table;

#[cfg(test)]
pub(crate) mod testutil;

pub use builder::FieldMappingBuilder;
pub use classify::{ClassifiedFields, classify};
pub use model::{ConversionType, Diagnostic, FieldMapping, FieldRenderStrategy, OneofMember};
pub use registry::{ConverterRegistry, MessageRegistry, PackageScope, TargetModel, TargetRegistry};
pub use table::{TypeMapping, TypeMappingTable};
