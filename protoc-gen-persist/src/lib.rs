//! protoc-gen-persist
//!
//! A protoc plugin that derives storage models from annotated protobuf
//! messages and generates converters between them and the API messages.
//! Models are emitted for SeaORM and for a BSON document store.
//!
//! Usage:
//!   protoc --persist_out=backends=seaorm+document:./gen proto/*.proto

#![warn(missing_docs)]

pub mod backends;
pub mod codegen;
pub mod config;
pub mod error;
pub mod generator;
pub mod ir;
pub mod mapping;
pub mod naming;
pub mod options;
pub mod package;
pub mod wellknown;

pub use config::Config;
pub use error::GeneratorError;
pub use generator::{generate, generate_from_bytes};
