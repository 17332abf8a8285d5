//! Backend implementations for code generation
//!
//! Each backend turns storage models into structs for one persistence
//! library. Converters are backend-independent and rendered elsewhere.

mod document;
mod seaorm;
pub mod types;

use crate::error::GeneratorError;
use crate::ir::Model;
use crate::options::Backend as BackendOption;
use proc_macro2::TokenStream;

/// Supported backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    /// SeaORM entities (relational)
    SeaOrm,
    /// serde structs for a document store
    Document,
}

impl BackendKind {
    /// Backend name, also the generated module name
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::SeaOrm => "seaorm",
            BackendKind::Document => "document",
        }
    }

    /// Conventional suffix of model names, stripped to infer the source message
    pub fn model_suffix(self) -> &'static str {
        match self {
            BackendKind::SeaOrm => "Model",
            BackendKind::Document => "Document",
        }
    }

    /// Backend named by a `(persist.model)` option, if any
    pub fn from_option(option: BackendOption) -> Option<Self> {
        match option {
            BackendOption::Seaorm => Some(BackendKind::SeaOrm),
            BackendOption::Document => Some(BackendKind::Document),
            BackendOption::Unspecified => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A code generation backend
pub trait Backend: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Name other code uses to refer to a model's struct, relative to the
    /// backend module (e.g. `user_model::Model` or `UserDocument`)
    fn struct_name(&self, stem: &str, is_table: bool) -> String;

    /// Time type used for timestamp fields
    fn time_type(&self) -> &'static str {
        "::chrono::DateTime<::chrono::Utc>"
    }

    /// Imports at the top of the generated backend module
    fn preamble(&self) -> TokenStream {
        TokenStream::new()
    }

    /// Generate the struct (and supporting items) for a model
    fn generate_model(&self, model: &Model) -> Result<TokenStream, GeneratorError>;
}

/// Get the backend implementation for a kind
pub fn get_backend(kind: BackendKind) -> Box<dyn Backend> {
    match kind {
        BackendKind::SeaOrm => Box::new(seaorm::SeaOrmBackend),
        BackendKind::Document => Box::new(document::DocumentBackend),
    }
}

/// Parse a Rust type string into tokens
pub(crate) fn parse_type(rust_type: &str) -> Result<syn::Type, GeneratorError> {
    syn::parse_str(rust_type).map_err(|e| {
        GeneratorError::CodeGenError(format!("invalid Rust type {:?}: {}", rust_type, e))
    })
}

/// Parse a field name (possibly a raw identifier) into an identifier
pub(crate) fn parse_ident(name: &str) -> Result<syn::Ident, GeneratorError> {
    syn::parse_str(name).map_err(|e| {
        GeneratorError::CodeGenError(format!("invalid identifier {:?}: {}", name, e))
    })
}
