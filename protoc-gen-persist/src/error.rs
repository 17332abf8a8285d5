//! Error types for code generation
//!
//! Unconvertible fields are not errors: they are reported as diagnostics and
//! skipped. Everything here aborts generation.

/// Error type for code generation
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Code generation failed
    #[error("code generation error: {0}")]
    CodeGenError(String),

    /// Failed to decode protobuf message or descriptors
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Invalid plugin parameter
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A storage model whose API message cannot be found
    #[error("model {model}: source message {source_name:?} not found")]
    MissingSource {
        /// Fully qualified model name
        model: String,
        /// Declared or inferred source name
        source_name: String,
    },

    /// A model field referencing a message that is not a declared model
    #[error("model {model}: field {field} references {type_name}, which has no {backend} model")]
    MissingTarget {
        /// Fully qualified model name
        model: String,
        /// Field name
        field: String,
        /// Referenced message
        type_name: String,
        /// Backend being generated
        backend: String,
    },

    /// A field mapping reached rendering in an invalid state
    #[error("invalid mapping for {message}.{field}: {reason}")]
    InvalidMapping {
        /// Model name
        message: String,
        /// Field name
        field: String,
        /// What was wrong
        reason: String,
    },
}

impl From<String> for GeneratorError {
    fn from(s: String) -> Self {
        GeneratorError::CodeGenError(s)
    }
}
