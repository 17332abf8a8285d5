//! Code emission helpers
//!
//! Backends and the converter renderer build token streams; this module
//! turns them into formatted source files.

pub mod convert;

use crate::error::GeneratorError;
use proc_macro2::TokenStream;

/// Format generated tokens as a source file
pub fn format_code(tokens: TokenStream) -> Result<String, GeneratorError> {
    let code = tokens.to_string();
    let parsed = syn::parse_file(&code).map_err(|e| {
        GeneratorError::CodeGenError(format!("Failed to parse generated code: {}", e))
    })?;
    Ok(prettyplease::unparse(&parsed))
}

/// Parse a Rust expression produced by the mapping engine
pub(crate) fn parse_expr(code: &str) -> Result<syn::Expr, GeneratorError> {
    syn::parse_str(code).map_err(|e| {
        GeneratorError::CodeGenError(format!("invalid expression {:?}: {}", code, e))
    })
}

/// Parse a Rust path (a type or a function)
pub(crate) fn parse_path(path: &str) -> Result<syn::Path, GeneratorError> {
    syn::parse_str(path)
        .map_err(|e| GeneratorError::CodeGenError(format!("invalid path {:?}: {}", path, e)))
}
