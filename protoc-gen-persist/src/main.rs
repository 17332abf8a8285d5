//! protoc-gen-persist
//!
//! Reads a `CodeGeneratorRequest` from stdin and writes the response to
//! stdout. Logs go to stderr, filtered by `PERSIST_LOG` (default `warn`).
//!
//! Usage:
//!   protoc --persist_out=backends=seaorm+document,source_module=crate::pb:./gen proto/*.proto

#![deny(missing_docs)]

use std::io::{self, Read, Write};

use prost::Message;
use prost_types::compiler::CodeGeneratorResponse;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("PERSIST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;

    // Errors are reported to protoc, not through the exit code
    let response = protoc_gen_persist::generate_from_bytes(&input).unwrap_or_else(|err| {
        tracing::error!(error = %err, "generation failed");
        CodeGeneratorResponse {
            error: Some(err.to_string()),
            supported_features: Some(1),
            ..Default::default()
        }
    });

    let mut output = Vec::new();
    response.encode(&mut output)?;
    io::stdout().write_all(&output)?;

    Ok(())
}
