//! Plugin parameters
//!
//! protoc passes everything after `--persist_out=` and before the colon as
//! a single comma separated string:
//!
//!   protoc --persist_out=backends=seaorm+document,source_module=crate::pb:./gen
//!

use crate::backends::BackendKind;
use crate::error::GeneratorError;

/// Parsed plugin configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backends to generate
    pub backends: Vec<BackendKind>,
    /// Backend for models that do not name one
    pub default_backend: BackendKind,
    /// Rust path prefix under which prost-generated API types live
    pub source_module: String,
    /// Rust path prefix under which the generated storage modules live
    pub target_module: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backends: vec![BackendKind::SeaOrm, BackendKind::Document],
            default_backend: BackendKind::SeaOrm,
            source_module: "crate".to_string(),
            target_module: "crate::persist".to_string(),
        }
    }
}

impl Config {
    /// Parse the protoc parameter string
    pub fn parse(param: &str) -> Result<Self, GeneratorError> {
        let mut config = Config::default();

        for part in param.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                GeneratorError::InvalidConfig(format!("expected key=value, got {:?}", part))
            })?;

            match key.trim() {
                "backends" | "backend" => {
                    config.backends = value
                        .split('+')
                        .map(parse_backend)
                        .collect::<Result<_, _>>()?;
                }
                "default_backend" => config.default_backend = parse_backend(value)?,
                "source_module" => config.source_module = value.trim().to_string(),
                "target_module" => config.target_module = value.trim().to_string(),
                other => {
                    return Err(GeneratorError::InvalidConfig(format!(
                        "unknown parameter: {}",
                        other
                    )));
                }
            }
        }

        Ok(config)
    }
}

fn parse_backend(name: &str) -> Result<BackendKind, GeneratorError> {
    match name.trim().to_lowercase().as_str() {
        "seaorm" | "sea_orm" | "sea-orm" => Ok(BackendKind::SeaOrm),
        "document" | "mongo" | "mongodb" => Ok(BackendKind::Document),
        other => Err(GeneratorError::InvalidConfig(format!(
            "unknown backend: {}",
            other
        ))),
    }
}
