//! Package module generation
//!
//! Every package directory gets a `mod.rs` declaring the backend modules
//! generated for it and the directories of its sub-packages, so the output
//! tree can be mounted with a single `mod` at `target_module`.

use crate::backends::BackendKind;
use crate::codegen::format_code;
use crate::error::GeneratorError;
use crate::naming::package_dir;
use prost_types::compiler::code_generator_response::File;
use quote::{format_ident, quote};
use std::collections::{BTreeMap, BTreeSet};

/// What a package directory contains
#[derive(Debug, Default)]
struct Directory {
    children: BTreeSet<String>,
    backends: BTreeSet<BackendKind>,
}

/// Directory tree of the generated output
#[derive(Debug, Default)]
pub struct Layout {
    directories: BTreeMap<String, Directory>,
}

impl Layout {
    /// Record that `backend` produced a file for `package`
    pub fn add(&mut self, package: &str, backend: BackendKind) {
        let dir = package_dir(package);
        self.directories
            .entry(dir.clone())
            .or_default()
            .backends
            .insert(backend);

        // Make every ancestor declare the directory below it
        let mut current = dir;
        while let Some((parent, child)) = current.rsplit_once('/') {
            self.directories
                .entry(parent.to_string())
                .or_default()
                .children
                .insert(child.to_string());
            current = parent.to_string();
        }
    }

    /// One `mod.rs` per directory
    pub fn generate(&self) -> Result<Vec<File>, GeneratorError> {
        self.directories
            .iter()
            .filter(|(dir, _)| !dir.is_empty())
            .map(|(dir, directory)| generate_mod(dir, directory))
            .collect()
    }
}

fn generate_mod(dir: &str, directory: &Directory) -> Result<File, GeneratorError> {
    let children = directory.children.iter().map(|c| format_ident!("{}", c));
    let backends = directory
        .backends
        .iter()
        .map(|b| format_ident!("{}", b.name()));

    let code = quote! {
        //! Generated storage modules
        //!
        //! @generated by protoc-gen-persist. Do not edit.

        #(pub mod #children;)*

        #(pub mod #backends;)*
    };

    Ok(File {
        name: Some(format!("{}/mod.rs", dir)),
        content: Some(format_code(code)?),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(layout: &Layout) -> Vec<(String, String)> {
        layout
            .generate()
            .unwrap()
            .into_iter()
            .map(|f| (f.name.unwrap(), f.content.unwrap()))
            .collect()
    }

    #[test]
    fn test_backends_declared_in_package_dir() {
        let mut layout = Layout::default();
        layout.add("shop", BackendKind::Document);
        layout.add("shop", BackendKind::SeaOrm);

        let files = files(&layout);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "shop/mod.rs");
        assert!(files[0].1.contains("pub mod seaorm;"));
        assert!(files[0].1.contains("pub mod document;"));
    }

    #[test]
    fn test_ancestors_declare_sub_packages() {
        let mut layout = Layout::default();
        layout.add("acme.shop.v1", BackendKind::SeaOrm);
        layout.add("acme.billing", BackendKind::SeaOrm);

        let files = files(&layout);
        let names: Vec<_> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "acme/mod.rs",
                "acme/billing/mod.rs",
                "acme/shop/mod.rs",
                "acme/shop/v1/mod.rs"
            ]
        );

        let acme = &files[0].1;
        assert!(acme.contains("pub mod billing;"));
        assert!(acme.contains("pub mod shop;"));
        assert!(!acme.contains("pub mod seaorm;"));
        assert!(files[2].1.contains("pub mod v1;"));
    }
}
