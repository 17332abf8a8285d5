//! Document-store backend
//!
//! Models become plain serde structs suitable for a BSON document store.
//! Field names are lowerCamelCase on the wire unless `rename` says otherwise,
//! and the primary key is stored as `_id`.

use super::{Backend, BackendKind, parse_ident, parse_type};
use crate::error::GeneratorError;
use crate::ir::{Field, Model, StorageKind};
use heck::ToLowerCamelCase;
use proc_macro2::TokenStream;
use quote::quote;

/// serde helper storing `chrono` times as BSON datetimes
const DATETIME_HELPER: &str = "::bson::serde_helpers::chrono_datetime_as_bson_datetime";

/// Document struct generation
pub struct DocumentBackend;

impl Backend for DocumentBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Document
    }

    fn struct_name(&self, stem: &str, _is_table: bool) -> String {
        stem.to_string()
    }

    fn generate_model(&self, model: &Model) -> Result<TokenStream, GeneratorError> {
        let ident = parse_ident(&model.name)?;
        let doc = if model.is_table() {
            format!(" Document in the `{}` collection", model.table_name)
        } else {
            format!(" Embedded document `{}`", model.name)
        };

        let fields = model
            .fields
            .iter()
            .map(generate_field)
            .collect::<Result<Vec<_>, _>>()?;

        let collection = if model.is_table() {
            let name = &model.table_name;
            quote! {
                impl #ident {
                    /// Collection holding these documents
                    pub const COLLECTION: &'static str = #name;
                }
            }
        } else {
            quote! {}
        };

        Ok(quote! {
            #[doc = #doc]
            #[derive(Clone, Debug, PartialEq, Default, ::serde::Serialize, ::serde::Deserialize)]
            pub struct #ident {
                #(#fields)*
            }

            #collection
        })
    }
}

/// Name of a field in the stored document
fn wire_name(field: &Field) -> String {
    if field.options.primary_key {
        "_id".to_string()
    } else if !field.options.rename.is_empty() {
        field.options.rename.clone()
    } else {
        field.proto_name.to_lower_camel_case()
    }
}

fn generate_field(field: &Field) -> Result<TokenStream, GeneratorError> {
    let name = parse_ident(&field.name)?;
    let ty = parse_type(&field.rust_type)?;
    let rename = wire_name(field);
    let helper = DATETIME_HELPER;

    let serde = if field.nullable {
        quote! { #[serde(rename = #rename, default, skip_serializing_if = "Option::is_none")] }
    } else if field.storage == StorageKind::Time {
        quote! { #[serde(rename = #rename, with = #helper)] }
    } else {
        quote! { #[serde(rename = #rename, default)] }
    };

    Ok(quote! {
        #serde
        pub #name: #ty,
    })
}
