//! SeaORM backend for Rust code generation
//!
//! Models with a table become dense-format SeaORM entities, each in its own
//! module (`user_model::Model`). Models without a table are embedded values
//! stored in JSON columns.

mod column;

use super::{Backend, BackendKind, parse_ident, parse_type};
use crate::error::GeneratorError;
use crate::ir::{Field, Model};
use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// SeaORM entity generation
pub struct SeaOrmBackend;

impl Backend for SeaOrmBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SeaOrm
    }

    fn struct_name(&self, stem: &str, is_table: bool) -> String {
        if is_table {
            format!("{}::Model", stem.to_snake_case())
        } else {
            stem.to_string()
        }
    }

    fn preamble(&self) -> TokenStream {
        quote! {
            use sea_orm::entity::prelude::*;
        }
    }

    fn generate_model(&self, model: &Model) -> Result<TokenStream, GeneratorError> {
        if model.is_table() {
            generate_entity(model)
        } else {
            generate_embedded(model)
        }
    }
}

/// A table model: an entity module with `Model`, `Relation` and `ActiveModel`
fn generate_entity(model: &Model) -> Result<TokenStream, GeneratorError> {
    let module = format_ident!("{}", model.name.to_snake_case());
    let table_name = &model.table_name;
    let doc = format!(" Entity for the `{}` table", table_name);

    // An entity needs a primary key; fall back to a field named `id`
    let has_primary_key = model.fields.iter().any(|f| f.options.primary_key);
    if !has_primary_key && !model.fields.iter().any(|f| f.name == "id") {
        tracing::warn!(model = %model.name, table = %table_name, "entity has no primary key");
    }

    let fields = model
        .fields
        .iter()
        .map(|field| {
            let implicit_key = !has_primary_key && field.name == "id";
            generate_column(field, implicit_key)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(quote! {
        #[doc = #doc]
        pub mod #module {
            use super::*;

            #[derive(Clone, Debug, PartialEq, Default, DeriveEntityModel, ::serde::Serialize, ::serde::Deserialize)]
            #[sea_orm(table_name = #table_name)]
            pub struct Model {
                #(#fields)*
            }

            #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
            pub enum Relation {}

            impl ActiveModelBehavior for ActiveModel {}
        }
    })
}

/// A model without a table, stored as JSON inside its parent
fn generate_embedded(model: &Model) -> Result<TokenStream, GeneratorError> {
    let ident = parse_ident(&model.name)?;
    let doc = format!(" Embedded value `{}`, stored as JSON", model.name);

    let fields = model
        .fields
        .iter()
        .map(|field| {
            let name = parse_ident(&field.name)?;
            let ty = parse_type(&field.rust_type)?;
            Ok(quote! { pub #name: #ty, })
        })
        .collect::<Result<Vec<_>, GeneratorError>>()?;

    Ok(quote! {
        #[doc = #doc]
        #[derive(Clone, Debug, PartialEq, Default, ::serde::Serialize, ::serde::Deserialize, FromJsonQueryResult)]
        pub struct #ident {
            #(#fields)*
        }
    })
}

fn generate_column(field: &Field, implicit_key: bool) -> Result<TokenStream, GeneratorError> {
    let name = parse_ident(&field.name)?;
    let ty = parse_type(&field.rust_type)?;

    let mut options = field.options.clone();
    if implicit_key {
        options.primary_key = true;
    }
    let attributes = column::generate_attributes(&options, field.storage).attributes;
    if attributes.is_empty() {
        return Ok(quote! { pub #name: #ty, });
    }

    let attributes: TokenStream = attributes.join(", ").parse().map_err(|e| {
        GeneratorError::CodeGenError(format!(
            "invalid column attributes for {}: {}",
            field.proto_name, e
        ))
    })?;
    Ok(quote! {
        #[sea_orm(#attributes)]
        pub #name: #ty,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StorageKind;
    use crate::options::FieldOptions;

    fn field(name: &str, rust_type: &str, storage: StorageKind, options: FieldOptions) -> Field {
        Field {
            name: name.to_string(),
            proto_name: name.to_string(),
            rust_type: rust_type.to_string(),
            storage,
            nullable: rust_type.starts_with("Option<"),
            options,
        }
    }

    fn render(model: &Model) -> String {
        let tokens = SeaOrmBackend.generate_model(model).unwrap();
        prettyplease::unparse(&syn::parse2(tokens).unwrap())
    }

    #[test]
    fn test_entity_module() {
        let model = Model {
            name: "UserModel".to_string(),
            table_name: "users".to_string(),
            package: "example".to_string(),
            fields: vec![
                field(
                    "id",
                    "i64",
                    StorageKind::Scalar,
                    FieldOptions {
                        primary_key: true,
                        ..Default::default()
                    },
                ),
                field("nickname", "Option<String>", StorageKind::Scalar, FieldOptions::default()),
                field("address", "AddressModel", StorageKind::Embedded, FieldOptions::default()),
            ],
        };
        let code = render(&model);
        assert!(code.contains("pub mod user_model"));
        assert!(code.contains("#[sea_orm(table_name = \"users\")]"));
        assert!(code.contains("#[sea_orm(primary_key, auto_increment = false)]"));
        assert!(code.contains("pub nickname: Option<String>"));
        assert!(code.contains("#[sea_orm(column_type = \"JsonBinary\")]"));
        assert!(code.contains("impl ActiveModelBehavior for ActiveModel"));
    }

    #[test]
    fn test_id_is_implicit_primary_key() {
        let model = Model {
            name: "TagModel".to_string(),
            table_name: "tags".to_string(),
            package: "example".to_string(),
            fields: vec![field("id", "String", StorageKind::Scalar, FieldOptions::default())],
        };
        assert!(render(&model).contains("#[sea_orm(primary_key, auto_increment = false)]"));
    }

    #[test]
    fn test_embedded_value() {
        let model = Model {
            name: "AddressModel".to_string(),
            table_name: String::new(),
            package: "example".to_string(),
            fields: vec![field("city", "String", StorageKind::Scalar, FieldOptions::default())],
        };
        let code = render(&model);
        assert!(code.contains("pub struct AddressModel"));
        assert!(code.contains("FromJsonQueryResult"));
        assert!(!code.contains("DeriveEntityModel"));
    }
}
