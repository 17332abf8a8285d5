//! Converter rendering
//!
//! Turns the field mappings of one (API message, storage model) pair into a
//! pair of converter functions. Each direction is emitted as a struct literal
//! holding the inline fields, followed by setters, then loops, then the
//! decorator hook.

use super::{parse_expr, parse_path};
use crate::backends::parse_ident;
use crate::error::GeneratorError;
use crate::mapping::expr::{self, Access, Transform};
use crate::mapping::{ConversionType, FieldMapping, FieldRenderStrategy, classify};
use crate::naming::{converter_fn_path, rust_field_name};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// A converter pair to render
#[derive(Debug)]
pub struct ConverterSpec<'a> {
    /// Fully qualified API message name, for docs
    pub source_name: String,
    /// Fully qualified storage message name, for docs
    pub target_name: String,
    /// Rust path of the API type
    pub source_type: String,
    /// Rust path of the storage type, relative to the backend module
    pub target_type: String,
    /// `{Source}To{Target}` reference
    pub to_name: String,
    /// `{Source}From{Target}` reference
    pub from_name: String,
    /// Field mappings, in storage field order
    pub mappings: &'a [FieldMapping],
}

/// Which way a function converts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToTarget,
    FromTarget,
}

/// One direction of a mapping, as the renderer needs it
struct Side<'m> {
    model: &'m str,
    mapping: &'m FieldMapping,
    direction: Direction,
}

impl<'m> Side<'m> {
    fn code(&self) -> &str {
        match self.direction {
            Direction::ToTarget => &self.mapping.to_target_code,
            Direction::FromTarget => &self.mapping.from_target_code,
        }
    }

    fn converter(&self) -> &str {
        match self.direction {
            Direction::ToTarget => &self.mapping.to_target_converter,
            Direction::FromTarget => &self.mapping.from_target_converter,
        }
    }

    fn conversion(&self) -> ConversionType {
        match self.direction {
            Direction::ToTarget => self.mapping.to_target_conversion,
            Direction::FromTarget => self.mapping.from_target_conversion,
        }
    }

    fn strategy(&self) -> FieldRenderStrategy {
        match self.direction {
            Direction::ToTarget => self.mapping.to_target_strategy,
            Direction::FromTarget => self.mapping.from_target_strategy,
        }
    }

    fn input(&self) -> &Access {
        match self.direction {
            Direction::ToTarget => &self.mapping.source_access,
            Direction::FromTarget => &self.mapping.target_access,
        }
    }

    /// Field read by this direction
    fn input_field(&self) -> &str {
        match self.direction {
            Direction::ToTarget => &self.mapping.source_field,
            Direction::FromTarget => &self.mapping.target_field,
        }
    }

    /// Field written by this direction
    fn output_field(&self) -> &str {
        match self.direction {
            Direction::ToTarget => &self.mapping.target_field,
            Direction::FromTarget => &self.mapping.source_field,
        }
    }

    /// Whether the written field is an `Option`
    fn output_pointer(&self) -> bool {
        match self.direction {
            Direction::ToTarget => self.mapping.target_is_pointer,
            Direction::FromTarget => self.mapping.source_is_pointer,
        }
    }

    /// Value expression, calling the converter when there is no inline code
    fn value(&self) -> Result<syn::Expr, GeneratorError> {
        if !self.code().is_empty() {
            return parse_expr(self.code());
        }
        let function = converter_fn_path(self.converter());
        let code = expr::lift(
            self.input(),
            self.output_pointer(),
            Transform {
                fallible: self.conversion().is_fallible(),
                yields_presence: false,
            },
            |input| format!("{}(&{})", function, input),
        );
        parse_expr(&code)
    }

    fn invalid(&self, reason: impl Into<String>) -> GeneratorError {
        GeneratorError::InvalidMapping {
            message: self.model.to_string(),
            field: self.mapping.target_field.clone(),
            reason: reason.into(),
        }
    }
}

/// Render both converter functions for a pair
pub fn render_converters(spec: &ConverterSpec<'_>) -> Result<TokenStream, GeneratorError> {
    for mapping in spec.mappings {
        mapping
            .validate()
            .map_err(|reason| GeneratorError::InvalidMapping {
                message: spec.target_name.clone(),
                field: mapping.target_field.clone(),
                reason,
            })?;
    }

    let to = render_direction(spec, Direction::ToTarget)?;
    let from = render_direction(spec, Direction::FromTarget)?;
    Ok(quote! {
        #to
        #from
    })
}

fn render_direction(spec: &ConverterSpec<'_>, direction: Direction) -> Result<TokenStream, GeneratorError> {
    let groups = classify(spec.mappings);
    let source_type = parse_path(&spec.source_type)?;
    let target_type = parse_path(&spec.target_type)?;

    let (reference, input_type, output_type, doc) = match direction {
        Direction::ToTarget => (
            &spec.to_name,
            &source_type,
            &target_type,
            format!(" Convert `{}` to its `{}` storage model", spec.source_name, spec.target_name),
        ),
        Direction::FromTarget => (
            &spec.from_name,
            &target_type,
            &source_type,
            format!(" Convert a `{}` storage model back to `{}`", spec.target_name, spec.source_name),
        ),
    };
    let (inline, setters, loops) = match direction {
        Direction::ToTarget => (
            &groups.to_target_inline,
            &groups.to_target_setter,
            &groups.to_target_loop,
        ),
        Direction::FromTarget => (
            &groups.from_target_inline,
            &groups.from_target_setter,
            &groups.from_target_loop,
        ),
    };
    let model = spec.target_name.as_str();

    let function = format_ident!("{}", converter_fn_path(reference));
    let function_with = format_ident!("{}_with", converter_fn_path(reference));

    let inline = inline
        .iter()
        .map(|m| {
            render_inline(&Side {
                model,
                mapping: m,
                direction,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let setters = setters
        .iter()
        .map(|m| {
            render_setter(&Side {
                model,
                mapping: m,
                direction,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let loops = loops
        .iter()
        .map(|m| {
            render_loop(&Side {
                model,
                mapping: m,
                direction,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let doc_with = format!("{} with a decorator run after the generated assignments", doc);

    Ok(quote! {
        #[doc = #doc]
        pub fn #function(src: &#input_type) -> Result<#output_type, ::persist_runtime::ConversionError> {
            #function_with(src, &::persist_runtime::NoDecorator)
        }

        #[doc = #doc_with]
        pub fn #function_with<D>(src: &#input_type, decorator: &D) -> Result<#output_type, ::persist_runtime::ConversionError>
        where
            D: ::persist_runtime::Decorator<#input_type, #output_type> + ?Sized,
        {
            #[allow(unused_mut)]
            let mut out = #output_type {
                #(#inline)*
                ..::core::default::Default::default()
            };
            #(#setters)*
            #(#loops)*
            decorator.decorate(src, &mut out)?;
            Ok(out)
        }
    })
}

fn render_inline(side: &Side<'_>) -> Result<TokenStream, GeneratorError> {
    if side.code().is_empty() {
        return Err(side.invalid("inline field without an expression"));
    }
    let field = parse_ident(&rust_field_name(side.output_field()))?;
    let value = side.value()?;
    Ok(quote! { #field: #value, })
}

fn render_setter(side: &Side<'_>) -> Result<TokenStream, GeneratorError> {
    let value = side.value()?;

    // `expr?` needs a postfix-safe receiver
    let value = match side.strategy() {
        FieldRenderStrategy::SetterWithError => {
            let value = parenthesize(value);
            quote! { #value? }
        }
        _ => quote! { #value },
    };

    let oneof = side
        .mapping
        .source_oneof
        .as_ref()
        .filter(|_| side.direction == Direction::FromTarget);
    if let Some(member) = oneof {
        // Only a stored value selects the member
        let field = parse_ident(&member.field)?;
        let variant = parse_path(&format!("{}::{}", member.enum_path, member.variant))?;
        let guard = parse_expr(&member.presence_guard)?;

        let set = match (member.is_message, side.strategy()) {
            (true, FieldRenderStrategy::SetterIgnoreError) => quote! {
                if let Ok(Some(value)) = #value {
                    out.#field = Some(#variant(value));
                }
            },
            (true, _) => quote! {
                if let Some(value) = #value {
                    out.#field = Some(#variant(value));
                }
            },
            (false, FieldRenderStrategy::SetterIgnoreError) => quote! {
                if let Ok(value) = #value {
                    out.#field = Some(#variant(value));
                }
            },
            (false, _) => quote! {
                out.#field = Some(#variant(#value));
            },
        };
        return Ok(quote! {
            if #guard {
                #set
            }
        });
    }

    let field = parse_ident(&rust_field_name(side.output_field()))?;
    Ok(match side.strategy() {
        FieldRenderStrategy::SetterIgnoreError => quote! {
            if let Ok(value) = #value {
                out.#field = value;
            }
        },
        _ => quote! {
            out.#field = #value;
        },
    })
}

fn render_loop(side: &Side<'_>) -> Result<TokenStream, GeneratorError> {
    if side.converter().is_empty() {
        return Err(side.invalid("loop without an element converter"));
    }
    let input = parse_ident(&rust_field_name(side.input_field()))?;
    let output = parse_ident(&rust_field_name(side.output_field()))?;
    let function = parse_path(&converter_fn_path(side.converter()))?;
    let conversion = side.conversion();

    let (pattern, element, store) = match side.strategy() {
        FieldRenderStrategy::LoopMap => (
            quote! { (key, value) },
            quote! { #function(value) },
            quote! { out.#output.insert(key.clone(), converted) },
        ),
        _ => (
            quote! { item },
            quote! { #function(item) },
            quote! { out.#output.push(converted) },
        ),
    };

    let body = match conversion {
        ConversionType::ByTransformerWithError => quote! {
            let converted = #element?;
            #store;
        },
        ConversionType::ByTransformerWithIgnorableError => quote! {
            if let Ok(converted) = #element {
                #store;
            }
        },
        _ => quote! {
            let converted = #element;
            #store;
        },
    };

    Ok(quote! {
        for #pattern in &src.#input {
            #body
        }
    })
}

/// Wrap expressions that cannot take a postfix operator directly
fn parenthesize(value: syn::Expr) -> syn::Expr {
    match value {
        syn::Expr::Cast(_)
        | syn::Expr::Binary(_)
        | syn::Expr::Unary(_)
        | syn::Expr::Match(_)
        | syn::Expr::If(_)
        | syn::Expr::Closure(_)
        | syn::Expr::Range(_) => syn::Expr::Paren(syn::ExprParen {
            attrs: Vec::new(),
            paren_token: Default::default(),
            expr: Box::new(value),
        }),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::format_code;
    use crate::mapping::OneofMember;

    fn mapping(name: &str) -> FieldMapping {
        FieldMapping {
            source_field: name.to_string(),
            target_field: name.to_string(),
            to_target_code: format!("src.{}.clone()", name),
            from_target_code: format!("src.{}.clone()", name),
            source_access: Access::field(format!("src.{}", name), false),
            target_access: Access::field(format!("src.{}", name), false),
            ..Default::default()
        }
    }

    fn spec(mappings: &[FieldMapping]) -> ConverterSpec<'_> {
        ConverterSpec {
            source_name: "shop.Order".to_string(),
            target_name: "shop.OrderModel".to_string(),
            source_type: "crate::shop::Order".to_string(),
            target_type: "order_model::Model".to_string(),
            to_name: "OrderToOrderModel".to_string(),
            from_name: "OrderFromOrderModel".to_string(),
            mappings,
        }
    }

    /// Rendered code with all whitespace removed
    fn render(mappings: &[FieldMapping]) -> String {
        let code = format_code(render_converters(&spec(mappings)).unwrap()).unwrap();
        compact(&code)
    }

    fn compact(code: &str) -> String {
        code.split_whitespace().collect()
    }

    fn assert_renders(code: &str, expected: &str) {
        assert!(
            code.contains(&compact(expected)),
            "expected {:?} in {}",
            expected,
            code
        );
    }

    fn via_converter(mut m: FieldMapping, strategy: FieldRenderStrategy) -> FieldMapping {
        m.to_target_code.clear();
        m.from_target_code.clear();
        m.to_target_converter = "AddressToAddressModel".to_string();
        m.from_target_converter = "AddressFromAddressModel".to_string();
        m.to_target_conversion = ConversionType::ByTransformerWithError;
        m.from_target_conversion = ConversionType::ByTransformerWithError;
        m.to_target_strategy = strategy;
        m.from_target_strategy = strategy;
        m
    }

    #[test]
    fn test_inline_fields_and_signatures() {
        let code = render(&[mapping("id")]);
        assert_renders(&code, "pub fn order_to_order_model(src: &crate::shop::Order");
        assert_renders(
            &code,
            "-> Result<order_model::Model, ::persist_runtime::ConversionError>",
        );
        assert_renders(
            &code,
            "pub fn order_from_order_model_with<D>(src: &order_model::Model, decorator: &D",
        );
        assert_renders(
            &code,
            "-> Result<crate::shop::Order, ::persist_runtime::ConversionError>",
        );
        assert_renders(&code, "order_to_order_model_with(src, &::persist_runtime::NoDecorator)");
        assert_renders(
            &code,
            "D: ::persist_runtime::Decorator<crate::shop::Order, order_model::Model> + ?Sized",
        );
        assert_renders(
            &code,
            "let mut out = order_model::Model { id: src.id.clone(), ..::core::default::Default::default() };",
        );
        assert_renders(&code, "decorator.decorate(src, &mut out)?; Ok(out)");
    }

    #[test]
    fn test_setters() {
        let mut count = mapping("count");
        count.to_target_code = "::persist_runtime::uint32_to_string(&src.count)".to_string();
        count.from_target_code = "::persist_runtime::string_to_uint32(&src.count)".to_string();
        count.to_target_conversion = ConversionType::ByTransformer;
        count.from_target_conversion = ConversionType::ByTransformerWithError;
        count.from_target_strategy = FieldRenderStrategy::SetterWithError;

        let mut note = mapping("note");
        note.to_target_strategy = FieldRenderStrategy::SetterSimple;
        note.from_target_strategy = FieldRenderStrategy::SetterIgnoreError;
        note.from_target_conversion = ConversionType::ByTransformerWithIgnorableError;
        note.from_target_code = "parse(&src.note)".to_string();

        let code = render(&[count, note]);
        assert_renders(&code, "out.count = ::persist_runtime::string_to_uint32(&src.count)?;");
        assert_renders(&code, "out.note = src.note.clone();");
        assert_renders(&code, "if let Ok(value) = parse(&src.note) { out.note = value; }");
    }

    #[test]
    fn test_singular_converter_call() {
        let mut billing = via_converter(mapping("billing"), FieldRenderStrategy::SetterWithError);
        billing.source_is_pointer = true;
        billing.source_access = Access::field("src.billing", true);

        let code = render(&[billing]);
        assert_renders(
            &code,
            "out.billing = src.billing.as_ref().map(|v| address_to_address_model(&v)).transpose().map(Option::unwrap_or_default)?;",
        );
        assert_renders(
            &code,
            "out.billing = address_from_address_model(&src.billing).map(Some)?;",
        );
    }

    #[test]
    fn test_loops() {
        let mut stops = via_converter(mapping("stops"), FieldRenderStrategy::LoopRepeated);
        stops.is_repeated = true;
        stops.from_target_converter = "other::AddressFromAddressModel".to_string();

        let mut by_name = via_converter(mapping("by_name"), FieldRenderStrategy::LoopMap);
        by_name.is_map = true;

        let code = render(&[stops, by_name]);
        assert_renders(
            &code,
            "for item in &src.stops { let converted = address_to_address_model(item)?; out.stops.push(converted); }",
        );
        assert_renders(&code, "let converted = other::address_from_address_model(item)?;");
        assert_renders(
            &code,
            "for (key, value) in &src.by_name { let converted = address_to_address_model(value)?; out.by_name.insert(key.clone(), converted); }",
        );
    }

    #[test]
    fn test_oneof_reconstruction() {
        let mut email = mapping("email");
        email.source_is_oneof = true;
        email.source_oneof = Some(OneofMember {
            field: "contact".to_string(),
            enum_path: "crate::shop::order::Contact".to_string(),
            variant: "Email".to_string(),
            is_message: false,
            presence_guard: "!src.email.is_empty()".to_string(),
        });
        email.from_target_strategy = FieldRenderStrategy::SetterSimple;

        let mut office = via_converter(mapping("office"), FieldRenderStrategy::SetterWithError);
        office.source_is_pointer = true;
        office.source_is_oneof = true;
        office.source_oneof = Some(OneofMember {
            field: "contact".to_string(),
            enum_path: "crate::shop::order::Contact".to_string(),
            variant: "Office".to_string(),
            is_message: true,
            presence_guard: "src.office != ::core::default::Default::default()".to_string(),
        });

        let code = render(&[email, office]);
        assert_renders(
            &code,
            "if !src.email.is_empty() { out.contact = Some(crate::shop::order::Contact::Email(src.email.clone())); }",
        );
        assert_renders(
            &code,
            "if src.office != ::core::default::Default::default() { if let Some(value) = address_from_address_model(&src.office).map(Some)? { out.contact = Some(crate::shop::order::Contact::Office(value)); } }",
        );
    }

    #[test]
    fn test_mapping_without_code_or_converter_is_rejected() {
        let mut broken = mapping("id");
        broken.to_target_code.clear();
        let mappings = [broken];
        assert!(matches!(
            render_converters(&spec(&mappings)),
            Err(GeneratorError::InvalidMapping { .. })
        ));
    }

    #[test]
    fn test_casts_are_parenthesized_before_try() {
        let value = parenthesize(parse_expr("src.a as i64").unwrap());
        assert!(matches!(value, syn::Expr::Paren(_)));
        let value = parenthesize(parse_expr("f(&src.a)").unwrap());
        assert!(matches!(value, syn::Expr::Call(_)));
    }
}
