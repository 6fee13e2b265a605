use crate::infer::{CollectionType, Field, Shape, TypeUnion};
use crate::type_utils::{rust_field_name, safe_field_ident};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashSet;

/// Render serde-ready Rust structs for every collection type.
pub fn render(types: &[CollectionType]) -> String {
    let items: Vec<TokenStream> = types.iter().map(collection_struct).collect();
    let tokens = quote! {
        use serde::{Deserialize, Serialize};

        #(#items)*
    };
    format_token_stream(&tokens)
}

/// Pretty-print a token stream as a Rust source file.
pub fn format_token_stream(tokens: &TokenStream) -> String {
    match syn::parse2::<syn::File>(tokens.clone()) {
        Ok(file) => prettyplease::unparse(&file),
        Err(e) => {
            log::warn!("Generated tokens did not parse as a Rust file: {e}");
            tokens.to_string()
        }
    }
}

fn collection_struct(ty: &CollectionType) -> TokenStream {
    let name = format_ident!("{}", ty.type_name);
    let list = format_ident!("{}", ty.list_name);
    let doc = if ty.samples == 0 {
        format!(" '{}' has no records to infer fields from.", ty.collection)
    } else {
        format!(" Inferred from {} record(s) in '{}'.", ty.samples, ty.collection)
    };

    let mut used = HashSet::new();
    let fields = ty.fields.iter().map(|field| struct_field(field, &mut used));
    let fields: Vec<TokenStream> = fields.collect();

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct #name {
            #(#fields)*
        }

        pub type #list = Vec<#name>;
    }
}

fn struct_field(field: &Field, used: &mut HashSet<String>) -> TokenStream {
    let mut rust_name = rust_field_name(&field.name);
    let base = rust_name.clone();
    let mut n = 2;
    while !used.insert(rust_name.clone()) {
        rust_name = format!("{base}_{n}");
        n += 1;
    }

    let ident = safe_field_ident(&rust_name);
    let ident_text = ident.to_string();
    let original = &field.name;
    let rename = if ident_text.trim_start_matches("r#") != original.as_str() {
        quote! { #[serde(rename = #original)] }
    } else {
        quote! {}
    };

    let base_type = union_type(&field.ty);
    let (field_type, skip) = if field.optional {
        (
            quote! { Option<#base_type> },
            quote! { #[serde(default, skip_serializing_if = "Option::is_none")] },
        )
    } else if field.ty.is_nullable() {
        (quote! { Option<#base_type> }, quote! {})
    } else {
        (base_type, quote! {})
    };

    quote! {
        #rename
        #skip
        pub #ident: #field_type,
    }
}

/// Rust type for the non-null part of a union.
fn union_type(union: &TypeUnion) -> TokenStream {
    let shapes: Vec<&Shape> = union.non_null().collect();
    match shapes.as_slice() {
        [Shape::Integer] => quote! { i64 },
        [Shape::Float] | [Shape::Integer, Shape::Float] => quote! { f64 },
        [Shape::String] => quote! { String },
        [Shape::Boolean] => quote! { bool },
        [Shape::Array(element)] => {
            let inner = union_type(element);
            if element.is_nullable() {
                quote! { Vec<Option<#inner>> }
            } else {
                quote! { Vec<#inner> }
            }
        }
        [Shape::Object(_)] => quote! { serde_json::Map<String, serde_json::Value> },
        _ => quote! { serde_json::Value },
    }
}
