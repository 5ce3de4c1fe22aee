extern crate proc_macro;
mod entity;
mod field_parser;
mod macro_utils;
mod record;
mod relationship;

use proc_macro::TokenStream;
use proc_macro_error::proc_macro_error;
use quote::quote;
use syn::parse::Parse;
use syn::punctuated::Punctuated;
use syn::token::Comma;
use syn::{parse_macro_input, ItemStruct, LitStr, Path, Token};

/// `#[entity]` / `#[entity(table = "...")]`
struct EntityAttr {
    table: Option<LitStr>,
}

impl Parse for EntityAttr {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        if input.is_empty() {
            return Ok(EntityAttr { table: None });
        }
        let key: syn::Ident = input.parse()?;
        if key != "table" {
            return Err(syn::Error::new(key.span(), "expected `table = \"...\"`"));
        }
        input.parse::<Token![=]>()?;
        Ok(EntityAttr { table: Some(input.parse()?) })
    }
}

#[proc_macro_attribute]
#[proc_macro_error]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_args = parse_macro_input!(attr as EntityAttr);
    let mut s = parse_macro_input!(item as ItemStruct);
    let struct_ident = s.ident.clone();
    let derives: Punctuated<Path, Comma> = syn::parse_quote![Clone, Debug, Default, PartialEq, Entity];
    macro_utils::merge_struct_derives(&mut s, derives);
    if let Some(table) = attr_args.table {
        s.attrs.push(syn::parse_quote! { #[table(name = #table)] });
    }
    let stream = quote! {
        #s
    };
    macro_utils::submit_struct_to_stream(stream, "entity", &struct_ident, "_attr.rs")
}

#[proc_macro_derive(Entity, attributes(pk, column, relation, transient, table))]
#[proc_macro_error]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item_struct = parse_macro_input!(input as ItemStruct);
    let entity_def = match field_parser::get_entity_def(&item_struct) {
        Ok(entity_def) => entity_def,
        Err(e) => return e.to_compile_error().into(),
    };
    let stream = entity::new(&entity_def);
    macro_utils::submit_struct_to_stream(stream, "entity", &item_struct.ident, "_derive.rs")
}

#[proc_macro_derive(Record, attributes(column, relation, transient))]
#[proc_macro_error]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let item_struct = parse_macro_input!(input as ItemStruct);
    let entity_def = match field_parser::get_entity_def(&item_struct) {
        Ok(entity_def) => entity_def,
        Err(e) => return e.to_compile_error().into(),
    };
    let stream = record::record_impls(&entity_def);
    macro_utils::submit_struct_to_stream(stream, "record", &item_struct.ident, "_derive.rs")
}
