use crate::field_parser::{ColumnDef, EntityDef};
use crate::record;
use crate::relationship;
use proc_macro2::TokenStream;
use quote::quote;

pub fn new(entity_def: &EntityDef) -> TokenStream {
    let ident = &entity_def.ident;
    let name = ident.to_string();
    let record_impls = record::record_impls(entity_def);
    let table = match &entity_def.table {
        Some(table) => quote! { Some(#table) },
        None => quote! { None },
    };
    let arms: Vec<TokenStream> = entity_def
        .columns
        .iter()
        .filter_map(|c| match c {
            ColumnDef::Relationship { field, multiplicity, .. } => Some(relationship::assign_arm(&field.name, *multiplicity)),
            _ => None,
        })
        .collect();
    let unknown = quote! {
        Err(::ormbit::OrmError::UnknownRelation { type_name: #name, field: field.to_string() })
    };
    let assign_body = if arms.is_empty() {
        quote! {
            let _ = rows;
            #unknown
        }
    } else {
        quote! {
            match field {
                #(#arms)*
                _ => return #unknown,
            }
            Ok(())
        }
    };

    quote! {
        #record_impls

        impl ::ormbit::Entity for #ident {
            const TABLE: Option<&'static str> = #table;

            fn assign_relation(&mut self, field: &str, rows: &[::ormbit::Row]) -> Result<(), ::ormbit::OrmError> {
                #assign_body
            }
        }

        ::ormbit::inventory::submit! {
            ::ormbit::EntityInfo {
                name: #name,
                bootstrap: <#ident as ::ormbit::Entity>::bootstrap,
            }
        }
    }
}
