use crate::field_parser::{ColumnDef, EntityDef};
use crate::relationship;
use proc_macro2::TokenStream;
use quote::quote;

fn field_spec(column_def: &ColumnDef) -> TokenStream {
    let field_str = column_def.field().name.to_string();
    match column_def {
        ColumnDef::Column { field, column, pk, relation } => {
            let ty = &field.tpe;
            let relation = match relation {
                Some(relation) => {
                    let spec = relationship::relation_spec(relation, None, None);
                    quote! { Some(#spec) }
                }
                None => quote! { None },
            };
            quote! {
                ::ormbit::FieldSpec {
                    name: #field_str,
                    kind: ::ormbit::FieldKind::Column { name: #column, primary_key: #pk },
                    ty: Some(<#ty as ::ormbit::Described>::descriptor),
                    relation: #relation,
                }
            }
        }
        ColumnDef::Embedded(field) => {
            let ty = &field.tpe;
            quote! {
                ::ormbit::FieldSpec {
                    name: #field_str,
                    kind: ::ormbit::FieldKind::Embedded,
                    ty: Some(<#ty as ::ormbit::Described>::descriptor),
                    relation: None,
                }
            }
        }
        ColumnDef::Relationship { relation, multiplicity, child_type, .. } => {
            let spec = relationship::relation_spec(relation, Some(*multiplicity), Some(child_type));
            quote! {
                ::ormbit::FieldSpec {
                    name: #field_str,
                    kind: ::ormbit::FieldKind::Relation,
                    ty: None,
                    relation: Some(#spec),
                }
            }
        }
        ColumnDef::Transient(_) => quote! {
            ::ormbit::FieldSpec { name: #field_str, kind: ::ormbit::FieldKind::Transient, ty: None, relation: None }
        },
    }
}

/// `Described` and `Record` impls shared by `#[derive(Entity)]` and `#[derive(Record)]`.
pub fn record_impls(entity_def: &EntityDef) -> TokenStream {
    let ident = &entity_def.ident;
    let name = ident.to_string();
    let specs: Vec<TokenStream> = entity_def.columns.iter().map(field_spec).collect();

    let mut value_arms = Vec::new();
    let mut embedded_lookups = Vec::new();
    let mut inits = Vec::new();
    for column_def in &entity_def.columns {
        let field_name = &column_def.field().name;
        let ty = &column_def.field().tpe;
        match column_def {
            ColumnDef::Column { column, .. } => {
                value_arms.push(quote! { #column => Some(::ormbit::Scalar::to_value(&self.#field_name)) });
                inits.push(quote! { #field_name: row.decode::<#ty>(#column)? });
            }
            ColumnDef::Embedded(_) => {
                embedded_lookups.push(quote! { .or_else(|| ::ormbit::Record::value_of(&self.#field_name, column)) });
                inits.push(quote! { #field_name: <#ty as ::ormbit::Record>::from_row(row)? });
            }
            ColumnDef::Relationship { .. } | ColumnDef::Transient(_) => {
                inits.push(quote! { #field_name: ::core::default::Default::default() });
            }
        }
    }

    quote! {
        impl ::ormbit::Described for #ident {
            fn descriptor() -> ::ormbit::TypeDescriptor {
                static FIELDS: &[::ormbit::FieldSpec] = &[#(#specs),*];
                ::ormbit::TypeDescriptor::record::<#ident>(#name, FIELDS)
            }
        }

        impl ::ormbit::Record for #ident {
            fn value_of(&self, column: &str) -> Option<::ormbit::Value> {
                match column {
                    #(#value_arms,)*
                    _ => None #(#embedded_lookups)*,
                }
            }

            fn from_row(row: &::ormbit::Row) -> Result<Self, ::ormbit::OrmError> {
                Ok(#ident {
                    #(#inits),*
                })
            }
        }
    }
}
