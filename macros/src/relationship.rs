use crate::field_parser::{Multiplicity, RelationDef};
use proc_macro2::{Ident, TokenStream};
use quote::quote;
use syn::Type;

/// `::ormbit::RelationSpec` literal for a relation annotation.
pub fn relation_spec(relation: &RelationDef, multiplicity: Option<Multiplicity>, default_target: Option<&Type>) -> TokenStream {
    let RelationDef { join, mapped_by, fetch_by, lazy, target } = relation;
    let fetch_by = match fetch_by {
        Some(column) => quote! { Some(#column) },
        None => quote! { None },
    };
    let fetch = if *lazy { quote! { ::ormbit::Fetch::Lazy } } else { quote! { ::ormbit::Fetch::Eager } };
    let cardinality = match multiplicity {
        Some(Multiplicity::OneToMany) | Some(Multiplicity::OneToOptionalMany) => quote! { ::ormbit::Cardinality::Many },
        Some(Multiplicity::OneToOption) | None => quote! { ::ormbit::Cardinality::One },
    };
    let target = match target.as_ref().or(default_target) {
        Some(ty) => quote! { Some(<#ty as ::ormbit::Described>::descriptor) },
        None => quote! { None },
    };
    quote! {
        ::ormbit::RelationSpec {
            join: #join,
            mapped_by: #mapped_by,
            fetch_by: #fetch_by,
            fetch: #fetch,
            cardinality: #cardinality,
            target: #target,
        }
    }
}

/// Match arm of `Entity::assign_relation` for one relation-only field.
pub fn assign_arm(field_name: &Ident, multiplicity: Multiplicity) -> TokenStream {
    let field_str = field_name.to_string();
    let assignment = match multiplicity {
        Multiplicity::OneToMany => quote! { self.#field_name = ::ormbit::decode_all(rows)?; },
        Multiplicity::OneToOptionalMany => quote! { self.#field_name = Some(::ormbit::decode_all(rows)?); },
        Multiplicity::OneToOption => quote! { self.#field_name = ::ormbit::decode_first(rows)?; },
    };
    quote! {
        #field_str => { #assignment }
    }
}
