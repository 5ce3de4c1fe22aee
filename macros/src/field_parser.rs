use crate::macro_utils;
use proc_macro2::{Ident, Span};
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::token::Comma;
use syn::{Attribute, Fields, ItemStruct, LitStr, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// `Option<T>`
    OneToOption,
    /// `Vec<T>`
    OneToMany,
    /// `Option<Vec<T>>`
    OneToOptionalMany,
}

#[derive(Clone)]
pub struct FieldDef {
    pub name: Ident,
    pub tpe: Type,
}

#[derive(Clone)]
pub struct RelationDef {
    pub join: LitStr,
    pub mapped_by: LitStr,
    pub fetch_by: Option<LitStr>,
    pub lazy: bool,
    pub target: Option<Type>,
}

#[derive(Clone)]
pub enum ColumnDef {
    Column { field: FieldDef, column: String, pk: bool, relation: Option<RelationDef> },
    Embedded(FieldDef),
    Relationship { field: FieldDef, relation: RelationDef, multiplicity: Multiplicity, child_type: Type },
    Transient(FieldDef),
}

impl ColumnDef {
    pub fn field(&self) -> &FieldDef {
        match self {
            ColumnDef::Column { field, .. } => field,
            ColumnDef::Embedded(field) => field,
            ColumnDef::Relationship { field, .. } => field,
            ColumnDef::Transient(field) => field,
        }
    }
}

pub struct EntityDef {
    pub ident: Ident,
    pub table: Option<LitStr>,
    pub columns: Vec<ColumnDef>,
}

pub fn get_named_fields(ast: &ItemStruct) -> Result<Punctuated<syn::Field, Comma>, syn::Error> {
    match &ast.fields {
        Fields::Named(columns_named) => Ok(columns_named.named.clone()),
        _ => Err(syn::Error::new(ast.span(), "`#[derive(Entity)]` and `#[derive(Record)]` only support structs with named fields.")),
    }
}

/// `#[pk(name = "...")]` / `#[column(name = "...")]`, the name defaulting to the field name.
fn parse_column_name(attr: &Attribute, field_name: &Ident) -> Result<String, syn::Error> {
    let mut name = field_name.to_string();
    if matches!(attr.meta, syn::Meta::List(_)) {
        attr.parse_nested_meta(|nested| {
            if nested.path.is_ident("name") {
                name = nested.value()?.parse::<LitStr>()?.value();
                Ok(())
            } else {
                Err(nested.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(name)
}

fn parse_relation(attr: &Attribute) -> Result<RelationDef, syn::Error> {
    let mut join = None;
    let mut mapped_by = None;
    let mut fetch_by = None;
    let mut lazy = false;
    let mut target = None;
    attr.parse_nested_meta(|nested| {
        if nested.path.is_ident("join") {
            join = Some(nested.value()?.parse::<LitStr>()?);
        } else if nested.path.is_ident("mapped_by") {
            mapped_by = Some(nested.value()?.parse::<LitStr>()?);
        } else if nested.path.is_ident("fetch_by") {
            fetch_by = Some(nested.value()?.parse::<LitStr>()?);
        } else if nested.path.is_ident("fetch") {
            let fetch = nested.value()?.parse::<LitStr>()?;
            lazy = match fetch.value().as_str() {
                "lazy" => true,
                "eager" => false,
                _ => return Err(syn::Error::new(fetch.span(), "fetch must be \"lazy\" or \"eager\"")),
            };
        } else if nested.path.is_ident("target") {
            target = Some(nested.value()?.parse::<Type>()?);
        } else {
            return Err(nested.error("expected one of `join`, `mapped_by`, `fetch_by`, `fetch`, `target`"));
        }
        Ok(())
    })?;
    let join = join.ok_or_else(|| syn::Error::new(attr.path().span(), "#[relation] requires `join = \"table\"`"))?;
    let mapped_by = mapped_by.ok_or_else(|| syn::Error::new(attr.path().span(), "#[relation] requires `mapped_by = \"column\"`"))?;
    Ok(RelationDef { join, mapped_by, fetch_by, lazy, target })
}

/// Element type and multiplicity of a relation-only field.
fn relationship_type(ty: &Type) -> Option<(Multiplicity, Type)> {
    if let Some(inner) = macro_utils::generic_inner(ty, "Option") {
        return match macro_utils::generic_inner(inner, "Vec") {
            Some(child) => Some((Multiplicity::OneToOptionalMany, child.clone())),
            None => Some((Multiplicity::OneToOption, inner.clone())),
        };
    }
    macro_utils::generic_inner(ty, "Vec").map(|child| (Multiplicity::OneToMany, child.clone()))
}

fn parse_entity_field(field: &syn::Field) -> Result<ColumnDef, syn::Error> {
    let name = field.ident.clone().ok_or_else(|| syn::Error::new(field.span(), "Unnamed fields not supported"))?;
    let field_def = FieldDef { name: name.clone(), tpe: field.ty.clone() };
    let mut column: Option<(String, bool)> = None;
    let mut relation: Option<RelationDef> = None;
    let mut transient: Option<Span> = None;
    for attr in &field.attrs {
        if attr.path().is_ident("pk") || attr.path().is_ident("column") {
            if column.is_some() {
                return Err(syn::Error::new(attr.span(), "Field can carry only one of #[pk] / #[column]"));
            }
            column = Some((parse_column_name(attr, &name)?, attr.path().is_ident("pk")));
        } else if attr.path().is_ident("relation") {
            relation = Some(parse_relation(attr)?);
        } else if attr.path().is_ident("transient") {
            transient = Some(attr.path().span());
        }
    }
    match (column, relation, transient) {
        (None, None, Some(_)) => Ok(ColumnDef::Transient(field_def)),
        (_, _, Some(span)) => Err(syn::Error::new(span, "#[transient] cannot be combined with other persistence annotations")),
        (Some((column, pk)), relation, None) => Ok(ColumnDef::Column { field: field_def, column, pk, relation }),
        (None, Some(relation), None) => {
            let (multiplicity, child_type) = relationship_type(&field.ty).ok_or_else(|| {
                syn::Error::new(field.ty.span(), "Relation field must be `Vec<T>`, `Option<Vec<T>>` or `Option<T>`")
            })?;
            Ok(ColumnDef::Relationship { field: field_def, relation, multiplicity, child_type })
        }
        (None, None, None) => Ok(ColumnDef::Embedded(field_def)),
    }
}

fn parse_table(ast: &ItemStruct) -> Result<Option<LitStr>, syn::Error> {
    let mut table = None;
    for attr in ast.attrs.iter().filter(|a| a.path().is_ident("table")) {
        attr.parse_nested_meta(|nested| {
            if nested.path.is_ident("name") {
                table = Some(nested.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(nested.error("expected `name = \"...\"`"))
            }
        })?;
    }
    Ok(table)
}

pub fn get_entity_def(ast: &ItemStruct) -> Result<EntityDef, syn::Error> {
    let fields = get_named_fields(ast)?;
    let columns = fields.iter().map(parse_entity_field).collect::<Result<Vec<ColumnDef>, syn::Error>>()?;
    let pks: Vec<&ColumnDef> = columns.iter().filter(|c| matches!(c, ColumnDef::Column { pk: true, .. })).collect();
    if let Some(second) = pks.get(1) {
        return Err(syn::Error::new(second.field().name.span(), "Multiple `#[pk]` columns found; only one is allowed"));
    }
    Ok(EntityDef { ident: ast.ident.clone(), table: parse_table(ast)?, columns })
}
