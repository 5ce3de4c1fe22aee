//! Persistence metadata: the static descriptors emitted by `#[derive(Entity)]` / `#[derive(Record)]`
//! and the extractor that flattens them into ordered column lists.

use crate::error::OrmError;
use crate::value::ScalarKind;
use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Hashable identity of a Rust type, used as the registry key.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey { id: TypeId::of::<T>(), name: type_name::<T>() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Runtime shape of a type as seen by the mapper.
pub trait Described: 'static {
    fn descriptor() -> TypeDescriptor;
}

#[derive(Debug, Clone, Copy)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub key: TypeKey,
    pub shape: Shape,
}

#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Record(&'static [FieldSpec]),
    Scalar { kind: ScalarKind, nullable: bool },
}

impl TypeDescriptor {
    pub fn record<T: ?Sized + 'static>(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        TypeDescriptor { name, key: TypeKey::of::<T>(), shape: Shape::Record(fields) }
    }

    pub fn scalar<T: ?Sized + 'static>(kind: ScalarKind, nullable: bool) -> Self {
        TypeDescriptor { name: type_name::<T>(), key: TypeKey::of::<T>(), shape: Shape::Scalar { kind, nullable } }
    }

    pub fn fields(&self) -> Option<&'static [FieldSpec]> {
        match self.shape {
            Shape::Record(fields) => Some(fields),
            Shape::Scalar { .. } => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.shape, Shape::Record(_))
    }
}

/// How a struct field participates in persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Column { name: &'static str, primary_key: bool },
    /// No annotation: a nested record whose columns are spliced into the parent.
    Embedded,
    /// Relation-only field, populated by the resolver.
    Relation,
    Transient,
}

/// One annotated struct field, as declared.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub ty: Option<fn() -> TypeDescriptor>,
    pub relation: Option<RelationSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fetch {
    #[default]
    Eager,
    Lazy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// `#[relation(join = .., mapped_by = .., fetch_by = .., fetch = ..)]`
#[derive(Debug, Clone, Copy)]
pub struct RelationSpec {
    /// Related table for a direct relation, link table for an indirect one.
    pub join: &'static str,
    /// Column on the related/link side that correlates back to the owner.
    pub mapped_by: &'static str,
    /// Column projected from the link table.
    pub fetch_by: Option<&'static str>,
    pub fetch: Fetch,
    pub cardinality: Cardinality,
    pub target: Option<fn() -> TypeDescriptor>,
}

impl RelationSpec {
    pub fn is_lazy(&self) -> bool {
        self.fetch == Fetch::Lazy
    }
}

/// Flattened column produced by [`extract`].
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub column: &'static str,
    pub source_field: &'static str,
    pub ty: TypeDescriptor,
    pub primary_key: bool,
    pub relation: Option<RelationSpec>,
}

impl FieldDescriptor {
    pub fn scalar(&self) -> Option<(ScalarKind, bool)> {
        match self.ty.shape {
            Shape::Scalar { kind, nullable } => Some((kind, nullable)),
            Shape::Record(_) => None,
        }
    }
}

/// Top-level relation-only field of an entity.
#[derive(Debug, Clone, Copy)]
pub struct RelationField {
    pub field: &'static str,
    pub spec: RelationSpec,
}

fn record_fields(desc: &TypeDescriptor, path: &str) -> Result<&'static [FieldSpec], OrmError> {
    desc.fields().ok_or_else(|| OrmError::InvalidEntityKind { type_name: desc.name, path: path.to_string() })
}

/// Ordered column descriptors of `desc`, embedded records flattened in place.
pub fn extract(desc: &TypeDescriptor, include_key: bool) -> Result<Vec<FieldDescriptor>, OrmError> {
    let mut out = Vec::new();
    extract_into(desc, include_key, desc.name, &mut out)?;
    Ok(out)
}

fn extract_into(desc: &TypeDescriptor, include_key: bool, path: &str, out: &mut Vec<FieldDescriptor>) -> Result<(), OrmError> {
    for field in record_fields(desc, path)? {
        match field.kind {
            FieldKind::Column { name, primary_key } => {
                if primary_key && !include_key {
                    continue;
                }
                let ty = field.ty.map(|ty| ty()).ok_or_else(|| OrmError::InvalidEntityKind {
                    type_name: desc.name,
                    path: format!("{path}.{}", field.name),
                })?;
                out.push(FieldDescriptor { column: name, source_field: field.name, ty, primary_key, relation: field.relation });
            }
            FieldKind::Embedded => {
                let nested_path = format!("{path}.{}", field.name);
                let nested = field
                    .ty
                    .map(|ty| ty())
                    .ok_or_else(|| OrmError::InvalidEntityKind { type_name: desc.name, path: nested_path.clone() })?;
                extract_into(&nested, include_key, &nested_path, out)?;
            }
            FieldKind::Relation | FieldKind::Transient => {}
        }
    }
    Ok(())
}

/// Relation-only fields declared directly on `desc`.
pub fn relations(desc: &TypeDescriptor) -> Result<Vec<RelationField>, OrmError> {
    Ok(record_fields(desc, desc.name)?
        .iter()
        .filter(|f| f.kind == FieldKind::Relation)
        .filter_map(|f| f.relation.map(|spec| RelationField { field: f.name, spec }))
        .collect())
}

/// Key column declared directly on `desc`, if any.
pub fn key_column(desc: &TypeDescriptor) -> Result<Option<&'static str>, OrmError> {
    Ok(record_fields(desc, desc.name)?.iter().find_map(|f| match f.kind {
        FieldKind::Column { name, primary_key: true } => Some(name),
        _ => None,
    }))
}

/// Lookups over an extracted column list.
pub trait FieldList {
    fn by_column(&self, column: &str) -> Option<&FieldDescriptor>;
    fn joining<'a>(&'a self, table: &'a str) -> Box<dyn Iterator<Item = &'a FieldDescriptor> + 'a>;
    fn column_names(&self) -> Vec<&'static str>;
}

impl FieldList for [FieldDescriptor] {
    fn by_column(&self, column: &str) -> Option<&FieldDescriptor> {
        self.iter().find(|f| f.column == column)
    }

    fn joining<'a>(&'a self, table: &'a str) -> Box<dyn Iterator<Item = &'a FieldDescriptor> + 'a> {
        Box::new(self.iter().filter(move |f| f.relation.is_some_and(|r| r.join == table)))
    }

    fn column_names(&self) -> Vec<&'static str> {
        self.iter().map(|f| f.column).collect()
    }
}
