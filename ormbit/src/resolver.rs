//! Lazy association resolution.
//!
//! A relation field is resolved in two phases: a [`RelationPlan`] is derived once per
//! (entity type, field) from the registered metadata and cached in the registry, then the
//! relation is loaded with one query per relation for a whole batch of owners. A single owner
//! runs the plan's own `sql`; several owners are bound into one `IN ($1, ..., $n)` list and the
//! fetched rows are split back by owner value.

use crate::error::{Intent, OrmError};
use crate::executor::Executor;
use crate::meta::{self, Cardinality, FieldList, RelationField, TypeDescriptor, TypeKey};
use crate::model::Entity;
use crate::query::{self, Statement};
use crate::registry::Registry;
use crate::value::{Row, Value};
use std::sync::Arc;
use tracing::debug;

/// Owner values bound per batched statement, below SQLite's host parameter limit.
const BATCH_SIZE: usize = 500;

/// Alias of the link column carried by batched indirect rows.
const OWNER_ALIAS: &str = "ormbit_owner";

/// Link table hop of an indirect relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkPlan {
    pub table: String,
    /// Link column holding the owner's value.
    pub owner_column: &'static str,
    /// Link column projected into the related table's lookup.
    pub fetch_column: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPlan {
    pub field: &'static str,
    pub related_table: String,
    /// Related column compared against the owner value or the link projection.
    pub related_column: &'static str,
    /// Owner column whose value is bound as `$1`.
    pub source_column: &'static str,
    pub link: Option<LinkPlan>,
    pub many: bool,
    pub sql: String,
}

impl RelationPlan {
    /// Query loading the relation for `owners`. One owner uses [`RelationPlan::sql`].
    pub fn statement(&self, owners: &[Value]) -> Statement {
        let sql = if owners.len() == 1 { self.sql.clone() } else { self.batch_sql(owners.len()) };
        Statement { sql, params: owners.to_vec(), intent: Intent::ResolveRelation, table: self.related_table.clone() }
    }

    fn batch_sql(&self, owners: usize) -> String {
        let placeholders: Vec<String> = (1..=owners).map(|n| format!("${n}")).collect();
        let placeholders = placeholders.join(", ");
        let related = &self.related_table;
        match &self.link {
            None => format!("SELECT * FROM {related} WHERE {} IN ({placeholders})", self.related_column),
            Some(link) => format!(
                "SELECT {related}.*, {l}.{owner} AS {OWNER_ALIAS} FROM {related} JOIN {l} ON {related}.{} = {l}.{} WHERE {l}.{owner} IN ({placeholders}) ORDER BY {related}.rowid",
                self.related_column,
                link.fetch_column,
                l = link.table,
                owner = link.owner_column,
            ),
        }
    }

    /// Rows of a batched result that belong to `owner`.
    fn rows_of(&self, owner: &Value, rows: &[Row]) -> Result<Vec<Row>, OrmError> {
        let column = if self.link.is_some() { OWNER_ALIAS } else { self.related_column };
        let mut owned: Vec<Row> = Vec::new();
        for row in rows {
            if row.get(column)? != owner {
                continue;
            }
            // repeated link pairs collapse as in the single-owner form
            if self.link.is_some() && owned.last() == Some(row) {
                continue;
            }
            owned.push(row.clone());
        }
        Ok(owned)
    }
}

fn invalid(source: &TypeDescriptor, field: &'static str, reason: impl Into<String>) -> OrmError {
    OrmError::InvalidRelation { type_name: source.name, field, reason: reason.into() }
}

fn owner_key(source: &TypeDescriptor, field: &'static str) -> Result<&'static str, OrmError> {
    meta::key_column(source)?.ok_or_else(|| invalid(source, field, "owner declares no key column"))
}

/// Derives the plan for one relation-only field of `source`, stored in `source_table`.
pub fn plan(registry: &Registry, source: &TypeDescriptor, source_table: &str, relation: &RelationField) -> Result<RelationPlan, OrmError> {
    let spec = relation.spec;
    let joined = registry.entity_by_table(spec.join).ok_or_else(|| OrmError::RelationTargetUnregistered(spec.join.to_string()))?;
    let target = spec.target.map(|target| target()).unwrap_or(joined.descriptor);
    let related_table = registry.table_name(target.key).ok_or_else(|| OrmError::RelationTargetUnregistered(target.name.to_string()))?;
    let many = spec.cardinality == Cardinality::Many;

    if joined.key == target.key {
        let related_fields = meta::extract(&target, true)?;
        let mapped = related_fields
            .by_column(spec.mapped_by)
            .ok_or_else(|| invalid(source, relation.field, format!("`{related_table}` has no column `{}`", spec.mapped_by)))?;
        let source_fields = meta::extract(source, true)?;
        let foreign_key = source_fields
            .joining(&related_table)
            .find(|f| f.relation.is_some_and(|r| r.mapped_by == spec.mapped_by))
            .map(|f| f.column);
        let source_column = match (mapped.relation.filter(|r| r.join == source_table), foreign_key) {
            (Some(back_reference), _) => back_reference.mapped_by,
            (None, Some(column)) => column,
            (None, None) => owner_key(source, relation.field)?,
        };
        let comparison = if many { "IN ($1)" } else { "= $1" };
        let sql = format!("SELECT * FROM {related_table} WHERE {} {comparison}", spec.mapped_by);
        return Ok(RelationPlan {
            field: relation.field,
            related_table,
            related_column: spec.mapped_by,
            source_column,
            link: None,
            many,
            sql,
        });
    }

    let link_fields = meta::extract(&joined.descriptor, true)?;
    let fetch_column = match spec.fetch_by {
        Some(column) => column,
        None => link_fields
            .joining(&related_table)
            .next()
            .map(|f| f.column)
            .ok_or_else(|| invalid(source, relation.field, format!("`{}` has no column joining `{related_table}`", spec.join)))?,
    };
    let fetched = link_fields
        .by_column(fetch_column)
        .ok_or_else(|| invalid(source, relation.field, format!("`{}` has no column `{fetch_column}`", spec.join)))?;
    let related_column = match fetched.relation.filter(|r| r.join == related_table) {
        Some(r) => r.mapped_by,
        None => meta::key_column(&target)?.ok_or_else(|| invalid(source, relation.field, format!("{} declares no key column", target.name)))?,
    };
    let owner = link_fields
        .by_column(spec.mapped_by)
        .ok_or_else(|| invalid(source, relation.field, format!("`{}` has no column `{}`", spec.join, spec.mapped_by)))?;
    let source_column = match owner.relation.filter(|r| r.join == source_table) {
        Some(r) => r.mapped_by,
        None => owner_key(source, relation.field)?,
    };
    let sql = format!(
        "SELECT * FROM {related_table} WHERE {related_column} IN (SELECT {fetch_column} FROM {} WHERE {} = $1)",
        spec.join, spec.mapped_by
    );
    Ok(RelationPlan {
        field: relation.field,
        related_table,
        related_column,
        source_column,
        link: Some(LinkPlan { table: spec.join.to_string(), owner_column: spec.mapped_by, fetch_column }),
        many,
        sql,
    })
}

fn cached_plan(registry: &Registry, source: &TypeDescriptor, source_table: &str, relation: &RelationField) -> Result<Arc<RelationPlan>, OrmError> {
    if let Some(plan) = registry.cached_plan(source.key, relation.field) {
        return Ok(plan);
    }
    let derived = plan(registry, source, source_table, relation)?;
    debug!(entity = source.name, field = relation.field, sql = %derived.sql, "derived relation plan");
    Ok(registry.cache_plan(source.key, relation.field, derived))
}

/// Populates every lazy relation field of `entity`. Eager fields are left untouched.
pub fn resolve<T: Entity, X: Executor + ?Sized>(registry: &Registry, executor: &X, entity: &mut T) -> Result<(), OrmError> {
    resolve_all(registry, executor, std::slice::from_mut(entity))
}

pub fn resolve_all<T: Entity, X: Executor + ?Sized>(registry: &Registry, executor: &X, entities: &mut [T]) -> Result<(), OrmError> {
    let source = T::descriptor();
    let lazy: Vec<RelationField> = meta::relations(&source)?.into_iter().filter(|r| r.spec.is_lazy()).collect();
    if lazy.is_empty() || entities.is_empty() {
        return Ok(());
    }
    let source_table = registry.table_name(TypeKey::of::<T>()).ok_or(OrmError::UnregisteredEntity(source.name))?;
    for relation in &lazy {
        let plan = cached_plan(registry, &source, &source_table, relation)?;
        let owners = entities
            .iter()
            .map(|e| e.value_of(plan.source_column).ok_or_else(|| OrmError::MissingColumn(plan.source_column.to_string())))
            .collect::<Result<Vec<Value>, OrmError>>()?;
        let mut distinct: Vec<Value> = Vec::new();
        for owner in owners.iter().filter(|v| !v.is_null()) {
            if !distinct.contains(owner) {
                distinct.push(owner.clone());
            }
        }
        // single-owner chunks run the plan's own sql, whose rows all belong to that owner
        let mut fetched: Vec<(Option<&Value>, Vec<Row>)> = Vec::new();
        for chunk in distinct.chunks(BATCH_SIZE) {
            let single = if chunk.len() == 1 { chunk.first() } else { None };
            fetched.push((single, query::fetch_all(executor, &plan.statement(chunk))?));
        }
        for (entity, owner) in entities.iter_mut().zip(&owners) {
            let mut owned = Vec::new();
            for (single, rows) in &fetched {
                match single {
                    Some(single) if *single == owner => owned.extend(rows.iter().cloned()),
                    Some(_) => {}
                    None => owned.extend(plan.rows_of(owner, rows)?),
                }
            }
            entity.assign_relation(plan.field, &owned)?;
        }
    }
    Ok(())
}
