use crate::error::{Intent, OrmError};
use crate::executor::Executor;
use crate::meta::{self, FieldDescriptor, FieldList, TypeDescriptor};
use crate::registry::Registry;
use crate::value::ScalarKind;
use tracing::{debug, info};

fn sql_type(kind: ScalarKind) -> Option<&'static str> {
    match kind {
        ScalarKind::Integer => Some("INTEGER"),
        ScalarKind::Real => Some("REAL"),
        ScalarKind::Text | ScalarKind::Json => Some("TEXT"),
        ScalarKind::Boolean => Some("BOOLEAN"),
        ScalarKind::Date => Some("DATE"),
        ScalarKind::Timestamp => Some("TIMESTAMP"),
        ScalarKind::Blob => Some("BLOB"),
        ScalarKind::Dynamic => None,
    }
}

/// Column type of the related column a `Dynamic` field points at. One level only.
fn related_sql_type(registry: &Registry, field: &FieldDescriptor) -> Option<&'static str> {
    let spec = field.relation?;
    let related = match spec.target {
        Some(target) => target(),
        None => registry.entity_by_table(spec.join)?.descriptor,
    };
    let related_fields = meta::extract(&related, true).ok()?;
    let mapped = related_fields.by_column(spec.mapped_by)?;
    if mapped.primary_key {
        return Some("INTEGER");
    }
    mapped.scalar().and_then(|(kind, _)| sql_type(kind))
}

fn column_definition(registry: &Registry, owner: &TypeDescriptor, field: &FieldDescriptor) -> Result<String, OrmError> {
    let unmapped = |kind| OrmError::UnmappedColumnKind { type_name: owner.name, column: field.column, kind };
    let (kind, nullable) = field.scalar().ok_or_else(|| unmapped(ScalarKind::Dynamic))?;
    let sql = match kind {
        ScalarKind::Dynamic => related_sql_type(registry, field),
        other => sql_type(other),
    }
    .ok_or_else(|| unmapped(kind))?;
    if field.primary_key {
        return Ok(match sql {
            "INTEGER" => format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", field.column),
            other => format!("{} {other} PRIMARY KEY", field.column),
        });
    }
    Ok(if nullable { format!("{} {sql}", field.column) } else { format!("{} {sql} NOT NULL", field.column) })
}

/// `CREATE TABLE IF NOT EXISTS` statement for `descriptor`, key column included.
pub fn create_table_sql(registry: &Registry, descriptor: &TypeDescriptor, table: &str) -> Result<String, OrmError> {
    let columns = meta::extract(descriptor, true)?
        .iter()
        .map(|field| column_definition(registry, descriptor, field))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("CREATE TABLE IF NOT EXISTS {table} ({})", columns.join(", ")))
}

/// Creates `table` when it does not exist yet. Existing tables are left as they are.
/// Returns whether a table was created.
pub fn ensure_table<X: Executor + ?Sized>(
    executor: &X,
    registry: &Registry,
    descriptor: &TypeDescriptor,
    table: &str,
) -> Result<bool, OrmError> {
    match executor.query(&format!("SELECT 1 FROM {table} LIMIT 1"), &[]) {
        Ok(_) => {
            debug!(table, "table exists");
            Ok(false)
        }
        Err(e) if e.is_missing_relation() => {
            let sql = create_table_sql(registry, descriptor, table)?;
            executor.execute(&sql, &[]).map_err(|e| OrmError::storage(Intent::CreateTable, table, e))?;
            info!(table, entity = descriptor.name, "created table");
            Ok(true)
        }
        Err(e) => Err(OrmError::storage(Intent::Probe, table, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{Cardinality, Described, Fetch, FieldKind, FieldSpec, RelationSpec};
    use crate::value::Value;
    use rusqlite::Connection;

    struct Owner;
    struct Pet;
    struct Tag;

    fn owner() -> TypeDescriptor {
        static FIELDS: &[FieldSpec] = &[
            FieldSpec { name: "id", kind: FieldKind::Column { name: "id", primary_key: true }, ty: Some(<i64 as Described>::descriptor), relation: None },
            FieldSpec { name: "name", kind: FieldKind::Column { name: "name", primary_key: false }, ty: Some(<String as Described>::descriptor), relation: None },
            FieldSpec { name: "born", kind: FieldKind::Column { name: "born", primary_key: false }, ty: Some(<Option<chrono::NaiveDate> as Described>::descriptor), relation: None },
        ];
        TypeDescriptor::record::<Owner>("Owner", FIELDS)
    }

    fn pet() -> TypeDescriptor {
        static FIELDS: &[FieldSpec] = &[
            FieldSpec { name: "id", kind: FieldKind::Column { name: "id", primary_key: true }, ty: Some(<i64 as Described>::descriptor), relation: None },
            FieldSpec {
                name: "owner",
                kind: FieldKind::Column { name: "owner_id", primary_key: false },
                ty: Some(<Value as Described>::descriptor),
                relation: Some(RelationSpec { join: "owners", mapped_by: "id", fetch_by: None, fetch: Fetch::Eager, cardinality: Cardinality::One, target: Some(owner) }),
            },
            FieldSpec {
                name: "nick",
                kind: FieldKind::Column { name: "nick", primary_key: false },
                ty: Some(<Option<Value> as Described>::descriptor),
                relation: Some(RelationSpec { join: "owners", mapped_by: "name", fetch_by: None, fetch: Fetch::Eager, cardinality: Cardinality::One, target: None }),
            },
        ];
        TypeDescriptor::record::<Pet>("Pet", FIELDS)
    }

    fn tag() -> TypeDescriptor {
        static FIELDS: &[FieldSpec] = &[FieldSpec {
            name: "payload",
            kind: FieldKind::Column { name: "payload", primary_key: false },
            ty: Some(<Value as Described>::descriptor),
            relation: None,
        }];
        TypeDescriptor::record::<Tag>("Tag", FIELDS)
    }

    #[test]
    fn scalar_kinds_map_to_column_types() {
        let sql = create_table_sql(&Registry::new(), &owner(), "owners").unwrap();
        assert_eq!(sql, "CREATE TABLE IF NOT EXISTS owners (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, born DATE)");
    }

    #[test]
    fn dynamic_relation_columns_take_the_related_type() {
        let registry = Registry::new();
        registry.bind(&owner(), "owners").unwrap();
        let sql = create_table_sql(&registry, &pet(), "pets").unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS pets (id INTEGER PRIMARY KEY AUTOINCREMENT, owner_id INTEGER NOT NULL, nick TEXT)"
        );
    }

    #[test]
    fn dynamic_column_without_relation_is_unmapped() {
        let err = create_table_sql(&Registry::new(), &tag(), "tags").unwrap_err();
        assert!(matches!(err, OrmError::UnmappedColumnKind { column: "payload", kind: ScalarKind::Dynamic, .. }));
    }

    #[test]
    fn dynamic_column_with_unregistered_join_is_unmapped() {
        let err = create_table_sql(&Registry::new(), &pet(), "pets").unwrap_err();
        assert!(matches!(err, OrmError::UnmappedColumnKind { column: "nick", .. }));
    }

    #[test]
    fn existing_tables_are_left_alone() {
        let conn = Connection::open_in_memory().unwrap();
        let registry = Registry::new();
        assert!(ensure_table(&conn, &registry, &owner(), "owners").unwrap());
        assert!(!ensure_table(&conn, &registry, &owner(), "owners").unwrap());
    }
}
