use crate::error::OrmError;
use crate::executor::Executor;
use crate::meta::Described;
use crate::registry::Registry;
use crate::value::{Row, Value};

/// A struct whose columns can be read from a row and bound as parameters.
/// Derived by `#[derive(Record)]` for embedded records and by `#[derive(Entity)]`.
pub trait Record: Described + Sized {
    /// Value bound for `column`, `None` when this record does not supply it.
    fn value_of(&self, column: &str) -> Option<Value>;

    fn from_row(row: &Row) -> Result<Self, OrmError>;
}

/// A record persisted in its own table.
pub trait Entity: Record {
    /// Table override from `#[table(name = "...")]`.
    const TABLE: Option<&'static str> = None;

    /// Replaces a relation-only field with the decoded `rows`.
    fn assign_relation(&mut self, field: &str, rows: &[Row]) -> Result<(), OrmError>;

    fn bootstrap(registry: &Registry, executor: &dyn Executor) -> Result<String, OrmError> {
        registry.register::<Self, dyn Executor>(executor)
    }
}

/// Collected for every `#[derive(Entity)]`, see [`Registry::register_all`].
pub struct EntityInfo {
    pub name: &'static str,
    pub bootstrap: fn(&Registry, &dyn Executor) -> Result<String, OrmError>,
}

inventory::collect!(EntityInfo);

pub fn decode_all<R: Record>(rows: &[Row]) -> Result<Vec<R>, OrmError> {
    rows.iter().map(R::from_row).collect()
}

pub fn decode_first<R: Record>(rows: &[Row]) -> Result<Option<R>, OrmError> {
    rows.first().map(R::from_row).transpose()
}
