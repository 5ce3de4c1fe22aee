use crate::error::StoreError;
use crate::settings::DatabaseSettings;
use crate::value::{Row, Value};
use rusqlite::types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, ToSql, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The statement-running capability the mapper is built on.
///
/// Placeholders are positional (`$1`, `$2`, ...) and bind `params` in order. Implementations
/// must report a missing table as [`StoreError::MissingRelation`].
pub trait Executor {
    /// Runs a statement and returns the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, StoreError>;

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError>;

    /// Runs an insert whose first returned column is the generated key.
    fn insert_returning(&self, sql: &str, params: &[Value]) -> Result<i64, StoreError>;
}

impl<X: Executor + ?Sized> Executor for &X {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, StoreError> {
        (**self).execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        (**self).query(sql, params)
    }

    fn insert_returning(&self, sql: &str, params: &[Value]) -> Result<i64, StoreError> {
        (**self).insert_returning(sql, params)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(r) => ToSqlOutput::from(*r),
            Value::Text(t) => ToSqlOutput::from(t.as_str()),
            Value::Boolean(b) => ToSqlOutput::from(*b),
            Value::Date(d) => ToSqlOutput::from(d.format("%Y-%m-%d").to_string()),
            Value::Timestamp(ts) => ToSqlOutput::from(ts.to_rfc3339()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
            Value::Json(j) => ToSqlOutput::from(j.to_string()),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

fn classify(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.starts_with("no such table") => {
            StoreError::MissingRelation(msg.clone())
        }
        _ => StoreError::Sqlite(err),
    }
}

fn sqlite_execute(conn: &Connection, sql: &str, params: &[Value]) -> Result<usize, StoreError> {
    debug!(sql, params = params.len(), "execute");
    let mut stmt = conn.prepare(sql).map_err(classify)?;
    stmt.execute(params_from_iter(params.iter())).map_err(classify)
}

fn sqlite_query(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
    debug!(sql, params = params.len(), "query");
    let mut stmt = conn.prepare(sql).map_err(classify)?;
    let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect::<Vec<_>>().into();
    let mut rows = stmt.query(params_from_iter(params.iter())).map_err(classify)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(classify)? {
        let values = (0..columns.len()).map(|idx| row.get::<_, Value>(idx)).collect::<Result<Vec<_>, _>>()?;
        out.push(Row::new(Arc::clone(&columns), values));
    }
    Ok(out)
}

fn sqlite_insert_returning(conn: &Connection, sql: &str, params: &[Value]) -> Result<i64, StoreError> {
    debug!(sql, params = params.len(), "insert returning");
    let mut stmt = conn.prepare(sql).map_err(classify)?;
    let mut rows = stmt.query(params_from_iter(params.iter())).map_err(classify)?;
    match rows.next().map_err(classify)? {
        Some(row) => Ok(row.get::<_, i64>(0)?),
        None => Err(StoreError::NoKey),
    }
}

impl Executor for Connection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, StoreError> {
        sqlite_execute(self, sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        sqlite_query(self, sql, params)
    }

    fn insert_returning(&self, sql: &str, params: &[Value]) -> Result<i64, StoreError> {
        sqlite_insert_returning(self, sql, params)
    }
}

impl Executor for Transaction<'_> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, StoreError> {
        sqlite_execute(self, sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        sqlite_query(self, sql, params)
    }

    fn insert_returning(&self, sql: &str, params: &[Value]) -> Result<i64, StoreError> {
        sqlite_insert_returning(self, sql, params)
    }
}

/// Opens the SQLite database described by `settings` (`:memory:` for an in-memory one).
pub fn open_connection(settings: &DatabaseSettings) -> Result<Connection, StoreError> {
    let conn = if settings.path == ":memory:" {
        Connection::open_in_memory()?
    } else {
        Connection::open_with_flags(&settings.path, OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)?
    };
    conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;
    Ok(conn)
}
