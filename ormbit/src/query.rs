use crate::error::{Intent, OrmError};
use crate::executor::Executor;
use crate::meta::{self, Described, FieldDescriptor, TypeDescriptor};
use crate::model::Record;
use crate::registry::Registry;
use crate::value::{Row, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Eq => "=",
            Op::Ge => ">=",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Lt => "<",
        })
    }
}

/// Connective written after a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Joiner {
    #[default]
    And,
    Or,
}

impl Joiner {
    fn neutral(&self) -> &'static str {
        match self {
            Joiner::And => "TRUE",
            Joiner::Or => "FALSE",
        }
    }
}

impl fmt::Display for Joiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Joiner::And => "AND",
            Joiner::Or => "OR",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: Op,
    pub value: Value,
    #[serde(default)]
    pub joiner: Joiner,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Filter { column: column.into(), op, value: value.into(), joiner: Joiner::And }
    }

    pub fn equal(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::new(column, Op::Eq, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::new(column, Op::Gt, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::new(column, Op::Lt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::new(column, Op::Ge, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::new(column, Op::Le, value)
    }

    /// Joins this filter to the next one with `OR`.
    pub fn or(mut self) -> Self {
        self.joiner = Joiner::Or;
        self
    }
}

/// `limit == 0` means unlimited. Negative values are rejected when the query is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Pagination {
    pub fn new(limit: i64, offset: i64) -> Self {
        Pagination { limit, offset }
    }

    pub fn all() -> Self {
        Pagination::default()
    }
}

/// A parameterized statement and the context reported when it fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
    pub intent: Intent,
    pub table: String,
}

impl Statement {
    pub fn with_intent(mut self, intent: Intent) -> Self {
        self.intent = intent;
        self
    }
}

struct Params(Vec<Value>);

impl Params {
    fn push(&mut self, value: Value) -> String {
        self.0.push(value);
        format!("${}", self.0.len())
    }
}

/// Builds statements for one registered entity type.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    descriptor: TypeDescriptor,
    key: Option<&'static str>,
}

impl QueryBuilder {
    pub fn for_entity<T: Described>(registry: &Registry) -> Result<Self, OrmError> {
        let descriptor = T::descriptor();
        let table = registry.table_of::<T>().ok_or(OrmError::UnregisteredEntity(descriptor.name))?;
        let key = meta::key_column(&descriptor)?;
        Ok(QueryBuilder { table, descriptor, key })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn statement(&self, sql: String, params: Vec<Value>, intent: Intent) -> Statement {
        Statement { sql, params, intent, table: self.table.clone() }
    }

    fn key(&self) -> Result<&'static str, OrmError> {
        self.key.ok_or(OrmError::MissingKey(self.descriptor.name))
    }

    /// Columns `record` supplies, key excluded.
    fn supplied<R: Record>(&self, record: &R) -> Result<Vec<(&'static str, Value)>, OrmError> {
        let fields: Vec<FieldDescriptor> = meta::extract(&self.descriptor, false)?;
        Ok(fields.iter().filter_map(|f| record.value_of(f.column).map(|v| (f.column, v))).collect())
    }

    fn paginate(sql: &mut String, params: &mut Params, pagination: Pagination) -> Result<(), OrmError> {
        if pagination.limit < 0 || pagination.offset < 0 {
            return Err(OrmError::InvalidPagination { limit: pagination.limit, offset: pagination.offset });
        }
        if pagination.limit != 0 {
            let n = params.push(Value::Integer(pagination.limit));
            sql.push_str(&format!(" LIMIT {n}"));
        }
        if pagination.offset != 0 {
            if pagination.limit == 0 {
                sql.push_str(" LIMIT -1");
            }
            let n = params.push(Value::Integer(pagination.offset));
            sql.push_str(&format!(" OFFSET {n}"));
        }
        Ok(())
    }

    /// `SELECT *` with an optional raw predicate whose placeholders bind `args`.
    /// A blank predicate selects every row.
    pub fn select(&self, predicate: Option<&str>, args: &[Value]) -> Statement {
        let sql = match predicate.map(str::trim).filter(|p| !p.is_empty()) {
            Some(predicate) => format!("SELECT * FROM {} WHERE {predicate}", self.table),
            None => format!("SELECT * FROM {}", self.table),
        };
        self.statement(sql, args.to_vec(), Intent::SelectMany)
    }

    pub fn find_by_key(&self, key: i64) -> Result<Statement, OrmError> {
        let sql = format!("SELECT * FROM {} WHERE {} = $1", self.table, self.key()?);
        Ok(self.statement(sql, vec![Value::Integer(key)], Intent::FindByKey))
    }

    pub fn find_all(&self, pagination: Pagination) -> Result<Statement, OrmError> {
        let mut sql = format!("SELECT * FROM {}", self.table);
        let mut params = Params(Vec::new());
        Self::paginate(&mut sql, &mut params, pagination)?;
        Ok(self.statement(sql, params.0, Intent::SelectMany))
    }

    /// Filters are joined in list order; the last joiner is closed with its neutral operand.
    pub fn find_by_filters(&self, filters: &[Filter], pagination: Pagination) -> Result<Statement, OrmError> {
        let mut sql = format!("SELECT * FROM {}", self.table);
        let mut params = Params(Vec::new());
        if let Some(last) = filters.last() {
            let clauses: Vec<String> = filters
                .iter()
                .map(|f| {
                    let n = params.push(f.value.clone());
                    format!("{} {} {n} {}", f.column, f.op, f.joiner)
                })
                .collect();
            sql.push_str(&format!(" WHERE {} {}", clauses.join(" "), last.joiner.neutral()));
        }
        Self::paginate(&mut sql, &mut params, pagination)?;
        Ok(self.statement(sql, params.0, Intent::FindByFilters))
    }

    /// Insert returning the generated key, or the rowid for keyless tables.
    pub fn insert_one<R: Record>(&self, record: &R) -> Result<Statement, OrmError> {
        let returning = self.key.unwrap_or("rowid");
        let supplied = self.supplied(record)?;
        if supplied.is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {returning}", self.table);
            return Ok(self.statement(sql, Vec::new(), Intent::InsertOne));
        }
        let mut params = Params(Vec::with_capacity(supplied.len()));
        let (columns, placeholders): (Vec<&str>, Vec<String>) =
            supplied.into_iter().map(|(column, value)| (column, params.push(value))).unzip();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {returning}",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok(self.statement(sql, params.0, Intent::InsertOne))
    }

    /// A single multi-row insert laid out after `records[0]`. Empty batches yield no statement.
    /// Records that supply no columns at all are inserted one `DEFAULT VALUES` statement each.
    pub fn insert_many<R: Record>(&self, records: &[R]) -> Result<Vec<Statement>, OrmError> {
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };
        let layout: Vec<&'static str> = self.supplied(first)?.into_iter().map(|(column, _)| column).collect();
        let mut params = Params(Vec::with_capacity(layout.len() * records.len()));
        let mut tuples = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let supplied = self.supplied(record)?;
            if supplied.len() != layout.len() || supplied.iter().zip(&layout).any(|((c, _), l)| c != l) {
                return Err(OrmError::HeterogeneousBatch { index });
            }
            let placeholders: Vec<String> = supplied.into_iter().map(|(_, value)| params.push(value)).collect();
            tuples.push(format!("({})", placeholders.join(", ")));
        }
        if layout.is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES", self.table);
            return Ok(records.iter().map(|_| self.statement(sql.clone(), Vec::new(), Intent::InsertMany)).collect());
        }
        let sql = format!("INSERT INTO {} ({}) VALUES {}", self.table, layout.join(", "), tuples.join(", "));
        Ok(vec![self.statement(sql, params.0, Intent::InsertMany)])
    }

    /// Sets every non-key column, keyed by the record's key column.
    pub fn update<R: Record>(&self, record: &R) -> Result<Statement, OrmError> {
        let key = self.key()?;
        let key_value = record.value_of(key).ok_or_else(|| OrmError::MissingColumn(key.to_string()))?;
        let mut params = Params(Vec::new());
        let mut assignments: Vec<String> =
            self.supplied(record)?.into_iter().map(|(column, value)| format!("{column} = {}", params.push(value))).collect();
        if assignments.is_empty() {
            assignments.push(format!("{key} = {key}"));
        }
        let n = params.push(key_value);
        let sql = format!("UPDATE {} SET {} WHERE {key} = {n}", self.table, assignments.join(", "));
        Ok(self.statement(sql, params.0, Intent::Update))
    }

    pub fn delete_by_key(&self, key: i64) -> Result<Statement, OrmError> {
        let sql = format!("DELETE FROM {} WHERE {} = $1", self.table, self.key()?);
        Ok(self.statement(sql, vec![Value::Integer(key)], Intent::Delete))
    }
}

pub fn fetch_all<X: Executor + ?Sized>(executor: &X, stmt: &Statement) -> Result<Vec<Row>, OrmError> {
    debug!(intent = %stmt.intent, table = %stmt.table, params = stmt.params.len(), "fetching rows");
    executor.query(&stmt.sql, &stmt.params).map_err(|e| OrmError::storage(stmt.intent, &stmt.table, e))
}

/// First row of the result, `NotFound` when there is none.
pub fn fetch_one<X: Executor + ?Sized>(executor: &X, stmt: &Statement) -> Result<Row, OrmError> {
    fetch_all(executor, stmt)?
        .into_iter()
        .next()
        .ok_or_else(|| OrmError::NotFound(format!("no row in `{}` while {}", stmt.table, stmt.intent)))
}

pub fn execute<X: Executor + ?Sized>(executor: &X, stmt: &Statement) -> Result<usize, OrmError> {
    debug!(intent = %stmt.intent, table = %stmt.table, params = stmt.params.len(), "executing");
    executor.execute(&stmt.sql, &stmt.params).map_err(|e| OrmError::storage(stmt.intent, &stmt.table, e))
}

pub fn insert_returning<X: Executor + ?Sized>(executor: &X, stmt: &Statement) -> Result<i64, OrmError> {
    debug!(intent = %stmt.intent, table = %stmt.table, params = stmt.params.len(), "inserting");
    executor.insert_returning(&stmt.sql, &stmt.params).map_err(|e| OrmError::storage(stmt.intent, &stmt.table, e))
}
