use crate::value::ScalarKind;
use config::ConfigError;
use std::fmt;
use thiserror::Error;

/// What a statement was trying to do, carried into storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Probe,
    CreateTable,
    SelectOne,
    SelectMany,
    FindByKey,
    FindByFilters,
    InsertOne,
    InsertMany,
    Update,
    Delete,
    ResolveRelation,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Intent::Probe => "probing table",
            Intent::CreateTable => "creating table",
            Intent::SelectOne => "selecting one row",
            Intent::SelectMany => "selecting rows",
            Intent::FindByKey => "finding by key",
            Intent::FindByFilters => "finding by filters",
            Intent::InsertOne => "inserting row",
            Intent::InsertMany => "inserting rows",
            Intent::Update => "updating row",
            Intent::Delete => "deleting row",
            Intent::ResolveRelation => "resolving relation",
        };
        f.write_str(s)
    }
}

/// Failures reported by an [`Executor`](crate::Executor).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("relation does not exist: {0}")]
    MissingRelation(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("statement returned no generated key")]
    NoKey,
}

impl StoreError {
    pub fn is_missing_relation(&self) -> bool {
        matches!(self, StoreError::MissingRelation(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected} value, found {found}")]
pub struct ValueError {
    pub expected: ScalarKind,
    pub found: String,
}

impl ValueError {
    pub fn new(expected: ScalarKind, found: impl Into<String>) -> Self {
        ValueError { expected, found: found.into() }
    }
}

#[derive(Debug, Error)]
pub enum OrmError {
    #[error("entity {0} is not registered with any table")]
    UnregisteredEntity(&'static str),

    #[error("{type_name} is not a structured record (reached through `{path}`)")]
    InvalidEntityKind { type_name: &'static str, path: String },

    #[error("relation target `{0}` has no registered entity")]
    RelationTargetUnregistered(String),

    #[error("storage error while {intent} on `{table}`: {source}")]
    Storage {
        intent: Intent,
        table: String,
        #[source]
        source: StoreError,
    },

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("column `{column}` of {type_name} has kind {kind} which maps to no column type")]
    UnmappedColumnKind { type_name: &'static str, column: &'static str, kind: ScalarKind },

    #[error("batch record #{index} does not share the column layout of the first record")]
    HeterogeneousBatch { index: usize },

    #[error("table `{table}` is already bound to {bound}, cannot bind {requested}")]
    TableConflict { table: String, bound: &'static str, requested: &'static str },

    #[error("relation `{field}` of {type_name}: {reason}")]
    InvalidRelation { type_name: &'static str, field: &'static str, reason: String },

    #[error("column `{column}`: {source}")]
    Decode {
        column: String,
        #[source]
        source: ValueError,
    },

    #[error("{type_name} has no relation field `{field}`")]
    UnknownRelation { type_name: &'static str, field: String },

    #[error("entity {0} declares no key column")]
    MissingKey(&'static str),

    #[error("pagination must not be negative (limit {limit}, offset {offset})")]
    InvalidPagination { limit: i64, offset: i64 },

    #[error("row has no column `{0}`")]
    MissingColumn(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl OrmError {
    pub fn storage(intent: Intent, table: impl Into<String>, source: StoreError) -> Self {
        OrmError::Storage { intent, table: table.into(), source }
    }

    pub fn decode(column: impl Into<String>, source: ValueError) -> Self {
        OrmError::Decode { column: column.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OrmError::NotFound(_))
    }
}
