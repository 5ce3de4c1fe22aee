//! ormbit reads struct annotations and derives the metadata needed for persisting and querying
//! entities in SQLite through [rusqlite](https://github.com/rusqlite/rusqlite).
//!
//! Tables are created on first use, filters and pagination are turned into parameterized SQL,
//! and relation fields marked `fetch = "lazy"` are resolved on demand, either directly through a
//! foreign key column or through a link table.
//!

extern crate self as ormbit;

pub mod error;
pub mod executor;
pub mod handle;
pub mod logger;
pub mod meta;
pub mod model;
pub mod naming;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod settings;
pub mod value;

pub use chrono;
pub use error::{Intent, OrmError, StoreError, ValueError};
pub use executor::{open_connection, Executor};
pub use handle::Handle;
pub use inventory;
pub use macros::entity;
pub use macros::Entity;
pub use macros::Record;
pub use meta::{Cardinality, Described, Fetch, FieldDescriptor, FieldKind, FieldSpec, RelationSpec, Shape, TypeDescriptor, TypeKey};
pub use model::{decode_all, decode_first, Entity, EntityInfo, Record};
pub use query::{Filter, Joiner, Op, Pagination, QueryBuilder, Statement};
pub use registry::Registry;
pub use rusqlite;
pub use serde_json;
pub use settings::OrmSettings;
pub use value::{Row, Scalar, ScalarKind, Value};
