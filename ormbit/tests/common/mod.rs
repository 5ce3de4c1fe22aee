#![allow(dead_code)]

use ormbit::meta::{FieldKind, FieldSpec};
use ormbit::*;
use parking_lot::Mutex;
use rusqlite::Connection;

#[entity]
pub struct User {
    #[pk]
    pub id: i64,
    #[column]
    pub name: String,
    #[column]
    pub email: Option<String>,
    #[relation(join = "documents", mapped_by = "user_id", fetch = "lazy")]
    pub documents: Option<Vec<Document>>,
    #[relation(join = "user_roles", mapped_by = "user_id", fetch = "lazy", target = Role)]
    pub roles: Option<Vec<Role>>,
    #[relation(join = "documents", mapped_by = "user_id")]
    pub drafts: Vec<Document>,
}

#[entity]
pub struct Document {
    #[pk]
    pub id: i64,
    #[column]
    pub title: String,
    #[column]
    pub views: i64,
    #[column]
    #[relation(join = "users", mapped_by = "id")]
    pub user_id: i64,
    #[relation(join = "users", mapped_by = "id", fetch = "lazy")]
    pub owner: Option<User>,
}

#[entity]
pub struct Role {
    #[pk]
    pub id: i64,
    #[column]
    pub name: String,
}

#[entity(table = "user_roles")]
pub struct UserRole {
    #[column]
    #[relation(join = "users", mapped_by = "id")]
    pub user_id: i64,
    #[column]
    #[relation(join = "roles", mapped_by = "id")]
    pub role_id: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Record)]
pub struct Audit {
    #[column(name = "created_by")]
    pub creator: String,
    #[column]
    pub created_on: Option<chrono::NaiveDate>,
}

#[entity]
pub struct Note {
    #[pk]
    pub id: i64,
    #[column]
    pub body: String,
    #[column]
    pub pinned: bool,
    #[column]
    pub score: f64,
    #[column]
    pub attrs: serde_json::Value,
    #[column]
    pub digest: Vec<u8>,
    pub audit: Audit,
    #[transient]
    pub cached_len: usize,
}

#[entity]
pub struct Comment {
    #[pk]
    pub id: i64,
    #[column]
    #[relation(join = "documents", mapped_by = "id", target = Document)]
    pub document_id: Value,
    #[column]
    #[relation(join = "users", mapped_by = "name", target = User)]
    pub author: Option<Value>,
}

/// Hand-written entity whose `meta` field claims to embed a scalar.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Broken {
    pub id: i64,
}

impl Described for Broken {
    fn descriptor() -> TypeDescriptor {
        static FIELDS: &[FieldSpec] = &[
            FieldSpec { name: "id", kind: FieldKind::Column { name: "id", primary_key: true }, ty: Some(<i64 as Described>::descriptor), relation: None },
            FieldSpec { name: "meta", kind: FieldKind::Embedded, ty: Some(<i64 as Described>::descriptor), relation: None },
        ];
        TypeDescriptor::record::<Broken>("Broken", FIELDS)
    }
}

impl Record for Broken {
    fn value_of(&self, column: &str) -> Option<Value> {
        (column == "id").then(|| Value::Integer(self.id))
    }

    fn from_row(row: &Row) -> Result<Self, OrmError> {
        Ok(Broken { id: row.decode("id")? })
    }
}

impl Entity for Broken {
    fn assign_relation(&mut self, _field: &str, _rows: &[Row]) -> Result<(), OrmError> {
        Ok(())
    }
}

/// Shared in-memory connection that remembers every statement it ran.
pub struct RecordingExecutor {
    conn: Mutex<Connection>,
    statements: Mutex<Vec<String>>,
}

impl RecordingExecutor {
    pub fn in_memory() -> Self {
        RecordingExecutor { conn: Mutex::new(Connection::open_in_memory().unwrap()), statements: Mutex::new(Vec::new()) }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn count_starting_with(&self, prefix: &str) -> usize {
        self.statements.lock().iter().filter(|sql| sql.starts_with(prefix)).count()
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize, StoreError> {
        self.statements.lock().push(sql.to_string());
        Executor::execute(&*self.conn.lock(), sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        self.statements.lock().push(sql.to_string());
        self.conn.lock().query(sql, params)
    }

    fn insert_returning(&self, sql: &str, params: &[Value]) -> Result<i64, StoreError> {
        self.statements.lock().push(sql.to_string());
        self.conn.lock().insert_returning(sql, params)
    }
}

pub fn user(name: &str) -> User {
    User { name: name.to_string(), ..Default::default() }
}

pub fn document(title: &str, views: i64, user_id: i64) -> Document {
    Document { title: title.to_string(), views, user_id, ..Default::default() }
}
