use crate::error::{OrmError, ValueError};
use crate::meta::{Described, TypeDescriptor};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Closed set of column kinds a scalar field can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Integer,
    Real,
    Text,
    Boolean,
    Date,
    Timestamp,
    Blob,
    Json,
    /// Untyped value; its column type can only be inferred through a relation.
    Dynamic,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single bound parameter or fetched cell.
///
/// Fetched cells only ever carry SQLite storage classes (`Null`, `Integer`, `Real`, `Text`,
/// `Blob`). `Boolean` is stored as `Integer`, while `Date`, `Timestamp` and `Json` are stored as
/// `Text`; typed fields convert back through [`Scalar::from_value`], but a `Value` field
/// (`ScalarKind::Dynamic`) reads back the storage class.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Blob(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn describe(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => format!("integer {i}"),
            Value::Real(r) => format!("real {r}"),
            Value::Text(t) => format!("text {t:?}"),
            Value::Boolean(b) => format!("boolean {b}"),
            Value::Date(d) => format!("date {d}"),
            Value::Timestamp(ts) => format!("timestamp {ts}"),
            Value::Blob(b) => format!("blob of {} bytes", b.len()),
            Value::Json(j) => format!("json {j}"),
        }
    }
}

macro_rules! impl_value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_value_from!(
    i8 => Integer, i16 => Integer, i32 => Integer, i64 => Integer,
    u8 => Integer, u16 => Integer, u32 => Integer,
    f32 => Real, f64 => Real,
    String => Text, bool => Boolean,
    NaiveDate => Date, DateTime<Utc> => Timestamp,
    Vec<u8> => Blob, serde_json::Value => Json,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Conversion between a Rust field type and a [`Value`].
pub trait Scalar: Sized + 'static {
    const KIND: ScalarKind;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;
    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

macro_rules! impl_integer_scalar {
    ($($t:ty),*) => {
        $(
            impl Scalar for $t {
                const KIND: ScalarKind = ScalarKind::Integer;

                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: &Value) -> Result<Self, ValueError> {
                    match value {
                        Value::Integer(i) => <$t>::try_from(*i)
                            .map_err(|_| ValueError::new(ScalarKind::Integer, format!("{i} out of range for {}", stringify!($t)))),
                        Value::Boolean(b) => Ok(<$t>::from(*b)),
                        other => Err(ValueError::new(ScalarKind::Integer, other.describe())),
                    }
                }
            }
        )*
    };
}

impl_integer_scalar!(i8, i16, i32, i64, u8, u16, u32);

impl Scalar for f64 {
    const KIND: ScalarKind = ScalarKind::Real;

    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Real(r) => Ok(*r),
            Value::Integer(i) => Ok(*i as f64),
            other => Err(ValueError::new(ScalarKind::Real, other.describe())),
        }
    }
}

impl Scalar for f32 {
    const KIND: ScalarKind = ScalarKind::Real;

    fn to_value(&self) -> Value {
        Value::Real(f64::from(*self))
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        f64::from_value(value).map(|r| r as f32)
    }
}

impl Scalar for String {
    const KIND: ScalarKind = ScalarKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(t) => Ok(t.clone()),
            other => Err(ValueError::new(ScalarKind::Text, other.describe())),
        }
    }
}

impl Scalar for bool {
    const KIND: ScalarKind = ScalarKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => Err(ValueError::new(ScalarKind::Boolean, other.describe())),
        }
    }
}

impl Scalar for NaiveDate {
    const KIND: ScalarKind = ScalarKind::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::Text(t) => NaiveDate::parse_from_str(t, "%Y-%m-%d")
                .map_err(|e| ValueError::new(ScalarKind::Date, format!("{t:?} ({e})"))),
            other => Err(ValueError::new(ScalarKind::Date, other.describe())),
        }
    }
}

impl Scalar for DateTime<Utc> {
    const KIND: ScalarKind = ScalarKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::Text(t) => DateTime::parse_from_rfc3339(t)
                .map(|ts| ts.with_timezone(&Utc))
                .or_else(|_| NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S").map(|naive| naive.and_utc()))
                .map_err(|e| ValueError::new(ScalarKind::Timestamp, format!("{t:?} ({e})"))),
            other => Err(ValueError::new(ScalarKind::Timestamp, other.describe())),
        }
    }
}

impl Scalar for Vec<u8> {
    const KIND: ScalarKind = ScalarKind::Blob;

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Blob(b) => Ok(b.clone()),
            other => Err(ValueError::new(ScalarKind::Blob, other.describe())),
        }
    }
}

impl Scalar for serde_json::Value {
    const KIND: ScalarKind = ScalarKind::Json;

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::Text(t) => serde_json::from_str(t).map_err(|e| ValueError::new(ScalarKind::Json, e.to_string())),
            other => Err(ValueError::new(ScalarKind::Json, other.describe())),
        }
    }
}

/// Stored as given, read back as its storage class.
impl Scalar for Value {
    const KIND: ScalarKind = ScalarKind::Dynamic;

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(value.clone())
    }
}

impl<T: Scalar> Scalar for Option<T> {
    const KIND: ScalarKind = T::KIND;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! impl_scalar_described {
    ($($t:ty),* $(,)?) => {
        $(
            impl Described for $t {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::scalar::<Self>(<Self as Scalar>::KIND, <Self as Scalar>::NULLABLE)
                }
            }
        )*
    };
}

impl_scalar_described!(
    i8, i16, i32, i64, u8, u16, u32, f32, f64,
    String, bool, NaiveDate, DateTime<Utc>, Vec<u8>, serde_json::Value, Value,
);

impl<T: Scalar> Described for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::scalar::<Self>(T::KIND, true)
    }
}

/// One fetched row: column names shared across the result set, values in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Row { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Result<&Value, OrmError> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| OrmError::MissingColumn(column.to_string()))
    }

    /// Decodes the named column into a scalar field type.
    pub fn decode<T: Scalar>(&self, column: &str) -> Result<T, OrmError> {
        T::from_value(self.get(column)?).map_err(|e| OrmError::decode(column, e))
    }
}
