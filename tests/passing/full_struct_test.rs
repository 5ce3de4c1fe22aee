#![allow(warnings)]

use ormbit::*;

#[entity]
pub struct FullStruct {
    #[pk]
    pub id: i64,
    #[column]
    pub amount: u32,
    #[column(name = "label")]
    pub title: String,
    #[column]
    pub ratio: Option<f64>,
    #[column]
    pub active: bool,
    #[column]
    pub created: chrono::NaiveDate,
    #[column]
    pub seen_at: Option<chrono::DateTime<chrono::Utc>>,
    #[column]
    pub payload: Vec<u8>,
    #[column]
    pub attrs: serde_json::Value,
}

fn main() {
    let full = FullStruct { id: 4, amount: 45, title: "t".to_string(), ..Default::default() };
    assert_eq!(full.value_of("label"), Some(Value::Text("t".to_string())));
    assert_eq!(FullStruct::TABLE, None);
}
