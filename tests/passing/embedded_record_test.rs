#![allow(warnings)]

use ormbit::*;

#[derive(Clone, Debug, Default, PartialEq, Record)]
pub struct Audit {
    #[column(name = "created_by")]
    pub creator: String,
    #[column]
    pub revision: i32,
}

#[entity(table = "notes")]
pub struct Note {
    #[pk]
    pub id: i64,
    #[column]
    pub body: String,
    pub audit: Audit,
}

fn main() {
    let note = Note { id: 1, body: "b".to_string(), audit: Audit { creator: "ann".to_string(), revision: 2 } };
    assert_eq!(note.value_of("created_by"), Some(Value::Text("ann".to_string())));
    assert_eq!(Note::TABLE, Some("notes"));
}
