#![allow(warnings)]

use ormbit::*;

#[entity]
struct TransientAnnotationStruct {
    #[pk]
    id: i64,
    #[column]
    pub foo: u32,
    #[transient]
    name: String,
}

fn main() {
    let t = TransientAnnotationStruct { id: 1, name: "foo".to_string(), foo: 3 };
    assert_eq!(t.value_of("name"), None);
}
