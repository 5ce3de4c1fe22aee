#![allow(warnings)]

use ormbit::*;

#[entity]
pub struct Author {
    #[pk]
    pub id: i64,
    #[column]
    pub name: String,
    #[relation(join = "books", mapped_by = "author_id", fetch = "lazy")]
    pub books: Option<Vec<Book>>,
    #[relation(join = "author_tags", mapped_by = "author_id", fetch = "lazy", target = Tag)]
    pub tags: Vec<Tag>,
    #[relation(join = "books", mapped_by = "author_id")]
    pub first_book: Option<Book>,
}

#[entity]
pub struct Book {
    #[pk]
    pub id: i64,
    #[column]
    #[relation(join = "authors", mapped_by = "id")]
    pub author_id: Value,
}

#[entity]
pub struct Tag {
    #[pk]
    pub id: i64,
}

#[entity]
#[table(name = "author_tags")]
pub struct AuthorTag {
    #[column]
    #[relation(join = "authors", mapped_by = "id")]
    pub author_id: i64,
    #[column]
    #[relation(join = "tags", mapped_by = "id")]
    pub tag_id: i64,
}

fn main() {
    let descriptor = Author::descriptor();
    assert!(descriptor.is_record());
    assert_eq!(AuthorTag::TABLE, Some("author_tags"));
}
