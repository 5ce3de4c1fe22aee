use ormbit::Entity;

#[derive(Entity)]
struct Author {
    #[pk]
    id: i64,
    #[relation(join = "books", mapped_by = "author_id")]
    books: i64,
}

fn main() {}
