use ormbit::Entity;

#[derive(Entity)]
struct Author {
    #[pk]
    id: i64,
    #[relation(mapped_by = "author_id", fetch = "lazy")]
    books: Option<Vec<i64>>,
}

fn main() {}
