use ormbit::Entity;

#[derive(Entity)]
struct Author {
    #[pk]
    id: i64,
    #[relation(join = "books")]
    books: Vec<i64>,
}

fn main() {}
