use ormbit::Entity;

#[derive(Entity)]
struct Cached {
    #[pk]
    id: i64,
    #[column]
    #[transient]
    size: i64,
}

fn main() {}
