use ormbit::Entity;

#[derive(Entity)]
struct DoublePk {
    #[pk]
    first: i64,
    #[pk]
    second: i64,
}

fn main() {}
