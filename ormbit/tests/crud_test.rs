mod common;

use common::*;
use ormbit::*;
use pretty_assertions::assert_eq;
use rusqlite::Connection;

fn setup() -> (Connection, Registry) {
    let conn = Connection::open_in_memory().unwrap();
    let registry = Registry::new();
    registry.register_all(&conn).unwrap();
    (conn, registry)
}

#[test]
fn inserted_entity_reads_back_equal() {
    let (conn, registry) = setup();
    let notes = registry.handle::<Note, _>(&conn);
    let mut note = Note {
        body: "hello".to_string(),
        pinned: true,
        score: 0.5,
        attrs: serde_json::json!({"tags": ["a", "b"]}),
        digest: vec![1, 2, 3],
        audit: Audit { creator: "ann".to_string(), created_on: chrono::NaiveDate::from_ymd_opt(2024, 5, 1) },
        ..Default::default()
    };
    note.id = notes.insert(&note).unwrap();
    assert_eq!(notes.find_by_key(note.id).unwrap(), note);
}

#[test]
fn transient_fields_are_not_persisted() {
    let (conn, registry) = setup();
    let notes = registry.handle::<Note, _>(&conn);
    let id = notes.insert(&Note { body: "x".to_string(), cached_len: 99, ..Default::default() }).unwrap();
    assert_eq!(notes.find_by_key(id).unwrap().cached_len, 0);
}

#[test]
fn missing_key_is_not_found() {
    let (conn, registry) = setup();
    let err = registry.handle::<Role, _>(&conn).find_by_key(42).unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[test]
fn filters_select_matching_rows() {
    let (conn, registry) = setup();
    let docs = registry.handle::<Document, _>(&conn);
    let owner = registry.handle::<User, _>(&conn).insert(&user("ann")).unwrap();
    for (title, views) in [("a", 5), ("b", 15), ("c", 25)] {
        docs.insert(&document(title, views, owner)).unwrap();
    }
    let popular = docs.find_by(&[Filter::gt("views", 10)], Pagination::all()).unwrap();
    assert_eq!(popular.iter().map(|d| d.title.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);

    let either = docs.find_by(&[Filter::equal("title", "a").or(), Filter::ge("views", 25).or()], Pagination::all()).unwrap();
    assert_eq!(either.len(), 2);

    let none = docs.find_by(&[Filter::lt("views", 0)], Pagination::all()).unwrap();
    assert!(none.is_empty());
}

#[test]
fn pagination_skips_and_limits() {
    let (conn, registry) = setup();
    let roles = registry.handle::<Role, _>(&conn);
    for name in ["ADMIN", "EDITOR", "VIEWER"] {
        roles.insert(&Role { name: name.to_string(), ..Default::default() }).unwrap();
    }
    let page = roles.find_all(Pagination::new(1, 1)).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "EDITOR");
    assert_eq!(roles.find_all(Pagination::new(0, 2)).unwrap()[0].name, "VIEWER");
    assert_eq!(roles.find_all(Pagination::all()).unwrap().len(), 3);
}

#[test]
fn batch_insert_keeps_every_record_aligned() {
    let (conn, registry) = setup();
    let roles = registry.handle::<Role, _>(&conn);
    let batch: Vec<Role> = ["A", "B", "C"].iter().map(|n| Role { name: n.to_string(), ..Default::default() }).collect();
    assert_eq!(roles.insert_many(&batch).unwrap(), 3);
    assert_eq!(roles.insert_many(&[]).unwrap(), 0);
    let stored: Vec<String> = roles.find_all(Pagination::all()).unwrap().into_iter().map(|r| r.name).collect();
    assert_eq!(stored, vec!["A", "B", "C"]);
}

#[test]
fn keyless_link_rows_insert_with_rowid() {
    let (conn, registry) = setup();
    let links = registry.handle::<UserRole, _>(&conn);
    assert_eq!(links.insert(&UserRole { user_id: 1, role_id: 2 }).unwrap(), 1);
    assert_eq!(links.insert(&UserRole { user_id: 1, role_id: 3 }).unwrap(), 2);
    assert_eq!(links.select(Some("user_id = $1"), &[Value::Integer(1)]).unwrap().len(), 2);
}

#[test]
fn raw_predicates_select_one_or_many() {
    let (conn, registry) = setup();
    let users = registry.handle::<User, _>(&conn);
    users.insert_many(&[user("ann"), user("bob")]).unwrap();
    let bob = users.get(Some("name = $1"), &[Value::from("bob")]).unwrap();
    assert_eq!(bob.name, "bob");
    assert_eq!(bob.documents, None);
    assert!(users.get(Some("name = $1"), &[Value::from("eve")]).unwrap_err().is_not_found());
    assert_eq!(users.select(None, &[]).unwrap().len(), 2);
}

#[test]
fn missing_or_blank_predicate_reads_the_first_row() {
    let (conn, registry) = setup();
    let roles = registry.handle::<Role, _>(&conn);
    assert!(roles.get(None, &[]).unwrap_err().is_not_found());
    roles.insert(&Role { name: "ADMIN".to_string(), ..Default::default() }).unwrap();
    assert_eq!(roles.get(None, &[]).unwrap().name, "ADMIN");
    assert_eq!(roles.get(Some(""), &[]).unwrap().name, "ADMIN");
    assert_eq!(roles.select(Some("  "), &[]).unwrap().len(), 1);
}

#[test]
fn negative_pagination_is_refused_before_querying() {
    let (conn, registry) = setup();
    let roles = registry.handle::<Role, _>(&conn);
    assert!(matches!(roles.find_all(Pagination::new(-5, 0)), Err(OrmError::InvalidPagination { limit: -5, offset: 0 })));
}

#[test]
fn update_and_delete_by_key() {
    let (conn, registry) = setup();
    let users = registry.handle::<User, _>(&conn);
    let mut ann = user("ann");
    ann.id = users.insert(&ann).unwrap();
    ann.email = Some("ann@example.com".to_string());
    assert_eq!(users.update(&ann).unwrap(), 1);
    let found = users.find_one_by(&[Filter::equal("name", "ann")], Pagination::all()).unwrap();
    assert_eq!(found.email.as_deref(), Some("ann@example.com"));
    assert_eq!(users.delete(ann.id).unwrap(), 1);
    assert_eq!(users.delete(ann.id).unwrap(), 0);
    assert!(users.find_one_by(&[Filter::equal("name", "ann")], Pagination::all()).unwrap_err().is_not_found());
}

#[test]
fn storage_errors_carry_intent_and_table() {
    let (conn, registry) = setup();
    let users = registry.handle::<User, _>(&conn);
    match users.select(Some("no_such_column = $1"), &[Value::Integer(1)]) {
        Err(OrmError::Storage { intent: Intent::SelectMany, table, .. }) => assert_eq!(table, "users"),
        other => panic!("unexpected {other:?}"),
    }
}
