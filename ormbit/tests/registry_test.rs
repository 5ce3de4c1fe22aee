mod common;

use common::*;
use ormbit::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;

#[test]
fn registration_runs_once_per_type() {
    let exec = RecordingExecutor::in_memory();
    let registry = Registry::new();
    let roles = registry.handle::<Role, _>(&exec);
    assert_eq!(roles.table_name().unwrap(), "roles");
    assert_eq!(roles.table_name().unwrap(), "roles");
    roles.find_all(Pagination::all()).unwrap();
    assert_eq!(exec.count_starting_with("SELECT 1 FROM roles"), 1);
    assert_eq!(exec.count_starting_with("CREATE TABLE IF NOT EXISTS roles"), 1);
    assert_eq!(registry.entity_by_table("roles").unwrap().key, TypeKey::of::<Role>());
}

#[test]
fn existing_tables_are_not_recreated() {
    let exec = RecordingExecutor::in_memory();
    Registry::new().handle::<Role, _>(&exec).table_name().unwrap();
    Registry::new().handle::<Role, _>(&exec).table_name().unwrap();
    assert_eq!(exec.count_starting_with("SELECT 1 FROM roles"), 2);
    assert_eq!(exec.count_starting_with("CREATE TABLE"), 1);
}

#[test]
fn concurrent_first_use_binds_once() {
    let exec = Arc::new(RecordingExecutor::in_memory());
    let registry = Arc::new(Registry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let exec = Arc::clone(&exec);
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.register::<User, _>(&*exec).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), "users");
    }
    assert_eq!(exec.count_starting_with("CREATE TABLE IF NOT EXISTS users"), 1);
    assert_eq!(exec.count_starting_with("SELECT 1 FROM users"), 1);
}

#[test]
fn table_override_is_honoured() {
    let exec = RecordingExecutor::in_memory();
    let registry = Registry::new();
    assert_eq!(registry.handle::<UserRole, _>(&exec).table_name().unwrap(), "user_roles");
    assert!(registry.is_registered::<UserRole>());
    assert!(!registry.is_registered::<User>());
}

#[test]
fn register_all_covers_every_declared_entity() {
    let exec = RecordingExecutor::in_memory();
    let registry = Registry::new();
    let mut tables = registry.register_all(&exec).unwrap();
    tables.sort();
    assert_eq!(tables, vec!["comments", "documents", "notes", "roles", "user_roles", "users"]);
    assert!(!registry.is_registered::<Broken>());
}

#[test]
fn non_record_embedding_fails_registration() {
    let exec = RecordingExecutor::in_memory();
    let registry = Registry::new();
    let broken = registry.handle::<Broken, _>(&exec);
    match broken.insert(&Broken::default()) {
        Err(OrmError::InvalidEntityKind { path, .. }) => assert_eq!(path, "Broken.meta"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!registry.is_registered::<Broken>());
    assert!(exec.statements().is_empty());
}

#[test]
fn unregistered_entities_have_no_query_builder() {
    let registry = Registry::new();
    assert!(matches!(QueryBuilder::for_entity::<Role>(&registry), Err(OrmError::UnregisteredEntity("Role"))));
}

#[test]
fn conflicting_table_binding_is_refused() {
    let exec = RecordingExecutor::in_memory();
    let registry = Registry::new();
    registry.bind(&Role::descriptor(), "users").unwrap();
    match registry.register::<User, _>(&exec) {
        Err(OrmError::TableConflict { table, bound, requested }) => {
            assert_eq!((table.as_str(), bound, requested), ("users", "Role", "User"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(exec.statements().is_empty());
    assert!(!registry.is_registered::<User>());
}
