//! Tests for the migration registry.

use super::*;

fn migration(name: &str) -> Migration {
    Migration::new(name, format!("{name} description"))
}

#[test]
fn register_assigns_number() {
    let mut reg = Registry::new();
    reg.register(migration("0003_add_col")).unwrap();
    let m = reg.ordered().next().unwrap();
    assert_eq!(m.number(), 3);
}

#[test]
fn register_rejects_malformed_name_and_leaves_registry_unchanged() {
    let mut reg = Registry::new();
    let err = reg.register(migration("3_add_col")).unwrap_err();
    assert!(matches!(err, MigrateError::InvalidName { .. }));
    assert!(reg.is_empty());
}

#[test]
fn register_rejects_duplicate_number_keeping_first() {
    let mut reg = Registry::new();
    reg.register(migration("0001_first")).unwrap();
    let err = reg.register(migration("0001_second")).unwrap_err();
    match err {
        MigrateError::DuplicateNumber { number, existing } => {
            assert_eq!(number, 1);
            assert_eq!(existing, "0001_first");
        }
        other => panic!("expected DuplicateNumber, got {other}"),
    }
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.ordered().next().unwrap().name, "0001_first");
}

#[test]
fn duplicate_detection_ignores_leading_zeros() {
    let mut reg = Registry::new();
    reg.register(migration("0007_seven")).unwrap();
    assert!(reg.register(migration("0007_again")).is_err());
}

#[test]
fn ordered_is_ascending_regardless_of_registration_order() {
    let mut reg = Registry::new();
    for name in ["0009_nine", "0001_one", "0005_five", "0002_two"] {
        reg.register(migration(name)).unwrap();
    }
    let numbers: Vec<u32> = reg.ordered().map(|m| m.number()).collect();
    assert_eq!(numbers, vec![1, 2, 5, 9]);
}
