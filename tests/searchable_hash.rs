use fieldvault::hash::{hash, verify, ColumnHasher, SearchableHash, PBKDF2_ITERATIONS};

#[test]
fn pbkdf2_iteration_floor() {
    assert!(PBKDF2_ITERATIONS >= 100_000);
}

#[test]
fn hash_then_verify() {
    for value in ["", "alice@example.com", "4111-1111-1111-1111", "ünïcödé"] {
        let stored = hash(value, None).unwrap();
        assert!(verify(value, &stored).unwrap(), "{value:?}");
    }
}

#[test]
fn distinct_values_give_distinct_index_entries() {
    let column = ColumnHasher::new(vec![0x42; 16]).unwrap();
    let a = column.index_value("alice@example.com").unwrap();
    let b = column.index_value("bob@example.com").unwrap();
    assert_ne!(a, b);
    assert!(!verify("alice@example.com", &b).unwrap());
}

#[test]
fn column_index_supports_equality_lookup() {
    let column = ColumnHasher::generate().unwrap();
    let index: Vec<String> = ["a@x.io", "b@x.io", "c@x.io"]
        .iter()
        .map(|v| column.index_value(v).unwrap())
        .collect();

    let probe = column.index_value("b@x.io").unwrap();
    assert_eq!(index.iter().position(|entry| *entry == probe), Some(1));
}

#[test]
fn parse_and_display_roundtrip() {
    let stored = hash("value", None).unwrap();
    let parsed: SearchableHash = stored.parse().unwrap();
    assert_eq!(parsed.to_string(), stored);
    assert!(parsed.matches("value"));
}
