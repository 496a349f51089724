#![cfg(feature = "serde")]

//! Integration tests for serde support.
//!
//! Dictionaries serialize as maps, in insertion order. Integer keys become
//! JSON object keys such as `"0"` and come back as integer keys.

use persistent_dictionary::persistent::{Key, PersistentDictionary};
use persistent_dictionary::routing::MemoizedRouter;
use rstest::rstest;

#[rstest]
fn test_dictionary_json_preserves_insertion_order() {
    let dictionary = PersistentDictionary::new()
        .set("zebra", 1)
        .set("apple", 2)
        .append(3);

    let json = serde_json::to_string(&dictionary).unwrap();

    assert_eq!(json, r#"{"zebra":1,"apple":2,"0":3}"#);
}

#[rstest]
fn test_dictionary_json_roundtrip() {
    let dictionary = PersistentDictionary::new()
        .set("name", "value".to_string())
        .append("first".to_string())
        .set(10, "ten".to_string());

    let json = serde_json::to_string(&dictionary).unwrap();
    let restored: PersistentDictionary<String> = serde_json::from_str(&json).unwrap();

    assert_eq!(dictionary, restored);
    assert_eq!(restored.get(10), Some(&"ten".to_string()));
    assert_eq!(restored.next_index(), Some(11));
}

#[rstest]
fn test_deserialize_into_memoized_router() {
    let restored: PersistentDictionary<i32, MemoizedRouter> =
        serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();

    assert_eq!(restored.keys().cloned().collect::<Vec<_>>(), vec![Key::from("b"), Key::from("a")]);
    assert_eq!(restored.router().cached_paths(), 2);
}

#[rstest]
fn test_deserialize_repeated_key_keeps_last_value() {
    let restored: PersistentDictionary<i32> = serde_json::from_str(r#"{"a":1,"b":2,"a":3}"#).unwrap();

    assert_eq!(restored.len(), 2);
    assert_eq!(restored.first(), Some(&3));
}

#[rstest]
fn test_nested_dictionaries() {
    let inner = PersistentDictionary::new().set("x", 1);
    let outer = PersistentDictionary::new().set("inner", inner.clone()).append(inner);

    let json = serde_json::to_string(&outer).unwrap();
    let restored: PersistentDictionary<PersistentDictionary<i32>> = serde_json::from_str(&json).unwrap();

    assert_eq!(json, r#"{"inner":{"x":1},"0":{"x":1}}"#);
    assert_eq!(outer, restored);
}

#[rstest]
fn test_key_json_forms() {
    assert_eq!(serde_json::to_string(&Key::from(7)).unwrap(), "7");
    assert_eq!(serde_json::to_string(&Key::from("seven")).unwrap(), r#""seven""#);
    assert_eq!(serde_json::from_str::<Key>("7").unwrap(), Key::Index(7));
    assert_eq!(serde_json::from_str::<Key>(r#""7""#).unwrap(), Key::Index(7));
    assert_eq!(serde_json::from_str::<Key>("-7").unwrap(), Key::from("-7"));
}

#[rstest]
fn test_deserialize_rejects_non_map() {
    let result: Result<PersistentDictionary<i32>, _> = serde_json::from_str("[1, 2]");

    assert!(result.is_err());
}

// =============================================================================
// Binary (non human-readable) formats
// =============================================================================

#[rstest]
fn test_dictionary_msgpack_roundtrip() {
    let dictionary = PersistentDictionary::new()
        .set("name", 1)
        .append(2)
        .set(u64::MAX, 3)
        .set("-4", 4);

    let bytes = rmp_serde::to_vec(&dictionary).unwrap();
    let restored: PersistentDictionary<i32> = rmp_serde::from_slice(&bytes).unwrap();

    assert_eq!(dictionary, restored);
    assert_eq!(restored.get(u64::MAX), Some(&3));
    assert_eq!(restored.next_index(), None);
}

#[rstest]
#[case::index(Key::Index(7))]
#[case::largest_index(Key::Index(u64::MAX))]
#[case::name(Key::from("seven"))]
#[case::numeric_looking_name(Key::from("007"))]
fn test_key_msgpack_roundtrip_keeps_variant(#[case] key: Key) {
    let bytes = rmp_serde::to_vec(&key).unwrap();
    let restored: Key = rmp_serde::from_slice(&bytes).unwrap();

    assert_eq!(restored, key);
    assert_eq!(restored.is_index(), key.is_index());
}
