//! Property-based tests for `PersistentDictionary`.
//!
//! This module verifies that `PersistentDictionary` satisfies various laws
//! and invariants using proptest.

use persistent_dictionary::persistent::{Key, PersistentDictionary};
use persistent_dictionary::routing::BucketRouter;
use proptest::prelude::*;
use std::collections::HashSet;

// =============================================================================
// Strategy for generating test data
// =============================================================================

fn arbitrary_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(Key::from),
        (0u64..64).prop_map(Key::from),
    ]
}

fn arbitrary_value() -> impl Strategy<Value = i32> {
    any::<i32>()
}

fn arbitrary_entries() -> impl Strategy<Value = Vec<(Key, i32)>> {
    prop::collection::vec((arbitrary_key(), arbitrary_value()), 0..50)
}

fn arbitrary_depth() -> impl Strategy<Value = usize> {
    1..=BucketRouter::MAX_DEPTH
}

/// Keys in first-insertion order, without repetitions.
fn distinct_keys(entries: &[(Key, i32)]) -> Vec<Key> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|(key, _)| seen.insert(key.clone()))
        .map(|(key, _)| key.clone())
        .collect()
}

// =============================================================================
// Get-Set Law: dictionary.set(k, v).get(k) == Some(&v)
// =============================================================================

proptest! {
    #[test]
    fn prop_get_set_law(
        entries in arbitrary_entries(),
        key in arbitrary_key(),
        value in arbitrary_value()
    ) {
        let dictionary = PersistentDictionary::from_entries(entries);
        let before = dictionary.get(&key).copied();
        let updated = dictionary.set(key.clone(), value);

        prop_assert_eq!(updated.get(&key), Some(&value));
        prop_assert_eq!(dictionary.get(&key).copied(), before);
    }
}

// =============================================================================
// Get-Set-Other Law: k1 != k2 => dictionary.set(k1, v).get(k2) == dictionary.get(k2)
// =============================================================================

proptest! {
    #[test]
    fn prop_get_set_other_law(
        entries in arbitrary_entries(),
        key1 in arbitrary_key(),
        key2 in arbitrary_key(),
        value in arbitrary_value()
    ) {
        prop_assume!(key1 != key2);

        let dictionary = PersistentDictionary::from_entries(entries);
        let updated = dictionary.set(key1, value);

        prop_assert_eq!(updated.get(&key2), dictionary.get(&key2));
    }
}

// =============================================================================
// Unset-Get Law: dictionary.unset(k).get(k) == None
// =============================================================================

proptest! {
    #[test]
    fn prop_unset_get_law(entries in arbitrary_entries(), key in arbitrary_key()) {
        let dictionary = PersistentDictionary::from_entries(entries);
        let removed = dictionary.unset(&key);

        prop_assert_eq!(removed.get(&key), None);
        prop_assert!(!removed.contains_key(&key));
    }
}

// =============================================================================
// Unset-Absent Law: k not in dictionary => dictionary.unset(k) == dictionary
// =============================================================================

proptest! {
    #[test]
    fn prop_unset_absent_is_identity(entries in arbitrary_entries(), key in arbitrary_key()) {
        let dictionary = PersistentDictionary::from_entries(entries);
        prop_assume!(!dictionary.contains_key(&key));

        let unchanged = dictionary.unset(&key);

        prop_assert!(unchanged.ptr_eq(&dictionary));
        prop_assert_eq!(unchanged, dictionary);
    }
}

// =============================================================================
// Order Law: iteration yields distinct keys in first-insertion order
// =============================================================================

proptest! {
    #[test]
    fn prop_iteration_follows_insertion_order(
        entries in arbitrary_entries(),
        depth in arbitrary_depth()
    ) {
        let router = BucketRouter::new(depth).unwrap();
        let dictionary = PersistentDictionary::from_entries_with_router(entries.clone(), router);

        let keys: Vec<Key> = dictionary.keys().cloned().collect();
        prop_assert_eq!(keys, distinct_keys(&entries));
    }
}

proptest! {
    #[test]
    fn prop_reverse_iteration_mirrors_forward(entries in arbitrary_entries()) {
        let dictionary = PersistentDictionary::from_entries(entries);

        let forward: Vec<&Key> = dictionary.keys().collect();
        let mut backward: Vec<&Key> = dictionary.keys().rev().collect();
        backward.reverse();

        prop_assert_eq!(forward, backward);
    }
}

proptest! {
    #[test]
    fn prop_appends_iterate_in_order(values in prop::collection::vec(arbitrary_value(), 0..50)) {
        let dictionary = values
            .iter()
            .fold(PersistentDictionary::new(), |dictionary, value| dictionary.append(*value));

        let iterated: Vec<i32> = dictionary.values().copied().collect();
        prop_assert_eq!(iterated, values);
    }
}

// =============================================================================
// Length Law: len() == number of distinct keys, and one less after unset
// =============================================================================

proptest! {
    #[test]
    fn prop_len_counts_distinct_keys(entries in arbitrary_entries()) {
        let dictionary = PersistentDictionary::from_entries(entries.clone());
        let keys = distinct_keys(&entries);

        prop_assert_eq!(dictionary.len(), keys.len());
        prop_assert_eq!(dictionary.iter().len(), keys.len());

        if let Some(key) = keys.first() {
            prop_assert_eq!(dictionary.unset(key).len(), keys.len() - 1);
        }
    }
}

// =============================================================================
// Unset Law: unsetting keeps the remaining keys in their relative order
// =============================================================================

proptest! {
    #[test]
    fn prop_unset_preserves_relative_order(
        entries in arbitrary_entries(),
        removals in prop::collection::vec(arbitrary_key(), 0..20)
    ) {
        let dictionary = PersistentDictionary::from_entries(entries.clone());
        let removed = removals
            .iter()
            .fold(dictionary.clone(), |dictionary, key| dictionary.unset(key));

        let expected: Vec<Key> = distinct_keys(&entries)
            .into_iter()
            .filter(|key| !removals.contains(key))
            .collect();
        let keys: Vec<Key> = removed.keys().cloned().collect();

        prop_assert_eq!(&keys, &expected);
        prop_assert_eq!(removed.first_key(), expected.first());
        prop_assert_eq!(removed.last_key(), expected.last());
        prop_assert_eq!(dictionary.len(), distinct_keys(&entries).len());
    }
}

// =============================================================================
// Auto-Index Law: append uses an index above every integer key ever set
// =============================================================================

proptest! {
    #[test]
    fn prop_append_index_exceeds_integer_keys(entries in arbitrary_entries(), value in arbitrary_value()) {
        let dictionary = PersistentDictionary::from_entries(entries.clone());
        let expected = entries
            .iter()
            .filter_map(|(key, _)| key.as_index())
            .map(|index| index + 1)
            .max()
            .unwrap_or(0);

        prop_assert_eq!(dictionary.next_index(), Some(expected));
        let appended = dictionary.append(value);
        prop_assert_eq!(appended.get(expected), Some(&value));
        prop_assert_eq!(appended.last(), Some(&value));
    }
}

// =============================================================================
// Sort Law: sorted values follow the comparator, entries are preserved
// =============================================================================

proptest! {
    #[test]
    fn prop_sort_orders_values(entries in arbitrary_entries()) {
        let dictionary = PersistentDictionary::from_entries(entries);
        let sorted = dictionary.sort_by(|left, right| left.cmp(right));

        let mut expected: Vec<(Key, i32)> = dictionary.to_vec();
        expected.sort_by(|(_, left), (_, right)| left.cmp(right));

        prop_assert_eq!(sorted.to_vec(), expected);
        prop_assert_eq!(sorted.len(), dictionary.len());
    }
}

// =============================================================================
// Reroute Law: changing the router never changes the observable dictionary
// =============================================================================

proptest! {
    #[test]
    fn prop_rerouted_is_equal(entries in arbitrary_entries(), depth in arbitrary_depth()) {
        let dictionary = PersistentDictionary::from_entries(entries);
        let rerouted = dictionary
            .rerouted(BucketRouter::new(depth).unwrap())
            .rerouted(BucketRouter::default());

        prop_assert_eq!(rerouted, dictionary);
    }
}
