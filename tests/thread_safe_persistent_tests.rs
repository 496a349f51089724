//! Integration tests for sharing dictionaries across threads.
//!
//! These tests verify that dictionaries work correctly with the `arc`
//! feature enabled, providing thread-safe access to immutable data across
//! multiple threads.

#![cfg(feature = "arc")]
#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use persistent_dictionary::persistent::PersistentDictionary;
use persistent_dictionary::routing::MemoizedRouter;
use rstest::rstest;
use std::sync::Arc;
use std::thread;

#[rstest]
fn test_dictionary_cross_thread_structural_sharing() {
    let original = Arc::new(PersistentDictionary::from_entries([("a", 1), ("b", 2), ("c", 3)]));

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let dictionary = Arc::clone(&original);
            thread::spawn(move || {
                // Each thread derives its own version
                let extended = dictionary.append(index * 10).unset("b");
                assert_eq!(extended.len(), 3);
                assert_eq!(extended.last(), Some(&(index * 10)));
                assert_eq!(dictionary.len(), 3);
                extended
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("Thread panicked"))
        .collect();

    for (index, dictionary) in results.iter().enumerate() {
        assert_eq!(dictionary.get(0), Some(&(index as i32 * 10)));
        assert_eq!(dictionary.get("b"), None);
    }
    assert_eq!(original.get("b"), Some(&2));
}

#[rstest]
fn test_dictionary_moves_between_threads() {
    let dictionary = PersistentDictionary::new().append("x");

    let extended = thread::spawn(move || dictionary.append("y"))
        .join()
        .expect("Thread panicked");

    assert_eq!(extended.values().copied().collect::<Vec<_>>(), vec!["x", "y"]);
}

#[rstest]
fn test_memoized_router_shared_across_threads() {
    let dictionary = Arc::new(
        (0..64).fold(
            PersistentDictionary::with_router(MemoizedRouter::with_depth(4).unwrap()),
            |dictionary, index| dictionary.set(format!("key-{index}"), index),
        ),
    );

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let dictionary = Arc::clone(&dictionary);
            thread::spawn(move || (0..64).all(|index| dictionary.get(format!("key-{index}")) == Some(&index)))
        })
        .collect();

    for handle in handles {
        assert!(handle.join().expect("Thread panicked"));
    }
    assert_eq!(dictionary.router().cached_paths(), 64);
}
