//! Persistent (immutable) insertion-ordered dictionary.
//!
//! This module provides [`PersistentDictionary`], an immutable map from
//! [`Key`]s to values that remembers insertion order and shares structure
//! between versions.
//!
//! # Overview
//!
//! Entries live in a trie of buckets. A [`Router`] turns every key into a
//! fixed-length path of nibbles; each nibble selects a child at one level,
//! and the bucket at the end of the path (the leaf bucket) holds the
//! `key -> Node` entries routed there. Independently of where keys land in
//! the trie, every [`Node`] stores the keys of its predecessor and successor
//! in insertion order, forming a doubly linked chain from the first key to
//! the last one.
//!
//! - O(depth) get
//! - O(depth + bucket size) set, append and unset
//! - O(1) len, first and last
//! - O(n) ordered iteration (in both directions)
//! - O(n log n) sort, which rebuilds the whole structure
//!
//! # Examples
//!
//! ```rust
//! use persistent_dictionary::persistent::PersistentDictionary;
//!
//! let dictionary = PersistentDictionary::new()
//!     .set("a", 1)
//!     .set("b", 2)
//!     .set("c", 3);
//!
//! let without_b = dictionary.unset("b");
//! assert_eq!(without_b.len(), 2);
//! assert_eq!(without_b.values().copied().collect::<Vec<_>>(), vec![1, 3]);
//!
//! // The original version is untouched
//! assert_eq!(dictionary.len(), 3);
//! assert_eq!(dictionary.get("b"), Some(&2));
//! ```
//!
//! # Internal Structure
//!
//! - 16-way branching, one nibble of the bucket path per level
//! - Bitmap-compressed children, as in a HAMT
//! - Copy-on-write through the reference counter: a mutation copies only the
//!   buckets on the path to the modified leaf, plus the leaves of the (at
//!   most two) neighbours whose links change

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;

use tracing::{debug, trace};

use super::{Key, Node, ReferenceCounter};
use crate::routing::{BUCKET_WIDTH, BucketRouter, Router};

// =============================================================================
// Bucket Definition
// =============================================================================

/// A level of the routing trie.
///
/// Inner levels only use `children`; the last level only uses `entries`.
#[derive(Clone)]
struct Bucket<V> {
    /// Bitmap indicating which of the 16 slots hold a child
    bitmap: u16,
    /// Children, compressed
    children: Vec<ReferenceCounter<Self>>,
    /// Entries of a leaf bucket
    entries: Vec<(Key, Node<V>)>,
}

/// Bit of `slot` in a bucket bitmap.
#[inline]
const fn slot_bit(slot: u8) -> u16 {
    1 << (slot as usize % BUCKET_WIDTH)
}

impl<V> Bucket<V> {
    const fn new() -> Self {
        Self {
            bitmap: 0,
            children: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Position of `bit` in the compressed children vector.
    #[inline]
    const fn position(&self, bit: u16) -> usize {
        (self.bitmap & (bit - 1)).count_ones() as usize
    }

    fn child(&self, slot: u8) -> Option<&Self> {
        let bit = slot_bit(slot);
        if self.bitmap & bit == 0 {
            None
        } else {
            Some(&*self.children[self.position(bit)])
        }
    }

    fn child_mut(&mut self, slot: u8) -> Option<&mut ReferenceCounter<Self>> {
        let bit = slot_bit(slot);
        if self.bitmap & bit == 0 {
            None
        } else {
            let position = self.position(bit);
            Some(&mut self.children[position])
        }
    }

    fn child_or_insert(&mut self, slot: u8) -> &mut ReferenceCounter<Self> {
        let bit = slot_bit(slot);
        let position = self.position(bit);
        if self.bitmap & bit == 0 {
            self.bitmap |= bit;
            self.children
                .insert(position, ReferenceCounter::new(Self::new()));
        }
        &mut self.children[position]
    }

    fn remove_child(&mut self, slot: u8) {
        let bit = slot_bit(slot);
        if self.bitmap & bit != 0 {
            let position = self.position(bit);
            self.children.remove(position);
            self.bitmap &= !bit;
        }
    }

    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.entries.is_empty()
    }
}

// =============================================================================
// PersistentDictionary Definition
// =============================================================================

/// A persistent (immutable) dictionary that iterates in insertion order.
///
/// Every mutating operation returns a new dictionary and leaves the receiver
/// untouched. Versions share every bucket the mutation did not touch.
///
/// Keys are strings or non-negative integers (see [`Key`]). Integer keys
/// drive an auto-index: [`append`](Self::append) stores its value under an
/// index greater than every integer key ever set in this lineage.
///
/// # Time Complexity
///
/// | Operation          | Complexity              |
/// |--------------------|-------------------------|
/// | `new`              | O(1)                    |
/// | `get`              | O(depth)                |
/// | `set` / `append`   | O(depth + bucket size)  |
/// | `unset`            | O(depth + bucket size)  |
/// | `contains_key`     | O(depth)                |
/// | `first` / `last`   | O(depth)                |
/// | `len` / `is_empty` | O(1)                    |
/// | `iter`             | O(n · depth)            |
/// | `sort_by`          | O(n log n)              |
///
/// # Examples
///
/// ```rust
/// use persistent_dictionary::persistent::PersistentDictionary;
///
/// let dictionary = PersistentDictionary::new().append("x").append("y");
/// assert_eq!(dictionary.get(0), Some(&"x"));
/// assert_eq!(dictionary.get(1), Some(&"y"));
///
/// let extended = dictionary.append("z");
/// assert_eq!(extended.get(2), Some(&"z"));
/// assert_eq!(dictionary.get(2), None);
/// ```
pub struct PersistentDictionary<V, R = BucketRouter> {
    /// Root bucket of the trie
    root: ReferenceCounter<Bucket<V>>,
    /// Router shared by every version of this dictionary
    router: ReferenceCounter<R>,
    /// Number of entries
    length: usize,
    /// Head of the insertion-order chain
    first: Option<Key>,
    /// Tail of the insertion-order chain
    last: Option<Key>,
    /// Index used by the next `append`; `None` once `u64::MAX` is taken
    next_index: Option<u64>,
}

impl<V> PersistentDictionary<V> {
    /// Creates an empty dictionary with the default [`BucketRouter`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary: PersistentDictionary<i32> = PersistentDictionary::new();
    /// assert!(dictionary.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_router(BucketRouter::default())
    }
}

impl<V: Clone> PersistentDictionary<V> {
    /// Builds a dictionary from key-value pairs with the default router.
    ///
    /// Pairs are inserted in order; a repeated key keeps its first position
    /// and its last value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::from_entries([("a", 1), ("b", 2), ("a", 3)]);
    ///
    /// assert_eq!(dictionary.len(), 2);
    /// assert_eq!(dictionary.get("a"), Some(&3));
    /// assert_eq!(dictionary.first(), Some(&3));
    /// ```
    #[must_use]
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
    {
        Self::from_entries_with_router(entries, BucketRouter::default())
    }
}

impl<V, R> PersistentDictionary<V, R> {
    /// Creates an empty dictionary that routes keys with `router`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    /// use persistent_dictionary::routing::{BucketRouter, Router};
    ///
    /// let router = BucketRouter::new(2).unwrap();
    /// let dictionary = PersistentDictionary::with_router(router).set("key", 1);
    ///
    /// assert_eq!(dictionary.router().depth(), 2);
    /// assert_eq!(dictionary.get("key"), Some(&1));
    /// ```
    #[must_use]
    pub fn with_router(router: R) -> Self {
        Self::with_shared_router(ReferenceCounter::new(router), Some(0))
    }

    fn with_shared_router(router: ReferenceCounter<R>, next_index: Option<u64>) -> Self {
        Self {
            root: ReferenceCounter::new(Bucket::new()),
            router,
            length: 0,
            first: None,
            last: None,
            next_index,
        }
    }

    /// Returns the number of entries.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the dictionary contains no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Key of the oldest entry.
    #[inline]
    #[must_use]
    pub const fn first_key(&self) -> Option<&Key> {
        self.first.as_ref()
    }

    /// Key of the newest entry.
    #[inline]
    #[must_use]
    pub const fn last_key(&self) -> Option<&Key> {
        self.last.as_ref()
    }

    /// Index that the next [`append`](Self::append) will use.
    ///
    /// Strictly greater than every integer key ever set in this lineage;
    /// it never decreases, not even when those keys are unset. Returns
    /// `None` once `u64::MAX` has been used as a key, after which no index
    /// is left to append under.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::new().set(41, "a");
    /// assert_eq!(dictionary.next_index(), Some(42));
    /// assert_eq!(dictionary.set(u64::MAX, "b").next_index(), None);
    /// ```
    #[inline]
    #[must_use]
    pub const fn next_index(&self) -> Option<u64> {
        self.next_index
    }

    /// The router used by this dictionary.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &R {
        &self.router
    }

    /// Returns `true` if both dictionaries share the same root storage.
    ///
    /// Operations that leave a dictionary unchanged, such as unsetting an
    /// absent key, return a version for which this holds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::new().set("a", 1);
    /// assert!(dictionary.unset("missing").ptr_eq(&dictionary));
    /// assert!(!dictionary.unset("a").ptr_eq(&dictionary));
    /// ```
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.root, &other.root)
    }
}

impl<V, R: Router> PersistentDictionary<V, R> {
    /// Finds the leaf bucket `key` routes to, if it exists.
    fn leaf(&self, key: &Key) -> Option<&Bucket<V>> {
        let path = self.router.buckets(key);
        let mut bucket = &*self.root;
        for &slot in &path {
            bucket = bucket.child(slot)?;
        }
        Some(bucket)
    }

    /// Finds the stored key and node for `key`.
    fn entry(&self, key: &Key) -> Option<(&Key, &Node<V>)> {
        self.leaf(key)?
            .entries
            .iter()
            .find(|(entry_key, _)| entry_key == key)
            .map(|(entry_key, node)| (entry_key, node))
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// # Complexity
    ///
    /// O(depth)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::from_entries([("1", "one")]);
    ///
    /// assert_eq!(dictionary.get(1), Some(&"one"));
    /// assert_eq!(dictionary.get("1"), Some(&"one"));
    /// assert_eq!(dictionary.get("2"), None);
    /// ```
    #[must_use]
    pub fn get(&self, key: impl Into<Key>) -> Option<&V> {
        self.entry(&key.into()).map(|(_, node)| node.value())
    }

    /// Returns `true` if the dictionary holds `key`.
    #[must_use]
    pub fn contains_key(&self, key: impl Into<Key>) -> bool {
        self.entry(&key.into()).is_some()
    }

    /// Returns the stored node for `key`, exposing its neighbour links.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::{Key, PersistentDictionary};
    ///
    /// let dictionary = PersistentDictionary::from_entries([("a", 1), ("b", 2)]);
    /// let node = dictionary.node("b").unwrap();
    ///
    /// assert_eq!(node.previous(), Some(&Key::from("a")));
    /// assert_eq!(node.next(), None);
    /// ```
    #[must_use]
    pub fn node(&self, key: impl Into<Key>) -> Option<&Node<V>> {
        self.entry(&key.into()).map(|(_, node)| node)
    }

    /// Value of the oldest entry.
    #[must_use]
    pub fn first(&self) -> Option<&V> {
        self.first
            .as_ref()
            .and_then(|key| self.entry(key))
            .map(|(_, node)| node.value())
    }

    /// Value of the newest entry.
    #[must_use]
    pub fn last(&self) -> Option<&V> {
        self.last
            .as_ref()
            .and_then(|key| self.entry(key))
            .map(|(_, node)| node.value())
    }

    /// First value, in insertion order, that satisfies `predicate`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::from_entries([(0, 1), (1, 42), (2, 2)]);
    ///
    /// assert_eq!(dictionary.first_where(|value| *value > 1), Some(&42));
    /// assert_eq!(dictionary.first_where(|value| *value > 100), None);
    /// ```
    pub fn first_where<P>(&self, mut predicate: P) -> Option<&V>
    where
        P: FnMut(&V) -> bool,
    {
        self.values().find(|value| predicate(value))
    }

    /// Returns an iterator over entries in insertion order.
    ///
    /// The iterator follows the chain of neighbour keys, so it is independent
    /// of where keys are stored in the trie. It can also be walked backwards.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::{Key, PersistentDictionary};
    ///
    /// let dictionary = PersistentDictionary::new().set("b", 2).set("a", 1);
    ///
    /// let keys: Vec<String> = dictionary.iter().map(|(key, _)| key.to_string()).collect();
    /// assert_eq!(keys, vec!["b", "a"]);
    ///
    /// let reversed: Vec<&i32> = dictionary.iter().rev().map(|(_, value)| value).collect();
    /// assert_eq!(reversed, vec![&1, &2]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> PersistentDictionaryIterator<'_, V, R> {
        PersistentDictionaryIterator {
            dictionary: self,
            front: self.first.as_ref(),
            back: self.last.as_ref(),
            remaining: self.length,
        }
    }

    /// Returns an iterator over keys in insertion order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &Key> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values in insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::new().append(1).append(2);
    /// let sum: i32 = dictionary.values().sum();
    /// assert_eq!(sum, 3);
    /// ```
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }

    /// Calls `visitor` on every entry in insertion order.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Key, &V),
    {
        for (key, value) in self {
            visitor(key, value);
        }
    }

    /// Calls `visitor` on every entry in insertion order, stopping at the
    /// first error.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `visitor`, unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::new().append(1).append(-2).append(3);
    /// let mut seen = Vec::new();
    ///
    /// let result = dictionary.try_for_each(|_, value| {
    ///     if *value < 0 {
    ///         return Err(format!("negative value {value}"));
    ///     }
    ///     seen.push(*value);
    ///     Ok(())
    /// });
    ///
    /// assert_eq!(result, Err("negative value -2".to_string()));
    /// assert_eq!(seen, vec![1]);
    /// ```
    pub fn try_for_each<F, E>(&self, mut visitor: F) -> Result<(), E>
    where
        F: FnMut(&Key, &V) -> Result<(), E>,
    {
        for (key, value) in self {
            visitor(key, value)?;
        }
        Ok(())
    }
}

impl<V: Clone, R: Router> PersistentDictionary<V, R> {
    /// Builds a dictionary from key-value pairs, routing keys with `router`.
    #[must_use]
    pub fn from_entries_with_router<I, K>(entries: I, router: R) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
    {
        let mut dictionary = Self::with_router(router);
        for (key, value) in entries {
            dictionary.set_node(key.into(), value);
        }
        dictionary
    }

    /// Stores `value` under `key`.
    ///
    /// A new key is appended to the end of the insertion order. An existing
    /// key keeps its position and only has its value replaced. Integer keys
    /// move [`next_index`](Self::next_index) past themselves.
    ///
    /// # Complexity
    ///
    /// O(depth + bucket size)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::from_entries([(0, 1), (1, 2), (2, 3)]);
    /// let updated = dictionary.set(1, 4);
    ///
    /// assert_eq!(dictionary.values().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    /// assert_eq!(updated.values().copied().collect::<Vec<_>>(), vec![1, 4, 3]);
    /// ```
    #[must_use]
    pub fn set(&self, key: impl Into<Key>, value: V) -> Self {
        let mut dictionary = self.clone();
        dictionary.set_node(key.into(), value);
        dictionary
    }

    /// Like [`set`](Self::set), but returns a version sharing this
    /// dictionary's storage when `key` already holds a value equal to
    /// `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::new().set("a", 1);
    ///
    /// assert!(dictionary.set_if_changed("a", 1).ptr_eq(&dictionary));
    /// assert_eq!(dictionary.set_if_changed("a", 2).get("a"), Some(&2));
    /// ```
    #[must_use]
    pub fn set_if_changed(&self, key: impl Into<Key>, value: V) -> Self
    where
        V: PartialEq,
    {
        let key = key.into();
        if self.get(&key) == Some(&value) {
            return self.clone();
        }
        self.set(key, value)
    }

    /// Stores `value` under [`next_index`](Self::next_index).
    ///
    /// Once the auto-index is exhausted (`u64::MAX` has been used as a key)
    /// nothing is stored and the result shares this dictionary's storage.
    /// Use [`checked_append`](Self::checked_append) to observe that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::from_entries([(0, 1), (1, 2), (2, 3)])
    ///     .set(5, 5)
    ///     .append(4);
    ///
    /// assert_eq!(dictionary.get(6), Some(&4));
    /// assert_eq!(dictionary.next_index(), Some(7));
    ///
    /// let exhausted = dictionary.set(u64::MAX, 0);
    /// assert!(exhausted.append(8).ptr_eq(&exhausted));
    /// ```
    #[must_use]
    pub fn append(&self, value: V) -> Self {
        self.checked_append(value).unwrap_or_else(|| {
            trace!("auto-index exhausted, append ignored");
            self.clone()
        })
    }

    /// Like [`append`](Self::append), but returns `None` instead of an
    /// unchanged dictionary when the auto-index is exhausted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::new().append("x");
    /// assert_eq!(dictionary.checked_append("y").unwrap().get(1), Some(&"y"));
    /// assert!(dictionary.set(u64::MAX, "max").checked_append("y").is_none());
    /// ```
    #[must_use]
    pub fn checked_append(&self, value: V) -> Option<Self> {
        self.next_index
            .map(|index| self.set(Key::Index(index), value))
    }

    /// Removes `key`.
    ///
    /// Its neighbours in insertion order are linked to each other. Removing
    /// an absent key is a no-op that returns a version sharing this
    /// dictionary's storage.
    ///
    /// # Complexity
    ///
    /// O(depth + bucket size)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::from_entries([("a", 1), ("b", 2), ("c", 3)]);
    /// let removed = dictionary.unset("a");
    ///
    /// assert_eq!(removed.first(), Some(&2));
    /// assert_eq!(removed.len(), 2);
    /// assert_eq!(dictionary.len(), 3);
    /// ```
    #[must_use]
    pub fn unset(&self, key: impl Into<Key>) -> Self {
        let key = key.into();
        let Some((_, node)) = self.entry(&key) else {
            trace!(%key, "unset of absent key");
            return self.clone();
        };
        let previous = node.previous().cloned();
        let next = node.next().cloned();

        let mut dictionary = self.clone();
        dictionary.length -= 1;

        match &previous {
            Some(previous_key) => {
                dictionary.relink(previous_key, |node| node.with_next(next.clone()));
            }
            None => dictionary.first.clone_from(&next),
        }
        match &next {
            Some(next_key) => {
                dictionary.relink(next_key, |node| node.with_previous(previous.clone()));
            }
            None => dictionary.last.clone_from(&previous),
        }

        let path = dictionary.router.buckets(&key);
        Self::remove_entry(&mut dictionary.root, &path, &key);
        dictionary
    }

    /// Returns a dictionary with the same entries, stably sorted by value.
    ///
    /// The result is rebuilt from scratch, so it shares no buckets with this
    /// dictionary. It keeps the router and the auto-index.
    ///
    /// # Complexity
    ///
    /// O(n log n)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::from_entries([("a", 3), ("b", 1), ("c", 2)]);
    /// let sorted = dictionary.sort_by(|left, right| left.cmp(right));
    ///
    /// let keys: Vec<String> = sorted.keys().map(ToString::to_string).collect();
    /// assert_eq!(keys, vec!["b", "c", "a"]);
    /// ```
    #[must_use]
    pub fn sort_by<F>(&self, mut compare: F) -> Self
    where
        F: FnMut(&V, &V) -> Ordering,
    {
        let mut entries: Vec<(&Key, &V)> = self.iter().collect();
        entries.sort_by(|(_, left), (_, right)| compare(*left, *right));
        debug!(entries = entries.len(), "rebuilding dictionary in sorted order");

        let mut sorted = Self::with_shared_router(ReferenceCounter::clone(&self.router), self.next_index);
        for (key, value) in entries {
            sorted.set_node(key.clone(), value.clone());
        }
        sorted
    }

    /// Returns a dictionary with the same entries, stably sorted by the key
    /// extracted from each value.
    #[must_use]
    pub fn sort_by_key<K, F>(&self, mut key_function: F) -> Self
    where
        K: Ord,
        F: FnMut(&V) -> K,
    {
        self.sort_by(|left, right| key_function(left).cmp(&key_function(right)))
    }

    /// Rebuilds the same entries, in the same order, under another router.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    /// use persistent_dictionary::routing::{MemoizedRouter, Router};
    ///
    /// let dictionary = PersistentDictionary::from_entries([("a", 1), ("b", 2)]);
    /// let rerouted = dictionary.rerouted(MemoizedRouter::with_depth(8).unwrap());
    ///
    /// assert_eq!(rerouted.router().depth(), 8);
    /// assert_eq!(rerouted.to_vec(), dictionary.to_vec());
    /// ```
    #[must_use]
    pub fn rerouted<S: Router>(&self, router: S) -> PersistentDictionary<V, S> {
        debug!(entries = self.length, depth = router.depth(), "rerouting dictionary");
        let mut rerouted =
            PersistentDictionary::with_shared_router(ReferenceCounter::new(router), self.next_index);
        for (key, value) in self {
            rerouted.set_node(key.clone(), value.clone());
        }
        rerouted
    }

    /// Returns a dictionary with the same keys, in the same order, holding
    /// `function` applied to every value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::PersistentDictionary;
    ///
    /// let dictionary = PersistentDictionary::new().append(41).append(1);
    /// let incremented = dictionary.map_values(|value| value + 1);
    ///
    /// assert_eq!(incremented.values().copied().collect::<Vec<_>>(), vec![42, 2]);
    /// ```
    #[must_use]
    pub fn map_values<U, F>(&self, mut function: F) -> PersistentDictionary<U, R>
    where
        U: Clone,
        F: FnMut(&V) -> U,
    {
        debug!(entries = self.length, "mapping dictionary values");
        let mut mapped = PersistentDictionary::with_shared_router(
            ReferenceCounter::clone(&self.router),
            self.next_index,
        );
        for (key, value) in self {
            mapped.set_node(key.clone(), function(value));
        }
        mapped
    }

    /// Collects the entries, in insertion order, into a vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_dictionary::persistent::{Key, PersistentDictionary};
    ///
    /// let dictionary = PersistentDictionary::new().set("a", 1).append(2);
    /// assert_eq!(
    ///     dictionary.to_vec(),
    ///     vec![(Key::from("a"), 1), (Key::from(0), 2)]
    /// );
    /// ```
    #[must_use]
    pub fn to_vec(&self) -> Vec<(Key, V)> {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    // =========================================================================
    // Working-copy mutation
    //
    // Only called on a dictionary that has not been handed out yet. Buckets
    // shared with other versions are copied by `make_mut` before writing.
    // =========================================================================

    /// Inserts or updates `key` in place.
    fn set_node(&mut self, key: Key, value: V) {
        self.advance_next_index(&key);

        let last = self.last.clone();
        let entries = self.leaf_entries_mut(&key);
        if let Some((_, node)) = entries.iter_mut().find(|(entry_key, _)| *entry_key == key) {
            *node = node.with_value(value);
            return;
        }
        entries.push((key.clone(), Node::new(last.clone(), None, value)));
        self.length += 1;

        match last {
            Some(previous_key) => {
                self.relink(&previous_key, |node| node.with_next(Some(key.clone())));
            }
            None => self.first = Some(key.clone()),
        }
        self.last = Some(key);
    }

    fn advance_next_index(&mut self, key: &Key) {
        if let Some(index) = key.as_index() {
            self.next_index = self
                .next_index
                .zip(index.checked_add(1))
                .map(|(current, candidate)| current.max(candidate));
        }
    }

    /// Returns the entries of the leaf `key` routes to, creating and
    /// unsharing every bucket on the way.
    fn leaf_entries_mut(&mut self, key: &Key) -> &mut Vec<(Key, Node<V>)> {
        let path = self.router.buckets(key);
        let mut bucket = ReferenceCounter::make_mut(&mut self.root);
        for &slot in &path {
            bucket = ReferenceCounter::make_mut(bucket.child_or_insert(slot));
        }
        &mut bucket.entries
    }

    /// Replaces the node stored under `key` with `relink(node)`.
    fn relink<F>(&mut self, key: &Key, relink: F)
    where
        F: FnOnce(&Node<V>) -> Node<V>,
    {
        if let Some((_, node)) = self
            .leaf_entries_mut(key)
            .iter_mut()
            .find(|(entry_key, _)| entry_key == key)
        {
            *node = relink(node);
        }
    }

    /// Removes `key` from the subtrie rooted at `bucket`, pruning buckets
    /// left empty. Returns the removed node.
    fn remove_entry(
        bucket: &mut ReferenceCounter<Bucket<V>>,
        path: &[u8],
        key: &Key,
    ) -> Option<Node<V>> {
        let bucket = ReferenceCounter::make_mut(bucket);
        match path.split_first() {
            None => {
                let position = bucket
                    .entries
                    .iter()
                    .position(|(entry_key, _)| entry_key == key)?;
                Some(bucket.entries.swap_remove(position).1)
            }
            Some((&slot, rest)) => {
                let child = bucket.child_mut(slot)?;
                let removed = Self::remove_entry(child, rest, key)?;
                if child.is_empty() {
                    bucket.remove_child(slot);
                }
                Some(removed)
            }
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over the entries of a [`PersistentDictionary`] in insertion
/// order.
pub struct PersistentDictionaryIterator<'a, V, R = BucketRouter> {
    dictionary: &'a PersistentDictionary<V, R>,
    front: Option<&'a Key>,
    back: Option<&'a Key>,
    remaining: usize,
}

impl<'a, V, R: Router> Iterator for PersistentDictionaryIterator<'a, V, R> {
    type Item = (&'a Key, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let dictionary = self.dictionary;
        let (key, node) = dictionary.entry(self.front?)?;
        self.front = node.next();
        self.remaining -= 1;
        Some((key, node.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V, R: Router> DoubleEndedIterator for PersistentDictionaryIterator<'_, V, R> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let dictionary = self.dictionary;
        let (key, node) = dictionary.entry(self.back?)?;
        self.back = node.previous();
        self.remaining -= 1;
        Some((key, node.value()))
    }
}

impl<V, R: Router> ExactSizeIterator for PersistentDictionaryIterator<'_, V, R> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<V, R: Router> FusedIterator for PersistentDictionaryIterator<'_, V, R> {}

/// An owning iterator over the entries of a [`PersistentDictionary`] in
/// insertion order.
pub struct PersistentDictionaryIntoIterator<V> {
    entries: std::vec::IntoIter<(Key, V)>,
}

impl<V> Iterator for PersistentDictionaryIntoIterator<V> {
    type Item = (Key, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<V> DoubleEndedIterator for PersistentDictionaryIntoIterator<V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

impl<V> ExactSizeIterator for PersistentDictionaryIntoIterator<V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<V, R> Clone for PersistentDictionary<V, R> {
    fn clone(&self) -> Self {
        Self {
            root: ReferenceCounter::clone(&self.root),
            router: ReferenceCounter::clone(&self.router),
            length: self.length,
            first: self.first.clone(),
            last: self.last.clone(),
            next_index: self.next_index,
        }
    }
}

impl<V, R: Default> Default for PersistentDictionary<V, R> {
    #[inline]
    fn default() -> Self {
        Self::with_router(R::default())
    }
}

impl<K, V, R> FromIterator<(K, V)> for PersistentDictionary<V, R>
where
    K: Into<Key>,
    V: Clone,
    R: Router + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries_with_router(iter, R::default())
    }
}

impl<V: Clone, R: Router> IntoIterator for PersistentDictionary<V, R> {
    type Item = (Key, V);
    type IntoIter = PersistentDictionaryIntoIterator<V>;

    fn into_iter(self) -> Self::IntoIter {
        PersistentDictionaryIntoIterator {
            entries: self.to_vec().into_iter(),
        }
    }
}

impl<'a, V, R: Router> IntoIterator for &'a PersistentDictionary<V, R> {
    type Item = (&'a Key, &'a V);
    type IntoIter = PersistentDictionaryIterator<'a, V, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: PartialEq, R: Router> PartialEq for PersistentDictionary<V, R> {
    /// Two dictionaries are equal when they hold the same entries in the same
    /// order, whatever their routers.
    ///
    /// The auto-index is not compared: equal dictionaries may still
    /// [`append`](PersistentDictionary::append) under different keys, for
    /// instance when one of them once held an integer key it later unset.
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<V: Eq, R: Router> Eq for PersistentDictionary<V, R> {}

impl<V: Hash, R: Router> Hash for PersistentDictionary<V, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for (key, value) in self {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<V: fmt::Debug, R: Router> fmt::Debug for PersistentDictionary<V, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<V: fmt::Display, R: Router> fmt::Display for PersistentDictionary<V, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<V, R> serde::Serialize for PersistentDictionary<V, R>
where
    V: serde::Serialize,
    R: Router,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct PersistentDictionaryVisitor<V, R> {
    marker: std::marker::PhantomData<(V, R)>,
}

#[cfg(feature = "serde")]
impl<'de, V, R> serde::de::Visitor<'de> for PersistentDictionaryVisitor<V, R>
where
    V: serde::Deserialize<'de> + Clone,
    R: Router + Default,
{
    type Value = PersistentDictionary<V, R>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut dictionary = PersistentDictionary::with_router(R::default());
        while let Some((key, value)) = access.next_entry::<Key, V>()? {
            dictionary.set_node(key, value);
        }
        Ok(dictionary)
    }
}

#[cfg(feature = "serde")]
impl<'de, V, R> serde::Deserialize<'de> for PersistentDictionary<V, R>
where
    V: serde::Deserialize<'de> + Clone,
    R: Router + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(PersistentDictionaryVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Thread Safety
// =============================================================================

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(PersistentDictionary<i32>: Send, Sync);

#[cfg(not(feature = "arc"))]
static_assertions::assert_not_impl_any!(PersistentDictionary<i32>: Send, Sync);

// =============================================================================
// Tests
// =============================================================================
