//! Persistent (immutable) ordered dictionary.
//!
//! - [`PersistentDictionary`]: insertion-ordered map over a routed trie
//! - [`Key`]: string or integer dictionary key
//! - [`Node`]: a stored value with the keys of its neighbours
//!
//! # Structural Sharing
//!
//! Every operation returns a new version and leaves the receiver untouched.
//! A new version copies only the buckets on the paths it modifies; all other
//! buckets are shared with the version it was derived from.
//!
//! # Examples
//!
//! ```rust
//! use persistent_dictionary::persistent::{Key, PersistentDictionary};
//!
//! let dictionary = PersistentDictionary::new()
//!     .set("name", "lambda")
//!     .append("first")
//!     .append("second");
//!
//! let keys: Vec<Key> = dictionary.keys().cloned().collect();
//! assert_eq!(keys, vec![Key::from("name"), Key::from(0), Key::from(1)]);
//!
//! // The original dictionary is preserved
//! let updated = dictionary.unset("name");
//! assert_eq!(dictionary.len(), 3);
//! assert_eq!(updated.len(), 2);
//! assert_eq!(updated.first(), Some(&"first"));
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod dictionary;
mod key;
mod node;

pub use dictionary::PersistentDictionary;
pub use dictionary::PersistentDictionaryIntoIterator;
pub use dictionary::PersistentDictionaryIterator;
pub use key::Key;
pub use node::Node;

// =============================================================================
// Tests
// =============================================================================
