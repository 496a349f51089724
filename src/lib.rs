//! # persistent-dictionary
//!
//! A persistent (immutable) ordered dictionary for Rust.
//!
//! ## Overview
//!
//! [`PersistentDictionary`](persistent::PersistentDictionary) maps string and
//! integer keys to values, iterates in insertion order, and shares structure
//! between versions: every operation returns a new dictionary and leaves the
//! old one intact.
//!
//! - **Persistent**: the dictionary, its keys and its linked nodes
//! - **Routing**: the nibble-folding bucket router and its memoizing decorator
//! - **Error**: router configuration errors
//!
//! ## Feature Flags
//!
//! - `arc`: Use `Arc` instead of `Rc` so dictionaries are `Send + Sync`
//! - `serde`: Serialize and deserialize dictionaries as maps. Keys work with
//!   self-describing formats (JSON) and with binary ones (`MessagePack`),
//!   where every key travels as its canonical string
//! - `fxhash`: Use `FxHashMap` for the memoized router cache
//!
//! ## Example
//!
//! ```rust
//! use persistent_dictionary::prelude::*;
//!
//! let dictionary = PersistentDictionary::new()
//!     .set("a", 1)
//!     .set("b", 2)
//!     .append(3);
//!
//! assert_eq!(dictionary.get("b"), Some(&2));
//! assert_eq!(dictionary.get(0), Some(&3));
//! assert_eq!(format!("{dictionary}"), "{a: 1, b: 2, 0: 3}");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use persistent_dictionary::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::*;
    pub use crate::persistent::*;
    pub use crate::routing::*;
}

pub mod error;
pub mod persistent;
pub mod routing;
