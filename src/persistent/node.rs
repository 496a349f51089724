//! One link of the insertion-order chain.

use super::Key;

/// A stored value together with the keys of its neighbours in insertion
/// order.
///
/// Neighbours are plain keys, resolved through the trie when the chain is
/// walked, never references to other nodes. A `Node` is never changed in
/// place: the `with_*` methods build a copy differing in one field.
///
/// # Examples
///
/// ```rust
/// use persistent_dictionary::persistent::{Key, Node};
///
/// let node = Node::new(None, None, "value");
/// let linked = node.with_next(Some(Key::from("b")));
///
/// assert_eq!(node.next(), None);
/// assert_eq!(linked.next(), Some(&Key::from("b")));
/// assert_eq!(linked.value(), &"value");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node<V> {
    value: V,
    previous: Option<Key>,
    next: Option<Key>,
}

impl<V> Node<V> {
    /// Creates a node from its neighbours and value.
    #[inline]
    #[must_use]
    pub const fn new(previous: Option<Key>, next: Option<Key>, value: V) -> Self {
        Self {
            value,
            previous,
            next,
        }
    }

    /// The stored value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Key of the entry inserted just before this one, if any.
    #[inline]
    #[must_use]
    pub const fn previous(&self) -> Option<&Key> {
        self.previous.as_ref()
    }

    /// Key of the entry inserted just after this one, if any.
    #[inline]
    #[must_use]
    pub const fn next(&self) -> Option<&Key> {
        self.next.as_ref()
    }

    /// Creates a copy of this node with a new successor.
    #[must_use]
    pub fn with_next(&self, next: Option<Key>) -> Self
    where
        V: Clone,
    {
        Self {
            value: self.value.clone(),
            previous: self.previous.clone(),
            next,
        }
    }

    /// Creates a copy of this node with a new predecessor.
    #[must_use]
    pub fn with_previous(&self, previous: Option<Key>) -> Self
    where
        V: Clone,
    {
        Self {
            value: self.value.clone(),
            previous,
            next: self.next.clone(),
        }
    }

    /// Creates a copy of this node holding another value.
    #[must_use]
    pub fn with_value(&self, value: V) -> Self {
        Self {
            value,
            previous: self.previous.clone(),
            next: self.next.clone(),
        }
    }

    /// Consumes the node, returning its value.
    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }
}
