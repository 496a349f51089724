//! Dictionary keys.
//!
//! A [`Key`] is either a non-negative integer index or a string name. Strings
//! holding the canonical decimal rendering of an index are normalised to
//! [`Key::Index`], so `"7"` and `7` always address the same entry.

use std::borrow::Cow;
use std::fmt;

use super::ReferenceCounter;

/// A key of a [`PersistentDictionary`](super::PersistentDictionary).
///
/// Integer keys take part in the auto-index counter used by
/// [`append`](super::PersistentDictionary::append). Names are reference
/// counted so that the neighbour links stored next to every value can be
/// cloned in O(1).
///
/// # Examples
///
/// ```rust
/// use persistent_dictionary::persistent::Key;
///
/// assert_eq!(Key::from("12"), Key::Index(12));
/// assert_eq!(Key::from("012"), Key::from("012".to_string()));
/// assert!(Key::from("012").is_name());
/// assert_eq!(Key::from(-3).to_string(), "-3");
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// A non-negative integer key.
    Index(u64),
    /// A string key that is not the canonical rendering of an index.
    Name(ReferenceCounter<str>),
}

impl Key {
    /// Builds a key from a name, normalising canonical decimal integers.
    #[must_use]
    pub fn name(name: &str) -> Self {
        parse_index(name).map_or_else(|| Self::Name(ReferenceCounter::from(name)), Self::Index)
    }

    /// Returns the index if this is an integer key.
    #[inline]
    #[must_use]
    pub const fn as_index(&self) -> Option<u64> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Name(_) => None,
        }
    }

    /// Returns the name if this is a string key.
    #[inline]
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Index(_) => None,
            Self::Name(name) => Some(name),
        }
    }

    /// Returns `true` for [`Key::Index`].
    #[inline]
    #[must_use]
    pub const fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Returns `true` for [`Key::Name`].
    #[inline]
    #[must_use]
    pub const fn is_name(&self) -> bool {
        matches!(self, Self::Name(_))
    }

    /// The bytes a router reads for this key.
    ///
    /// Indices are routed on their decimal rendering, names on their UTF-8
    /// bytes.
    #[must_use]
    pub fn routing_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Self::Index(index) => Cow::Owned(index.to_string().into_bytes()),
            Self::Name(name) => Cow::Borrowed(name.as_bytes()),
        }
    }
}

/// Parses the canonical decimal rendering of a `u64`.
///
/// Leading zeros, signs and surrounding whitespace are rejected so that the
/// mapping between indices and their names stays one-to-one.
fn parse_index(name: &str) -> Option<u64> {
    let bytes = name.as_bytes();
    let canonical = match bytes {
        [] => false,
        [b'0'] => true,
        [b'0', ..] => false,
        _ => bytes.iter().all(u8::is_ascii_digit),
    };
    if canonical { name.parse().ok() } else { None }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<u64> for Key {
    #[inline]
    fn from(index: u64) -> Self {
        Self::Index(index)
    }
}

impl From<u32> for Key {
    #[inline]
    fn from(index: u32) -> Self {
        Self::Index(u64::from(index))
    }
}

impl From<usize> for Key {
    #[inline]
    fn from(index: usize) -> Self {
        Self::Index(index as u64)
    }
}

impl From<i64> for Key {
    /// Negative integers are not indices and become names such as `"-1"`.
    fn from(value: i64) -> Self {
        u64::try_from(value).map_or_else(
            |_| Self::Name(ReferenceCounter::from(value.to_string().as_str())),
            Self::Index,
        )
    }
}

impl From<i32> for Key {
    #[inline]
    fn from(value: i32) -> Self {
        Self::from(i64::from(value))
    }
}

impl From<&str> for Key {
    #[inline]
    fn from(name: &str) -> Self {
        Self::name(name)
    }
}

impl From<String> for Key {
    #[inline]
    fn from(name: String) -> Self {
        Self::name(&name)
    }
}

impl From<&String> for Key {
    #[inline]
    fn from(name: &String) -> Self {
        Self::name(name)
    }
}

impl From<&Self> for Key {
    #[inline]
    fn from(key: &Self) -> Self {
        key.clone()
    }
}

// =============================================================================
// Formatting
// =============================================================================

impl fmt::Display for Key {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(formatter, "{index}"),
            Self::Name(name) => formatter.write_str(name),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(formatter, "{index}"),
            Self::Name(name) => write!(formatter, "{:?}", &**name),
        }
    }
}

// =============================================================================
// Serde Support
// =============================================================================

// Human-readable formats carry indices as numbers and names as strings, and
// read keys back with `deserialize_any`. Formats that are not self-describing
// carry every key as its canonical string, which `Key::name` maps back to the
// same variant.

#[cfg(feature = "serde")]
impl serde::Serialize for Key {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Index(index) if serializer.is_human_readable() => serializer.serialize_u64(*index),
            Self::Index(_) => serializer.collect_str(self),
            Self::Name(name) => serializer.serialize_str(name),
        }
    }
}

#[cfg(feature = "serde")]
struct KeyVisitor;

#[cfg(feature = "serde")]
impl serde::de::Visitor<'_> for KeyVisitor {
    type Value = Key;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string or an integer")
    }

    fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Key::Index(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Key::from(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Key::name(value))
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Key {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(KeyVisitor)
        } else {
            deserializer.deserialize_str(KeyVisitor)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
