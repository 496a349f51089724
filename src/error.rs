//! Error types.
//!
//! Dictionary operations never fail: lookups of absent keys yield `None` and
//! removing an absent key is a no-op. The only fallible step is configuring
//! a router.

/// Represents errors that can occur when configuring a router.
///
/// # Examples
///
/// ```rust
/// use persistent_dictionary::error::RoutingError;
/// use persistent_dictionary::routing::BucketRouter;
///
/// let error = BucketRouter::new(0).unwrap_err();
/// assert_eq!(error, RoutingError::DepthOutOfRange { depth: 0, maximum: 32 });
/// assert_eq!(
///     format!("{error}"),
///     "bucket depth 0 is out of range, expected 1..=32"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// The requested bucket depth is zero or larger than the supported maximum.
    DepthOutOfRange {
        /// The depth that was requested.
        depth: usize,
        /// The largest supported depth.
        maximum: usize,
    },
}

impl std::fmt::Display for RoutingError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DepthOutOfRange { depth, maximum } => write!(
                formatter,
                "bucket depth {depth} is out of range, expected 1..={maximum}"
            ),
        }
    }
}

impl std::error::Error for RoutingError {}
