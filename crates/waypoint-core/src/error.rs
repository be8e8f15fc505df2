//! Error types for the waypoint routing engine.
//!
//! The taxonomy distinguishes structural failures (no pattern matched a
//! path), configuration failures (a routing table or handler reference
//! could not be loaded), and exhausted reverse lookups. Per-candidate
//! rejections during reverse construction are not errors at this level;
//! they are plain values absorbed by the dispatcher while it advances to
//! the next candidate.

use thiserror::Error;

/// The primary error type for the waypoint routing engine.
///
/// All variants are surfaced to callers; none is used for internal control
/// flow. The enum is `Clone` so memoized lazy lookups can replay a failure
/// to every caller that forces them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaypointError {
    // ── Forward resolution ───────────────────────────────────────────

    /// No compiled pattern fully consumed the given path.
    ///
    /// `tried` holds the description of every candidate chain that was
    /// attempted before resolution gave up, for diagnostics.
    #[error("no URL pattern matches '{path}'")]
    NotFound {
        /// The path that failed to resolve.
        path: String,
        /// Descriptions of the pattern chains tried, in attempt order.
        tried: Vec<String>,
    },

    // ── Configuration ────────────────────────────────────────────────

    /// A routing table, sub-table thunk, or handler reference could not
    /// be loaded. Fatal; never masked by a fallback.
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Reverse resolution ───────────────────────────────────────────

    /// Every candidate chain for a reverse lookup was exhausted.
    ///
    /// The message enumerates the requested name, the arguments tried,
    /// and each attempted chain's description.
    #[error("{0}")]
    NoReverseMatch(String),
}

impl WaypointError {
    /// Shorthand constructor for [`WaypointError::ImproperlyConfigured`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::ImproperlyConfigured(message.into())
    }
}

/// A convenience type alias for `Result<T, WaypointError>`.
pub type WaypointResult<T> = Result<T, WaypointError>;
