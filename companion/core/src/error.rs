//! Core Error Types
//!
//! Errors surfaced by the companion core. Most failure modes in the core are
//! deliberately non-fatal (logged and absorbed at the boundary), so this set
//! is small.

use thiserror::Error;

/// A mood identifier that is not part of the catalog
///
/// Returned by [`MoodRegistry::metadata_of`](crate::mood::MoodRegistry::metadata_of)
/// and by the string-based mood setters. Callers that go through the
/// companion facade never see this as a crash: the request is logged and the
/// state is left untouched.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("Unknown mood: {0}")]
pub struct UnknownMoodError(pub String);

impl UnknownMoodError {
    /// The identifier that was rejected
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// The companion runtime task has stopped and no longer accepts commands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("Companion runtime is not running")]
pub struct RuntimeClosed;
