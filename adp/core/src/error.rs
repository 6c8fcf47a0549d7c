//! Router Error Types

use thiserror::Error;

/// Errors surfaced by the router's public API
///
/// Routing itself never fails: an empty candidate set is reported through
/// the decision's strategy tag. These errors cover inputs the router refuses
/// to accept.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RouterError {
    /// A category string did not name a known worker category
    #[error("Unknown worker category: {0}")]
    UnknownCategory(String),

    /// A worker profile failed validation at registration time
    #[error("Invalid profile for worker '{id}': {reason}")]
    InvalidProfile {
        /// The offending worker id
        id: String,
        /// What was wrong with the profile
        reason: String,
    },
}
