use thiserror::Error;

/// Failures surfaced synchronously by the aggregation core.
///
/// Both are request-level conditions; nothing here is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    /// Sender id is not a number or falls outside `[0, observer_count)`.
    #[error("invalid observer id '{id}': {reason}")]
    InvalidObserver { id: String, reason: String },

    /// Query for a session id that has never been seen (or was evicted).
    #[error("no such session: {0}")]
    NotFound(String),
}
