//! Typed errors for the scrape-job lifecycle.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur while driving a scrape job or resolving its output.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No response was obtained from the provider after the retry budget.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The provider answered with a non-retryable error status.
    #[error("provider rejected request ({status}): {message}")]
    ProviderRejected { status: u16, message: String },

    /// The poll loop exceeded the wall-clock ceiling.
    #[error("job timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    /// The provider explicitly reported the job as failed.
    #[error("job failed: {reason}")]
    JobFailed { reason: String },

    /// Cooperative cancellation was observed.
    #[error("operation cancelled")]
    Cancelled,

    /// Download succeeded but the payload is structurally unusable.
    ///
    /// This is the one failure worth surfacing loudly: it indicates a
    /// contract violation by the provider, not ordinary flakiness.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A required environment variable was not set.
    #[error("missing credential: {variable} is not set")]
    MissingCredential { variable: String },

    /// No provider is registered under the requested name.
    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },
}

impl ScrapeError {
    /// Whether this error aborts a whole batch instead of one slot.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScrapeError::MalformedPayload(_))
    }
}

/// Result type alias for scrape operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;
