//! Configuration types for retries, job options, and the poll loop.

use std::collections::HashSet;
use std::time::Duration;

/// Retry policy for a single network phase.
///
/// Constructed per call site; submit, poll, and download phases use
/// different budgets because their failure modes differ. Submit failures
/// are cheap to retry quickly, poll failures already sit inside an outer
/// repetition loop, and large downloads are the most failure-prone.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first (0 = one attempt total).
    pub max_retries: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Ceiling for the growing delay.
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry. Must be > 1.
    pub backoff_multiplier: f64,

    /// Status codes that are retried even when the transport succeeded.
    ///
    /// A code can be simultaneously "ok" and retryable: 202 from a
    /// results endpoint means "accepted, not ready yet".
    pub retryable_status_codes: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            retryable_status_codes: [429, 500, 502, 503, 504].into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Policy for job submission: quick, cheap retries.
    pub fn submit() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Policy for a single status poll: small budget, since the outer
    /// poll loop already provides repetition.
    pub fn poll() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            ..Default::default()
        }
    }

    /// Policy for result downloads: longer budget for large payloads.
    pub fn download() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            ..Default::default()
        }
    }

    /// Set the retry count.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the delay ceiling.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Mark an additional status code as retryable.
    pub fn with_retryable_status(mut self, status: u16) -> Self {
        self.retryable_status_codes.insert(status);
        self
    }
}

/// Options passed to a provider when submitting a prompt.
#[derive(Debug, Clone, Default)]
pub struct JobOptions {
    /// Ask the provider to ground the answer with a web-search step.
    pub use_search: bool,

    /// Two-letter country code for geo-targeted answers.
    pub country_code: Option<String>,
}

impl JobOptions {
    /// Create options with defaults (no search, no geo-targeting).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the web-search step.
    pub fn with_search(mut self) -> Self {
        self.use_search = true;
        self
    }

    /// Set the country code.
    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = Some(code.into());
        self
    }
}

/// Configuration for the job poll loop.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Fixed interval between status polls.
    pub poll_interval: Duration,

    /// Hard wall-clock ceiling measured from job start.
    ///
    /// A slow-but-progressing job still times out; the ceiling is not
    /// reset by activity.
    pub poll_timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(600),
        }
    }
}

impl JobConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the wall-clock ceiling.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }
}
