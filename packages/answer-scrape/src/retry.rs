//! Bounded-retry executor with exponential backoff.
//!
//! Wraps a single network operation: retries on transport errors and on
//! retryable status codes, growing the delay exponentially up to a cap,
//! and cooperating with an external cancellation signal. The final attempt
//! returns whatever was obtained, so callers always inspect the status
//! themselves.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScrapeError};
use crate::types::config::RetryPolicy;

/// Abstraction over a response the executor can classify.
///
/// Implemented for `reqwest::Response`; test doubles implement it to
/// exercise the executor without a network.
pub trait RetryOutcome {
    /// Transport-level success (a well-formed response was obtained).
    fn transport_ok(&self) -> bool;

    /// Numeric status code of the response.
    fn status_code(&self) -> u16;
}

impl RetryOutcome for reqwest::Response {
    fn transport_ok(&self) -> bool {
        self.status().is_success()
    }

    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Run `op` under the given retry policy.
///
/// Success means the response is transport-ok *and* its status is not in
/// the policy's retryable set; a 202 from a results endpoint is obtained
/// successfully yet still retried. On the final attempt the response is
/// returned as-is even when it signals failure. A transport error on the
/// final attempt (which, when every attempt failed, is the last error
/// ever observed) surfaces as [`ScrapeError::Transport`].
///
/// Sleeps are abortable: cancellation during a backoff wait returns
/// [`ScrapeError::Cancelled`] promptly, and an already-tripped token
/// fails before the first attempt.
pub async fn execute_with_retry<R, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<R>
where
    R: RetryOutcome,
    E: std::error::Error + Send + Sync + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
{
    if cancel.is_cancelled() {
        return Err(ScrapeError::Cancelled);
    }

    let mut delay = policy.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        let last = attempt == policy.max_retries;

        match op().await {
            Ok(response) => {
                let retryable = policy
                    .retryable_status_codes
                    .contains(&response.status_code());
                if (response.transport_ok() && !retryable) || last {
                    return Ok(response);
                }
                tracing::debug!(
                    attempt,
                    status = response.status_code(),
                    "retryable response, backing off"
                );
            }
            Err(error) => {
                if last {
                    return Err(ScrapeError::Transport(Box::new(error)));
                }
                tracing::debug!(attempt, error = %error, "request failed, backing off");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
        }

        delay = std::cmp::min(delay.mul_f64(policy.backoff_multiplier), policy.max_delay);
        attempt += 1;
    }
}
