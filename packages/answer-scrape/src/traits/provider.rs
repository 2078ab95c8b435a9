//! Provider contract for asynchronous prompt-scraping jobs.
//!
//! Every vendor implements the same three-phase lifecycle: submit a
//! prompt-execution job, poll until it finishes, download the results.
//! Vendor-specific response shapes stay behind [`ScrapeProvider`]; nothing
//! outside the provider registry branches on a vendor name.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::config::JobOptions;
use crate::types::model::ModelResult;

/// Opaque provider-assigned job identifier.
///
/// Created by submit, consumed by the poll and download phases, discarded
/// after the download. Carries no other state and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    /// Wrap a provider-assigned id. Returns `None` for an empty id, the
    /// provider's way of signalling a rejected submission.
    pub fn from_provider_id(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// The raw provider identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by a single poll of the provider's status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    /// The job is still executing; keep polling.
    Running,

    /// Results are ready for download.
    Ready,

    /// The provider explicitly reported failure.
    Failed(String),
}

/// A vendor that executes prompts asynchronously and reports sources.
///
/// Implementations own their per-phase retry policies: submit failures are
/// cheap to retry quickly, poll requests carry a small budget because the
/// orchestrator's poll loop already repeats them, and downloads tolerate a
/// longer budget.
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    /// Vendor name, used only for logging and registry lookup.
    fn name(&self) -> &str;

    /// Maximum jobs in flight; enforced by the batch runner.
    fn max_concurrency(&self) -> usize;

    /// Prompts per submitted job. Both implemented vendors accept one.
    fn max_prompts_per_request(&self) -> usize {
        1
    }

    /// Submit a prompt-execution job.
    ///
    /// Returns `Ok(None)` when the provider declines the submission:
    /// common and expected under provider load, so it is not an error.
    async fn trigger_job(
        &self,
        prompt: &str,
        options: &JobOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<JobHandle>>;

    /// Poll the job's status once.
    ///
    /// A non-retryable error status from the provider surfaces as
    /// `ProviderRejected`, which terminates the whole job rather than
    /// letting the orchestrator keep polling.
    async fn monitor_job(&self, job: &JobHandle, cancel: &CancellationToken)
        -> Result<JobStatus>;

    /// Download the raw result payload for a ready job.
    async fn download_job(&self, job: &JobHandle, cancel: &CancellationToken) -> Result<Value>;

    /// Map the raw payload into a normalized [`ModelResult`].
    ///
    /// Pure. Degrades malformed or missing optional fields to empty
    /// strings and arrays; fails with `MalformedPayload` only when the
    /// payload is structurally absent (null or an empty array).
    fn transform_response(&self, raw: &Value) -> Result<ModelResult>;
}

impl std::fmt::Debug for dyn ScrapeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeProvider")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

// Boxed providers (e.g. from the registry) are usable wherever a concrete
// provider is.
#[async_trait]
impl<P: ScrapeProvider + ?Sized> ScrapeProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn max_concurrency(&self) -> usize {
        (**self).max_concurrency()
    }

    fn max_prompts_per_request(&self) -> usize {
        (**self).max_prompts_per_request()
    }

    async fn trigger_job(
        &self,
        prompt: &str,
        options: &JobOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<JobHandle>> {
        (**self).trigger_job(prompt, options, cancel).await
    }

    async fn monitor_job(
        &self,
        job: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<JobStatus> {
        (**self).monitor_job(job, cancel).await
    }

    async fn download_job(&self, job: &JobHandle, cancel: &CancellationToken) -> Result<Value> {
        (**self).download_job(job, cancel).await
    }

    fn transform_response(&self, raw: &Value) -> Result<ModelResult> {
        (**self).transform_response(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_handle_rejects_empty_ids() {
        assert!(JobHandle::from_provider_id("").is_none());
        assert!(JobHandle::from_provider_id("   ").is_none());

        let handle = JobHandle::from_provider_id("task-42").unwrap();
        assert_eq!(handle.as_str(), "task-42");
        assert_eq!(handle.to_string(), "task-42");
    }
}
