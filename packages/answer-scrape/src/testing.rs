//! Mock implementations for testing.
//!
//! `MockProvider` scripts the three job phases so orchestrator behavior
//! (timeouts, failure classification, cancellation, batch alignment) can
//! be exercised without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScrapeError};
use crate::traits::provider::{JobHandle, JobStatus, ScrapeProvider};
use crate::types::config::JobOptions;
use crate::types::model::ModelResult;

/// A scriptable provider for tests.
///
/// Monitor calls consume the scripted status sequence, then fall back to
/// the default status. The payload is returned verbatim by download, and
/// the transform deserializes it directly as a [`ModelResult`].
pub struct MockProvider {
    name: String,
    max_concurrency: usize,
    job_id: Option<String>,
    statuses: Mutex<VecDeque<JobStatus>>,
    default_status: JobStatus,
    payload: Value,
    trigger_calls: AtomicUsize,
    monitor_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a mock that submits successfully and reports ready at once.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            max_concurrency: 2,
            job_id: Some("mock-job-1".to_string()),
            statuses: Mutex::new(VecDeque::new()),
            default_status: JobStatus::Ready,
            payload: Value::Null,
            trigger_calls: AtomicUsize::new(0),
            monitor_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    /// Decline every submission (trigger returns no job id).
    pub fn without_job_id(mut self) -> Self {
        self.job_id = None;
        self
    }

    /// Script the first monitor responses.
    pub fn with_status_sequence(self, statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .extend(statuses);
        self
    }

    /// Status reported once the script is exhausted.
    pub fn with_default_status(mut self, status: JobStatus) -> Self {
        self.default_status = status;
        self
    }

    /// Payload returned by download; the mock transform deserializes it
    /// as a [`ModelResult`].
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the concurrency limit reported to the batch runner.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Number of trigger calls observed.
    pub fn trigger_calls(&self) -> usize {
        self.trigger_calls.load(Ordering::SeqCst)
    }

    /// Number of monitor calls observed.
    pub fn monitor_calls(&self) -> usize {
        self.monitor_calls.load(Ordering::SeqCst)
    }

    /// Number of download calls observed.
    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScrapeProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    async fn trigger_job(
        &self,
        _prompt: &str,
        _options: &JobOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<JobHandle>> {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .job_id
            .clone()
            .and_then(JobHandle::from_provider_id))
    }

    async fn monitor_job(
        &self,
        _job: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<JobStatus> {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        self.monitor_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.statuses.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| self.default_status.clone()))
    }

    async fn download_job(&self, _job: &JobHandle, cancel: &CancellationToken) -> Result<Value> {
        if cancel.is_cancelled() {
            return Err(ScrapeError::Cancelled);
        }
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }

    fn transform_response(&self, raw: &Value) -> Result<ModelResult> {
        if raw.is_null() {
            return Err(ScrapeError::MalformedPayload(
                "null result payload".to_string(),
            ));
        }
        serde_json::from_value(raw.clone())
            .map_err(|e| ScrapeError::MalformedPayload(e.to_string()))
    }
}

/// A minimal well-formed payload for [`MockProvider`].
pub fn sample_payload(prompt: &str, answer: &str) -> Value {
    serde_json::json!({
        "prompt": prompt,
        "answer": answer,
        "sources": [],
        "search_queries": [],
        "search_sources": []
    })
}
