//! Scrape job orchestration.
//!
//! Drives the three provider phases strictly in sequence for one logical
//! request: submit, poll until ready, download, transform. The poll loop
//! enforces a wall-clock ceiling measured from job start, and the shared
//! cancellation token is honored at phase boundaries and inside every
//! sleep.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScrapeError};
use crate::traits::provider::{JobStatus, ScrapeProvider};
use crate::types::config::{JobConfig, JobOptions};
use crate::types::model::ModelResult;

/// Runs scrape jobs against one provider.
pub struct ScrapeJobRunner<P: ScrapeProvider> {
    provider: P,
    config: JobConfig,
}

impl<P: ScrapeProvider> ScrapeJobRunner<P> {
    /// Create a runner with the default poll configuration.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: JobConfig::default(),
        }
    }

    /// Create a runner with a custom poll configuration.
    pub fn with_config(provider: P, config: JobConfig) -> Self {
        Self { provider, config }
    }

    /// The provider this runner drives.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Execute one prompt end-to-end: submit, poll, download, transform.
    pub async fn run(
        &self,
        prompt: &str,
        options: &JobOptions,
        cancel: &CancellationToken,
    ) -> Result<ModelResult> {
        let started = tokio::time::Instant::now();

        tracing::info!(provider = self.provider.name(), "submitting scrape job");
        let handle = self
            .provider
            .trigger_job(prompt, options, cancel)
            .await?
            .ok_or_else(|| ScrapeError::JobFailed {
                reason: "provider returned no job id".to_string(),
            })?;
        tracing::info!(job_id = %handle, "job submitted, polling for completion");

        loop {
            if cancel.is_cancelled() {
                return Err(ScrapeError::Cancelled);
            }
            // Wall-clock ceiling from job start: a slow-but-progressing
            // job still times out.
            if started.elapsed() >= self.config.poll_timeout {
                return Err(ScrapeError::Timeout {
                    elapsed_secs: started.elapsed().as_secs(),
                });
            }

            match self.provider.monitor_job(&handle, cancel).await? {
                JobStatus::Ready => break,
                JobStatus::Failed(reason) => {
                    return Err(ScrapeError::JobFailed { reason });
                }
                JobStatus::Running => {
                    tracing::debug!(job_id = %handle, "job still running");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
            }
        }

        tracing::info!(job_id = %handle, "job ready, downloading results");
        let raw = self.provider.download_job(&handle, cancel).await?;
        let result = self.provider.transform_response(&raw)?;
        tracing::info!(
            job_id = %handle,
            sources = result.sources.len(),
            search_sources = result.search_sources.len(),
            "job transformed"
        );

        Ok(result)
    }

    /// Execute a batch of prompts with bounded concurrency.
    ///
    /// Output is index-aligned with the input: a failed job yields `None`
    /// in its slot instead of aborting its siblings. `MalformedPayload`
    /// alone propagates, since it signals a provider contract violation
    /// rather than ordinary flakiness.
    pub async fn run_batch(
        &self,
        prompts: &[String],
        options: &JobOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<ModelResult>>> {
        let concurrency = self.provider.max_concurrency().max(1);

        let outcomes: Vec<Result<ModelResult>> = futures::stream::iter(
            prompts
                .iter()
                .map(|prompt| self.run(prompt, options, cancel)),
        )
        .buffered(concurrency)
        .collect()
        .await;

        let mut results = Vec::with_capacity(outcomes.len());
        for (slot, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => results.push(Some(result)),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    tracing::warn!(slot, error = %error, "scrape job failed");
                    results.push(None);
                }
            }
        }

        Ok(results)
    }
}
