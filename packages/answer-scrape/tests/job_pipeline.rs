//! Integration tests for the scrape job orchestrator.
//!
//! These tests verify the full job workflow against a scripted provider:
//! 1. Submit the prompt
//! 2. Poll until the provider reports ready
//! 3. Download and transform the payload
//! 4. Batch execution with index-aligned results

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use answer_scrape::testing::{sample_payload, MockProvider};
use answer_scrape::{JobConfig, JobOptions, JobStatus, ScrapeError, ScrapeJobRunner};

fn fast_config() -> JobConfig {
    JobConfig::new()
        .with_poll_interval(Duration::from_millis(50))
        .with_poll_timeout(Duration::from_secs(10))
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_submits_polls_and_transforms() {
    let provider = MockProvider::new()
        .with_status_sequence([JobStatus::Running, JobStatus::Running, JobStatus::Ready])
        .with_payload(sample_payload("best crm", "HubSpot and Salesforce lead."));
    let runner = ScrapeJobRunner::with_config(provider, fast_config());

    let cancel = CancellationToken::new();
    let result = runner
        .run("best crm", &JobOptions::new(), &cancel)
        .await
        .unwrap();

    assert_eq!(result.prompt, "best crm");
    assert_eq!(result.answer, "HubSpot and Salesforce lead.");
    assert_eq!(runner.provider().trigger_calls(), 1);
    assert_eq!(runner.provider().monitor_calls(), 3);
    assert_eq!(runner.provider().download_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_job_that_never_finishes_times_out() {
    // The provider keeps reporting running forever: the wall-clock
    // ceiling must convert that into a timeout error, not an endless
    // poll loop.
    let provider = MockProvider::new().with_default_status(JobStatus::Running);
    let config = JobConfig::new()
        .with_poll_interval(Duration::from_secs(1))
        .with_poll_timeout(Duration::from_secs(5));
    let runner = ScrapeJobRunner::with_config(provider, config);

    let cancel = CancellationToken::new();
    let err = runner
        .run("slow prompt", &JobOptions::new(), &cancel)
        .await
        .unwrap_err();

    match err {
        ScrapeError::Timeout { elapsed_secs } => assert!(elapsed_secs >= 5),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(runner.provider().download_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_provider_reported_failure_stops_polling() {
    let provider = MockProvider::new().with_status_sequence([
        JobStatus::Running,
        JobStatus::Failed("model quota exhausted".to_string()),
    ]);
    let runner = ScrapeJobRunner::with_config(provider, fast_config());

    let cancel = CancellationToken::new();
    let err = runner
        .run("prompt", &JobOptions::new(), &cancel)
        .await
        .unwrap_err();

    match err {
        ScrapeError::JobFailed { reason } => assert_eq!(reason, "model quota exhausted"),
        other => panic!("expected job failure, got {other:?}"),
    }
    // Failure terminates the loop immediately.
    assert_eq!(runner.provider().monitor_calls(), 2);
    assert_eq!(runner.provider().download_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_declined_submission_is_a_job_failure() {
    let provider = MockProvider::new().without_job_id();
    let runner = ScrapeJobRunner::with_config(provider, fast_config());

    let cancel = CancellationToken::new();
    let err = runner
        .run("prompt", &JobOptions::new(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::JobFailed { .. }));
    assert_eq!(runner.provider().monitor_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_the_poll_sleep() {
    let provider = MockProvider::new().with_default_status(JobStatus::Running);
    let config = JobConfig::new()
        .with_poll_interval(Duration::from_secs(60))
        .with_poll_timeout(Duration::from_secs(600));
    let runner = ScrapeJobRunner::with_config(provider, config);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let err = runner
        .run("prompt", &JobOptions::new(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::Cancelled));
    // The 60s sleep was aborted by the token, not waited out.
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_batch_results_stay_index_aligned() {
    // Every other submission is declined; declined jobs become None
    // without disturbing their siblings' slots.
    let provider = FlakyProvider::new();
    let runner = ScrapeJobRunner::with_config(provider, fast_config());

    let prompts = vec![
        "prompt one".to_string(),
        "prompt two".to_string(),
        "prompt three".to_string(),
    ];
    let cancel = CancellationToken::new();
    let results = runner
        .run_batch(&prompts, &JobOptions::new(), &cancel)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0].as_ref().map(|r| r.prompt.as_str()),
        Some("prompt one")
    );
    assert!(results[1].is_none());
    assert_eq!(
        results[2].as_ref().map(|r| r.prompt.as_str()),
        Some("prompt three")
    );
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_aborts_the_batch() {
    // A null payload signals a provider contract violation and must
    // propagate instead of degrading to None.
    let provider = MockProvider::new().with_payload(serde_json::Value::Null);
    let runner = ScrapeJobRunner::with_config(provider, fast_config());

    let prompts = vec!["prompt".to_string()];
    let cancel = CancellationToken::new();
    let err = runner
        .run_batch(&prompts, &JobOptions::new(), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::MalformedPayload(_)));
}

/// Declines the second submission, keyed off the prompt text so buffered
/// execution order cannot skew the scenario. Downloads echo the prompt
/// that created the job.
struct FlakyProvider {
    jobs: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl FlakyProvider {
    fn new() -> Self {
        Self {
            jobs: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl answer_scrape::ScrapeProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky-mock"
    }

    fn max_concurrency(&self) -> usize {
        2
    }

    async fn trigger_job(
        &self,
        prompt: &str,
        _options: &JobOptions,
        _cancel: &CancellationToken,
    ) -> answer_scrape::Result<Option<answer_scrape::JobHandle>> {
        if prompt.contains("two") {
            return Ok(None);
        }
        let mut jobs = self.jobs.lock().unwrap();
        let id = format!("job-{}", jobs.len() + 1);
        jobs.insert(id.clone(), prompt.to_string());
        Ok(answer_scrape::JobHandle::from_provider_id(id))
    }

    async fn monitor_job(
        &self,
        _job: &answer_scrape::JobHandle,
        _cancel: &CancellationToken,
    ) -> answer_scrape::Result<JobStatus> {
        Ok(JobStatus::Ready)
    }

    async fn download_job(
        &self,
        job: &answer_scrape::JobHandle,
        _cancel: &CancellationToken,
    ) -> answer_scrape::Result<serde_json::Value> {
        let jobs = self.jobs.lock().unwrap();
        let prompt = jobs.get(job.as_str()).cloned().unwrap_or_default();
        Ok(sample_payload(&prompt, "answer"))
    }

    fn transform_response(
        &self,
        raw: &serde_json::Value,
    ) -> answer_scrape::Result<answer_scrape::ModelResult> {
        serde_json::from_value(raw.clone())
            .map_err(|e| ScrapeError::MalformedPayload(e.to_string()))
    }
}
