//! DataForSEO-backed scrape provider.
//!
//! Task-queue style vendor: `task_post` enqueues a prompt execution and
//! returns a task id, `task_get/{id}` reports vendor status codes until the
//! task completes and then carries the result array. Uses basic auth with
//! `DATAFORSEO_LOGIN` / `DATAFORSEO_PASSWORD`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, ScrapeError};
use crate::retry::execute_with_retry;
use crate::security::ProviderCredentials;
use crate::traits::provider::{JobHandle, JobStatus, ScrapeProvider};
use crate::types::config::{JobOptions, RetryPolicy};
use crate::types::model::{ModelResult, SearchSource, Source};

use super::{first_result_entry, search_snippet_for};

const DATAFORSEO_API_URL: &str = "https://api.dataforseo.com/v3";

// Vendor task status codes.
const TASK_OK: u32 = 20000;
const TASK_CREATED: u32 = 20100;
const TASK_IN_QUEUE: u32 = 40601;
const TASK_IN_PROGRESS: u32 = 40602;

/// LLM-answer scraping via the DataForSEO task queue.
pub struct DataForSeoProvider {
    client: Client,
    credentials: ProviderCredentials,
    submit_policy: RetryPolicy,
    poll_policy: RetryPolicy,
    download_policy: RetryPolicy,
}

// Request/response types for the task API.

#[derive(Debug, Serialize)]
struct TaskPostItem {
    user_prompt: String,
    web_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    tasks: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
struct TaskEntry {
    #[serde(default)]
    id: Option<String>,
    status_code: u32,
    #[serde(default)]
    status_message: String,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LlmResultEntry {
    items: Vec<LlmResponseItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LlmResponseItem {
    user_prompt: String,
    answer: String,
    citations: Vec<CitationRecord>,
    search_queries: Vec<String>,
    organic_results: Vec<OrganicRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CitationRecord {
    url: String,
    title: Option<String>,
    domain: Option<String>,
    cited: Option<bool>,
    #[serde(rename = "citation_positions")]
    positions: Vec<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrganicRecord {
    url: String,
    title: Option<String>,
    domain: Option<String>,
    description: Option<String>,
    #[serde(rename = "rank_absolute")]
    rank: Option<u32>,
    date_published: Option<String>,
}

impl DataForSeoProvider {
    /// Create a provider with explicit credentials.
    pub fn new(credentials: ProviderCredentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ScrapeError::Transport(Box::new(e)))?;

        Ok(Self {
            client,
            credentials,
            submit_policy: RetryPolicy::submit(),
            poll_policy: RetryPolicy::poll(),
            download_policy: RetryPolicy::download(),
        })
    }

    /// Create from `DATAFORSEO_LOGIN` / `DATAFORSEO_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let credentials =
            ProviderCredentials::from_env("DATAFORSEO_LOGIN", "DATAFORSEO_PASSWORD")?;
        Self::new(credentials)
    }

    /// Override the submit retry policy.
    pub fn with_submit_policy(mut self, policy: RetryPolicy) -> Self {
        self.submit_policy = policy;
        self
    }

    /// Override the poll retry policy.
    pub fn with_poll_policy(mut self, policy: RetryPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    /// Override the download retry policy.
    pub fn with_download_policy(mut self, policy: RetryPolicy) -> Self {
        self.download_policy = policy;
        self
    }

    async fn task_get(
        &self,
        job: &JobHandle,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<TaskEntry> {
        let url = format!(
            "{}/ai_optimization/chat_gpt/llm_responses/task_get/{}",
            DATAFORSEO_API_URL, job
        );

        let response = execute_with_retry(policy, cancel, || {
            self.client
                .get(&url)
                .basic_auth(self.credentials.username(), Some(self.credentials.secret()))
                .send()
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ScrapeError::ProviderRejected { status, message });
        }

        let envelope: TaskResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::Transport(Box::new(e)))?;

        envelope
            .tasks
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::JobFailed {
                reason: format!("task {job} not found"),
            })
    }
}

#[async_trait]
impl ScrapeProvider for DataForSeoProvider {
    fn name(&self) -> &str {
        "dataforseo"
    }

    fn max_concurrency(&self) -> usize {
        5
    }

    async fn trigger_job(
        &self,
        prompt: &str,
        options: &JobOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<JobHandle>> {
        let url = format!(
            "{}/ai_optimization/chat_gpt/llm_responses/task_post",
            DATAFORSEO_API_URL
        );
        let body = vec![TaskPostItem {
            user_prompt: prompt.to_string(),
            web_search: options.use_search,
            location_code: options.country_code.clone(),
        }];

        let response = execute_with_retry(&self.submit_policy, cancel, || {
            self.client
                .post(&url)
                .basic_auth(self.credentials.username(), Some(self.credentials.secret()))
                .json(&body)
                .send()
        })
        .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status, message, "task submission rejected");
            return Ok(None);
        }

        let envelope: TaskResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::Transport(Box::new(e)))?;

        let handle = match envelope.tasks.into_iter().next() {
            Some(task) if matches!(task.status_code, TASK_OK | TASK_CREATED) => {
                task.id.and_then(JobHandle::from_provider_id)
            }
            Some(task) => {
                tracing::warn!(
                    status_code = task.status_code,
                    message = %task.status_message,
                    "task not accepted"
                );
                None
            }
            None => None,
        };

        Ok(handle)
    }

    async fn monitor_job(
        &self,
        job: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<JobStatus> {
        let task = self.task_get(job, &self.poll_policy, cancel).await?;

        let status = match task.status_code {
            TASK_OK => JobStatus::Ready,
            TASK_CREATED | TASK_IN_QUEUE | TASK_IN_PROGRESS => JobStatus::Running,
            other => JobStatus::Failed(format!("{}: {}", other, task.status_message)),
        };
        tracing::debug!(job_id = %job, status_code = task.status_code, "polled task");

        Ok(status)
    }

    async fn download_job(&self, job: &JobHandle, cancel: &CancellationToken) -> Result<Value> {
        let task = self.task_get(job, &self.download_policy, cancel).await?;
        Ok(task.result.unwrap_or(Value::Null))
    }

    fn transform_response(&self, raw: &Value) -> Result<ModelResult> {
        let entry = first_result_entry(raw)?;
        let parsed: LlmResultEntry = serde_json::from_value(entry.clone()).unwrap_or_default();
        let item = parsed.items.into_iter().next().unwrap_or_default();

        let search_sources: Vec<SearchSource> = item
            .organic_results
            .into_iter()
            .filter(|record| !record.url.is_empty())
            .map(|record| SearchSource {
                url: record.url,
                title: record.title,
                domain: record.domain,
                snippet: record.description,
                rank: record.rank,
                date_published: record.date_published,
            })
            .collect();

        let sources: Vec<Source> = item
            .citations
            .into_iter()
            .filter(|record| !record.url.is_empty())
            .map(|record| Source {
                snippet: search_snippet_for(&search_sources, &record.url),
                url: record.url,
                title: record.title,
                domain: record.domain,
                cited: record.cited,
                positions: if record.positions.is_empty() {
                    None
                } else {
                    Some(record.positions.into_iter().collect())
                },
            })
            .collect();

        Ok(ModelResult {
            prompt: item.user_prompt,
            answer: item.answer,
            sources,
            search_queries: item.search_queries,
            search_sources,
        })
    }
}
