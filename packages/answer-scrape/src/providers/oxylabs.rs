//! Oxylabs-backed scrape provider.
//!
//! Push-pull style vendor: `POST /queries` creates a job, `GET
//! /queries/{id}` reports its status, and `GET /queries/{id}/results`
//! answers 202 until the payload is ready, obtained successfully at the
//! transport level yet still retryable, so the download policy lists 202.
//! Uses basic auth with `OXYLABS_USERNAME` / `OXYLABS_PASSWORD`.
//!
//! This vendor predates explicit citation positions: cited sources carry a
//! `cited` flag only, and citation numbers resolve through the legacy
//! array-index convention.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
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

const OXYLABS_API_URL: &str = "https://data.oxylabs.io/v1";

/// LLM-answer scraping via the Oxylabs push-pull API.
pub struct OxylabsProvider {
    client: Client,
    credentials: ProviderCredentials,
    submit_policy: RetryPolicy,
    poll_policy: RetryPolicy,
    download_policy: RetryPolicy,
}

// Request/response types for the queries API.

#[derive(Debug, Serialize)]
struct QueryRequest {
    source: String,
    prompt: String,
    web_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    geo_location: Option<String>,
    parse: bool,
}

#[derive(Debug, Deserialize)]
struct QueryInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ResultsEnvelope {
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResultRecord {
    content: ContentRecord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContentRecord {
    prompt: String,
    response_text: String,
    cited_sources: Vec<CitedRecord>,
    search_queries: Vec<String>,
    search_results: Vec<SearchRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CitedRecord {
    url: String,
    title: Option<String>,
    domain: Option<String>,
    cited: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchRecord {
    url: String,
    title: Option<String>,
    domain: Option<String>,
    description: Option<String>,
    position: Option<u32>,
    published_at: Option<String>,
}

impl OxylabsProvider {
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
            // 202 means "accepted, not ready yet" on the results endpoint.
            download_policy: RetryPolicy::download().with_retryable_status(202),
        })
    }

    /// Create from `OXYLABS_USERNAME` / `OXYLABS_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        let credentials = ProviderCredentials::from_env("OXYLABS_USERNAME", "OXYLABS_PASSWORD")?;
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
}

#[async_trait]
impl ScrapeProvider for OxylabsProvider {
    fn name(&self) -> &str {
        "oxylabs"
    }

    fn max_concurrency(&self) -> usize {
        3
    }

    async fn trigger_job(
        &self,
        prompt: &str,
        options: &JobOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<JobHandle>> {
        let url = format!("{}/queries", OXYLABS_API_URL);
        let body = QueryRequest {
            source: "chatgpt".to_string(),
            prompt: prompt.to_string(),
            web_search: options.use_search,
            geo_location: options.country_code.clone(),
            parse: true,
        };

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
            tracing::warn!(status, message, "query submission rejected");
            return Ok(None);
        }

        let info: QueryInfo = response
            .json()
            .await
            .map_err(|e| ScrapeError::Transport(Box::new(e)))?;

        if info.status == "faulted" {
            tracing::warn!(job_id = %info.id, "query faulted at submission");
            return Ok(None);
        }
        tracing::debug!(job_id = %info.id, created_at = ?info.created_at, "query accepted");

        Ok(JobHandle::from_provider_id(info.id))
    }

    async fn monitor_job(
        &self,
        job: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<JobStatus> {
        let url = format!("{}/queries/{}", OXYLABS_API_URL, job);

        let response = execute_with_retry(&self.poll_policy, cancel, || {
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

        let info: QueryInfo = response
            .json()
            .await
            .map_err(|e| ScrapeError::Transport(Box::new(e)))?;
        tracing::debug!(job_id = %job, status = %info.status, updated_at = ?info.updated_at, "polled query");

        let status = match info.status.as_str() {
            "done" => JobStatus::Ready,
            "pending" | "running" => JobStatus::Running,
            other => JobStatus::Failed(other.to_string()),
        };

        Ok(status)
    }

    async fn download_job(&self, job: &JobHandle, cancel: &CancellationToken) -> Result<Value> {
        let url = format!("{}/queries/{}/results", OXYLABS_API_URL, job);

        let response = execute_with_retry(&self.download_policy, cancel, || {
            self.client
                .get(&url)
                .basic_auth(self.credentials.username(), Some(self.credentials.secret()))
                .send()
        })
        .await?;

        if !response.status().is_success() || response.status().as_u16() == 202 {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ScrapeError::ProviderRejected { status, message });
        }

        let envelope: ResultsEnvelope = response
            .json()
            .await
            .map_err(|e| ScrapeError::Transport(Box::new(e)))?;

        Ok(Value::Array(envelope.results))
    }

    fn transform_response(&self, raw: &Value) -> Result<ModelResult> {
        let entry = first_result_entry(raw)?;
        let parsed: ResultRecord = serde_json::from_value(entry.clone()).unwrap_or_default();
        let content = parsed.content;

        let search_sources: Vec<SearchSource> = content
            .search_results
            .into_iter()
            .filter(|record| !record.url.is_empty())
            .map(|record| SearchSource {
                url: record.url,
                title: record.title,
                domain: record.domain,
                snippet: record.description,
                rank: record.position,
                date_published: record.published_at,
            })
            .collect();

        // Legacy shape: no positions metadata, array order is the citation
        // order.
        let sources: Vec<Source> = content
            .cited_sources
            .into_iter()
            .filter(|record| !record.url.is_empty())
            .map(|record| Source {
                snippet: search_snippet_for(&search_sources, &record.url),
                url: record.url,
                title: record.title,
                domain: record.domain,
                cited: record.cited,
                positions: None,
            })
            .collect();

        Ok(ModelResult {
            prompt: content.prompt,
            answer: content.response_text,
            sources,
            search_queries: content.search_queries,
            search_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> OxylabsProvider {
        OxylabsProvider::new(ProviderCredentials::new("user", "pass")).unwrap()
    }

    #[test]
    fn test_download_policy_treats_202_as_retryable() {
        let provider = provider();
        assert!(provider.download_policy.retryable_status_codes.contains(&202));
        assert!(!provider.poll_policy.retryable_status_codes.contains(&202));
    }

    #[test]
    fn test_transform_legacy_payload_without_positions() {
        let raw = json!([{
            "content": {
                "prompt": "who has the best reviews",
                "response_text": "Kids&Us has excellent reviews [1].",
                "cited_sources": [
                    { "url": "https://kidsandus.es", "title": "Kids&Us", "cited": true }
                ],
                "search_queries": ["kids&us reviews"],
                "search_results": [{
                    "url": "https://kidsandus.es",
                    "title": "Kids&Us",
                    "description": "English school reviews.",
                    "position": 2
                }]
            }
        }]);

        let result = provider().transform_response(&raw).unwrap();
        assert_eq!(result.answer, "Kids&Us has excellent reviews [1].");
        assert_eq!(result.sources.len(), 1);
        assert!(result.sources[0].positions.is_none());
        assert_eq!(result.sources[0].cited, Some(true));
        assert_eq!(
            result.sources[0].snippet.as_deref(),
            Some("English school reviews.")
        );
        assert_eq!(result.search_sources[0].rank, Some(2));
    }

    #[test]
    fn test_transform_rejects_empty_results() {
        assert!(matches!(
            provider().transform_response(&json!([])),
            Err(ScrapeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_transform_degrades_unknown_content_shape() {
        let raw = json!([{ "content": { "response_text": 42 } }]);
        let result = provider().transform_response(&raw).unwrap();
        assert!(result.answer.is_empty());
        assert!(result.sources.is_empty());
    }
}
