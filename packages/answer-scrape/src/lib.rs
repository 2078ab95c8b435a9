//! AI Answer Scraping and Source Attribution Library
//!
//! Drives asynchronous scrape jobs against AI answer providers (submit a
//! prompt, poll until the provider finishes, download the raw payload,
//! transform it into a common shape) and resolves which cited sources
//! support which statements in the returned answer.
//!
//! # Design Philosophy
//!
//! - Providers are submit/poll/download state machines behind one trait
//! - Retry is per phase: submission is cheap, polling is bounded, download
//!   rides out long transient windows
//! - Citation resolution prefers explicit positions, falls back to index
//! - Heuristic source linking is scored and explainable, never a black box
//!
//! # Usage
//!
//! ```rust,ignore
//! use answer_scrape::{providers, JobOptions, ScrapeJobRunner};
//! use tokio_util::sync::CancellationToken;
//!
//! let provider = providers::from_name("dataforseo")?;
//! let runner = ScrapeJobRunner::new(provider);
//!
//! let cancel = CancellationToken::new();
//! let result = runner
//!     .run("best CRM for small businesses", &JobOptions::default(), &cancel)
//!     .await?;
//!
//! for source in &result.sources {
//!     println!("{} cited={:?}", source.url, source.cited);
//! }
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core provider abstraction (ScrapeProvider, JobHandle)
//! - [`types`] - Job configuration and the common result model
//! - [`providers`] - Provider implementations (DataForSEO, Oxylabs)
//! - [`pipeline`] - Job orchestration, citation resolution, source linking
//! - [`retry`] - Phase-scoped retry executor with exponential backoff
//! - [`security`] - Credential loading and redaction
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod providers;
pub mod retry;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{Result, ScrapeError};
pub use traits::provider::{JobHandle, JobStatus, ScrapeProvider};
pub use types::{
    config::{JobConfig, JobOptions, RetryPolicy},
    model::{
        InfluencingSource, MatchScore, ModelResult, SearchSource, Source, StatementMatch,
    },
};

// Re-export the orchestrator
pub use pipeline::ScrapeJobRunner;

// Re-export pipeline components
pub use pipeline::{
    // Citation resolution
    extract_inline_citations, map_citations_to_sources, resolve_citations,
    // Source linking
    find_sources_for_company, link_sources_to_statement, LinkerConfig,
    // Company-name normalization
    fold_diacritics, normalize_company_name, AliasRule, NormalizeOptions,
};

// Re-export the retry executor
pub use retry::{execute_with_retry, RetryOutcome};

// Re-export providers
pub use providers::{DataForSeoProvider, OxylabsProvider};

// Re-export testing utilities
pub use testing::MockProvider;
