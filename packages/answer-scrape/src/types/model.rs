//! Value objects produced by a scrape job.
//!
//! Everything here is immutable after construction: the provider transform
//! produces a [`ModelResult`] once, and the citation resolver and linker
//! only ever return new derived collections.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A URL-keyed record the provider reports as having informed the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Unique key within a result's source list.
    pub url: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    /// Snippet/description carried over from the matching search result.
    #[serde(default)]
    pub snippet: Option<String>,

    /// Whether the provider flagged this source as cited in the answer.
    #[serde(default)]
    pub cited: Option<bool>,

    /// 1-based citation numbers under which this source appears in the
    /// answer text. A source cited repeatedly carries several positions;
    /// entries are distinct positive integers.
    #[serde(default)]
    pub positions: Option<BTreeSet<u32>>,
}

impl Source {
    /// Create a source from a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            domain: None,
            snippet: None,
            cited: None,
            positions: None,
        }
    }

    /// Add a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Add a snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Set the cited flag.
    pub fn with_cited(mut self, cited: bool) -> Self {
        self.cited = Some(cited);
        self
    }

    /// Set the citation positions.
    pub fn with_positions(mut self, positions: impl IntoIterator<Item = u32>) -> Self {
        self.positions = Some(positions.into_iter().collect());
        self
    }

    /// Whether this source is cited at position `n`.
    pub fn cites_position(&self, n: u32) -> bool {
        self.positions.as_ref().is_some_and(|p| p.contains(&n))
    }

    /// The source's domain, falling back to the URL host.
    pub fn domain_or_host(&self) -> Option<String> {
        if let Some(domain) = &self.domain {
            return Some(domain.clone());
        }
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

/// A result surfaced by the provider's web-search step.
///
/// Disjoint concept from [`Source::cited`]: a search source is not
/// necessarily cited in the answer, and the two lists may overlap by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSource {
    pub url: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub snippet: Option<String>,

    /// Organic rank reported by the search step.
    #[serde(default)]
    pub rank: Option<u32>,

    /// Publication date as reported by the provider, unparsed.
    #[serde(default)]
    pub date_published: Option<String>,
}

impl SearchSource {
    /// Create a search source from a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            domain: None,
            snippet: None,
            rank: None,
            date_published: None,
        }
    }

    /// Add a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Add a snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Set the organic rank.
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// The normalized output of one scrape job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResult {
    /// The prompt that was executed.
    pub prompt: String,

    /// The generated answer text, including inline citation markers.
    pub answer: String,

    /// Sources the provider linked to the answer.
    #[serde(default)]
    pub sources: Vec<Source>,

    /// Queries issued by the provider's web-search step.
    #[serde(default)]
    pub search_queries: Vec<String>,

    /// Results surfaced by the web-search step.
    #[serde(default)]
    pub search_sources: Vec<SearchSource>,
}

/// The subset of a source surfaced as supporting a specific statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluencingSource {
    pub url: String,
    pub domain: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub positions: Option<BTreeSet<u32>>,
}

impl From<&Source> for InfluencingSource {
    fn from(source: &Source) -> Self {
        Self {
            url: source.url.clone(),
            domain: source.domain_or_host().unwrap_or_default(),
            title: source.title.clone(),
            positions: source.positions.clone(),
        }
    }
}

/// Why a source was scored the way it was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub source_url: String,

    /// Normalized confidence in [0, 1].
    pub score: f64,

    /// Human-readable signals that contributed to the score.
    pub reasons: Vec<String>,
}

/// The outcome of linking a statement to its supporting sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementMatch {
    pub statement_text: String,

    /// Supporting sources, strongest first.
    pub supporting_sources: Vec<Source>,

    /// One score per supporting source, index-aligned.
    pub match_scores: Vec<MatchScore>,
}

impl StatementMatch {
    /// An empty match for a statement with no supporting evidence.
    pub fn empty(statement_text: impl Into<String>) -> Self {
        Self {
            statement_text: statement_text.into(),
            supporting_sources: Vec::new(),
            match_scores: Vec::new(),
        }
    }

    /// Project the supporting sources into their influencing form.
    pub fn influencing_sources(&self) -> Vec<InfluencingSource> {
        self.supporting_sources
            .iter()
            .map(InfluencingSource::from)
            .collect()
    }
}
