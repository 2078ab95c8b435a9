//! Statement-to-source linking.
//!
//! Explicit evidence always wins over inference: when a statement carries
//! inline citation markers they resolve directly to sources with full
//! confidence, and no heuristic scoring is attempted. Only citation-free
//! statements fall back to weighted multi-signal scoring against the
//! candidate source list.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::pipeline::citations::{extract_inline_citations, resolve_citations};
use crate::pipeline::normalize::{compare_key, fold_diacritics};
use crate::types::model::{MatchScore, Source, StatementMatch};

/// Tokens skipped when generating company-name variations.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "los", "las", "del", "de", "la", "el",
];

/// Configuration for heuristic statement-source scoring.
#[derive(Debug, Clone)]
pub struct LinkerConfig {
    /// Weight of the company/domain-name signal.
    pub domain_weight: f64,

    /// Weight of the title word-overlap signal.
    pub title_weight: f64,

    /// Weight of the snippet word-overlap signal.
    pub snippet_weight: f64,

    /// Minimum normalized score for a source to be kept.
    pub min_match_score: f64,

    /// Cap on supporting sources per statement.
    pub max_sources_per_statement: usize,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            domain_weight: 0.5,
            title_weight: 0.3,
            snippet_weight: 0.2,
            min_match_score: 0.3,
            max_sources_per_statement: 5,
        }
    }
}

impl LinkerConfig {
    /// Create a config with default weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum match score.
    pub fn with_min_match_score(mut self, score: f64) -> Self {
        self.min_match_score = score;
        self
    }

    /// Set the supporting-source cap.
    pub fn with_max_sources(mut self, max: usize) -> Self {
        self.max_sources_per_statement = max;
        self
    }
}

/// Link a statement to its supporting sources.
///
/// Primary path: inline citations resolve via the citation resolver, each
/// matched source scoring 1.0. Fallback path: every candidate is scored by
/// a weighted sum of the company/domain, title-overlap, and
/// snippet-overlap signals, normalized by the weights actually applicable
/// so a source lacking a field isn't penalized for it.
pub fn link_sources_to_statement(
    statement_text: &str,
    company_name: Option<&str>,
    sources: &[Source],
    config: &LinkerConfig,
) -> StatementMatch {
    let citations = extract_inline_citations(statement_text);
    if !citations.is_empty() {
        let resolved = resolve_citations(&citations, sources);
        let (supporting_sources, match_scores) = resolved
            .into_iter()
            .map(|(source, numbers)| {
                let score = MatchScore {
                    source_url: source.url.clone(),
                    score: 1.0,
                    reasons: numbers
                        .iter()
                        .map(|n| format!("inline citation [{n}]"))
                        .collect(),
                };
                (source, score)
            })
            .unzip();

        return StatementMatch {
            statement_text: statement_text.to_string(),
            supporting_sources,
            match_scores,
        };
    }

    let company = company_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(CompanyTokens::from_name);
    let statement_words = significant_words(statement_text);

    let mut scored: Vec<(Source, MatchScore)> = Vec::new();

    for source in sources {
        let mut weighted = 0.0;
        let mut applicable = 0.0;
        let mut reasons = Vec::new();

        if let Some(company) = &company {
            let (signal, mut signal_reasons) = company_signal(company, source);
            weighted += config.domain_weight * signal;
            applicable += config.domain_weight;
            reasons.append(&mut signal_reasons);
        }

        if let Some(title) = &source.title {
            let overlap = jaccard(&statement_words, &significant_words(title));
            weighted += config.title_weight * overlap;
            applicable += config.title_weight;
            if overlap > 0.0 {
                reasons.push(format!("title overlap {overlap:.2}"));
            }
        }

        if let Some(snippet) = &source.snippet {
            let overlap = jaccard(&statement_words, &significant_words(snippet));
            weighted += config.snippet_weight * overlap;
            applicable += config.snippet_weight;
            if overlap > 0.0 {
                reasons.push(format!("snippet overlap {overlap:.2}"));
            }
        }

        if applicable == 0.0 {
            continue;
        }

        let score = weighted / applicable;
        if score >= config.min_match_score {
            scored.push((
                source.clone(),
                MatchScore {
                    source_url: source.url.clone(),
                    score,
                    reasons,
                },
            ));
        }
    }

    scored.sort_by(|a, b| {
        b.1.score
            .partial_cmp(&a.1.score)
            .unwrap_or(Ordering::Equal)
    });
    scored.truncate(config.max_sources_per_statement);

    let (supporting_sources, match_scores) = scored.into_iter().unzip();
    StatementMatch {
        statement_text: statement_text.to_string(),
        supporting_sources,
        match_scores,
    }
}

/// Higher-precision source lookup when no statement text is available.
///
/// Keeps any source whose normalized domain, title, or URL contains one of
/// the company's name variations. Ties prefer sources carrying citation
/// positions, then the provider's `cited` flag.
pub fn find_sources_for_company(
    company_name: &str,
    sources: &[Source],
    max_sources: usize,
) -> Vec<Source> {
    let variations = name_variations(company_name);
    if variations.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<&Source> = sources
        .iter()
        .filter(|source| {
            let domain = compare_key(&source.domain_or_host().unwrap_or_default());
            let title = compare_key(source.title.as_deref().unwrap_or_default());
            let url = compare_key(&source.url);
            variations
                .iter()
                .any(|v| domain.contains(v) || title.contains(v) || url.contains(v))
        })
        .collect();

    hits.sort_by_key(|source| {
        let has_positions = source.positions.as_ref().is_some_and(|p| !p.is_empty());
        let cited = source.cited.unwrap_or(false);
        (!has_positions, !cited)
    });
    hits.truncate(max_sources);

    hits.into_iter().cloned().collect()
}

/// Normalized name variations: the full joined name plus its individual
/// non-stop-word tokens of length >= 3.
fn name_variations(company_name: &str) -> Vec<String> {
    let tokens = CompanyTokens::from_name(company_name);
    let mut variations = Vec::new();

    if !tokens.joined.is_empty() {
        variations.push(tokens.joined.clone());
    }
    for token in &tokens.tokens {
        if token.len() >= 3 && !STOP_WORDS.contains(&token.as_str()) && !variations.contains(token)
        {
            variations.push(token.clone());
        }
    }

    variations
}

/// A company name broken into comparison tokens.
struct CompanyTokens {
    /// All tokens joined, e.g. "kidsandus" for "Kids&Us".
    joined: String,

    /// Individual tokens, ampersand expanded to "and".
    tokens: Vec<String>,

    /// Folded full name with spaces preserved.
    phrase: String,
}

impl CompanyTokens {
    fn from_name(name: &str) -> Self {
        // "&" reads as "and" in domains: Kids&Us -> kidsandus.es.
        let expanded = name.replace('&', " and ");
        let folded = fold_diacritics(&expanded).to_lowercase();
        let tokens: Vec<String> = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Self {
            joined: tokens.concat(),
            phrase: tokens.join(" "),
            tokens,
        }
    }
}

/// The company/domain signal in [0, 1].
///
/// Exact full-token match of the domain's brand label scores 1.0; partial
/// token overlap scores proportionally; a whole-name substring match in
/// the title scores 0.8, scaled by the overlap fraction otherwise. The
/// strongest of the domain and title parts wins.
fn company_signal(company: &CompanyTokens, source: &Source) -> (f64, Vec<String>) {
    let mut reasons = Vec::new();

    let mut domain_part: f64 = 0.0;
    if let Some(domain) = source.domain_or_host() {
        let candidates = brand_candidates(&domain);
        if candidates.iter().any(|c| *c == company.joined) {
            domain_part = 1.0;
            reasons.push(format!("domain matches company name ({domain})"));
        } else {
            let meaningful: Vec<&String> = company
                .tokens
                .iter()
                .filter(|t| t.len() >= 3 && !STOP_WORDS.contains(&t.as_str()))
                .collect();
            if !meaningful.is_empty() {
                let matched = meaningful
                    .iter()
                    .filter(|t| candidates.iter().any(|c| c.contains(t.as_str())))
                    .count();
                domain_part = matched as f64 / meaningful.len() as f64;
                if domain_part > 0.0 {
                    reasons.push(format!(
                        "domain token overlap {matched}/{} ({domain})",
                        meaningful.len()
                    ));
                }
            }
        }
    }

    let mut title_part: f64 = 0.0;
    if let Some(title) = &source.title {
        let title_folded = fold_diacritics(title).to_lowercase();
        if !company.phrase.is_empty() && title_folded.contains(&company.phrase) {
            title_part = 0.8;
            reasons.push("company name appears in title".to_string());
        } else {
            let title_words = significant_words(title);
            let meaningful: Vec<&String> = company
                .tokens
                .iter()
                .filter(|t| t.len() >= 3 && !STOP_WORDS.contains(&t.as_str()))
                .collect();
            if !meaningful.is_empty() {
                let matched = meaningful
                    .iter()
                    .filter(|t| title_words.contains(t.as_str()))
                    .count();
                title_part = 0.8 * matched as f64 / meaningful.len() as f64;
                if title_part > 0.0 {
                    reasons.push(format!(
                        "company token overlap in title {matched}/{}",
                        meaningful.len()
                    ));
                }
            }
        }
    }

    (domain_part.max(title_part), reasons)
}

/// Brand-name candidates derived from a domain: the registrable label as a
/// whole, plus its camelCase/hyphen/underscore parts.
fn brand_candidates(domain: &str) -> Vec<String> {
    let host = domain.trim().trim_start_matches("www.");
    let label = host.split('.').next().unwrap_or_default();
    if label.is_empty() {
        return Vec::new();
    }

    let mut candidates = vec![compare_key(label)];
    for part in split_brand_label(label) {
        let key = compare_key(&part);
        if !key.is_empty() && !candidates.contains(&key) {
            candidates.push(key);
        }
    }
    candidates
}

/// Split a domain label on hyphens, underscores, and camelCase boundaries.
fn split_brand_label(label: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;

    for c in label.chars() {
        if c == '-' || c == '_' {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase();
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

/// Normalized word set: lowercased, diacritics stripped, punctuation
/// removed, tokens shorter than 3 characters dropped.
fn significant_words(text: &str) -> BTreeSet<String> {
    fold_diacritics(text)
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 3)
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two word sets.
fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_citation_wins_over_heuristics() {
        let sources = vec![
            Source::new("https://a.com").with_positions([1]),
            Source::new("https://b.com").with_positions([2]),
        ];

        let matched = link_sources_to_statement(
            "Kids&Us Madrid is great [2]",
            Some("Kids&Us"),
            &sources,
            &LinkerConfig::default(),
        );

        assert_eq!(matched.supporting_sources.len(), 1);
        assert_eq!(matched.supporting_sources[0].url, "https://b.com");
        assert_eq!(matched.match_scores[0].score, 1.0);
        assert_eq!(matched.match_scores[0].reasons, vec!["inline citation [2]"]);
    }

    #[test]
    fn test_fallback_domain_match_scores_high() {
        let sources = vec![Source::new("https://www.kidsandus.es").with_domain("kidsandus.es")];

        let matched = link_sources_to_statement(
            "Kids&Us has native teachers",
            Some("Kids&Us"),
            &sources,
            &LinkerConfig::default(),
        );

        assert_eq!(matched.supporting_sources.len(), 1);
        assert!(matched.match_scores[0].score >= 0.5);
        assert!(matched.match_scores[0]
            .reasons
            .iter()
            .any(|r| r.contains("domain matches")));
    }

    #[test]
    fn test_fallback_filters_below_threshold() {
        let sources = vec![Source::new("https://unrelated.org")
            .with_domain("unrelated.org")
            .with_title("Completely different topic")];

        let matched = link_sources_to_statement(
            "Kids&Us has native teachers",
            Some("Kids&Us"),
            &sources,
            &LinkerConfig::default(),
        );

        assert!(matched.supporting_sources.is_empty());
        assert!(matched.match_scores.is_empty());
    }

    #[test]
    fn test_fallback_orders_descending_and_truncates() {
        let sources = vec![
            Source::new("https://one.com")
                .with_domain("one.com")
                .with_title("Kids and Us reviews for families"),
            Source::new("https://www.kidsandus.es").with_domain("kidsandus.es"),
        ];

        let config = LinkerConfig::default().with_max_sources(1);
        let matched = link_sources_to_statement(
            "Kids&Us has native teachers",
            Some("Kids&Us"),
            &sources,
            &config,
        );

        assert_eq!(matched.supporting_sources.len(), 1);
        assert_eq!(matched.supporting_sources[0].url, "https://www.kidsandus.es");
    }

    #[test]
    fn test_source_without_snippet_not_penalized() {
        let with_snippet = Source::new("https://a.com")
            .with_domain("kidsandus.es")
            .with_snippet("unrelated snippet text entirely");
        let without_snippet = Source::new("https://b.com").with_domain("kidsandus.es");

        let matched = link_sources_to_statement(
            "Kids&Us has native teachers",
            Some("Kids&Us"),
            &[with_snippet, without_snippet],
            &LinkerConfig::default(),
        );

        // The snippet-less source scores on domain alone; the zero-overlap
        // snippet drags the other one down.
        let score_without = matched
            .match_scores
            .iter()
            .find(|s| s.source_url == "https://b.com")
            .unwrap()
            .score;
        let score_with = matched
            .match_scores
            .iter()
            .find(|s| s.source_url == "https://a.com")
            .unwrap()
            .score;
        assert!(score_without > score_with);
    }

    #[test]
    fn test_statement_without_evidence_yields_empty_match() {
        let matched = link_sources_to_statement(
            "no citations here",
            None,
            &[Source::new("https://a.com")],
            &LinkerConfig::default(),
        );
        assert!(matched.supporting_sources.is_empty());
    }

    #[test]
    fn test_find_sources_for_company_by_domain_and_url() {
        let sources = vec![
            Source::new("https://other.org").with_domain("other.org"),
            Source::new("https://www.kidsandus.es/en").with_domain("kidsandus.es"),
            Source::new("https://blog.example.com/kidsandus-review"),
        ];

        let hits = find_sources_for_company("Kids&Us", &sources, 5);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|s| s.url != "https://other.org"));
    }

    #[test]
    fn test_find_sources_prefers_positions_then_cited() {
        let sources = vec![
            Source::new("https://a.kidsandus.es").with_domain("kidsandus.es"),
            Source::new("https://b.kidsandus.es")
                .with_domain("kidsandus.es")
                .with_cited(true),
            Source::new("https://c.kidsandus.es")
                .with_domain("kidsandus.es")
                .with_positions([1]),
        ];

        let hits = find_sources_for_company("Kids&Us", &sources, 2);
        assert_eq!(hits[0].url, "https://c.kidsandus.es");
        assert_eq!(hits[1].url, "https://b.kidsandus.es");
    }

    #[test]
    fn test_brand_candidates_split() {
        let candidates = brand_candidates("www.helen-doron.com");
        assert!(candidates.contains(&"helendoron".to_string()));
        assert!(candidates.contains(&"helen".to_string()));
        assert!(candidates.contains(&"doron".to_string()));

        let camel = brand_candidates("KidsAndUs.es");
        assert!(camel.contains(&"kidsandus".to_string()));
        assert!(camel.contains(&"kids".to_string()));
    }

    #[test]
    fn test_jaccard_on_significant_words() {
        let a = significant_words("Kids&Us has native English teachers");
        let b = significant_words("Native English teachers at our school");
        let similarity = jaccard(&a, &b);
        assert!(similarity > 0.0 && similarity < 1.0);
    }
}
