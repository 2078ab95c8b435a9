//! Scrape-job pipeline and answer-to-source resolution.
//!
//! The pipeline covers:
//! - Job orchestration (submit, poll, download, transform)
//! - Citation resolution (inline markers to source records)
//! - Statement-source linking (citations first, heuristics second)
//! - Company-name normalization for brand matching

pub mod citations;
pub mod linking;
pub mod normalize;
pub mod runner;

pub use citations::{extract_inline_citations, map_citations_to_sources, resolve_citations};
pub use linking::{find_sources_for_company, link_sources_to_statement, LinkerConfig};
pub use normalize::{fold_diacritics, normalize_company_name, AliasRule, NormalizeOptions};
pub use runner::ScrapeJobRunner;
