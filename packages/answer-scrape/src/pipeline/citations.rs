//! Citation resolution - link inline markers to source records.
//!
//! Providers evolved from "citation index == array order" to explicit
//! per-source position lists, and both payload shapes persist. Resolution
//! is therefore an explicit two-step order: positions lookup first, 1-based
//! array-index fallback second. Never a runtime format sniff.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::types::model::Source;

/// Marker pattern: a bracketed positive integer, with or without
/// markdown-escaped brackets: both `[3]` and `\[3\]` occur upstream.
fn citation_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\\?\[(\d+)\\?\]").unwrap())
}

/// Extract the distinct citation numbers from answer text, ascending.
pub fn extract_inline_citations(text: &str) -> Vec<u32> {
    let mut numbers = BTreeSet::new();
    for capture in citation_marker().captures_iter(text) {
        if let Ok(n) = capture[1].parse::<u32>() {
            if n > 0 {
                numbers.insert(n);
            }
        }
    }
    numbers.into_iter().collect()
}

/// Resolve citation numbers to sources, keeping the numbers that selected
/// each source.
///
/// For each number the source whose `positions` set contains it wins;
/// otherwise the number falls back to a 1-based index into the source
/// list, the legacy convention for payloads without position metadata.
/// Numbers matching neither are silently dropped; the provider may have
/// omitted a source the answer still cites. Deduplicates by URL, first
/// selection order preserved.
pub fn resolve_citations(numbers: &[u32], sources: &[Source]) -> Vec<(Source, Vec<u32>)> {
    let mut selected: IndexMap<String, (Source, Vec<u32>)> = IndexMap::new();

    for &n in numbers {
        let hit = sources
            .iter()
            .find(|source| source.cites_position(n))
            .or_else(|| {
                // Legacy 1-based index fallback.
                (n as usize)
                    .checked_sub(1)
                    .and_then(|index| sources.get(index))
            });

        if let Some(source) = hit {
            selected
                .entry(source.url.clone())
                .or_insert_with(|| (source.clone(), Vec::new()))
                .1
                .push(n);
        }
    }

    selected.into_values().collect()
}

/// Resolve citation numbers to sources, deduplicated by URL.
pub fn map_citations_to_sources(numbers: &[u32], sources: &[Source]) -> Vec<Source> {
    resolve_citations(numbers, sources)
        .into_iter()
        .map(|(source, _)| source)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str) -> Source {
        Source::new(url)
    }

    #[test]
    fn test_extract_plain_and_escaped_markers() {
        let text = r"Kids&Us is well reviewed [2], see also \[7\] and [2] again.";
        assert_eq!(extract_inline_citations(text), vec![2, 7]);
    }

    #[test]
    fn test_extract_is_ascending_and_distinct() {
        let numbers = extract_inline_citations("[9] then [3] then [9] then [12]");
        assert_eq!(numbers, vec![3, 9, 12]);
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_extract_ignores_zero_and_non_markers() {
        assert!(extract_inline_citations("[0] [x] [] plain text").is_empty());
    }

    #[test]
    fn test_positions_lookup_wins_over_index() {
        // Source order deliberately disagrees with position numbers.
        let sources = vec![
            source("https://a.com").with_positions([2]),
            source("https://b.com").with_positions([1]),
        ];

        let resolved = map_citations_to_sources(&[1], &sources);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].url, "https://b.com");
    }

    #[test]
    fn test_index_fallback_without_positions() {
        let sources = vec![source("https://a.com"), source("https://b.com")];

        let resolved = map_citations_to_sources(&[2], &sources);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].url, "https://b.com");
    }

    #[test]
    fn test_out_of_range_numbers_silently_dropped() {
        let sources = vec![source("https://a.com")];
        assert!(map_citations_to_sources(&[5], &sources).is_empty());
        assert!(map_citations_to_sources(&[5], &[]).is_empty());
    }

    #[test]
    fn test_deduplicates_by_url_keeping_all_positions() {
        let sources = vec![source("https://a.com").with_positions([1, 3])];

        let resolved = resolve_citations(&[1, 3], &sources);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1, vec![1, 3]);
        // The source's own positions set is intact.
        let positions = resolved[0].0.positions.as_ref().unwrap();
        assert!(positions.contains(&1) && positions.contains(&3));
    }

    #[test]
    fn test_round_trip_position_match_exactly_once() {
        let sources = vec![
            source("https://a.com").with_positions([1]),
            source("https://b.com").with_positions([2]),
        ];

        for n in [1u32, 2] {
            let resolved = map_citations_to_sources(&[n], &sources);
            assert_eq!(resolved.len(), 1);
            assert!(resolved[0].cites_position(n));
        }
    }
}
