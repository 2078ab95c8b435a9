//! Company/brand name normalization.
//!
//! Record names frequently arrive with location suffixes glued on
//! ("Kids&Us Madrid Aluche") that ruin matching against domains and
//! titles. Normalization strips trailing location hints, guards against
//! over-stripping into a meaningless generic word, and finally applies
//! caller-supplied alias rules. Pure functions, no I/O.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Words a name must never be reduced to on their own.
const GENERIC_TERMS: &[&str] = &[
    "academy",
    "school",
    "center",
    "centre",
    "club",
    "college",
    "institute",
    "gym",
    "studio",
];

/// An alias mapping: any name matching one of the patterns canonicalizes
/// to `canonical`, overriding whatever stripping produced.
#[derive(Debug, Clone)]
pub struct AliasRule {
    pub canonical: String,
    pub patterns: Vec<String>,
}

impl AliasRule {
    /// Create a rule mapping the given patterns to a canonical name.
    pub fn new(
        canonical: impl Into<String>,
        patterns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            canonical: canonical.into(),
            patterns: patterns.into_iter().map(|p| p.into()).collect(),
        }
    }
}

/// Options for [`normalize_company_name`].
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// Location words to strip from the end of a name, e.g. the city of
    /// the record's place field. Hyphenated hints also match by sub-part.
    pub location_hints: Vec<String>,

    /// Alias rules, applied last and taking priority when they match.
    pub alias_rules: Vec<AliasRule>,
}

impl NormalizeOptions {
    /// Create empty options (normalization becomes the identity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add location hints.
    pub fn with_location_hints(
        mut self,
        hints: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.location_hints = hints.into_iter().map(|h| h.into()).collect();
        self
    }

    /// Add an alias rule.
    pub fn with_alias(mut self, rule: AliasRule) -> Self {
        self.alias_rules.push(rule);
        self
    }
}

/// Strip diacritics: decompose and drop combining marks.
pub fn fold_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Case- and diacritic-insensitive comparison key, alphanumerics only.
pub(crate) fn compare_key(text: &str) -> String {
    fold_diacritics(text)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Normalize a free-text company name against location hints and aliases.
///
/// Trailing token sequences matching a hint are stripped repeatedly until
/// no hint matches, but never down to a single generic word (stripping
/// "Madrid" off "Academy Madrid" would leave a meaningless "Academy").
/// Idempotent for input already free of hints.
pub fn normalize_company_name(name: &str, options: &NormalizeOptions) -> String {
    let mut tokens: Vec<&str> = name.split_whitespace().collect();
    let hints = expand_hints(&options.location_hints);

    loop {
        let mut stripped = false;

        for hint in &hints {
            let len = hint.len();
            if len == 0 || tokens.len() <= len {
                continue;
            }

            let tail = &tokens[tokens.len() - len..];
            let matches = tail
                .iter()
                .zip(hint.iter())
                .all(|(token, part)| compare_key(token) == *part);
            if !matches {
                continue;
            }

            let remaining = &tokens[..tokens.len() - len];
            if remaining.len() == 1 && GENERIC_TERMS.contains(&compare_key(remaining[0]).as_str())
            {
                continue;
            }

            tokens.truncate(tokens.len() - len);
            stripped = true;
            break;
        }

        if !stripped {
            break;
        }
    }

    let rebuilt = tokens.join(" ");

    // Aliases win over the rebuilt form.
    let rebuilt_key = compare_key(&rebuilt);
    let original_key = compare_key(name);
    for rule in &options.alias_rules {
        for pattern in &rule.patterns {
            let pattern_key = compare_key(pattern);
            if pattern_key.is_empty() {
                continue;
            }
            if rebuilt_key.starts_with(&pattern_key) || original_key.starts_with(&pattern_key) {
                return rule.canonical.clone();
            }
        }
    }

    rebuilt
}

/// Expand hints into comparison-key token sequences, adding hyphen-split
/// sub-parts as single-token hints.
fn expand_hints(hints: &[String]) -> Vec<Vec<String>> {
    let mut expanded = Vec::new();

    for hint in hints {
        let tokens: Vec<String> = hint
            .split_whitespace()
            .map(compare_key)
            .filter(|k| !k.is_empty())
            .collect();
        if !tokens.is_empty() {
            expanded.push(tokens);
        }

        for part in hint.split('-') {
            let key = compare_key(part);
            if !key.is_empty() && key != compare_key(hint) {
                expanded.push(vec![key]);
            }
        }
    }

    expanded
}
