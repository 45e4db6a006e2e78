//! Approximate string matching against a small fixed knowledge base.
//!
//! Scores use a 0-100 scale. Inputs are expected to be normalized with
//! [`normalize_value`](crate::text::normalize_value) first; tokens are
//! whitespace separated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use crate::mention::{EntityLabel, LabelFamily};
use crate::resolution::{Candidate, CandidateSource};
use crate::text::normalize_value;

/// String similarity scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzyScorer {
    /// Weighted blend of the other scorers, adjusted for length mismatch.
    #[default]
    #[serde(rename = "wratio", alias = "w_ratio")]
    WRatio,
    /// Whole-string edit similarity.
    Ratio,
    /// Best match of the shorter string against windows of the longer one.
    PartialRatio,
    /// Ratio after sorting tokens.
    TokenSortRatio,
    /// Ratio over shared and distinct token sets.
    TokenSetRatio,
}

impl FuzzyScorer {
    /// Name accepted by `FromStr` and serde.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WRatio => "wratio",
            Self::Ratio => "ratio",
            Self::PartialRatio => "partial_ratio",
            Self::TokenSortRatio => "token_sort_ratio",
            Self::TokenSetRatio => "token_set_ratio",
        }
    }

    /// Similarity of `a` and `b` in `[0, 100]`.
    #[must_use]
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Self::WRatio => wratio(a, b),
            Self::Ratio => ratio(a, b),
            Self::PartialRatio => partial_ratio(a, b),
            Self::TokenSortRatio => token_sort_ratio(a, b),
            Self::TokenSetRatio => token_set_ratio(a, b),
        }
    }
}

impl FromStr for FuzzyScorer {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim().to_ascii_lowercase().replace('-', "_");
        match key.as_str() {
            "wratio" | "w_ratio" => Ok(Self::WRatio),
            "ratio" => Ok(Self::Ratio),
            "partial_ratio" => Ok(Self::PartialRatio),
            "token_sort_ratio" => Ok(Self::TokenSortRatio),
            "token_set_ratio" => Ok(Self::TokenSetRatio),
            _ => Err(format!(
                "unknown scorer '{value}' (expected wratio, ratio, partial_ratio, \
                 token_sort_ratio or token_set_ratio)"
            )),
        }
    }
}

impl fmt::Display for FuzzyScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let long_chars: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    if width == 0 {
        return 0.0;
    }

    let mut best = 0.0f64;
    for start in 0..=long_chars.len() - width {
        let window: String = long_chars[start..start + width].iter().collect();
        best = best.max(ratio(short, &window));
        if best >= 100.0 {
            break;
        }
    }
    best
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

fn token_set_ratio(a: &str, b: &str) -> f64 {
    use std::collections::BTreeSet;

    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let join = |set: Vec<&str>| set.join(" ");
    let sect = join(ta.intersection(&tb).copied().collect());
    let diff_ab = join(ta.difference(&tb).copied().collect());
    let diff_ba = join(tb.difference(&ta).copied().collect());

    let combine = |diff: &str| {
        if sect.is_empty() {
            diff.to_string()
        } else if diff.is_empty() {
            sect.clone()
        } else {
            format!("{sect} {diff}")
        }
    };
    let t1 = combine(&diff_ab);
    let t2 = combine(&diff_ba);

    ratio(&sect, &t1).max(ratio(&sect, &t2)).max(ratio(&t1, &t2))
}

fn wratio(a: &str, b: &str) -> f64 {
    let (la, lb) = (a.chars().count(), b.chars().count());
    if la == 0 || lb == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let len_ratio = la.max(lb) as f64 / la.min(lb) as f64;
    let base = ratio(a, b);

    if len_ratio < 1.5 {
        return base
            .max(token_sort_ratio(a, b) * 0.95)
            .max(token_set_ratio(a, b) * 0.95);
    }

    let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    let partial_tokens = partial_ratio(&sorted_tokens(a), &sorted_tokens(b));
    base.max(partial_ratio(a, b) * scale)
        .max(partial_tokens * scale * 0.95)
}

/// A node the fuzzy matcher can return.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyEntry {
    /// Node id.
    pub node_id: String,
    /// Display name, matched against.
    pub name: String,
    /// Node type.
    pub kind: EntityLabel,
    normalized: String,
}

impl FuzzyEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(node_id: impl Into<String>, name: impl Into<String>, kind: EntityLabel) -> Self {
        let name = name.into();
        Self {
            node_id: node_id.into(),
            normalized: normalize_value(&name),
            name,
            kind,
        }
    }
}

fn default_entries() -> Vec<FuzzyEntry> {
    use crate::mention::EntityLabel::{Gpe, Org, Person};

    [
        ("person:barack-obama", "Barack Obama", Person),
        ("person:michelle-obama", "Michelle Obama", Person),
        ("person:joe-biden", "Joe Biden", Person),
        ("person:tim-cook", "Tim Cook", Person),
        ("person:satya-nadella", "Satya Nadella", Person),
        ("person:elon-musk", "Elon Musk", Person),
        ("org:apple-inc", "Apple Inc.", Org),
        ("org:microsoft", "Microsoft Corporation", Org),
        ("org:alphabet-inc", "Alphabet Inc.", Org),
        ("org:amazon", "Amazon.com Inc.", Org),
        ("org:tesla-inc", "Tesla Inc.", Org),
        ("org:openai", "OpenAI", Org),
        ("org:united-nations", "United Nations", Org),
        ("gpe:new-york-city", "New York City", Gpe),
        ("gpe:san-francisco", "San Francisco", Gpe),
        ("gpe:los-angeles", "Los Angeles", Gpe),
        ("gpe:washington-dc", "Washington D.C.", Gpe),
        ("gpe:paris", "Paris", Gpe),
        ("gpe:london", "London", Gpe),
        ("gpe:united-states", "United States", Gpe),
    ]
    .into_iter()
    .map(|(id, name, kind)| FuzzyEntry::new(id, name, kind))
    .collect()
}

/// Fuzzy candidate search over a fixed list of nodes.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    scorer: FuzzyScorer,
    threshold: f64,
    entries: Vec<FuzzyEntry>,
}

impl FuzzyMatcher {
    /// Matcher over the built-in node list.
    #[must_use]
    pub fn new(scorer: FuzzyScorer, threshold: f64) -> Self {
        Self::with_entries(scorer, threshold, default_entries())
    }

    /// Matcher over a custom node list.
    #[must_use]
    pub fn with_entries(scorer: FuzzyScorer, threshold: f64, entries: Vec<FuzzyEntry>) -> Self {
        Self {
            scorer,
            threshold,
            entries,
        }
    }

    /// Active scorer.
    #[must_use]
    pub fn scorer(&self) -> FuzzyScorer {
        self.scorer
    }

    /// Minimum score (0-100) for a hit.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Best `limit` nodes of the given family scoring at least the threshold,
    /// highest first. Candidate scores are rescaled to `[0, 1]`.
    #[must_use]
    pub fn search(
        &self,
        normalized: &str,
        family: Option<LabelFamily>,
        limit: usize,
    ) -> Vec<Candidate> {
        if normalized.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut hits: Vec<(f64, &FuzzyEntry)> = self
            .entries
            .iter()
            .filter(|e| family.map_or(true, |f| e.kind.family() == f))
            .map(|e| (self.scorer.score(normalized, &e.normalized), e))
            .filter(|(score, _)| *score >= self.threshold)
            .collect();
        hits.sort_by(|a, b| b.0.total_cmp(&a.0));
        hits.truncate(limit);

        hits.into_iter()
            .map(|(score, e)| {
                #[allow(clippy::cast_possible_truncation)]
                let score = (score / 100.0) as f32;
                Candidate::new(
                    e.node_id.clone(),
                    e.name.clone(),
                    e.kind.as_str(),
                    score,
                    CandidateSource::FuzzyFallback,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scorer_names_round_trip() {
        for scorer in [
            FuzzyScorer::WRatio,
            FuzzyScorer::Ratio,
            FuzzyScorer::PartialRatio,
            FuzzyScorer::TokenSortRatio,
            FuzzyScorer::TokenSetRatio,
        ] {
            assert_eq!(scorer.as_str().parse::<FuzzyScorer>().unwrap(), scorer);
            let json = serde_json::to_string(&scorer).unwrap();
            assert_eq!(json, format!("\"{}\"", scorer.as_str()));
        }
        assert_eq!("WRatio".parse::<FuzzyScorer>().unwrap(), FuzzyScorer::WRatio);
        assert!("jaro".parse::<FuzzyScorer>().is_err());
    }

    #[test]
    fn test_basic_scores() {
        assert!((ratio("apple", "apple") - 100.0).abs() < 1e-9);
        assert!(ratio("", "apple").abs() < 1e-9);
        assert!((token_sort_ratio("new york city", "city new york") - 100.0).abs() < 1e-9);
        assert!((token_set_ratio("apple", "apple inc") - 100.0).abs() < 1e-9);
        assert!((partial_ratio("apple", "apple inc") - 100.0).abs() < 1e-9);
        assert!(ratio("apple", "zebra") < 50.0);
    }

    #[test]
    fn test_wratio_prefers_partial_for_unequal_lengths() {
        let w = wratio("apple", "apple inc");
        assert!(w >= 85.0, "{w}");
        assert!(w > ratio("apple", "apple inc"));
    }

    #[test]
    fn test_search_filters_by_family() {
        let matcher = FuzzyMatcher::new(FuzzyScorer::WRatio, 65.0);
        let hits = matcher.search("barak obama", Some(LabelFamily::Person), 5);
        assert_eq!(hits[0].node_id, "person:barack-obama");
        assert!(hits[0].score > 0.65);
        assert!(hits[0].fuzzy_match);
        assert_eq!(hits[0].source, CandidateSource::FuzzyFallback);

        assert!(matcher
            .search("barak obama", Some(LabelFamily::Place), 5)
            .is_empty());
    }

    #[test]
    fn test_search_respects_threshold_and_limit() {
        let strict = FuzzyMatcher::new(FuzzyScorer::Ratio, 99.0);
        assert!(strict.search("barak obama", None, 5).is_empty());

        let loose = FuzzyMatcher::new(FuzzyScorer::Ratio, 0.0);
        assert_eq!(loose.search("paris", None, 3).len(), 3);
        assert!(loose.search("", None, 3).is_empty());
    }
}
