use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Exact alias match in the alias store.
    AliasMatch,
    /// Label-specific substring rule.
    Heuristic,
    /// Approximate string match.
    FuzzyFallback,
}

/// A possible knowledge-base match for a mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Knowledge-base node id, e.g. `person:barack-obama`.
    pub node_id: String,
    /// Match score in `[0, 1]`.
    pub score: f32,
    /// Display name of the node.
    pub name: String,
    /// Node type (label text).
    #[serde(rename = "type")]
    pub kind: String,
    /// Producer.
    pub source: CandidateSource,
    /// Set for fuzzy-fallback candidates.
    #[serde(default)]
    pub fuzzy_match: bool,
    /// Optional node description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Candidate {
    /// Creates a candidate; the score is clamped to `[0, 1]`.
    #[must_use]
    pub fn new(
        node_id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        score: f32,
        source: CandidateSource,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            score: score.clamp(0.0, 1.0),
            name: name.into(),
            kind: kind.into(),
            source,
            fuzzy_match: source == CandidateSource::FuzzyFallback,
            description: None,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Candidates merged by node id.
///
/// Each node keeps the position where it was first seen and the candidate
/// with the highest score; on equal scores the earlier candidate stays.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    slots: HashMap<String, usize>,
}

impl CandidateSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one candidate.
    pub fn push(&mut self, candidate: Candidate) {
        match self.slots.get(&candidate.node_id) {
            Some(&slot) => {
                if candidate.score > self.items[slot].score {
                    self.items[slot] = candidate;
                }
            }
            None => {
                self.slots.insert(candidate.node_id.clone(), self.items.len());
                self.items.push(candidate);
            }
        }
    }

    /// Highest score so far.
    #[must_use]
    pub fn best_score(&self) -> Option<f32> {
        self.items.iter().map(|c| c.score).reduce(f32::max)
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was merged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Candidates in merge order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Candidate> {
        self.items
    }
}

impl Extend<Candidate> for CandidateSet {
    fn extend<T: IntoIterator<Item = Candidate>>(&mut self, iter: T) {
        for candidate in iter {
            self.push(candidate);
        }
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<T: IntoIterator<Item = Candidate>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(node: &str, score: f32, source: CandidateSource) -> Candidate {
        Candidate::new(node, node, "ORG", score, source)
    }

    #[test]
    fn test_merge_keeps_highest_in_first_position() {
        let set: CandidateSet = vec![
            cand("org:a", 0.65, CandidateSource::Heuristic),
            cand("org:b", 0.5, CandidateSource::Heuristic),
            cand("org:a", 0.9, CandidateSource::AliasMatch),
            cand("org:b", 0.4, CandidateSource::FuzzyFallback),
        ]
        .into_iter()
        .collect();

        let merged = set.into_vec();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].node_id, "org:a");
        assert_eq!(merged[0].source, CandidateSource::AliasMatch);
        assert_eq!(merged[1].source, CandidateSource::Heuristic);
    }

    #[test]
    fn test_best_score() {
        let mut set = CandidateSet::new();
        assert_eq!(set.best_score(), None);
        set.push(cand("org:a", 0.3, CandidateSource::Heuristic));
        set.push(cand("org:b", 0.8, CandidateSource::Heuristic));
        assert_eq!(set.best_score(), Some(0.8));
    }

    #[test]
    fn test_serde_shape() {
        let c = cand("org:a", 0.7, CandidateSource::FuzzyFallback);
        assert!(c.fuzzy_match);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "ORG");
        assert_eq!(json["source"], "fuzzy_fallback");
        assert!(json.get("description").is_none());
    }
}
