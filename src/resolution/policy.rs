use crate::resolution::{Candidate, ResolutionStatus};

/// Result of applying the policy to a merged candidate list.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Outcome.
    pub status: ResolutionStatus,
    /// Chosen node, only when resolved.
    pub node_id: Option<String>,
    /// Best score, absent only when there were no candidates.
    pub score: Option<f32>,
    /// Leading candidates in merge order.
    pub candidates: Vec<Candidate>,
}

/// Picks a winner from merged candidates.
///
/// The best candidate resolves when its score reaches `threshold`; otherwise
/// the entity is ambiguous and only the score is kept. The first
/// `max_candidates` candidates are kept either way, without re-sorting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionPolicy {
    /// Minimum score to resolve.
    pub threshold: f32,
    /// Candidates retained for audit.
    pub max_candidates: usize,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            max_candidates: 5,
        }
    }
}

impl ResolutionPolicy {
    /// Creates a policy.
    #[must_use]
    pub fn new(threshold: f32, max_candidates: usize) -> Self {
        Self {
            threshold,
            max_candidates,
        }
    }

    /// Applies the policy.
    #[must_use]
    pub fn apply(&self, mut candidates: Vec<Candidate>) -> Decision {
        // First of equal maxima wins.
        let best = candidates
            .iter()
            .fold(None::<&Candidate>, |best, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(c),
            })
            .map(|c| (c.node_id.clone(), c.score));

        let (status, node_id, score) = match best {
            None => (ResolutionStatus::Unmatched, None, None),
            Some((node, score)) if score >= self.threshold => {
                (ResolutionStatus::Resolved, Some(node), Some(score))
            }
            Some((_, score)) => (ResolutionStatus::Ambiguous, None, Some(score)),
        };

        candidates.truncate(self.max_candidates);
        Decision {
            status,
            node_id,
            score,
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::CandidateSource;

    fn cand(node: &str, score: f32) -> Candidate {
        Candidate::new(node, node, "ORG", score, CandidateSource::Heuristic)
    }

    #[test]
    fn test_no_candidates_unmatched() {
        let d = ResolutionPolicy::default().apply(Vec::new());
        assert_eq!(d.status, ResolutionStatus::Unmatched);
        assert!(d.node_id.is_none());
        assert!(d.score.is_none());
        assert!(d.candidates.is_empty());
    }

    #[test]
    fn test_resolved_at_threshold() {
        let d = ResolutionPolicy::default().apply(vec![cand("org:a", 0.5), cand("org:b", 0.7)]);
        assert_eq!(d.status, ResolutionStatus::Resolved);
        assert_eq!(d.node_id.as_deref(), Some("org:b"));
        assert_eq!(d.score, Some(0.7));
    }

    #[test]
    fn test_ambiguous_keeps_score() {
        let d = ResolutionPolicy::default().apply(vec![cand("org:a", 0.65)]);
        assert_eq!(d.status, ResolutionStatus::Ambiguous);
        assert!(d.node_id.is_none());
        assert_eq!(d.score, Some(0.65));
        assert_eq!(d.candidates.len(), 1);
    }

    #[test]
    fn test_keeps_first_five_in_merge_order() {
        let candidates: Vec<Candidate> = (0..7u8)
            .map(|i| cand(&format!("org:{i}"), f32::from(i) / 10.0))
            .collect();
        let d = ResolutionPolicy::default().apply(candidates);
        let kept: Vec<&str> = d.candidates.iter().map(|c| c.node_id.as_str()).collect();
        assert_eq!(kept, vec!["org:0", "org:1", "org:2", "org:3", "org:4"]);
        // The winner may fall outside the retained list.
        assert_eq!(d.score, Some(0.6));
        assert_eq!(d.status, ResolutionStatus::Ambiguous);
    }

    #[test]
    fn test_tie_prefers_first() {
        let d = ResolutionPolicy::default().apply(vec![cand("org:a", 0.9), cand("org:b", 0.9)]);
        assert_eq!(d.node_id.as_deref(), Some("org:a"));
    }
}
