use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::mention::MentionId;
use crate::resolution::Candidate;

/// How a batch was triggered. Only used to label metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// Inline with a request.
    Sync,
    /// From a background worker.
    #[default]
    Async,
}

impl ResolveMode {
    /// Metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

impl FromStr for ResolveMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "async" => Ok(Self::Async),
            _ => Err(ValidationError::UnknownMode {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for ResolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a persisted resolution.
///
/// `Missing` and `InvalidId` are never stored; they only label batch
/// outcomes for entities that could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    /// Resolution in progress.
    Processing,
    /// Best candidate met the threshold.
    Resolved,
    /// Candidates exist but none met the threshold.
    Ambiguous,
    /// No candidates.
    Unmatched,
    /// The entity row does not exist.
    Missing,
    /// The entity id was not a UUID.
    InvalidId,
}

impl ResolutionStatus {
    /// Wire and metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Resolved => "resolved",
            Self::Ambiguous => "ambiguous",
            Self::Unmatched => "unmatched",
            Self::Missing => "missing",
            Self::InvalidId => "invalid_id",
        }
    }

    /// Returns true for the outcomes the resolution policy can produce.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        matches!(self, Self::Resolved | Self::Ambiguous | Self::Unmatched)
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted resolution of one entity mention, keyed by the mention id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityResolution {
    /// Mention this resolution belongs to.
    pub entity_id: MentionId,
    /// Chosen node, set only when resolved.
    pub node_id: Option<String>,
    /// Best candidate score, kept for ambiguous outcomes too.
    pub score: Option<f32>,
    /// Current state.
    pub status: ResolutionStatus,
    /// Up to `max_candidates` candidates, in merge order.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Fingerprint of the alias table that produced this resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_version: Option<String>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl EntityResolution {
    /// A fresh row in the `processing` state.
    #[must_use]
    pub fn processing(entity_id: MentionId) -> Self {
        Self {
            entity_id,
            node_id: None,
            score: None,
            status: ResolutionStatus::Processing,
            candidates: Vec::new(),
            kb_version: None,
            updated_at: Utc::now(),
        }
    }

    /// Returns true if resolved to a node.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }

    /// Checks the status/node/score invariant for `threshold`.
    #[must_use]
    pub fn is_consistent(&self, threshold: f32) -> bool {
        match self.status {
            ResolutionStatus::Resolved => {
                self.node_id.is_some() && self.score.is_some_and(|s| s >= threshold)
            }
            ResolutionStatus::Ambiguous => {
                self.node_id.is_none() && self.score.is_some_and(|s| s < threshold)
            }
            ResolutionStatus::Unmatched => {
                self.node_id.is_none() && self.score.is_none() && self.candidates.is_empty()
            }
            _ => self.node_id.is_none(),
        }
    }
}

/// What `resolve_entities` returns for each entity it could load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionPayload {
    /// Mention id.
    pub entity_id: MentionId,
    /// Outcome.
    pub status: ResolutionStatus,
    /// Chosen node when resolved.
    pub node_id: Option<String>,
    /// Best score, if any candidate was found.
    pub score: Option<f32>,
    /// Persisted candidates.
    pub candidates: Vec<Candidate>,
}

impl From<&EntityResolution> for ResolutionPayload {
    fn from(resolution: &EntityResolution) -> Self {
        Self {
            entity_id: resolution.entity_id,
            status: resolution.status,
            node_id: resolution.node_id.clone(),
            score: resolution.score,
            candidates: resolution.candidates.clone(),
        }
    }
}

/// Successful single-entity result, waiting to be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionOutcome {
    /// Row to persist.
    pub resolution: EntityResolution,
    /// Row replaced by the `processing` marker, restored if the commit fails.
    pub previous: Option<EntityResolution>,
}

impl ResolutionOutcome {
    /// Outcome status.
    #[must_use]
    pub fn status(&self) -> ResolutionStatus {
        self.resolution.status
    }

    /// Caller-facing payload.
    #[must_use]
    pub fn payload(&self) -> ResolutionPayload {
        ResolutionPayload::from(&self.resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("SYNC".parse::<ResolveMode>().unwrap(), ResolveMode::Sync);
        assert_eq!(" async ".parse::<ResolveMode>().unwrap(), ResolveMode::Async);
        assert_eq!(ResolveMode::default(), ResolveMode::Async);
        assert!(matches!(
            "batch".parse::<ResolveMode>(),
            Err(ValidationError::UnknownMode { .. })
        ));
    }

    #[test]
    fn test_status_serde() {
        let json = serde_json::to_string(&ResolutionStatus::InvalidId).unwrap();
        assert_eq!(json, "\"invalid_id\"");
        assert!(ResolutionStatus::Unmatched.is_decided());
        assert!(!ResolutionStatus::Processing.is_decided());
    }

    #[test]
    fn test_consistency() {
        let mut row = EntityResolution::processing(MentionId::new());
        assert!(row.is_consistent(0.7));

        row.status = ResolutionStatus::Resolved;
        row.node_id = Some("org:acme".to_string());
        row.score = Some(0.65);
        assert!(!row.is_consistent(0.7));

        row.score = Some(0.9);
        assert!(row.is_consistent(0.7));

        row.status = ResolutionStatus::Unmatched;
        assert!(!row.is_consistent(0.7));
    }
}
