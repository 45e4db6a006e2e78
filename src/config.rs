//! Configuration for the extractor and the resolver.
//!
//! Both configs deserialize with defaults so they can be embedded in a larger
//! settings file. The resolver additionally reads `RESOLVE_*` environment
//! variables.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;
use crate::resolution::FuzzyScorer;

/// Environment variable for the resolved/ambiguous cutoff.
pub const ENV_CONFIDENCE_THRESHOLD: &str = "RESOLVE_CONFIDENCE_THRESHOLD";
/// Environment variable toggling fuzzy fallback (`"1"` enables).
pub const ENV_FUZZY_FALLBACK: &str = "RESOLVE_FUZZY_FALLBACK";
/// Environment variable for the minimum fuzzy score (0-100).
pub const ENV_FUZZY_THRESHOLD: &str = "RESOLVE_FUZZY_THRESHOLD";
/// Environment variable selecting the fuzzy scorer.
pub const ENV_FUZZY_SCORER: &str = "RESOLVE_FUZZY_SCORER";

/// Relation extractor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Largest gap (characters) between two mentions for pattern matching.
    pub max_pattern_gap: usize,
    /// Characters of context kept on each side of a pattern match.
    pub context_window: usize,
    /// Confidence of dependency-parse relations.
    pub dependency_confidence: f32,
    /// Confidence of pattern-match relations.
    pub pattern_confidence: f32,
    /// Confidence of co-occurrence relations.
    pub cooccurrence_confidence: f32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_pattern_gap: 50,
            context_window: 30,
            dependency_confidence: 0.7,
            pattern_confidence: 0.8,
            cooccurrence_confidence: 0.3,
        }
    }
}

/// Entity resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Scores at or above this resolve; below it the entity is ambiguous.
    pub confidence_threshold: f32,
    /// Whether fuzzy matching runs when alias/heuristic scores are low.
    pub fuzzy_fallback: bool,
    /// Minimum fuzzy score (0-100) for a fuzzy candidate.
    pub fuzzy_threshold: f64,
    /// Scorer used for fuzzy matching.
    pub fuzzy_scorer: FuzzyScorer,
    /// Fuzzy matching only runs while the best score is below this.
    pub fuzzy_trigger: f32,
    /// Candidates persisted per resolution.
    pub max_candidates: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            fuzzy_fallback: true,
            fuzzy_threshold: 65.0,
            fuzzy_scorer: FuzzyScorer::WRatio,
            fuzzy_trigger: 0.7,
            max_candidates: 5,
        }
    }
}

impl ResolverConfig {
    /// Reads the `RESOLVE_*` environment variables over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable or out-of-range
    /// values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ResolverConfig::from_env`], but logs and falls back to defaults
    /// on bad values.
    #[must_use]
    pub fn from_env_lossy() -> Self {
        Self::from_env().unwrap_or_else(|err| {
            warn!(error = %err, "invalid resolver configuration, using defaults");
            Self::default()
        })
    }

    /// Reads settings through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparseable or out-of-range
    /// values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CONFIDENCE_THRESHOLD) {
            config.confidence_threshold = parse_value(ENV_CONFIDENCE_THRESHOLD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FUZZY_FALLBACK) {
            config.fuzzy_fallback = raw.trim() == "1";
        }
        if let Some(raw) = lookup(ENV_FUZZY_THRESHOLD) {
            config.fuzzy_threshold = parse_value(ENV_FUZZY_THRESHOLD, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FUZZY_SCORER) {
            config.fuzzy_scorer = raw.parse().map_err(|reason| ConfigError::InvalidValue {
                key: ENV_FUZZY_SCORER.to_string(),
                value: raw.clone(),
                reason,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks thresholds are in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(out_of_range(
                ENV_CONFIDENCE_THRESHOLD,
                self.confidence_threshold,
                "expected a value in [0, 1]",
            ));
        }
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(out_of_range(
                ENV_FUZZY_THRESHOLD,
                self.fuzzy_threshold,
                "expected a value in [0, 100]",
            ));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn out_of_range(key: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
