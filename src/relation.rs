//! Typed relations between entity mentions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mention::{EntityMention, MentionId};

/// Relation type linking a subject mention to an object mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Predicate {
    /// Person employed by an organization.
    WorksAt,
    /// Person heading an organization.
    Leads,
    /// Person who founded an organization.
    Founded,
    /// Person's birthplace.
    BornIn,
    /// Person's residence.
    LivesIn,
    /// Person travelled to a place.
    Visited,
    /// Organization or place inside a place.
    LocatedIn,
    /// Organization active in a place.
    OperatesIn,
    /// Two people acquainted.
    Knows,
    /// Two people married.
    MarriedTo,
    /// Generic co-occurrence link.
    RelatedTo,
}

impl Predicate {
    /// Canonical upper-case name, as serialized.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WorksAt => "WORKS_AT",
            Self::Leads => "LEADS",
            Self::Founded => "FOUNDED",
            Self::BornIn => "BORN_IN",
            Self::LivesIn => "LIVES_IN",
            Self::Visited => "VISITED",
            Self::LocatedIn => "LOCATED_IN",
            Self::OperatesIn => "OPERATES_IN",
            Self::Knows => "KNOWS",
            Self::MarriedTo => "MARRIED_TO",
            Self::RelatedTo => "RELATED_TO",
        }
    }

    /// Human-readable phrase used as the default `predicate_text`.
    #[must_use]
    pub const fn phrase(&self) -> &'static str {
        match self {
            Self::WorksAt => "works at",
            Self::Leads => "leads",
            Self::Founded => "founded",
            Self::BornIn => "born in",
            Self::LivesIn => "lives in",
            Self::Visited => "visited",
            Self::LocatedIn => "located in",
            Self::OperatesIn => "operates in",
            Self::Knows => "knows",
            Self::MarriedTo => "married to",
            Self::RelatedTo => "related to",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategy produced a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Subject/verb/object triples from a dependency parse.
    DependencyParse,
    /// Lexical patterns between nearby mentions.
    PatternMatch,
    /// Mentions sharing a sentence.
    Cooccurrence,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DependencyParse => write!(f, "dependency_parse"),
            Self::PatternMatch => write!(f, "pattern_match"),
            Self::Cooccurrence => write!(f, "cooccurrence"),
        }
    }
}

/// Deduplication key: relations are directed, so `(a, b)` and `(b, a)` differ.
pub type RelationKey = (MentionId, MentionId, Predicate);

/// A typed, directed link between two mentions.
///
/// Relations are transient: they are returned to the caller and never
/// persisted by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Subject mention.
    pub subject_entity_id: MentionId,

    /// Object mention.
    pub object_entity_id: MentionId,

    /// Relation type.
    pub predicate: Predicate,

    /// Text that triggered the relation (verb lemma, matched phrase, ...).
    pub predicate_text: String,

    /// Confidence in `[0, 1]`.
    pub confidence: f32,

    /// Start character offset of the supporting span.
    pub span_start: usize,

    /// End character offset of the supporting span.
    pub span_end: usize,

    /// Surrounding text.
    pub context: String,

    /// Strategy that found the relation.
    pub extraction_method: ExtractionMethod,

    /// Strategy-specific details.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Relation {
    /// Creates a relation from `subject` to `object`.
    ///
    /// The span covers both mentions, `predicate_text` defaults to the
    /// predicate phrase and the context starts empty.
    #[must_use]
    pub fn between(
        subject: &EntityMention,
        object: &EntityMention,
        predicate: Predicate,
        method: ExtractionMethod,
        confidence: f32,
    ) -> Self {
        Self {
            subject_entity_id: subject.id,
            object_entity_id: object.id,
            predicate,
            predicate_text: predicate.phrase().to_string(),
            confidence: confidence.clamp(0.0, 1.0),
            span_start: subject.span_start.min(object.span_start),
            span_end: subject.span_end.max(object.span_end),
            context: String::new(),
            extraction_method: method,
            metadata: serde_json::Map::new(),
        }
    }

    /// Overrides the trigger text.
    #[must_use]
    pub fn with_predicate_text(mut self, text: impl Into<String>) -> Self {
        self.predicate_text = text.into();
        self
    }

    /// Overrides the supporting span.
    #[must_use]
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span_start = start;
        self.span_end = end;
        self
    }

    /// Sets the context text.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Returns the deduplication key.
    #[must_use]
    pub fn key(&self) -> RelationKey {
        (self.subject_entity_id, self.object_entity_id, self.predicate)
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
