//! Entity mentions produced by upstream extraction.
//!
//! A mention is a labelled span of document text. This crate reads mentions
//! but never mutates them; they are owned by the ingestion pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Stable identifier of an entity mention.
///
/// # Examples
///
/// ```
/// use doc_entities::MentionId;
///
/// let id = MentionId::new();
/// assert_eq!(id.to_string().parse::<MentionId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MentionId(Uuid);

impl MentionId {
    /// Creates a new random mention ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a mention ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parses a textual id, accepting any UUID format `uuid` understands.
    ///
    /// # Errors
    ///
    /// Returns the underlying `uuid::Error` when `value` is not a UUID.
    pub fn parse(value: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(value.trim()).map(Self)
    }
}

impl Default for MentionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MentionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MentionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for MentionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Coarse grouping of labels used when comparing against knowledge-base types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelFamily {
    /// People.
    Person,
    /// Companies, institutions and groups.
    Organization,
    /// Geo-political entities and other locations.
    Place,
    /// Values that resolve to themselves (money, percentages, dates).
    Literal,
    /// Anything else.
    Other,
}

/// Semantic label attached to a mention.
///
/// Parsing is case-insensitive and folds common spellings together
/// (`ORGANIZATION` becomes [`EntityLabel::Org`], `LOCATION` becomes
/// [`EntityLabel::Loc`]). Unknown labels are kept verbatim, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EntityLabel {
    /// A person.
    Person,
    /// An organization.
    Org,
    /// A geo-political entity (country, city, state).
    Gpe,
    /// A non-GPE location.
    Loc,
    /// A monetary amount.
    Money,
    /// A percentage.
    Percent,
    /// An absolute or relative date.
    Date,
    /// Any other label.
    Other(String),
}

impl EntityLabel {
    /// Returns the canonical label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Person => "PERSON",
            Self::Org => "ORG",
            Self::Gpe => "GPE",
            Self::Loc => "LOC",
            Self::Money => "MONEY",
            Self::Percent => "PERCENT",
            Self::Date => "DATE",
            Self::Other(name) => name,
        }
    }

    /// Returns the family this label belongs to.
    #[must_use]
    pub fn family(&self) -> LabelFamily {
        match self {
            Self::Person => LabelFamily::Person,
            Self::Org => LabelFamily::Organization,
            Self::Gpe | Self::Loc => LabelFamily::Place,
            Self::Money | Self::Percent | Self::Date => LabelFamily::Literal,
            Self::Other(_) => LabelFamily::Other,
        }
    }

    /// Returns true for labels whose values resolve to a literal node.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.family() == LabelFamily::Literal
    }
}

impl TryFrom<String> for EntityLabel {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for EntityLabel {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::EmptyLabel);
        }

        let upper = value.to_ascii_uppercase();
        Ok(match upper.as_str() {
            "PERSON" | "PER" => Self::Person,
            "ORG" | "ORGANIZATION" | "ORGANISATION" => Self::Org,
            "GPE" => Self::Gpe,
            "LOC" | "LOCATION" => Self::Loc,
            "MONEY" => Self::Money,
            "PERCENT" => Self::Percent,
            "DATE" => Self::Date,
            _ => Self::Other(upper),
        })
    }
}

impl From<EntityLabel> for String {
    fn from(value: EntityLabel) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_confidence() -> f32 {
    1.0
}

/// A labelled span of document text.
///
/// Spans are character offsets into the source text, end-exclusive. They are
/// not validated against the text: the extractor tolerates out-of-range spans.
///
/// Deserialization ignores unknown keys, so ingestion payloads carrying extra
/// fields can be fed in directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    /// Mention identifier.
    pub id: MentionId,

    /// Document the mention was found in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<Uuid>,

    /// Semantic label.
    pub label: EntityLabel,

    /// Surface text of the mention.
    pub value: String,

    /// Start character offset (inclusive).
    pub span_start: usize,

    /// End character offset (exclusive).
    pub span_end: usize,

    /// Upstream extraction confidence.
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

impl EntityMention {
    /// Creates a mention with a fresh id and full confidence.
    ///
    /// # Examples
    ///
    /// ```
    /// use doc_entities::{EntityLabel, EntityMention};
    ///
    /// let m = EntityMention::new(EntityLabel::Person, "Barack Obama", 0, 12);
    /// assert_eq!(m.len(), 12);
    /// ```
    #[must_use]
    pub fn new(
        label: EntityLabel,
        value: impl Into<String>,
        span_start: usize,
        span_end: usize,
    ) -> Self {
        Self {
            id: MentionId::new(),
            doc_id: None,
            label,
            value: value.into(),
            span_start,
            span_end,
            confidence: default_confidence(),
        }
    }

    /// Sets the owning document.
    #[must_use]
    pub fn with_doc(mut self, doc_id: Uuid) -> Self {
        self.doc_id = Some(doc_id);
        self
    }

    /// Sets the mention id.
    #[must_use]
    pub fn with_id(mut self, id: MentionId) -> Self {
        self.id = id;
        self
    }

    /// Sets the upstream confidence, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Span length in characters (zero for inverted spans).
    #[must_use]
    pub fn len(&self) -> usize {
        self.span_end.saturating_sub(self.span_start)
    }

    /// Returns true if the span covers no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the character offset falls inside the span.
    #[must_use]
    pub fn contains_offset(&self, offset: usize) -> bool {
        (self.span_start..self.span_end).contains(&offset)
    }

    /// Checks the mention is well formed for storage.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for empty values, inverted spans or an
    /// out-of-range confidence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.value.trim().is_empty() {
            return Err(ValidationError::EmptyValue);
        }
        if self.span_start > self.span_end {
            return Err(ValidationError::InvertedSpan {
                start: self.span_start,
                end: self.span_end,
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange {
                value: self.confidence,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing_folds_aliases() {
        assert_eq!("organization".parse::<EntityLabel>().unwrap(), EntityLabel::Org);
        assert_eq!("LOCATION".parse::<EntityLabel>().unwrap(), EntityLabel::Loc);
        assert_eq!("per".parse::<EntityLabel>().unwrap(), EntityLabel::Person);
        assert_eq!(
            "norp".parse::<EntityLabel>().unwrap(),
            EntityLabel::Other("NORP".to_string())
        );
    }

    #[test]
    fn test_empty_label_rejected() {
        assert_eq!("  ".parse::<EntityLabel>(), Err(ValidationError::EmptyLabel));
    }

    #[test]
    fn test_label_family() {
        assert_eq!(EntityLabel::Gpe.family(), LabelFamily::Place);
        assert_eq!(EntityLabel::Loc.family(), LabelFamily::Place);
        assert!(EntityLabel::Money.is_literal());
        assert!(!EntityLabel::Org.is_literal());
    }

    #[test]
    fn test_mention_ignores_extra_keys() {
        let id = MentionId::new();
        let json = format!(
            concat!(
                r#"{{"id":"{}","label":"ORG","value":"Apple Inc.","#,
                r#""span_start":23,"span_end":33,"source":"ner-v2"}}"#
            ),
            id
        );
        let mention: EntityMention = serde_json::from_str(&json).unwrap();
        assert_eq!(mention.id, id);
        assert_eq!(mention.label, EntityLabel::Org);
        assert!((mention.confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mention_validate() {
        let ok = EntityMention::new(EntityLabel::Person, "Ada", 0, 3);
        assert!(ok.validate().is_ok());

        let inverted = EntityMention::new(EntityLabel::Person, "Ada", 5, 3);
        assert!(matches!(
            inverted.validate(),
            Err(ValidationError::InvertedSpan { .. })
        ));
        assert_eq!(inverted.len(), 0);

        let blank = EntityMention::new(EntityLabel::Person, " ", 0, 1);
        assert_eq!(blank.validate(), Err(ValidationError::EmptyValue));
    }

    #[test]
    fn test_mention_id_parse_rejects_garbage() {
        assert!(MentionId::parse("not-a-uuid").is_err());
        let id = MentionId::new();
        assert_eq!(MentionId::parse(&format!(" {id} ")).unwrap(), id);
    }
}
