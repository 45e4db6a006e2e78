//! Relation extraction.
//!
//! Three independent strategies each propose relations between mention
//! pairs; the extractor concatenates their output and keeps the most
//! confident relation per `(subject, object, predicate)`.

use std::collections::HashMap;

use crate::config::ExtractorConfig;
use crate::mention::EntityMention;
use crate::parse::ParsedDoc;
use crate::relation::{ExtractionMethod, Relation, RelationKey};
use crate::text::TextIndex;

mod cooccurrence;
mod dependency;
mod extractor;
mod patterns;

pub use cooccurrence::CooccurrenceStrategy;
pub use dependency::DependencyStrategy;
pub use extractor::{RelationExtractor, RelationExtractorBuilder};
pub use patterns::{PatternMatcher, PatternStrategy, RelationPattern};

/// Inputs shared by every strategy during one extraction call.
#[derive(Debug)]
pub struct ExtractionContext<'a> {
    /// Character-indexed source text.
    pub text: &'a TextIndex<'a>,
    /// Mentions sorted by `span_start`.
    pub entities: &'a [EntityMention],
    /// Parse of the text, when a parser is configured and succeeded.
    pub parse: Option<&'a ParsedDoc>,
    /// Extractor settings.
    pub config: &'a ExtractorConfig,
}

impl ExtractionContext<'_> {
    /// Index of the first mention whose span contains `offset`.
    #[must_use]
    pub fn entity_at(&self, offset: usize) -> Option<usize> {
        self.entities.iter().position(|e| e.contains_offset(offset))
    }

    /// Sentence spans: from the parse when it has them, else split on `.!?`.
    #[must_use]
    pub fn sentences(&self) -> Vec<(usize, usize)> {
        match self.parse {
            Some(doc) if !doc.sentences().is_empty() => doc.sentences().to_vec(),
            _ => self.text.sentences(),
        }
    }
}

/// One way of finding relations.
pub trait RelationStrategy: Send + Sync {
    /// Method tag stamped on produced relations.
    fn method(&self) -> ExtractionMethod;

    /// Strategies needing a dependency parse are skipped without one.
    fn requires_dependency_parse(&self) -> bool {
        false
    }

    /// Proposes relations. Must not fail; returns nothing when it cannot run.
    fn extract(&self, ctx: &ExtractionContext<'_>) -> Vec<Relation>;
}

/// Keeps the highest-confidence relation per key, sorted by descending
/// confidence. On equal confidence the first relation seen wins, and equal
/// confidences keep their input order.
#[must_use]
pub fn deduplicate(relations: Vec<Relation>) -> Vec<Relation> {
    let mut slots: HashMap<RelationKey, usize> = HashMap::with_capacity(relations.len());
    let mut kept: Vec<Relation> = Vec::with_capacity(relations.len());

    for relation in relations {
        match slots.get(&relation.key()) {
            Some(&slot) => {
                if relation.confidence > kept[slot].confidence {
                    kept[slot] = relation;
                }
            }
            None => {
                slots.insert(relation.key(), kept.len());
                kept.push(relation);
            }
        }
    }

    kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    kept
}
