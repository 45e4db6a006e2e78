use tracing::debug;

use crate::extraction::{ExtractionContext, RelationStrategy};
use crate::mention::LabelFamily;
use crate::relation::{ExtractionMethod, Predicate, Relation};

// Unordered family pairs plausible enough for a weak RELATED_TO link.
const ALLOWED_PAIRS: &[(LabelFamily, LabelFamily)] = &[
    (LabelFamily::Person, LabelFamily::Organization),
    (LabelFamily::Person, LabelFamily::Place),
    (LabelFamily::Organization, LabelFamily::Place),
];

/// Weak `RELATED_TO` links between mentions sharing a sentence.
///
/// Each unordered pair yields one relation whose subject is the mention that
/// appears first in the text, so the direction follows word order rather than
/// label. A pattern or dependency relation with a different predicate between
/// the same mentions is kept alongside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CooccurrenceStrategy;

impl CooccurrenceStrategy {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns true if the families may be linked, in either order.
    #[must_use]
    pub fn is_allowed(a: LabelFamily, b: LabelFamily) -> bool {
        ALLOWED_PAIRS
            .iter()
            .any(|&(x, y)| (x, y) == (a, b) || (y, x) == (a, b))
    }
}

impl RelationStrategy for CooccurrenceStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Cooccurrence
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> Vec<Relation> {
        let mut out = Vec::new();

        for (sentence_index, (start, end)) in ctx.sentences().into_iter().enumerate() {
            let members: Vec<_> = ctx
                .entities
                .iter()
                .filter(|e| (start..end).contains(&e.span_start))
                .collect();
            if members.len() < 2 {
                continue;
            }
            let sentence = ctx.text.slice(start, end).trim();

            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    if a.id == b.id || !Self::is_allowed(a.label.family(), b.label.family()) {
                        continue;
                    }
                    let relation = Relation::between(
                        a,
                        b,
                        Predicate::RelatedTo,
                        ExtractionMethod::Cooccurrence,
                        ctx.config.cooccurrence_confidence,
                    )
                    .with_context(sentence)
                    .with_metadata("sentence_index", sentence_index);
                    out.push(relation);
                }
            }
        }

        debug!(count = out.len(), "co-occurrence strategy finished");
        out
    }
}
