use std::collections::HashMap;

use tracing::debug;

use crate::extraction::{ExtractionContext, RelationStrategy};
use crate::mention::LabelFamily;
use crate::parse::deps;
use crate::relation::{ExtractionMethod, Predicate, Relation};

use crate::mention::LabelFamily::{Organization as O, Person as P, Place as L};

// (verb lemma, subject family, object family) -> predicate
const VERB_RULES: &[(&str, LabelFamily, LabelFamily, Predicate)] = &[
    ("work", P, O, Predicate::WorksAt),
    ("join", P, O, Predicate::WorksAt),
    ("employ", P, O, Predicate::WorksAt),
    ("lead", P, O, Predicate::Leads),
    ("head", P, O, Predicate::Leads),
    ("run", P, O, Predicate::Leads),
    ("manage", P, O, Predicate::Leads),
    ("chair", P, O, Predicate::Leads),
    ("found", P, O, Predicate::Founded),
    ("co-found", P, O, Predicate::Founded),
    ("establish", P, O, Predicate::Founded),
    ("start", P, O, Predicate::Founded),
    ("bear", P, L, Predicate::BornIn),
    ("live", P, L, Predicate::LivesIn),
    ("reside", P, L, Predicate::LivesIn),
    ("move", P, L, Predicate::LivesIn),
    ("visit", P, L, Predicate::Visited),
    ("travel", P, L, Predicate::Visited),
    ("tour", P, L, Predicate::Visited),
    ("locate", O, L, Predicate::LocatedIn),
    ("base", O, L, Predicate::LocatedIn),
    ("headquarter", O, L, Predicate::LocatedIn),
    ("operate", O, L, Predicate::OperatesIn),
    ("expand", O, L, Predicate::OperatesIn),
    ("know", P, P, Predicate::Knows),
    ("meet", P, P, Predicate::Knows),
    ("marry", P, P, Predicate::MarriedTo),
    ("wed", P, P, Predicate::MarriedTo),
];

/// Subject/verb/object triples read off a dependency parse.
///
/// For every verb, subjects are its `nsubj`/`nsubjpass` dependents and objects
/// are its `dobj`/`iobj`/`pobj` dependents plus the `pobj` of any `prep` or
/// `agent` dependent. A pair becomes a relation when the verb lemma and the
/// two label families appear in the lookup table.
#[derive(Debug, Clone)]
pub struct DependencyStrategy {
    rules: HashMap<(String, LabelFamily, LabelFamily), Predicate>,
}

impl DependencyStrategy {
    /// Creates the strategy with the built-in verb table.
    #[must_use]
    pub fn new() -> Self {
        let rules = VERB_RULES
            .iter()
            .map(|(lemma, s, o, p)| (((*lemma).to_string(), *s, *o), *p))
            .collect();
        Self { rules }
    }

    /// Adds or replaces a verb rule.
    #[must_use]
    pub fn with_rule(
        mut self,
        lemma: impl Into<String>,
        subject: LabelFamily,
        object: LabelFamily,
        predicate: Predicate,
    ) -> Self {
        self.rules
            .insert((lemma.into().to_lowercase(), subject, object), predicate);
        self
    }

    /// Looks up the relation type for a verb and label pair.
    #[must_use]
    pub fn classify(
        &self,
        lemma: &str,
        subject: LabelFamily,
        object: LabelFamily,
    ) -> Option<Predicate> {
        self.rules.get(&(lemma.to_string(), subject, object)).copied()
    }
}

impl Default for DependencyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationStrategy for DependencyStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::DependencyParse
    }

    fn requires_dependency_parse(&self) -> bool {
        true
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> Vec<Relation> {
        let Some(doc) = ctx.parse else {
            return Vec::new();
        };
        let tokens = doc.tokens();
        let token_entity: Vec<Option<usize>> =
            tokens.iter().map(|t| ctx.entity_at(t.idx)).collect();

        let mut out = Vec::new();
        for (vi, verb) in tokens.iter().enumerate().filter(|(_, t)| t.is_verb()) {
            let mut subjects = Vec::new();
            let mut objects: Vec<(usize, Option<&str>)> = Vec::new();

            for &child in doc.children(vi) {
                match tokens[child].dep.as_str() {
                    deps::NSUBJ | deps::NSUBJPASS => subjects.push(child),
                    deps::DOBJ | deps::IOBJ | deps::POBJ => objects.push((child, None)),
                    deps::PREP | deps::AGENT => {
                        for &grandchild in doc.children(child) {
                            if tokens[grandchild].dep == deps::POBJ {
                                objects.push((grandchild, Some(tokens[child].text.as_str())));
                            }
                        }
                    }
                    _ => {}
                }
            }

            for &s in &subjects {
                let Some(subject) = token_entity[s].map(|i| &ctx.entities[i]) else {
                    continue;
                };
                for &(o, prep) in &objects {
                    let Some(object) = token_entity[o].map(|i| &ctx.entities[i]) else {
                        continue;
                    };
                    if subject.id == object.id {
                        continue;
                    }
                    let Some(predicate) =
                        self.classify(&verb.lemma, subject.label.family(), object.label.family())
                    else {
                        continue;
                    };

                    let trigger = match prep {
                        Some(p) => format!("{} {}", verb.text, p.to_lowercase()),
                        None => verb.text.clone(),
                    };
                    let mut relation = Relation::between(
                        subject,
                        object,
                        predicate,
                        ExtractionMethod::DependencyParse,
                        ctx.config.dependency_confidence,
                    )
                    .with_predicate_text(trigger)
                    .with_metadata("verb_lemma", verb.lemma.clone())
                    .with_metadata("subject_dep", tokens[s].dep.clone());
                    if let Some(p) = prep {
                        relation = relation.with_metadata("preposition", p.to_lowercase());
                    }
                    let context = ctx
                        .text
                        .window(relation.span_start, relation.span_end, ctx.config.context_window);
                    out.push(relation.with_context(context));
                }
            }
        }

        debug!(count = out.len(), "dependency strategy finished");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractorConfig;
    use crate::mention::{EntityLabel, EntityMention};
    use crate::parse::{ParsedDoc, PartOfSpeech, Token};
    use crate::text::TextIndex;

    const TEXT: &str = "Barack Obama worked at Apple Inc. in New York City.";

    fn entities() -> Vec<EntityMention> {
        vec![
            EntityMention::new(EntityLabel::Person, "Barack Obama", 0, 12),
            EntityMention::new(EntityLabel::Org, "Apple Inc.", 23, 33),
            EntityMention::new(EntityLabel::Gpe, "New York City", 37, 50),
        ]
    }

    fn parse() -> ParsedDoc {
        use crate::parse::PartOfSpeech::{Adp, Propn, Punct, Verb};
        ParsedDoc::from_tokens(
            vec![
                Token::new("Barack", 0, "barack", Propn, "compound", 1),
                Token::new("Obama", 7, "obama", Propn, deps::NSUBJ, 2),
                Token::new("worked", 13, "work", Verb, "ROOT", 2),
                Token::new("at", 20, "at", Adp, deps::PREP, 2),
                Token::new("Apple", 23, "apple", Propn, "compound", 5),
                Token::new("Inc.", 29, "inc.", Propn, deps::POBJ, 3),
                Token::new("in", 34, "in", Adp, deps::PREP, 2),
                Token::new("New", 37, "new", Propn, "compound", 8),
                Token::new("York", 41, "york", Propn, "compound", 9),
                Token::new("City", 46, "city", Propn, deps::POBJ, 6),
                Token::new(".", 50, ".", Punct, "punct", 2),
            ],
            vec![(0, 51)],
        )
        .unwrap()
    }

    #[test]
    fn test_classify() {
        let strategy = DependencyStrategy::new();
        assert_eq!(
            strategy.classify("work", LabelFamily::Person, LabelFamily::Organization),
            Some(Predicate::WorksAt)
        );
        assert_eq!(
            strategy.classify("work", LabelFamily::Organization, LabelFamily::Person),
            None
        );
    }

    #[test]
    fn test_extracts_subject_prep_object() {
        let text = TextIndex::new(TEXT);
        let entities = entities();
        let doc = parse();
        let config = ExtractorConfig::default();
        let ctx = ExtractionContext {
            text: &text,
            entities: &entities,
            parse: Some(&doc),
            config: &config,
        };

        let out = DependencyStrategy::new().extract(&ctx);
        // "worked in New York City" has no (work, PERSON, GPE) rule.
        assert_eq!(out.len(), 1);
        let rel = &out[0];
        assert_eq!(rel.predicate, Predicate::WorksAt);
        assert_eq!(rel.subject_entity_id, entities[0].id);
        assert_eq!(rel.object_entity_id, entities[1].id);
        assert!((rel.confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(rel.predicate_text, "worked at");
        assert_eq!(rel.metadata["verb_lemma"], "work");
    }

    #[test]
    fn test_custom_rule() {
        let text = TextIndex::new(TEXT);
        let entities = entities();
        let doc = parse();
        let config = ExtractorConfig::default();
        let ctx = ExtractionContext {
            text: &text,
            entities: &entities,
            parse: Some(&doc),
            config: &config,
        };

        let strategy = DependencyStrategy::new().with_rule(
            "work",
            LabelFamily::Person,
            LabelFamily::Place,
            Predicate::LivesIn,
        );
        let out = strategy.extract(&ctx);
        assert_eq!(out.len(), 2);
        assert!(out
            .iter()
            .any(|r| r.predicate == Predicate::LivesIn && r.object_entity_id == entities[2].id));
    }

    #[test]
    fn test_no_parse_yields_nothing() {
        let text = TextIndex::new(TEXT);
        let entities = entities();
        let config = ExtractorConfig::default();
        let ctx = ExtractionContext {
            text: &text,
            entities: &entities,
            parse: None,
            config: &config,
        };
        assert!(DependencyStrategy::new().extract(&ctx).is_empty());
    }
}
