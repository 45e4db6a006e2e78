use doc_entities::parse::{deps, PartOfSpeech};
use doc_entities::{
    deduplicate, EntityLabel, EntityMention, ExtractionMethod, ParsedDoc, Predicate,
    PrecomputedParser, Relation, RelationExtractor, Token,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use std::process::Command;
use std::sync::Arc;

const SCENARIO: &str = "Barack Obama worked at Apple Inc. in New York City.";

fn scenario_entities() -> Vec<EntityMention> {
    vec![
        EntityMention::new(EntityLabel::Person, "Barack Obama", 0, 12),
        EntityMention::new(EntityLabel::Org, "Apple Inc.", 23, 33),
        EntityMention::new(EntityLabel::Gpe, "New York City", 37, 50),
    ]
}

fn scenario_parse() -> ParsedDoc {
    use PartOfSpeech::{Adp, Propn, Punct, Verb};
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
fn works_at_scenario_without_parser() {
    let entities = scenario_entities();
    let relations = RelationExtractor::new().extract_relations(SCENARIO, &entities);

    let top = &relations[0];
    assert_eq!(top.predicate, Predicate::WorksAt);
    assert_eq!(top.subject_entity_id, entities[0].id);
    assert_eq!(top.object_entity_id, entities[1].id);
    assert_eq!(top.extraction_method, ExtractionMethod::PatternMatch);
    assert!((top.confidence - 0.8).abs() < f32::EPSILON);
    assert!(relations
        .iter()
        .all(|r| r.extraction_method != ExtractionMethod::DependencyParse));
}

#[test]
fn input_order_does_not_matter() {
    let entities = scenario_entities();
    let mut shuffled = entities.clone();
    shuffled.reverse();

    let extractor = RelationExtractor::new();
    let a = extractor.extract_relations(SCENARIO, &entities);
    let b = extractor.extract_relations(SCENARIO, &shuffled);
    assert_eq!(a, b);
}

#[test]
fn fewer_than_two_entities_yields_nothing() {
    let extractor = RelationExtractor::new();
    let entities = scenario_entities();
    assert!(extractor.extract_relations(SCENARIO, &[]).is_empty());
    assert!(extractor.extract_relations(SCENARIO, &entities[..1]).is_empty());
    assert!(extractor.extract_relations("", &entities[..1]).is_empty());
}

#[test]
fn precomputed_parse_enables_dependency_strategy() {
    let parser = PrecomputedParser::new();
    parser.insert(SCENARIO, scenario_parse()).unwrap();
    let entities = scenario_entities();

    let only_deps = RelationExtractor::builder()
        .parser(Arc::new(parser))
        .without(ExtractionMethod::PatternMatch)
        .build();
    assert!(only_deps.supports_dependency_parse());

    let relations = only_deps.extract_relations(SCENARIO, &entities);
    let top = &relations[0];
    assert_eq!(top.predicate, Predicate::WorksAt);
    assert_eq!(top.extraction_method, ExtractionMethod::DependencyParse);
    assert!((top.confidence - 0.7).abs() < f32::EPSILON);

    // The parse has one sentence, so all three mentions co-occur.
    let related = relations
        .iter()
        .filter(|r| r.predicate == Predicate::RelatedTo)
        .count();
    assert_eq!(related, 3);
    assert_eq!(relations.len(), 4);
}

#[test]
fn pattern_beats_dependency_for_same_key() {
    let parser = PrecomputedParser::new();
    parser.insert(SCENARIO, scenario_parse()).unwrap();
    let entities = scenario_entities();

    let relations =
        RelationExtractor::with_parser(Arc::new(parser)).extract_relations(SCENARIO, &entities);
    let works_at: Vec<&Relation> = relations
        .iter()
        .filter(|r| r.predicate == Predicate::WorksAt)
        .collect();
    assert_eq!(works_at.len(), 1);
    assert_eq!(works_at[0].extraction_method, ExtractionMethod::PatternMatch);
}

#[test]
fn reversed_pattern_swaps_subject() {
    let text = "Paris-born Ada painted.";
    let paris = EntityMention::new(EntityLabel::Gpe, "Paris", 0, 5);
    let ada = EntityMention::new(EntityLabel::Person, "Ada", 11, 14);

    let relations = RelationExtractor::new().extract_relations(text, &[paris.clone(), ada.clone()]);
    let born = relations
        .iter()
        .find(|r| r.predicate == Predicate::BornIn)
        .unwrap();
    assert_eq!(born.subject_entity_id, ada.id);
    assert_eq!(born.object_entity_id, paris.id);
    assert_eq!(born.span_start, 0);
    assert_eq!(born.span_end, 14);

    // Co-occurrence direction follows word order instead.
    let related = relations
        .iter()
        .find(|r| r.predicate == Predicate::RelatedTo)
        .unwrap();
    assert_eq!(related.subject_entity_id, paris.id);
}

#[test]
fn offsets_are_characters_not_bytes() {
    let text = "Zoë worked at Café Müller.";
    let zoe = EntityMention::new(EntityLabel::Person, "Zoë", 0, 3);
    let cafe = EntityMention::new(EntityLabel::Org, "Café Müller", 14, 25);

    let relations = RelationExtractor::new().extract_relations(text, &[zoe, cafe]);
    let top = &relations[0];
    assert_eq!(top.predicate, Predicate::WorksAt);
    assert_eq!(top.predicate_text, "worked at");
    assert_eq!(top.metadata["trigger_start"], 4);
    assert_eq!(top.metadata["trigger_end"], 13);
    assert_eq!(top.context, text);
}

#[test]
fn out_of_range_spans_do_not_panic() {
    let a = EntityMention::new(EntityLabel::Person, "Ghost", 500, 505);
    let b = EntityMention::new(EntityLabel::Org, "Nowhere", 510, 517);
    let relations = RelationExtractor::new().extract_relations("short text", &[a, b]);
    assert!(relations.iter().all(|r| r.predicate != Predicate::WorksAt));
}

#[test]
fn cli_extract_reads_json_file() {
    let entities: Vec<serde_json::Value> = scenario_entities()
        .iter()
        .map(|e| serde_json::to_value(e).unwrap())
        .collect();
    let input = serde_json::json!({ "text": SCENARIO, "entities": entities });

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{input}").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_doc-entities"))
        .args(["extract", "--input"])
        .arg(file.path())
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    assert!(output.status.success());

    let relations: Vec<Relation> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(relations[0].predicate, Predicate::WorksAt);
}

fn relation_strategy() -> impl Strategy<Value = (usize, usize, usize, f32)> {
    (0usize..3, 0usize..3, 0usize..3, 0.0f32..=1.0)
}

proptest! {
    #[test]
    fn fewer_than_two_entities_always_empty(
        text in ".{0,80}",
        start in 0usize..100,
        len in 0usize..20,
        with_one in any::<bool>(),
    ) {
        let extractor = RelationExtractor::new();
        let entities: Vec<EntityMention> = if with_one {
            vec![EntityMention::new(EntityLabel::Person, "Ada", start, start + len)]
        } else {
            Vec::new()
        };
        prop_assert!(extractor.extract_relations(&text, &entities).is_empty());
    }

    #[test]
    fn dedup_keeps_one_best_relation_per_key(
        specs in proptest::collection::vec(relation_strategy(), 0..40)
    ) {
        let mentions = scenario_entities();
        let predicates = [Predicate::WorksAt, Predicate::RelatedTo, Predicate::LocatedIn];

        let input: Vec<Relation> = specs
            .iter()
            .map(|&(s, o, p, c)| {
                Relation::between(
                    &mentions[s],
                    &mentions[o],
                    predicates[p],
                    ExtractionMethod::PatternMatch,
                    c,
                )
            })
            .collect();

        let mut best: HashMap<_, f32> = HashMap::new();
        for r in &input {
            let slot = best.entry(r.key()).or_insert(r.confidence);
            if r.confidence > *slot {
                *slot = r.confidence;
            }
        }

        let out = deduplicate(input);
        prop_assert_eq!(out.len(), best.len());
        prop_assert!(out.windows(2).all(|w| w[0].confidence >= w[1].confidence));
        for r in &out {
            prop_assert_eq!(Some(&r.confidence), best.get(&r.key()));
        }
    }
}
