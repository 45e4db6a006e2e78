use crate::mention::{EntityLabel, EntityMention, LabelFamily};
use crate::resolution::{Candidate, CandidateSource};
use crate::text::slugify;

const CORPORATE_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "corp",
    "corporation",
    "co",
    "company",
    "llc",
    "ltd",
    "limited",
    "plc",
    "gmbh",
    "ag",
    "sa",
    "group",
    "holdings",
    "technologies",
    "labs",
];

const PLACE_WORDS: &[&str] = &[
    "city",
    "county",
    "state",
    "province",
    "republic",
    "kingdom",
    "island",
    "islands",
    "river",
    "lake",
    "mountain",
    "mountains",
    "valley",
    "bay",
    "district",
];

/// Label-specific substring rules producing low-cost candidates.
///
/// Scores are fixed per rule: a known-person hit scores 0.9, a synthesized
/// organization 0.65, a synthesized place 0.6, and literal values always
/// resolve to their own node at 0.8.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicRules {
    /// Score of a known-person rule.
    pub known_person_score: f32,
    /// Score of a synthesized organization node.
    pub organization_score: f32,
    /// Score of a well-known place rule.
    pub known_place_score: f32,
    /// Score of a synthesized place node.
    pub place_score: f32,
    /// Score of a literal node.
    pub literal_score: f32,
}

impl Default for HeuristicRules {
    fn default() -> Self {
        Self {
            known_person_score: 0.9,
            organization_score: 0.65,
            known_place_score: 0.85,
            place_score: 0.6,
            literal_score: 0.8,
        }
    }
}

impl HeuristicRules {
    /// Creates the default rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates for `mention`, whose value normalizes to `normalized`.
    #[must_use]
    pub fn candidates(&self, mention: &EntityMention, normalized: &str) -> Vec<Candidate> {
        if normalized.is_empty() {
            return Vec::new();
        }
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let label = &mention.label;
        let name = mention.value.trim();
        let mut out = Vec::new();

        match label.family() {
            LabelFamily::Person => {
                if normalized.contains("obama") {
                    out.push(
                        Candidate::new(
                            "person:barack-obama",
                            "Barack Obama",
                            EntityLabel::Person.as_str(),
                            self.known_person_score,
                            CandidateSource::Heuristic,
                        )
                        .with_description("Matched on surname"),
                    );
                }
            }
            LabelFamily::Organization => {
                if words.iter().any(|w| CORPORATE_SUFFIXES.contains(w)) {
                    out.push(Candidate::new(
                        format!("org:{}", slugify(normalized)),
                        name,
                        label.as_str(),
                        self.organization_score,
                        CandidateSource::Heuristic,
                    ));
                }
            }
            LabelFamily::Place => {
                if normalized.contains("new york") {
                    out.push(Candidate::new(
                        "gpe:new-york-city",
                        "New York City",
                        EntityLabel::Gpe.as_str(),
                        self.known_place_score,
                        CandidateSource::Heuristic,
                    ));
                }
                if words.iter().any(|w| PLACE_WORDS.contains(w)) {
                    let prefix = if *label == EntityLabel::Gpe { "gpe" } else { "loc" };
                    out.push(Candidate::new(
                        format!("{prefix}:{}", slugify(normalized)),
                        name,
                        label.as_str(),
                        self.place_score,
                        CandidateSource::Heuristic,
                    ));
                }
            }
            LabelFamily::Literal => {
                let kind = label.as_str().to_ascii_lowercase();
                out.push(Candidate::new(
                    format!("literal:{kind}:{}", slugify(name)),
                    name,
                    label.as_str(),
                    self.literal_score,
                    CandidateSource::Heuristic,
                ));
            }
            LabelFamily::Other => {}
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize_value;

    fn run(label: EntityLabel, value: &str) -> Vec<Candidate> {
        let mention = EntityMention::new(label, value, 0, value.chars().count());
        HeuristicRules::new().candidates(&mention, &normalize_value(value))
    }

    #[test]
    fn test_known_person() {
        let out = run(EntityLabel::Person, "President Obama");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].node_id, "person:barack-obama");
        assert!((out[0].score - 0.9).abs() < f32::EPSILON);
        assert!(run(EntityLabel::Person, "Jane Doe").is_empty());
    }

    #[test]
    fn test_corporate_suffix() {
        let out = run(EntityLabel::Org, "Totally Unknown Startup Corp");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].node_id, "org:totally-unknown-startup-corp");
        assert!((out[0].score - 0.65).abs() < f32::EPSILON);
        assert_eq!(out[0].source, CandidateSource::Heuristic);

        // Suffix must be a whole word.
        assert!(run(EntityLabel::Org, "Incognito").is_empty());
    }

    #[test]
    fn test_places() {
        let out = run(EntityLabel::Gpe, "New York City");
        assert_eq!(out[0].node_id, "gpe:new-york-city");
        assert_eq!(out[1].node_id, "gpe:new-york-city");
        assert!(out[0].score > out[1].score);

        let out = run(EntityLabel::Loc, "Hudson River");
        assert_eq!(out[0].node_id, "loc:hudson-river");
    }

    #[test]
    fn test_literals_always_resolve() {
        let out = run(EntityLabel::Money, "$4.5 million");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].node_id, "literal:money:4-5-million");
        assert!((out[0].score - 0.8).abs() < f32::EPSILON);

        let out = run(EntityLabel::Date, "March 3, 2021");
        assert_eq!(out[0].node_id, "literal:date:march-3-2021");
    }

    #[test]
    fn test_other_labels_ignored() {
        assert!(run(EntityLabel::Other("NORP".to_string()), "Americans").is_empty());
    }
}
