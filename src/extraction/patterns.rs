use std::collections::HashMap;

use regex::Regex;
use tracing::{debug, warn};

use crate::extraction::{ExtractionContext, RelationStrategy};
use crate::mention::LabelFamily;
use crate::relation::{ExtractionMethod, Predicate, Relation};

use crate::mention::LabelFamily::{Organization as O, Person as P, Place as L};

/// How a pattern recognizes the text between two mentions.
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    /// One of `verbs`, followed within three words by one of `preps`.
    /// An empty `preps` list matches the verb alone.
    VerbPrep {
        /// Accepted verb forms, lower-case.
        verbs: Vec<String>,
        /// Accepted prepositions, lower-case.
        preps: Vec<String>,
    },
    /// A regular expression searched in the gap text.
    Regex(Regex),
}

impl PatternMatcher {
    /// Builds a verb + preposition matcher.
    #[must_use]
    pub fn verb_prep(verbs: &[&str], preps: &[&str]) -> Self {
        Self::VerbPrep {
            verbs: verbs.iter().map(|v| v.to_lowercase()).collect(),
            preps: preps.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Compiles a regex matcher.
    ///
    /// # Errors
    ///
    /// Returns the compile error for an invalid expression.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self::Regex)
    }

    /// Byte range of the first match inside `gap`.
    #[must_use]
    pub fn find(&self, gap: &str) -> Option<(usize, usize)> {
        match self {
            Self::Regex(re) => re.find(gap).map(|m| (m.start(), m.end())),
            Self::VerbPrep { verbs, preps } => {
                let words = words(gap);
                for (i, (start, end, word)) in words.iter().enumerate() {
                    if !verbs.iter().any(|v| v == word) {
                        continue;
                    }
                    if preps.is_empty() {
                        return Some((*start, *end));
                    }
                    let found = words
                        .iter()
                        .skip(i + 1)
                        .take(3)
                        .find(|(_, _, w)| preps.iter().any(|p| p == w));
                    if let Some((_, prep_end, _)) = found {
                        return Some((*start, *prep_end));
                    }
                }
                None
            }
        }
    }
}

// Lower-cased words with their byte ranges. Hyphens and apostrophes stay
// inside words so "co-founded" is one word.
fn words(text: &str) -> Vec<(usize, usize, String)> {
    let is_word = |c: char| c.is_alphanumeric() || c == '-' || c == '\'';
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (is_word(c), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push((s, i, text[s..i].to_lowercase()));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, text.len(), text[s..].to_lowercase()));
    }
    out
}

/// A relation pattern for one ordered label-family pair.
///
/// `first` and `second` refer to textual order. When `reversed` is set the
/// later mention becomes the subject, as in "Apple CEO Tim Cook".
#[derive(Debug, Clone)]
pub struct RelationPattern {
    /// Name recorded in relation metadata.
    pub name: String,
    /// Family of the earlier mention.
    pub first: LabelFamily,
    /// Family of the later mention.
    pub second: LabelFamily,
    /// Relation type produced.
    pub predicate: Predicate,
    /// Gap matcher.
    pub matcher: PatternMatcher,
    /// Subject is the later mention.
    pub reversed: bool,
}

impl RelationPattern {
    /// Creates a forward pattern.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        first: LabelFamily,
        second: LabelFamily,
        predicate: Predicate,
        matcher: PatternMatcher,
    ) -> Self {
        Self {
            name: name.into(),
            first,
            second,
            predicate,
            matcher,
            reversed: false,
        }
    }

    /// Marks the later mention as the subject.
    #[must_use]
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }
}

enum Trigger {
    VerbPrep(&'static [&'static str], &'static [&'static str]),
    Regex(&'static str),
}

use self::Trigger::{Regex as Re, VerbPrep as Vp};

const WORK: &[&str] = &["work", "works", "worked", "working"];
const LIVE: &[&str] = &["live", "lives", "lived", "living", "resides", "resided", "residing"];
const JOIN: &[&str] = &["join", "joins", "joined", "joining"];
const LEAD: &[&str] = &[
    "leads", "led", "heads", "headed", "runs", "ran", "manages", "managed", "chairs", "chaired",
];
const FOUND: &[&str] = &[
    "founded", "co-founded", "cofounded", "established", "started", "launched",
];
const HIRE: &[&str] = &["hired", "hires", "employs", "appointed"];
const TRAVEL: &[&str] = &["traveled", "travelled", "travels", "flew", "went"];
const BASED: &[&str] = &["based", "headquartered", "located", "situated"];
const OPERATE: &[&str] = &[
    "operate", "operates", "operated", "operating", "expanded", "expands", "expanding",
];
const IN_PLACE: &[&str] = &["is", "lies", "located", "situated"];
const KNOW: &[&str] = &["knows", "knew", "met", "meets", "befriended"];

const EMPLOYEE_OF: &str = r"(?i)\b(?:employee|engineer|analyst|researcher|member)\s+(?:of|at)\b";
const TITLE_OF: &str = concat!(
    r"(?i)\b(?:ceo|chief executive(?:\s+officer)?|president|chairman|chairwoman|director|head)",
    r"\s+(?:of|at)\b",
);
const ORG_TITLE: &str = concat!(
    r"(?i)^[\s,]*(?:'s\s+)?",
    r"(?:ceo|chief executive(?:\s+officer)?|president|chairman|chairwoman|head)[\s,]*$",
);
const ORG_FOUNDER: &str = r"(?i)^[\s,]*(?:'s\s+)?(?:co-?)?founder[\s,]*$";
const OFFICES_IN: &str = r"(?i)\b(?:headquarters|hq|offices?)\s+(?:is\s+|are\s+)?in\b";
const PRESENCE_IN: &str = r"(?i)\b(?:stores|branches|presence|operations)\s+in\b";
const FRIEND_OF: &str = r"(?i)\b(?:friend|colleague|classmate)\s+of\b";
const POSSESSIVE_SPOUSE: &str = r"(?i)^\s*'s\s+(?:wife|husband|spouse)[\s,]*$";

// (name, first, second, predicate, reversed, trigger)
const DEFAULT_PATTERNS: &[(&str, LabelFamily, LabelFamily, Predicate, bool, Trigger)] = &[
    ("works_at", P, O, Predicate::WorksAt, false, Vp(WORK, &["at", "for"])),
    ("joined", P, O, Predicate::WorksAt, false, Vp(JOIN, &[])),
    ("employed_by", P, O, Predicate::WorksAt, false, Vp(&["employed"], &["by", "at"])),
    ("employee_of", P, O, Predicate::WorksAt, false, Re(EMPLOYEE_OF)),
    ("leads", P, O, Predicate::Leads, false, Vp(LEAD, &[])),
    ("title_of", P, O, Predicate::Leads, false, Re(TITLE_OF)),
    ("founded", P, O, Predicate::Founded, false, Vp(FOUND, &[])),
    ("founder_of", P, O, Predicate::Founded, false, Re(r"(?i)\b(?:co-?)?founder\s+of\b")),
    ("org_title", O, P, Predicate::Leads, true, Re(ORG_TITLE)),
    ("org_founder", O, P, Predicate::Founded, true, Re(ORG_FOUNDER)),
    ("org_hired", O, P, Predicate::WorksAt, true, Vp(HIRE, &[])),
    ("born_in", P, L, Predicate::BornIn, false, Vp(&["born"], &["in"])),
    ("lives_in", P, L, Predicate::LivesIn, false, Vp(LIVE, &["in"])),
    ("moved_to", P, L, Predicate::LivesIn, false, Vp(&["moved", "moves", "relocated"], &["to"])),
    ("visited", P, L, Predicate::Visited, false, Vp(&["visited", "visits", "visiting"], &[])),
    ("traveled_to", P, L, Predicate::Visited, false, Vp(TRAVEL, &["to"])),
    ("trip_to", P, L, Predicate::Visited, false, Re(r"(?i)\b(?:trip|visit|journey)\s+to\b")),
    ("place_born", L, P, Predicate::BornIn, true, Re(r"(?i)^\s*-?\s*born\s*$")),
    ("based_in", O, L, Predicate::LocatedIn, false, Vp(BASED, &["in", "at"])),
    ("offices_in", O, L, Predicate::LocatedIn, false, Re(OFFICES_IN)),
    ("operates_in", O, L, Predicate::OperatesIn, false, Vp(OPERATE, &["in", "into"])),
    ("presence_in", O, L, Predicate::OperatesIn, false, Re(PRESENCE_IN)),
    ("place_based", L, O, Predicate::LocatedIn, true, Re(r"(?i)^\s*-?\s*based\s*$")),
    ("married", P, P, Predicate::MarriedTo, false, Vp(&["married", "marries", "wed"], &[])),
    ("spouse_of", P, P, Predicate::MarriedTo, false, Re(r"(?i)\b(?:wife|husband|spouse)\s+of\b")),
    ("possessive_spouse", P, P, Predicate::MarriedTo, true, Re(POSSESSIVE_SPOUSE)),
    ("knows", P, P, Predicate::Knows, false, Vp(KNOW, &[])),
    ("friend_of", P, P, Predicate::Knows, false, Re(FRIEND_OF)),
    ("place_comma_place", L, L, Predicate::LocatedIn, false, Re(r"^\s*,\s*$")),
    ("place_in_place", L, L, Predicate::LocatedIn, false, Vp(IN_PLACE, &["in"])),
];

/// Lexical patterns over the gap between two nearby mentions.
///
/// Mentions are visited in textual order; every pair whose gap is at most
/// `max_pattern_gap` characters is checked against the patterns registered
/// for its label-family pair.
#[derive(Debug, Clone)]
pub struct PatternStrategy {
    table: HashMap<(LabelFamily, LabelFamily), Vec<RelationPattern>>,
}

impl PatternStrategy {
    /// Creates the strategy with the built-in pattern table.
    #[must_use]
    pub fn new() -> Self {
        let mut strategy = Self::empty();
        for (name, first, second, predicate, reversed, trigger) in DEFAULT_PATTERNS {
            let matcher = match trigger {
                Vp(verbs, preps) => PatternMatcher::verb_prep(verbs, preps),
                Re(expr) => match PatternMatcher::regex(expr) {
                    Ok(m) => m,
                    Err(err) => {
                        warn!(pattern = *name, error = %err, "discarding relation pattern");
                        continue;
                    }
                },
            };
            let mut pattern = RelationPattern::new(*name, *first, *second, *predicate, matcher);
            pattern.reversed = *reversed;
            strategy = strategy.with_pattern(pattern);
        }
        strategy
    }

    /// Creates a strategy with no patterns.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Registers a pattern.
    #[must_use]
    pub fn with_pattern(mut self, pattern: RelationPattern) -> Self {
        self.table
            .entry((pattern.first, pattern.second))
            .or_default()
            .push(pattern);
        self
    }

    /// Patterns registered for an ordered family pair.
    #[must_use]
    pub fn patterns_for(&self, first: LabelFamily, second: LabelFamily) -> &[RelationPattern] {
        match self.table.get(&(first, second)) {
            Some(patterns) => patterns,
            None => &[],
        }
    }
}

impl Default for PatternStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationStrategy for PatternStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PatternMatch
    }

    fn extract(&self, ctx: &ExtractionContext<'_>) -> Vec<Relation> {
        let entities = ctx.entities;
        let mut out = Vec::new();

        for (i, first) in entities.iter().enumerate() {
            for second in &entities[i + 1..] {
                if second.span_start < first.span_end {
                    continue;
                }
                // Sorted by start, so every later mention is at least as far away.
                if second.span_start - first.span_end > ctx.config.max_pattern_gap {
                    break;
                }
                if first.id == second.id {
                    continue;
                }

                let patterns = self.patterns_for(first.label.family(), second.label.family());
                if patterns.is_empty() {
                    continue;
                }
                let gap = ctx.text.slice(first.span_end, second.span_start);

                for pattern in patterns {
                    let Some((b_start, b_end)) = pattern.matcher.find(gap) else {
                        continue;
                    };
                    let trigger_start = first.span_end + gap[..b_start].chars().count();
                    let trigger_end = trigger_start + gap[b_start..b_end].chars().count();
                    let trigger = gap[b_start..b_end]
                        .trim_matches(|c: char| c.is_whitespace() || c == ',' || c == '-');
                    let trigger = if trigger.is_empty() {
                        pattern.predicate.phrase().to_string()
                    } else {
                        trigger.to_lowercase()
                    };

                    let (subject, object) = if pattern.reversed {
                        (second, first)
                    } else {
                        (first, second)
                    };
                    let relation = Relation::between(
                        subject,
                        object,
                        pattern.predicate,
                        ExtractionMethod::PatternMatch,
                        ctx.config.pattern_confidence,
                    )
                    .with_span(first.span_start, second.span_end)
                    .with_predicate_text(trigger)
                    .with_context(ctx.text.window(
                        first.span_start,
                        second.span_end,
                        ctx.config.context_window,
                    ))
                    .with_metadata("pattern", pattern.name.clone())
                    .with_metadata("trigger_start", trigger_start)
                    .with_metadata("trigger_end", trigger_end);
                    out.push(relation);
                }
            }
        }

        debug!(count = out.len(), "pattern strategy finished");
        out
    }
}
