//! Dependency-parse seam.
//!
//! No language model ships with this crate. A parser is injected into the
//! relation extractor; its [`ParserCapabilities`] are read once at
//! construction and decide whether the dependency strategy runs at all.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ValidationError};

/// Coarse part-of-speech tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum PartOfSpeech {
    Verb,
    Aux,
    Noun,
    Propn,
    Pron,
    Adp,
    Det,
    Adj,
    Adv,
    Punct,
    Other,
}

/// Dependency labels the extractor cares about.
pub mod deps {
    /// Nominal subject.
    pub const NSUBJ: &str = "nsubj";
    /// Passive nominal subject.
    pub const NSUBJPASS: &str = "nsubjpass";
    /// Direct object.
    pub const DOBJ: &str = "dobj";
    /// Object of a preposition.
    pub const POBJ: &str = "pobj";
    /// Indirect object.
    pub const IOBJ: &str = "iobj";
    /// Prepositional modifier.
    pub const PREP: &str = "prep";
    /// Passive agent (`by ...`).
    pub const AGENT: &str = "agent";
}

/// One parsed token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Surface text.
    pub text: String,
    /// Character offset of the token in the source text.
    pub idx: usize,
    /// Lemma, lower-cased.
    pub lemma: String,
    /// Part of speech.
    pub pos: PartOfSpeech,
    /// Dependency label relative to `head`.
    pub dep: String,
    /// Index of the syntactic head; roots point at themselves.
    pub head: usize,
}

impl Token {
    /// Convenience constructor.
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        idx: usize,
        lemma: impl Into<String>,
        pos: PartOfSpeech,
        dep: impl Into<String>,
        head: usize,
    ) -> Self {
        Self {
            text: text.into(),
            idx,
            lemma: lemma.into().to_lowercase(),
            pos,
            dep: dep.into(),
            head,
        }
    }

    /// End character offset (exclusive).
    #[must_use]
    pub fn end(&self) -> usize {
        self.idx + self.text.chars().count()
    }

    /// Returns true for main verbs.
    #[must_use]
    pub fn is_verb(&self) -> bool {
        self.pos == PartOfSpeech::Verb
    }
}

/// Parser output: tokens with a dependency tree, plus sentence spans.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDoc {
    tokens: Vec<Token>,
    sentences: Vec<(usize, usize)>,
    children: Vec<Vec<usize>>,
}

impl ParsedDoc {
    /// Builds a document, validating that every head index is in range.
    ///
    /// `sentences` are character spans; pass an empty vector when the parser
    /// does not segment sentences.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DanglingHead`] when a head points past the
    /// token list.
    pub fn from_tokens(
        tokens: Vec<Token>,
        sentences: Vec<(usize, usize)>,
    ) -> Result<Self, ValidationError> {
        let len = tokens.len();
        let mut children = vec![Vec::new(); len];
        for (i, token) in tokens.iter().enumerate() {
            if token.head >= len {
                return Err(ValidationError::DanglingHead {
                    token: i,
                    head: token.head,
                    len,
                });
            }
            if token.head != i {
                children[token.head].push(i);
            }
        }
        Ok(Self {
            tokens,
            sentences,
            children,
        })
    }

    /// All tokens in document order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Sentence spans (character offsets). May be empty.
    #[must_use]
    pub fn sentences(&self) -> &[(usize, usize)] {
        &self.sentences
    }

    /// Direct dependents of token `i`.
    #[must_use]
    pub fn children(&self, i: usize) -> &[usize] {
        match self.children.get(i) {
            Some(children) => children,
            None => &[],
        }
    }
}

/// What a parser can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserCapabilities {
    /// Tokens carry dependency labels and heads.
    pub dependency_parse: bool,
    /// Documents carry sentence spans.
    pub sentence_boundaries: bool,
}

/// Dependency parser interface.
///
/// Implementations are shared across calls; callers that wrap a
/// thread-unsafe model must serialize access inside `parse`.
pub trait DependencyParser: Send + Sync {
    /// Name of the parser (for logs).
    fn name(&self) -> &str;

    /// Capabilities, read once by the extractor at construction.
    fn capabilities(&self) -> ParserCapabilities;

    /// Parses a text.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the backend fails.
    fn parse(&self, text: &str) -> Result<ParsedDoc, ParseError>;
}

/// Parser serving documents parsed ahead of time, keyed by their text.
///
/// Useful when the ingestion pipeline already ran a model over the document.
#[derive(Debug, Default)]
pub struct PrecomputedParser {
    docs: RwLock<HashMap<String, ParsedDoc>>,
}

impl PrecomputedParser {
    /// Creates an empty parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the parse of `text`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Backend`] if the internal lock is poisoned.
    pub fn insert(&self, text: impl Into<String>, doc: ParsedDoc) -> Result<(), ParseError> {
        let mut docs = self.docs.write().map_err(|_| ParseError::Backend {
            message: "poisoned lock: precomputed.insert".to_string(),
        })?;
        docs.insert(text.into(), doc);
        Ok(())
    }
}

impl DependencyParser for PrecomputedParser {
    fn name(&self) -> &str {
        "precomputed"
    }

    fn capabilities(&self) -> ParserCapabilities {
        ParserCapabilities {
            dependency_parse: true,
            sentence_boundaries: true,
        }
    }

    fn parse(&self, text: &str) -> Result<ParsedDoc, ParseError> {
        let docs = self.docs.read().map_err(|_| ParseError::Backend {
            message: "poisoned lock: precomputed.parse".to_string(),
        })?;
        docs.get(text).cloned().ok_or_else(|| ParseError::Backend {
            message: format!("no precomputed parse for text of {} bytes", text.len()),
        })
    }
}
