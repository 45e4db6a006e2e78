//! # doc-entities
//!
//! Relation extraction and entity resolution over entity mentions found in
//! documents by an upstream tagger.
//!
//! ## Core Concepts
//!
//! - **Entity mention**: a labelled span of text (`PERSON`, `ORG`, `GPE`, ...)
//! - **Relation**: a typed, directed link between two mentions, tagged with
//!   the strategy that found it
//! - **Resolution**: the mapping of a mention to a knowledge-base node with a
//!   score and a status
//! - **Candidate**: a possible node for a mention before the policy picks one
//!
//! ## Usage
//!
//! ```rust
//! use doc_entities::{
//!     EntityLabel, EntityMention, EntityResolver, InMemoryStores, MentionStore, Predicate,
//!     RelationExtractor, ResolutionStatus, ResolveMode,
//! };
//!
//! let text = "Barack Obama worked at Apple Inc. in New York City.";
//! let person = EntityMention::new(EntityLabel::Person, "Barack Obama", 0, 12);
//! let org = EntityMention::new(EntityLabel::Org, "Apple Inc.", 23, 33);
//!
//! let extractor = RelationExtractor::new();
//! let relations = extractor.extract_relations(text, &[person.clone(), org]);
//! assert_eq!(relations[0].predicate, Predicate::WorksAt);
//!
//! let stores = InMemoryStores::new();
//! stores.mentions.insert(person.clone())?;
//! let resolver = EntityResolver::new(stores.mentions.clone(), stores.resolutions.clone());
//! let payloads = resolver.resolve_entities(&[person.id.to_string()], ResolveMode::Sync)?;
//! assert_eq!(payloads[0].status, ResolutionStatus::Resolved);
//! # Ok::<(), doc_entities::StorageError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod config;
pub mod error;
pub mod mention;
pub mod relation;
pub mod text;

// Extraction
pub mod extraction;
pub mod parse;

// Resolution, storage and metrics
pub mod metrics;
pub mod resolution;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use config::{ExtractorConfig, ResolverConfig};
pub use error::{ConfigError, DocEntitiesError, ParseError, ResolveFault, ValidationError};
pub use mention::{EntityLabel, EntityMention, LabelFamily, MentionId};
pub use relation::{ExtractionMethod, Predicate, Relation, RelationKey};

pub use extraction::{
    deduplicate, CooccurrenceStrategy, DependencyStrategy, PatternStrategy, RelationExtractor,
    RelationExtractorBuilder, RelationStrategy,
};
pub use parse::{DependencyParser, ParsedDoc, ParserCapabilities, PrecomputedParser, Token};

pub use metrics::{FacadeMetrics, InMemoryMetrics, NoopMetrics, ResolutionMetrics};
pub use resolution::{
    AliasStore, Candidate, CandidateSource, EntityResolution, EntityResolver, FuzzyScorer,
    ResolutionPayload, ResolutionStatus, ResolveMode, StaticAliasStore,
};
pub use storage::{
    InMemoryMentionStore, InMemoryResolutionStore, InMemoryStores, MentionStore,
    ResolutionStore, StorageError,
};
