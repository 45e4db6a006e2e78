//! Entity resolution.
//!
//! A mention's normalized value is looked up in the alias store, run through
//! label-specific heuristics and, when both score low, fuzzy matched against
//! a small node list. Candidates are merged by node id and the
//! [`ResolutionPolicy`] picks the winner.

mod candidate;
mod fuzzy;
mod heuristics;
mod knowledge;
mod policy;
mod record;
mod resolver;

pub use candidate::{Candidate, CandidateSet, CandidateSource};
pub use fuzzy::{FuzzyEntry, FuzzyMatcher, FuzzyScorer};
pub use heuristics::HeuristicRules;
pub use knowledge::{AliasEntry, AliasStore, AliasStoreBuilder, StaticAliasStore};
pub use policy::{Decision, ResolutionPolicy};
pub use record::{
    EntityResolution, ResolutionOutcome, ResolutionPayload, ResolutionStatus, ResolveMode,
};
pub use resolver::{EntityResolver, EntityResult};
