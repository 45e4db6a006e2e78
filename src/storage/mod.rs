//! Storage traits and the in-memory backend.
//!
//! The resolver only talks to the traits; any relational store providing
//! get-by-key, insert and an atomic batch commit can stand in.

mod memory;
mod traits;

pub use memory::{InMemoryMentionStore, InMemoryResolutionStore, InMemoryStores};
pub use traits::{MentionStore, ResolutionStore, StorageError};
