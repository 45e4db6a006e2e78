//! Storage contracts the resolver depends on.
//!
//! Two tables keyed by mention id: the mentions themselves, written by the
//! ingestion pipeline, and their resolutions, written by the resolver. A
//! resolution's `entity_id` is both its key and a foreign key to a mention.

use thiserror::Error;
use uuid::Uuid;

use crate::mention::{EntityMention, MentionId};
use crate::resolution::EntityResolution;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Mention not found.
    #[error("Mention not found: {0}")]
    MentionNotFound(MentionId),

    /// Resolution row references a mention that does not exist.
    #[error("Foreign key violation: no mention {0}")]
    ForeignKeyViolation(MentionId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Row rejected before writing.
    #[error("Invalid row: {0}")]
    InvalidRow(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Storage trait for entity mentions.
pub trait MentionStore: Send + Sync {
    /// Insert a mention. Returns error if the id already exists.
    fn insert(&self, mention: EntityMention) -> Result<(), StorageError>;

    /// Get a mention by id.
    fn get(&self, id: MentionId) -> Result<Option<EntityMention>, StorageError>;

    /// All mentions of a document, ordered by span start.
    fn list_by_doc(&self, doc_id: Uuid) -> Result<Vec<EntityMention>, StorageError>;

    /// Number of stored mentions.
    fn len(&self) -> Result<usize, StorageError>;

    /// Returns true when no mentions are stored.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

/// Storage trait for entity resolutions.
///
/// # Write semantics
/// - `mark_processing` is written through immediately so concurrent readers
///   see that a resolution is under way.
/// - `commit` applies a batch of final rows atomically: either every row is
///   written or none is.
/// - `restore` undoes `mark_processing` when a batch fails to commit.
/// - Rows are updated in place; only a marker created by a failed batch is
///   ever removed. Concurrent batches touching the same ids race; the last
///   commit wins.
pub trait ResolutionStore: Send + Sync {
    /// Get the resolution of a mention.
    fn get(&self, entity_id: MentionId) -> Result<Option<EntityResolution>, StorageError>;

    /// Load or create the row for `entity_id` and set it to `processing`.
    ///
    /// Returns the row as it was before the update, if any.
    ///
    /// # Errors
    /// - `ForeignKeyViolation`: the mention does not exist
    fn mark_processing(
        &self,
        entity_id: MentionId,
    ) -> Result<Option<EntityResolution>, StorageError>;

    /// Put back the row `mark_processing` replaced. `None` removes the row.
    ///
    /// # Errors
    /// - `BackendError`: the store could not be written
    fn restore(
        &self,
        entity_id: MentionId,
        previous: Option<EntityResolution>,
    ) -> Result<(), StorageError>;

    /// Write all rows in one atomic step.
    ///
    /// # Errors
    /// - `ForeignKeyViolation`: any row references a missing mention
    /// - `InvalidRow`: duplicate ids within the batch
    fn commit(&self, rows: Vec<EntityResolution>) -> Result<(), StorageError>;

    /// All rows, ordered by entity id.
    fn list(&self) -> Result<Vec<EntityResolution>, StorageError>;
}
