//! In-memory storage backend.
//!
//! Thread-safe implementations of the storage traits, intended for embedded
//! usage, tests and the CLI.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::mention::{EntityMention, MentionId};
use crate::resolution::{EntityResolution, ResolutionStatus};
use crate::storage::traits::{MentionStore, ResolutionStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct MentionState {
    by_id: HashMap<MentionId, EntityMention>,
    by_doc: HashMap<Uuid, HashSet<MentionId>>,
}

/// Thread-safe in-memory mention store.
#[derive(Debug, Default)]
pub struct InMemoryMentionStore {
    state: RwLock<MentionState>,
}

impl InMemoryMentionStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts every mention, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first insert error.
    pub fn insert_all(
        &self,
        mentions: impl IntoIterator<Item = EntityMention>,
    ) -> Result<usize, StorageError> {
        let mut count = 0;
        for mention in mentions {
            self.insert(mention)?;
            count += 1;
        }
        Ok(count)
    }
}

impl MentionStore for InMemoryMentionStore {
    fn insert(&self, mention: EntityMention) -> Result<(), StorageError> {
        mention
            .validate()
            .map_err(|e| StorageError::InvalidRow(e.to_string()))?;

        let mut state = self.state.write().map_err(|_| lock_err("mention.insert"))?;
        if state.by_id.contains_key(&mention.id) {
            return Err(StorageError::DuplicateKey(mention.id.to_string()));
        }
        if let Some(doc_id) = mention.doc_id {
            state.by_doc.entry(doc_id).or_default().insert(mention.id);
        }
        state.by_id.insert(mention.id, mention);
        Ok(())
    }

    fn get(&self, id: MentionId) -> Result<Option<EntityMention>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("mention.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn list_by_doc(&self, doc_id: Uuid) -> Result<Vec<EntityMention>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("mention.list_by_doc"))?;
        let Some(ids) = state.by_doc.get(&doc_id) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<EntityMention> = ids
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect();
        results.sort_by_key(|m| (m.span_start, m.span_end, m.id));
        Ok(results)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("mention.len"))?;
        Ok(state.by_id.len())
    }
}

/// Thread-safe in-memory resolution store.
///
/// When built with [`InMemoryResolutionStore::with_mentions`], every write
/// checks that the referenced mention exists.
#[derive(Default)]
pub struct InMemoryResolutionStore {
    rows: RwLock<BTreeMap<MentionId, EntityResolution>>,
    mentions: Option<Arc<dyn MentionStore>>,
}

impl std::fmt::Debug for InMemoryResolutionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryResolutionStore")
            .field("rows", &self.rows)
            .field("foreign_keys", &self.mentions.is_some())
            .finish()
    }
}

impl InMemoryResolutionStore {
    /// Create a new empty store without foreign-key checks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store whose rows must reference `mentions`.
    #[must_use]
    pub fn with_mentions(mentions: Arc<dyn MentionStore>) -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            mentions: Some(mentions),
        }
    }

    /// Number of rows in each status.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the lock is poisoned.
    pub fn count_by_status(&self) -> Result<BTreeMap<&'static str, usize>, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("resolution.count_by_status"))?;
        let mut counts = BTreeMap::new();
        for row in rows.values() {
            *counts.entry(row.status.as_str()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn check_foreign_key(&self, entity_id: MentionId) -> Result<(), StorageError> {
        match &self.mentions {
            Some(mentions) if mentions.get(entity_id)?.is_none() => {
                Err(StorageError::ForeignKeyViolation(entity_id))
            }
            _ => Ok(()),
        }
    }
}

impl ResolutionStore for InMemoryResolutionStore {
    fn get(&self, entity_id: MentionId) -> Result<Option<EntityResolution>, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("resolution.get"))?;
        Ok(rows.get(&entity_id).cloned())
    }

    fn mark_processing(
        &self,
        entity_id: MentionId,
    ) -> Result<Option<EntityResolution>, StorageError> {
        self.check_foreign_key(entity_id)?;

        let mut rows = self.rows.write().map_err(|_| lock_err("resolution.mark_processing"))?;
        let previous = rows.get(&entity_id).cloned();
        let row = rows
            .entry(entity_id)
            .or_insert_with(|| EntityResolution::processing(entity_id));
        row.status = ResolutionStatus::Processing;
        row.updated_at = Utc::now();
        Ok(previous)
    }

    fn restore(
        &self,
        entity_id: MentionId,
        previous: Option<EntityResolution>,
    ) -> Result<(), StorageError> {
        let mut rows = self.rows.write().map_err(|_| lock_err("resolution.restore"))?;
        match previous {
            Some(row) => {
                rows.insert(entity_id, row);
            }
            None => {
                rows.remove(&entity_id);
            }
        }
        Ok(())
    }

    fn commit(&self, rows: Vec<EntityResolution>) -> Result<(), StorageError> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.entity_id) {
                return Err(StorageError::InvalidRow(format!(
                    "entity {} appears twice in one commit",
                    row.entity_id
                )));
            }
            if matches!(row.status, ResolutionStatus::Missing | ResolutionStatus::InvalidId) {
                return Err(StorageError::InvalidRow(format!(
                    "status {} is not persisted (entity {})",
                    row.status, row.entity_id
                )));
            }
            self.check_foreign_key(row.entity_id)?;
        }

        let mut stored = self.rows.write().map_err(|_| lock_err("resolution.commit"))?;
        for row in rows {
            stored.insert(row.entity_id, row);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<EntityResolution>, StorageError> {
        let rows = self.rows.read().map_err(|_| lock_err("resolution.list"))?;
        Ok(rows.values().cloned().collect())
    }
}

/// Convenience bundle: a mention store and a resolution store wired with
/// foreign-key checks against it.
#[derive(Debug, Clone)]
pub struct InMemoryStores {
    /// Mention store.
    pub mentions: Arc<InMemoryMentionStore>,
    /// Resolution store.
    pub resolutions: Arc<InMemoryResolutionStore>,
}

impl InMemoryStores {
    /// Create a new bundle.
    #[must_use]
    pub fn new() -> Self {
        let mentions = Arc::new(InMemoryMentionStore::new());
        let resolutions = Arc::new(InMemoryResolutionStore::with_mentions(
            Arc::clone(&mentions) as Arc<dyn MentionStore>
        ));
        Self {
            mentions,
            resolutions,
        }
    }
}

impl Default for InMemoryStores {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mention::EntityLabel;

    fn mention(value: &str, start: usize) -> EntityMention {
        EntityMention::new(EntityLabel::Org, value, start, start + value.len())
    }

    #[test]
    fn mention_insert_get_and_doc_index() {
        let store = InMemoryMentionStore::new();
        let doc = Uuid::new_v4();

        let later = mention("Acme", 20).with_doc(doc);
        let earlier = mention("Globex", 3).with_doc(doc);
        let orphan = mention("Initech", 0);

        store.insert(later.clone()).unwrap();
        store.insert(earlier.clone()).unwrap();
        store.insert(orphan.clone()).unwrap();
        assert!(matches!(store.insert(later.clone()), Err(StorageError::DuplicateKey(_))));

        assert_eq!(store.get(orphan.id).unwrap(), Some(orphan));
        assert_eq!(store.len().unwrap(), 3);

        let listed = store.list_by_doc(doc).unwrap();
        assert_eq!(listed, vec![earlier, later]);
        assert!(store.list_by_doc(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn mention_insert_rejects_invalid_rows() {
        let store = InMemoryMentionStore::new();
        let inverted = EntityMention::new(EntityLabel::Org, "Acme", 9, 2);
        assert!(matches!(store.insert(inverted), Err(StorageError::InvalidRow(_))));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn mark_processing_creates_and_resets_rows() {
        let stores = InMemoryStores::new();
        let m = mention("Acme", 0);
        stores.mentions.insert(m.clone()).unwrap();

        assert!(stores.resolutions.mark_processing(m.id).unwrap().is_none());
        let row = stores.resolutions.get(m.id).unwrap().unwrap();
        assert_eq!(row.status, ResolutionStatus::Processing);

        let mut done = row.clone();
        done.status = ResolutionStatus::Resolved;
        done.node_id = Some("org:acme".to_string());
        done.score = Some(0.9);
        stores.resolutions.commit(vec![done.clone()]).unwrap();

        let previous = stores.resolutions.mark_processing(m.id).unwrap().unwrap();
        assert_eq!(previous.status, ResolutionStatus::Resolved);
        let reset = stores.resolutions.get(m.id).unwrap().unwrap();
        assert_eq!(reset.status, ResolutionStatus::Processing);
        // Earlier decision stays visible until the next commit overwrites it.
        assert_eq!(reset.node_id.as_deref(), Some("org:acme"));
    }

    #[test]
    fn restore_undoes_processing_markers() {
        let stores = InMemoryStores::new();
        let fresh = mention("Acme", 0);
        let decided = mention("Globex", 10);
        stores.mentions.insert(fresh.clone()).unwrap();
        stores.mentions.insert(decided.clone()).unwrap();

        let mut done = EntityResolution::processing(decided.id);
        done.status = ResolutionStatus::Unmatched;
        stores.resolutions.commit(vec![done.clone()]).unwrap();

        let before_fresh = stores.resolutions.mark_processing(fresh.id).unwrap();
        let before_decided = stores.resolutions.mark_processing(decided.id).unwrap();
        stores.resolutions.restore(fresh.id, before_fresh).unwrap();
        stores.resolutions.restore(decided.id, before_decided).unwrap();

        assert!(stores.resolutions.get(fresh.id).unwrap().is_none());
        assert_eq!(stores.resolutions.get(decided.id).unwrap(), Some(done));
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let stores = InMemoryStores::new();
        let ghost = MentionId::new();
        assert!(matches!(
            stores.resolutions.mark_processing(ghost),
            Err(StorageError::ForeignKeyViolation(id)) if id == ghost
        ));

        let unchecked = InMemoryResolutionStore::new();
        assert!(unchecked.mark_processing(ghost).is_ok());
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let stores = InMemoryStores::new();
        let m = mention("Acme", 0);
        stores.mentions.insert(m.clone()).unwrap();

        let mut good = EntityResolution::processing(m.id);
        good.status = ResolutionStatus::Unmatched;
        let bad = EntityResolution::processing(MentionId::new());

        assert!(stores.resolutions.commit(vec![good.clone(), bad]).is_err());
        assert!(stores.resolutions.get(m.id).unwrap().is_none());

        assert!(matches!(
            stores.resolutions.commit(vec![good.clone(), good.clone()]),
            Err(StorageError::InvalidRow(_))
        ));

        stores.resolutions.commit(vec![good]).unwrap();
        let counts = stores.resolutions.count_by_status().unwrap();
        assert_eq!(counts.get("unmatched"), Some(&1));
        assert_eq!(stores.resolutions.list().unwrap().len(), 1);
    }
}
