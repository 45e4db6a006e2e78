//! Alias knowledge base.

use std::collections::{BTreeMap, BTreeSet};

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::mention::EntityLabel;
use crate::resolution::{Candidate, CandidateSource};
use crate::text::normalize_value;

/// Exact alias lookup over a versioned table of knowledge-base nodes.
pub trait AliasStore: Send + Sync {
    /// Candidates whose alias equals `normalized` and whose type is
    /// compatible with `label` (any type when `label` is `None`).
    fn lookup(&self, normalized: &str, label: Option<&EntityLabel>) -> Vec<Candidate>;

    /// Stable fingerprint of the table contents.
    fn version(&self) -> String;
}

/// One knowledge-base node with its aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Node id.
    pub node_id: String,
    /// Node type.
    #[serde(rename = "type")]
    pub kind: EntityLabel,
    /// Display name.
    pub name: String,
    /// Normalized aliases.
    pub aliases: BTreeSet<String>,
    /// Score given to an alias hit.
    pub confidence: f32,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AliasEntry {
    /// Creates an entry; the display name is registered as an alias.
    #[must_use]
    pub fn new(
        node_id: impl Into<String>,
        kind: EntityLabel,
        name: impl Into<String>,
        confidence: f32,
    ) -> Self {
        let name = name.into();
        let mut aliases = BTreeSet::new();
        let normalized = normalize_value(&name);
        if !normalized.is_empty() {
            aliases.insert(normalized);
        }
        Self {
            node_id: node_id.into(),
            kind,
            name,
            aliases,
            confidence: confidence.clamp(0.0, 1.0),
            description: None,
        }
    }

    /// Adds an alias, normalized.
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        let normalized = normalize_value(alias);
        if !normalized.is_empty() {
            self.aliases.insert(normalized);
        }
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn accepts(&self, label: Option<&EntityLabel>) -> bool {
        label.map_or(true, |l| l.family() == self.kind.family())
    }

    fn candidate(&self) -> Candidate {
        let candidate = Candidate::new(
            self.node_id.clone(),
            self.name.clone(),
            self.kind.as_str(),
            self.confidence,
            CandidateSource::AliasMatch,
        );
        match &self.description {
            Some(d) => candidate.with_description(d.clone()),
            None => candidate,
        }
    }
}

fn default_entries() -> Vec<AliasEntry> {
    use crate::mention::EntityLabel::{Gpe, Org, Person};

    vec![
        AliasEntry::new("person:barack-obama", Person, "Barack Obama", 0.95)
            .with_alias("obama")
            .with_alias("president obama")
            .with_alias("barack h obama")
            .with_alias("barack hussein obama")
            .with_description("44th President of the United States"),
        AliasEntry::new("person:michelle-obama", Person, "Michelle Obama", 0.95)
            .with_alias("michelle robinson obama")
            .with_description("Former First Lady of the United States"),
        AliasEntry::new("person:tim-cook", Person, "Tim Cook", 0.93)
            .with_alias("timothy cook")
            .with_alias("timothy d cook")
            .with_description("Chief executive of Apple"),
        AliasEntry::new("person:satya-nadella", Person, "Satya Nadella", 0.93)
            .with_alias("nadella"),
        AliasEntry::new("org:apple-inc", Org, "Apple Inc.", 0.9)
            .with_alias("apple")
            .with_alias("apple computer")
            .with_alias("apple computer inc")
            .with_description("Consumer electronics company"),
        AliasEntry::new("org:microsoft", Org, "Microsoft Corporation", 0.9)
            .with_alias("microsoft")
            .with_alias("microsoft corp")
            .with_alias("msft"),
        AliasEntry::new("org:alphabet-inc", Org, "Alphabet Inc.", 0.9)
            .with_alias("alphabet")
            .with_alias("google")
            .with_alias("google llc"),
        AliasEntry::new("org:amazon", Org, "Amazon.com, Inc.", 0.9)
            .with_alias("amazon")
            .with_alias("amazoncom"),
        AliasEntry::new("org:united-nations", Org, "United Nations", 0.9)
            .with_alias("un")
            .with_alias("the united nations"),
        AliasEntry::new("gpe:new-york-city", Gpe, "New York City", 0.9)
            .with_alias("nyc")
            .with_alias("new york")
            .with_alias("the big apple"),
        AliasEntry::new("gpe:united-states", Gpe, "United States", 0.9)
            .with_alias("us")
            .with_alias("usa")
            .with_alias("united states of america")
            .with_alias("america"),
        AliasEntry::new("gpe:paris", Gpe, "Paris", 0.85),
        AliasEntry::new("gpe:london", Gpe, "London", 0.85),
        AliasEntry::new("gpe:san-francisco", Gpe, "San Francisco", 0.88)
            .with_alias("sf"),
    ]
}

/// Alias store backed by an in-process table.
///
/// The table is fixed after construction. Entries are scanned in node-id
/// order, so lookups are deterministic.
#[derive(Debug, Clone)]
pub struct StaticAliasStore {
    entries: BTreeMap<String, AliasEntry>,
    version: String,
}

impl StaticAliasStore {
    /// Store with the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().with_default_entries().build()
    }

    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> AliasStoreBuilder {
        AliasStoreBuilder::default()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a node id.
    #[must_use]
    pub fn entry(&self, node_id: &str) -> Option<&AliasEntry> {
        self.entries.get(node_id)
    }

    fn fingerprint(entries: &BTreeMap<String, AliasEntry>) -> String {
        let mut h = Hasher::new();
        for entry in entries.values() {
            h.update(entry.node_id.as_bytes());
            h.update(&[0]);
            h.update(entry.kind.as_str().as_bytes());
            h.update(&[0]);
            h.update(entry.name.as_bytes());
            h.update(&[0]);
            h.update(&entry.confidence.to_le_bytes());
            for alias in &entry.aliases {
                h.update(alias.as_bytes());
                h.update(&[1]);
            }
            h.update(&[0xff]);
        }
        let hash = h.finalize();
        hash.to_hex().as_str()[..16].to_string()
    }
}

impl Default for StaticAliasStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasStore for StaticAliasStore {
    fn lookup(&self, normalized: &str, label: Option<&EntityLabel>) -> Vec<Candidate> {
        if normalized.is_empty() {
            return Vec::new();
        }
        self.entries
            .values()
            .filter(|e| e.aliases.contains(normalized) && e.accepts(label))
            .map(AliasEntry::candidate)
            .collect()
    }

    fn version(&self) -> String {
        self.version.clone()
    }
}

/// Builder for [`StaticAliasStore`].
#[derive(Debug, Clone, Default)]
pub struct AliasStoreBuilder {
    entries: BTreeMap<String, AliasEntry>,
}

impl AliasStoreBuilder {
    /// Adds the built-in table. Entries added earlier with the same node id
    /// are replaced.
    #[must_use]
    pub fn with_default_entries(mut self) -> Self {
        for entry in default_entries() {
            self.entries.insert(entry.node_id.clone(), entry);
        }
        self
    }

    /// Adds or replaces an entry.
    #[must_use]
    pub fn with_entry(mut self, entry: AliasEntry) -> Self {
        self.entries.insert(entry.node_id.clone(), entry);
        self
    }

    /// Removes an entry.
    #[must_use]
    pub fn without(mut self, node_id: &str) -> Self {
        self.entries.remove(node_id);
        self
    }

    /// Freezes the table and computes its version.
    #[must_use]
    pub fn build(self) -> StaticAliasStore {
        let version = StaticAliasStore::fingerprint(&self.entries);
        StaticAliasStore {
            entries: self.entries,
            version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_lookup_with_label() {
        let store = StaticAliasStore::new();
        let hits = store.lookup("barack obama", Some(&EntityLabel::Person));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node_id, "person:barack-obama");
        assert!(hits[0].score >= 0.9);
        assert_eq!(hits[0].source, CandidateSource::AliasMatch);
        assert!(!hits[0].fuzzy_match);

        assert!(store.lookup("barack obama", Some(&EntityLabel::Org)).is_empty());
        assert_eq!(store.lookup("obama", None).len(), 1);
    }

    #[test]
    fn test_place_family_matches_loc() {
        let store = StaticAliasStore::new();
        let hits = store.lookup("nyc", Some(&EntityLabel::Loc));
        assert_eq!(hits[0].node_id, "gpe:new-york-city");
    }

    #[test]
    fn test_aliases_are_normalized() {
        let entry = AliasEntry::new("org:acme", EntityLabel::Org, "ACME, Inc.", 0.8)
            .with_alias("  Acme   Corp ");
        assert!(entry.aliases.contains("acme inc"));
        assert!(entry.aliases.contains("acme corp"));
    }

    #[test]
    fn test_version_tracks_contents() {
        let a = StaticAliasStore::new();
        let b = StaticAliasStore::new();
        assert_eq!(a.version(), b.version());
        assert_eq!(a.version().len(), 16);

        let extended = StaticAliasStore::builder()
            .with_default_entries()
            .with_entry(AliasEntry::new("org:acme", EntityLabel::Org, "Acme", 0.8))
            .build();
        assert_ne!(a.version(), extended.version());
        assert_eq!(extended.len(), a.len() + 1);

        let trimmed = StaticAliasStore::builder()
            .with_default_entries()
            .without("gpe:paris")
            .build();
        assert!(trimmed.entry("gpe:paris").is_none());
        assert!(trimmed.lookup("paris", None).is_empty());
    }
}
