use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::ResolverConfig;
use crate::error::ResolveFault;
use crate::mention::{EntityMention, MentionId};
use crate::metrics::{NoopMetrics, ResolutionMetrics};
use crate::resolution::{
    AliasStore, Candidate, CandidateSet, EntityResolution, FuzzyMatcher, HeuristicRules,
    ResolutionOutcome, ResolutionPayload, ResolutionPolicy, ResolutionStatus, ResolveMode,
    StaticAliasStore,
};
use crate::storage::{MentionStore, ResolutionStore, StorageError};
use crate::text::normalize_value;

/// Per-entity result of a batch.
pub type EntityResult = Result<ResolutionOutcome, ResolveFault>;

/// Maps entity mentions to knowledge-base nodes and persists the outcome.
///
/// A batch is processed in two steps. Each id is resolved on its own into an
/// [`EntityResult`]; faults stay inside that value. The successful outcomes
/// are then written with a single [`ResolutionStore::commit`], the only
/// failure that reaches the caller.
pub struct EntityResolver {
    mentions: Arc<dyn MentionStore>,
    resolutions: Arc<dyn ResolutionStore>,
    aliases: Arc<dyn AliasStore>,
    heuristics: HeuristicRules,
    fuzzy: FuzzyMatcher,
    policy: ResolutionPolicy,
    config: ResolverConfig,
    metrics: Arc<dyn ResolutionMetrics>,
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver")
            .field("config", &self.config)
            .field("kb_version", &self.aliases.version())
            .finish_non_exhaustive()
    }
}

impl EntityResolver {
    /// Resolver with the built-in alias table, default settings and no
    /// metrics.
    #[must_use]
    pub fn new(mentions: Arc<dyn MentionStore>, resolutions: Arc<dyn ResolutionStore>) -> Self {
        let config = ResolverConfig::default();
        Self {
            mentions,
            resolutions,
            aliases: Arc::new(StaticAliasStore::new()),
            heuristics: HeuristicRules::new(),
            fuzzy: FuzzyMatcher::new(config.fuzzy_scorer, config.fuzzy_threshold),
            policy: ResolutionPolicy::new(config.confidence_threshold, config.max_candidates),
            config,
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Replaces the settings. Also rebuilds the fuzzy matcher and policy.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.fuzzy = FuzzyMatcher::new(config.fuzzy_scorer, config.fuzzy_threshold);
        self.policy = ResolutionPolicy::new(config.confidence_threshold, config.max_candidates);
        self.config = config;
        self
    }

    /// Replaces the alias store.
    #[must_use]
    pub fn with_alias_store(mut self, aliases: Arc<dyn AliasStore>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Replaces the heuristic rules.
    #[must_use]
    pub fn with_heuristics(mut self, heuristics: HeuristicRules) -> Self {
        self.heuristics = heuristics;
        self
    }

    /// Replaces the fuzzy matcher. A later [`EntityResolver::with_config`]
    /// rebuilds it from the config.
    #[must_use]
    pub fn with_fuzzy_matcher(mut self, fuzzy: FuzzyMatcher) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// Sets the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn ResolutionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Active settings.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Candidates for one mention, in merge order.
    ///
    /// Alias and heuristic candidates come first. Fuzzy candidates are added
    /// only when fallback is enabled and the best score so far is below
    /// `fuzzy_trigger`. Duplicate nodes keep their highest score.
    #[must_use]
    pub fn find_candidates(&self, mention: &EntityMention) -> Vec<Candidate> {
        let normalized = normalize_value(&mention.value);
        let mut set = CandidateSet::new();

        set.extend(self.aliases.lookup(&normalized, Some(&mention.label)));
        set.extend(self.heuristics.candidates(mention, &normalized));

        let best = set.best_score().unwrap_or(0.0);
        if self.config.fuzzy_fallback && best < self.config.fuzzy_trigger {
            let fuzzy = self.fuzzy.search(
                &normalized,
                Some(mention.label.family()),
                self.config.max_candidates,
            );
            debug!(
                entity_id = %mention.id,
                best,
                fuzzy_hits = fuzzy.len(),
                "fuzzy fallback"
            );
            set.extend(fuzzy);
        }

        set.into_vec()
    }

    /// Resolves a batch of ids and commits the results once.
    ///
    /// Returns one payload per id occurrence that could be loaded, in input
    /// order; a repeated id is resolved again and stored once. Ids
    /// that are malformed or missing, or whose resolution failed, are omitted
    /// from the result but still counted in metrics.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] of the final commit. Nothing from the
    /// batch is persisted in that case; rows the batch marked `processing`
    /// are put back as they were.
    #[instrument(skip_all, fields(entities = entity_ids.len(), mode = %mode))]
    pub fn resolve_entities<S: AsRef<str>>(
        &self,
        entity_ids: &[S],
        mode: ResolveMode,
    ) -> Result<Vec<ResolutionPayload>, StorageError> {
        let started = Instant::now();
        self.metrics.record_run(mode);

        let results: Vec<EntityResult> = entity_ids
            .iter()
            .map(|id| self.resolve_one(id.as_ref()))
            .collect();

        let written = self.apply(&results)?;

        for result in &results {
            match result {
                Ok(outcome) => {
                    let status = outcome.status();
                    self.metrics.record_outcome(status.as_str());
                    if matches!(status, ResolutionStatus::Resolved | ResolutionStatus::Ambiguous) {
                        if let Some(score) = outcome.resolution.score {
                            self.metrics.observe_confidence(score);
                        }
                    }
                }
                Err(fault) => self.metrics.record_outcome(fault.label()),
            }
        }
        let elapsed = started.elapsed().as_secs_f64();
        self.metrics.observe_latency(mode, elapsed);

        let faults = results.iter().filter(|r| r.is_err()).count();
        info!(written, faults, elapsed_secs = elapsed, "resolution batch committed");

        Ok(results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(ResolutionOutcome::payload)
            .collect())
    }

    /// Resolves one id.
    ///
    /// # Errors
    ///
    /// Returns the [`StorageError`] of the commit.
    pub fn resolve_single_entity(
        &self,
        entity_id: &str,
    ) -> Result<Option<ResolutionPayload>, StorageError> {
        Ok(self
            .resolve_entities(&[entity_id], ResolveMode::Sync)?
            .into_iter()
            .next())
    }

    /// Persists the successful outcomes in one commit and returns how many
    /// rows were written.
    ///
    /// An id resolved more than once in the batch is written once, with its
    /// last outcome.
    ///
    /// # Errors
    ///
    /// Returns the commit's [`StorageError`]; no row is written then and the
    /// `processing` markers are replaced by the rows they displaced.
    pub fn apply(&self, results: &[EntityResult]) -> Result<usize, StorageError> {
        let outcomes: Vec<&ResolutionOutcome> =
            results.iter().filter_map(|r| r.as_ref().ok()).collect();

        let mut slots: HashMap<MentionId, usize> = HashMap::with_capacity(outcomes.len());
        let mut rows: Vec<EntityResolution> = Vec::with_capacity(outcomes.len());
        for outcome in &outcomes {
            let row = outcome.resolution.clone();
            match slots.get(&row.entity_id) {
                Some(&slot) => rows[slot] = row,
                None => {
                    slots.insert(row.entity_id, rows.len());
                    rows.push(row);
                }
            }
        }

        let count = rows.len();
        if let Err(err) = self.resolutions.commit(rows) {
            warn!(error = %err, rows = count, "commit failed, restoring previous rows");
            // Reverse order so a repeated id ends with the row from before
            // its first marker.
            for outcome in outcomes.iter().rev() {
                let entity_id = outcome.resolution.entity_id;
                if let Err(restore_err) =
                    self.resolutions.restore(entity_id, outcome.previous.clone())
                {
                    warn!(%entity_id, error = %restore_err, "could not restore row");
                }
            }
            return Err(err);
        }
        Ok(count)
    }

    /// Resolves one id without committing. The `processing` marker is
    /// written immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveFault`] describing why no resolution was produced.
    pub fn resolve_one(&self, raw_id: &str) -> EntityResult {
        let entity_id = MentionId::parse(raw_id).map_err(|e| {
            let fault = ResolveFault::InvalidId {
                raw: raw_id.to_string(),
                reason: e.to_string(),
            };
            warn!(entity_id = raw_id, error = %fault, "skipping entity");
            fault
        })?;

        let mention = match self.mentions.get(entity_id) {
            Ok(Some(mention)) => mention,
            Ok(None) => {
                warn!(%entity_id, "entity not found");
                return Err(ResolveFault::Missing { entity_id });
            }
            Err(e) => return Err(failed(entity_id, &e)),
        };

        let previous = self
            .resolutions
            .mark_processing(entity_id)
            .map_err(|e| failed(entity_id, &e))?;

        let candidates = self.find_candidates(&mention);
        let decision = self.policy.apply(candidates);
        debug!(
            %entity_id,
            status = %decision.status,
            node_id = decision.node_id.as_deref().unwrap_or(""),
            "entity resolved"
        );

        Ok(ResolutionOutcome {
            resolution: EntityResolution {
                entity_id,
                node_id: decision.node_id,
                score: decision.score,
                status: decision.status,
                candidates: decision.candidates,
                kb_version: Some(self.aliases.version()),
                updated_at: Utc::now(),
            },
            previous,
        })
    }
}

fn failed(entity_id: MentionId, error: &StorageError) -> ResolveFault {
    warn!(%entity_id, error = %error, "entity resolution failed");
    ResolveFault::Failed {
        entity_id,
        message: error.to_string(),
    }
}
