// Learning system: per-user memory stores behind one async service
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};

use crate::config::{Config, GatingConfig, ScoringConfig};
use crate::errors::{Result, SymptomError};
use crate::gating::{Gated, GatingPolicy, Subject};
use crate::memory::types::{FeedbackEvent, MemoryRecord, MemorySummary, Observation};
use crate::memory::{MemoryQuery, MemoryStore};
use crate::recommend::{
    LogRepository, ProtocolCandidate, RankedRecommendation, RecommendationRequest,
    RecommendationScorer,
};
use crate::session::persistence::{MemoryPersistence, PersistenceConfig};

/// Learning system configuration
#[derive(Debug, Clone)]
pub struct LearningConfig {
    /// Where to persist memory; `None` keeps everything in memory
    pub persistence: Option<PersistenceConfig>,
    /// Persist a user's memory after every mutation
    pub auto_save: bool,
    pub scoring: ScoringConfig,
    pub gating: GatingConfig,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            persistence: Some(PersistenceConfig::default()),
            auto_save: true,
            scoring: ScoringConfig::default(),
            gating: GatingConfig::default(),
        }
    }
}

impl LearningConfig {
    /// In-memory configuration, nothing touches disk
    pub fn ephemeral() -> Self {
        Self {
            persistence: None,
            auto_save: false,
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            persistence: Some(PersistenceConfig::from(&config.storage)),
            auto_save: config.storage.auto_save,
            scoring: config.scoring.clone(),
            gating: config.gating.clone(),
        }
    }
}

type Partition = Arc<Mutex<MemoryStore>>;

/// Per-user learning service.
///
/// Each user's store sits behind its own mutex, so every event is applied
/// as one unit and concurrent upserts to the same key never lose an
/// increment. Different users proceed independently.
pub struct LearningSystem {
    partitions: RwLock<HashMap<String, Partition>>,
    persistence: Option<MemoryPersistence>,
    scorer: RecommendationScorer,
    gating: GatingPolicy,
    auto_save: bool,
}

impl LearningSystem {
    /// Create new learning system
    pub fn new(config: LearningConfig) -> Result<Self> {
        let persistence = match &config.persistence {
            Some(persistence_config) => Some(
                MemoryPersistence::new(persistence_config.clone())
                    .map_err(|e| SymptomError::PersistenceError(format!("{:#}", e)))?,
            ),
            None => None,
        };

        Ok(Self {
            partitions: RwLock::new(HashMap::new()),
            persistence,
            scorer: RecommendationScorer::with_config(config.scoring),
            gating: GatingPolicy::with_config(&config.gating),
            auto_save: config.auto_save,
        })
    }

    /// Learning system that never touches disk
    pub fn in_memory() -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            persistence: None,
            scorer: RecommendationScorer::new(),
            gating: GatingPolicy::new(),
            auto_save: false,
        }
    }

    pub fn gating(&self) -> &GatingPolicy {
        &self.gating
    }

    /// Record an observation for a user
    pub async fn observe(&self, user: &str, observation: Observation) -> Result<MemoryRecord> {
        if observation.is_empty() {
            return Err(SymptomError::InvalidObservation(
                "an observation needs a symptom, trigger or resolution".to_string(),
            ));
        }

        self.commit(user, |store| Ok(store.upsert(&observation).clone()))
            .await
    }

    /// Apply outcome or judgment feedback to one of a user's records
    pub async fn feedback(
        &self,
        user: &str,
        event: FeedbackEvent,
        at: DateTime<Utc>,
    ) -> Result<MemoryRecord> {
        self.commit(user, |store| {
            if let Some(record) = store.apply_feedback(&event, at) {
                return Ok(record.clone());
            }
            let id = event.record_id();
            Err(match store.get(&id) {
                Some(_) => SymptomError::RecordInactive { id },
                None => SymptomError::RecordNotFound { id },
            })
        })
        .await
    }

    /// Ungated summaries of a user's matching records, best first
    pub async fn summaries(
        &self,
        user: &str,
        query: &MemoryQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<MemorySummary>> {
        let partition = self.partition(user).await?;
        let store = partition.lock().await;
        Ok(store.summaries(query, now))
    }

    /// Summaries passed through the insufficient-data gate
    pub async fn insights(
        &self,
        user: &str,
        query: &MemoryQuery,
        now: DateTime<Utc>,
    ) -> Result<Gated<Vec<MemorySummary>>> {
        let partition = self.partition(user).await?;
        let store = partition.lock().await;

        let records = store.query(query, now);
        let subject = Subject::from_filters(query.symptom.as_deref(), query.trigger.as_deref());
        Ok(self.gating.gate_insights(&subject, &records, now))
    }

    /// Rank candidate protocols, fetching their usage history.
    ///
    /// A failed history read is logged and scored as "no history".
    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
        logs: &dyn LogRepository,
    ) -> Gated<Vec<RankedRecommendation>> {
        let target = &request.target_symptoms;
        let mut candidates = Vec::with_capacity(request.candidate_protocols.len());

        for definition in &request.candidate_protocols {
            if definition.symptoms.is_disjoint(target) {
                continue;
            }

            let usage_logs = match logs.usage_logs_for(&definition.id).await {
                Ok(usage_logs) => usage_logs,
                Err(e) => {
                    tracing::warn!(protocol = %definition.id, error = %e, "Usage logs unavailable");
                    Vec::new()
                }
            };
            candidates.push(ProtocolCandidate::new(definition.clone(), usage_logs));
        }

        let ranked = self.scorer.rank(target, &candidates);
        tracing::debug!(
            candidates = request.candidate_protocols.len(),
            ranked = ranked.len(),
            "Ranked protocols"
        );
        self.gating.gate_recommendations(target, ranked)
    }

    /// Deactivate everything learned for a user; returns records affected
    pub async fn reset(&self, user: &str) -> Result<usize> {
        self.commit(user, |store| {
            let affected = store.active_count();
            store.deactivate_all();
            Ok(affected)
        })
        .await
    }

    /// Persist a user's memory now, regardless of auto-save
    pub async fn save(&self, user: &str) -> Result<()> {
        let partition = self.partition(user).await?;
        let store = partition.lock().await;
        self.persist(user, &store)
    }

    /// Users with a loaded partition
    pub async fn loaded_users(&self) -> Vec<String> {
        let partitions = self.partitions.read().await;
        let mut users: Vec<String> = partitions.keys().cloned().collect();
        users.sort();
        users
    }

    /// Get or lazily load a user's partition
    async fn partition(&self, user: &str) -> Result<Partition> {
        {
            let partitions = self.partitions.read().await;
            if let Some(partition) = partitions.get(user) {
                return Ok(Arc::clone(partition));
            }
        }

        let mut partitions = self.partitions.write().await;
        // Another task may have loaded it between the two locks
        if let Some(partition) = partitions.get(user) {
            return Ok(Arc::clone(partition));
        }

        let records = match &self.persistence {
            Some(persistence) => persistence
                .load(user)
                .map_err(|e| SymptomError::PersistenceError(format!("{:#}", e)))?,
            None => Vec::new(),
        };

        let partition = Arc::new(Mutex::new(MemoryStore::from_records(records)));
        partitions.insert(user.to_string(), Arc::clone(&partition));
        Ok(partition)
    }

    /// Apply one mutation to a user's store as a single unit.
    ///
    /// With auto-save the mutation runs on a staged copy that replaces the
    /// live store only once it has been written, so a failed write leaves
    /// the partition exactly as it was.
    async fn commit<T>(
        &self,
        user: &str,
        apply: impl FnOnce(&mut MemoryStore) -> Result<T>,
    ) -> Result<T> {
        let partition = self.partition(user).await?;
        let mut store = partition.lock().await;

        if !self.auto_save || self.persistence.is_none() {
            return apply(&mut *store);
        }

        let mut staged = (*store).clone();
        let value = apply(&mut staged)?;
        self.persist(user, &staged)?;
        *store = staged;
        Ok(value)
    }

    fn persist(&self, user: &str, store: &MemoryStore) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };

        let records: Vec<MemoryRecord> = store.records().into_iter().cloned().collect();
        persistence
            .save(user, &records)
            .map_err(|e| SymptomError::PersistenceError(format!("{:#}", e)))?;
        Ok(())
    }
}
