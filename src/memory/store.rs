//! Memory Store: keyed collection of memory records
//!
//! Records are keyed by (type, symptom, trigger, resolution). Only active
//! records take part in lookups; a reset deactivates everything and the
//! deactivated records are kept for audit history.

use crate::memory::confidence;
use crate::memory::types::{
    FeedbackEvent, MemoryId, MemoryKey, MemoryRecord, MemorySummary, MemoryType, Observation,
    Outcome, UserJudgment,
};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Filters for [`MemoryStore::query`]; `None` fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryQuery {
    pub symptom: Option<String>,
    pub trigger: Option<String>,
    pub memory_type: Option<MemoryType>,
}

impl MemoryQuery {
    pub fn for_symptom(symptom: impl Into<String>) -> Self {
        Self {
            symptom: Some(symptom.into()),
            ..Self::default()
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn with_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }
}

/// In-memory repository of learned associations
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// All records ever created, active or not
    records: HashMap<MemoryId, MemoryRecord>,
    /// Active record per key
    active_index: HashMap<MemoryKey, MemoryId>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted records.
    ///
    /// If persisted data holds more than one active record for a key, the
    /// most recently observed one stays active (lowest id on a tie) and the
    /// others are deactivated.
    pub fn from_records(records: Vec<MemoryRecord>) -> Self {
        let mut store = Self::new();
        for mut record in records {
            let id = record.id;
            if record.is_active {
                let key = record.key();
                let displaced = match store.active_index.get(&key).and_then(|id| store.records.get_mut(id)) {
                    Some(existing) if supersedes(&record, existing) => {
                        existing.is_active = false;
                        Some(existing.id)
                    }
                    Some(existing) => {
                        record.is_active = false;
                        Some(existing.id)
                    }
                    None => None,
                };
                if let Some(other) = displaced {
                    tracing::warn!(
                        record = %id,
                        other = %other,
                        "Duplicate active memory records for one key; keeping the most recent"
                    );
                }
                if record.is_active {
                    store.active_index.insert(key, id);
                }
            }
            store.records.insert(id, record);
        }
        store
    }

    /// Record an observation, creating the record on first sight
    pub fn upsert(&mut self, observation: &Observation) -> &MemoryRecord {
        let key = observation.key();

        if let Some(id) = self.active_index.get(&key).copied() {
            if let Some(record) = self.records.get_mut(&id) {
                confidence::record_occurrence(record, observation.timestamp);
                refresh_context(record, observation);
                tracing::debug!(
                    record = %id,
                    memory_type = %record.memory_type,
                    occurrences = record.occurrence_count,
                    confidence = record.confidence,
                    "Recorded occurrence"
                );
                return &self.records[&id];
            }
        }

        let record = confidence::new_record(observation);
        let id = record.id;
        tracing::debug!(
            record = %id,
            memory_type = %record.memory_type,
            symptom = ?record.symptom,
            "Created memory record"
        );
        self.active_index.insert(key, id);
        self.records.entry(id).or_insert(record)
    }

    /// Apply outcome or judgment feedback.
    ///
    /// Returns `None` when the record is unknown or inactive.
    pub fn apply_feedback(&mut self, event: &FeedbackEvent, at: DateTime<Utc>) -> Option<&MemoryRecord> {
        let record = self
            .records
            .get_mut(&event.record_id())
            .filter(|record| record.is_active)?;

        match event {
            FeedbackEvent::Outcome { outcome: Outcome::Success, .. } => {
                confidence::record_success(record, at)
            }
            FeedbackEvent::Outcome { outcome: Outcome::Failure, .. } => {
                confidence::record_failure(record, at)
            }
            FeedbackEvent::Judgment { user_judgment: UserJudgment::Confirm, .. } => {
                confidence::confirm_by_user(record, at)
            }
            FeedbackEvent::Judgment { user_judgment: UserJudgment::Deny, .. } => {
                confidence::deny_by_user(record, at)
            }
        }

        tracing::debug!(
            record = %record.id,
            confidence = record.confidence,
            successes = record.success_count,
            failures = record.failure_count,
            "Applied feedback"
        );
        Some(&*record)
    }

    /// Active records matching the query, best first.
    ///
    /// Ordered by decayed confidence descending, then most recent
    /// observation, then record id.
    pub fn query(&self, query: &MemoryQuery, now: DateTime<Utc>) -> Vec<&MemoryRecord> {
        let mut matches: Vec<(&MemoryRecord, f64)> = self
            .records
            .values()
            .filter(|record| record.is_active)
            .filter(|record| {
                record.matches(
                    query.symptom.as_deref(),
                    query.trigger.as_deref(),
                    query.memory_type,
                )
            })
            .map(|record| (record, confidence::decayed_confidence(record, now)))
            .collect();

        matches.sort_by(|(a, a_decayed), (b, b_decayed)| {
            b_decayed
                .partial_cmp(a_decayed)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.last_occurrence.cmp(&a.last_occurrence))
                .then_with(|| a.id.cmp(&b.id))
        });

        matches.into_iter().map(|(record, _)| record).collect()
    }

    /// Query and summarize in one step
    pub fn summaries(&self, query: &MemoryQuery, now: DateTime<Utc>) -> Vec<MemorySummary> {
        self.query(query, now)
            .into_iter()
            .map(|record| confidence::summarize(record, now))
            .collect()
    }

    /// Soft-delete every record
    pub fn deactivate_all(&mut self) {
        for record in self.records.values_mut() {
            record.is_active = false;
        }
        self.active_index.clear();
        tracing::info!(records = self.records.len(), "Deactivated all memory records");
    }

    /// Look up any record, active or not
    pub fn get(&self, id: &MemoryId) -> Option<&MemoryRecord> {
        self.records.get(id)
    }

    /// All records, active and inactive, ordered by creation time then id
    pub fn records(&self) -> Vec<&MemoryRecord> {
        let mut records: Vec<&MemoryRecord> = self.records.values().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }

    /// Total records including inactive ones
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of active records
    pub fn active_count(&self) -> usize {
        self.active_index.len()
    }
}

/// Whether `candidate` should replace `existing` as the active record of a key
fn supersedes(candidate: &MemoryRecord, existing: &MemoryRecord) -> bool {
    candidate
        .last_occurrence
        .cmp(&existing.last_occurrence)
        .then_with(|| existing.id.cmp(&candidate.id))
        == Ordering::Greater
}

/// Latest observation wins for the free-text context fields it supplies
fn refresh_context(record: &mut MemoryRecord, observation: &Observation) {
    if let Some(descriptor) = &observation.resolution_time_descriptor {
        record.resolution_time_descriptor = Some(descriptor.clone());
    }
    if let Some(factor) = &observation.environmental_factor {
        record.related_environmental_factor = Some(factor.clone());
    }
    if let Some(time_of_day) = &observation.time_of_day {
        record.related_time_of_day = Some(time_of_day.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn headache_trigger(trigger: &str, at: DateTime<Utc>) -> Observation {
        Observation::new(MemoryType::Trigger, at)
            .with_symptom("Headache")
            .with_trigger(trigger)
    }

    #[test]
    fn test_upsert_creates_then_increments() {
        let mut store = MemoryStore::new();
        let first_id = store.upsert(&headache_trigger("Red wine", t0())).id;
        let record = store.upsert(&headache_trigger("Red wine", t0() + Duration::days(1)));

        assert_eq!(record.id, first_id);
        assert_eq!(record.occurrence_count, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn test_upsert_distinguishes_keys() {
        let mut store = MemoryStore::new();
        store.upsert(&headache_trigger("Red wine", t0()));
        store.upsert(&headache_trigger("Bright light", t0()));
        store.upsert(
            &Observation::new(MemoryType::Pattern, t0())
                .with_symptom("Headache")
                .with_trigger("Red wine"),
        );
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_upsert_refreshes_context() {
        let mut store = MemoryStore::new();
        store.upsert(&headache_trigger("Red wine", t0()).with_time_of_day("evening"));
        let record = store.upsert(
            &headache_trigger("Red wine", t0()).with_environmental_factor("High humidity"),
        );
        assert_eq!(record.related_time_of_day.as_deref(), Some("evening"));
        assert_eq!(record.related_environmental_factor.as_deref(), Some("High humidity"));
    }

    #[test]
    fn test_query_filters_and_orders() {
        let mut store = MemoryStore::new();
        for _ in 0..5 {
            store.upsert(&headache_trigger("Red wine", t0()));
        }
        store.upsert(&headache_trigger("Bright light", t0()));
        store.upsert(
            &Observation::new(MemoryType::Trigger, t0())
                .with_symptom("Nausea")
                .with_trigger("Red wine"),
        );

        let results = store.query(&MemoryQuery::for_symptom("Headache"), t0());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].trigger.as_deref(), Some("Red wine"));

        let by_trigger = store.query(&MemoryQuery::default().with_trigger("Red wine"), t0());
        assert_eq!(by_trigger.len(), 2);

        let none = store.query(
            &MemoryQuery::for_symptom("Headache").with_type(MemoryType::WhatWorked),
            t0(),
        );
        assert!(none.is_empty());
    }

    #[test]
    fn test_query_prefers_recent_on_equal_decay() {
        let mut store = MemoryStore::new();
        store.upsert(&headache_trigger("Old", t0()));
        store.upsert(&headache_trigger("New", t0() + Duration::days(1)));

        // Both still at base confidence; decay separates them
        let results = store.query(&MemoryQuery::for_symptom("Headache"), t0() + Duration::days(2));
        assert_eq!(results[0].trigger.as_deref(), Some("New"));
    }

    #[test]
    fn test_query_tie_breaks_by_last_occurrence_then_id() {
        let mut store = MemoryStore::new();
        store.upsert(&headache_trigger("A", t0()));
        store.upsert(&headache_trigger("B", t0()));
        store.upsert(&headache_trigger("C", t0()));

        let now = t0();
        let first: Vec<MemoryId> = store
            .query(&MemoryQuery::for_symptom("Headache"), now)
            .iter()
            .map(|r| r.id)
            .collect();
        let mut sorted = first.clone();
        sorted.sort();
        assert_eq!(first, sorted);
    }

    #[test]
    fn test_apply_feedback() {
        let mut store = MemoryStore::new();
        let id = store
            .upsert(
                &Observation::new(MemoryType::WhatWorked, t0())
                    .with_symptom("Headache")
                    .with_resolution("Dark room"),
            )
            .id;

        let event = FeedbackEvent::Outcome {
            memory_record_id: id,
            outcome: Outcome::Success,
        };
        let record = store.apply_feedback(&event, t0()).unwrap();
        assert_eq!(record.success_count, 1);
        assert!((record.confidence - 0.60).abs() < 1e-9);

        let missing = FeedbackEvent::Judgment {
            memory_record_id: MemoryId::new_v4(),
            user_judgment: UserJudgment::Confirm,
        };
        assert!(store.apply_feedback(&missing, t0()).is_none());
    }

    #[test]
    fn test_deactivate_all_preserves_history() {
        let mut store = MemoryStore::new();
        let old_id = store.upsert(&headache_trigger("Red wine", t0())).id;
        store.deactivate_all();

        assert_eq!(store.len(), 1);
        assert_eq!(store.active_count(), 0);
        assert!(store.query(&MemoryQuery::default(), t0()).is_empty());
        assert!(!store.get(&old_id).unwrap().is_active);

        let feedback = FeedbackEvent::Outcome {
            memory_record_id: old_id,
            outcome: Outcome::Success,
        };
        assert!(store.apply_feedback(&feedback, t0()).is_none());

        // A new observation starts a fresh record
        let new_record = store.upsert(&headache_trigger("Red wine", t0()));
        assert_ne!(new_record.id, old_id);
        assert_eq!(new_record.occurrence_count, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_from_records_round_trip() {
        let mut store = MemoryStore::new();
        store.upsert(&headache_trigger("Red wine", t0()));
        store.deactivate_all();
        store.upsert(&headache_trigger("Red wine", t0()));

        let records: Vec<MemoryRecord> = store.records().into_iter().cloned().collect();
        let restored = MemoryStore::from_records(records);
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.active_count(), 1);
    }

    #[test]
    fn test_from_records_deactivates_duplicate_keys() {
        let mut older_store = MemoryStore::new();
        let older = older_store.upsert(&headache_trigger("Red wine", t0())).clone();
        let mut newer_store = MemoryStore::new();
        let newer = newer_store
            .upsert(&headache_trigger("Red wine", t0() + Duration::days(2)))
            .clone();

        for records in [vec![older.clone(), newer.clone()], vec![newer.clone(), older.clone()]] {
            let mut restored = MemoryStore::from_records(records);
            assert_eq!(restored.len(), 2);
            assert_eq!(restored.active_count(), 1);
            assert!(!restored.get(&older.id).unwrap().is_active);

            let results = restored.query(&MemoryQuery::for_symptom("Headache"), t0());
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].id, newer.id);

            let record = restored.upsert(&headache_trigger("Red wine", t0() + Duration::days(3)));
            assert_eq!(record.id, newer.id);
            assert_eq!(record.occurrence_count, 2);
        }
    }
}
