//! Confidence Engine: tiered confidence, feedback and temporal decay
//!
//! Pure update rules over a [`MemoryRecord`]. Every mutation recomputes
//! confidence from the record's evidence so a caller can apply one event
//! inside a single critical section without partial updates.
//!
//! Confidence is built from fixed tiers rather than a continuous curve:
//! base 0.30, one occurrence tier, one effectiveness tier (remedy records
//! only), then the user judgment adjustment, clamped to [0, 1].

use crate::memory::types::{
    ConfidenceLevel, MemoryRecord, MemorySummary, Observation, MAX_RECENT_DATES,
};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Confidence of a record with a single observation and no feedback
pub const BASE_CONFIDENCE: f64 = 0.30;

/// Effectiveness assumed when no outcome has been reported
pub const NEUTRAL_EFFECTIVENESS: f64 = 0.5;

/// Adjustment applied by an explicit user confirmation
pub const CONFIRM_BOOST: f64 = 0.10;

/// Adjustment applied by an explicit user denial
pub const DENY_PENALTY: f64 = 0.20;

/// Time constant of the exponential decay, in days
pub const DECAY_TIME_CONSTANT_DAYS: f64 = 180.0;

/// Records untouched for longer than this are stale
pub const STALE_AFTER_DAYS: f64 = 180.0;

/// Window used for the recency-aware occurrence count
pub const RECENCY_WINDOW_DAYS: f64 = 90.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Occurrence tiers: (minimum count, boost). Highest applicable wins.
const OCCURRENCE_TIERS: [(u32, f64); 3] = [(10, 0.30), (5, 0.20), (3, 0.10)];

/// Effectiveness tiers: (minimum ratio, boost). Highest applicable wins.
const EFFECTIVENESS_TIERS: [(f64, f64); 2] = [(0.7, 0.30), (0.5, 0.15)];

/// Create the record for the first observation of a key.
///
/// A new record starts at the base confidence; the tiers only apply from
/// the next update onwards.
pub fn new_record(observation: &Observation) -> MemoryRecord {
    let at = observation.timestamp;
    let mut recent_dates = VecDeque::with_capacity(MAX_RECENT_DATES);
    recent_dates.push_back(at);

    let record = MemoryRecord {
        id: uuid::Uuid::new_v4(),
        memory_type: observation.memory_type,
        symptom: observation.symptom.clone(),
        trigger: observation.trigger.clone(),
        resolution: observation.resolution.clone(),
        resolution_time_descriptor: observation.resolution_time_descriptor.clone(),
        related_environmental_factor: observation.environmental_factor.clone(),
        related_time_of_day: observation.time_of_day.clone(),
        occurrence_count: 1,
        success_count: 0,
        failure_count: 0,
        last_occurrence: at,
        created_at: at,
        last_updated: at,
        recent_dates,
        confidence: BASE_CONFIDENCE,
        user_confirmed: false,
        user_denied: false,
        is_active: true,
    };

    debug_assert!(check_invariants(&record));
    record
}

/// Record one more observed instance at `at`
pub fn record_occurrence(record: &mut MemoryRecord, at: DateTime<Utc>) {
    record.occurrence_count = record.occurrence_count.saturating_add(1);
    // Backdated entries never move the most recent observation backwards
    if at > record.last_occurrence {
        record.last_occurrence = at;
    }

    record.recent_dates.push_back(at);
    while record.recent_dates.len() > MAX_RECENT_DATES {
        record.recent_dates.pop_front();
    }

    record.last_updated = at;
    record.confidence = recompute(record);

    debug_assert!(check_invariants(record));
}

/// Record an explicit successful outcome
pub fn record_success(record: &mut MemoryRecord, at: DateTime<Utc>) {
    record.success_count = record.success_count.saturating_add(1);
    record.last_updated = at;
    record.confidence = recompute(record);

    debug_assert!(check_invariants(record));
}

/// Record an explicit failed outcome
pub fn record_failure(record: &mut MemoryRecord, at: DateTime<Utc>) {
    record.failure_count = record.failure_count.saturating_add(1);
    record.last_updated = at;
    record.confidence = recompute(record);

    debug_assert!(check_invariants(record));
}

/// Mark the association as confirmed by the user.
///
/// The boost is applied once per transition into the confirmed state;
/// confirming an already confirmed record only refreshes `last_updated`.
pub fn confirm_by_user(record: &mut MemoryRecord, at: DateTime<Utc>) {
    if !record.user_confirmed {
        record.confidence = clamp_unit(record.confidence + CONFIRM_BOOST);
    }
    record.user_confirmed = true;
    record.user_denied = false;
    record.last_updated = at;

    debug_assert!(check_invariants(record));
}

/// Mark the association as denied by the user.
///
/// Mirrors [`confirm_by_user`]: the penalty applies once per transition.
pub fn deny_by_user(record: &mut MemoryRecord, at: DateTime<Utc>) {
    if !record.user_denied {
        record.confidence = clamp_unit(record.confidence - DENY_PENALTY);
    }
    record.user_denied = true;
    record.user_confirmed = false;
    record.last_updated = at;

    debug_assert!(check_invariants(record));
}

/// Deterministic confidence from the record's evidence
pub fn recompute(record: &MemoryRecord) -> f64 {
    let mut confidence = BASE_CONFIDENCE + occurrence_boost(record.occurrence_count);

    if record.memory_type.tracks_effectiveness() {
        confidence += effectiveness_boost(effectiveness_score(record));
    }

    if record.user_confirmed {
        confidence += CONFIRM_BOOST;
    }
    if record.user_denied {
        confidence -= DENY_PENALTY;
    }

    clamp_unit(confidence)
}

fn occurrence_boost(count: u32) -> f64 {
    OCCURRENCE_TIERS
        .iter()
        .find(|(min, _)| count >= *min)
        .map_or(0.0, |(_, boost)| *boost)
}

fn effectiveness_boost(ratio: f64) -> f64 {
    EFFECTIVENESS_TIERS
        .iter()
        .find(|(min, _)| ratio >= *min)
        .map_or(0.0, |(_, boost)| *boost)
}

/// Success ratio of reported outcomes, or the neutral prior without any
pub fn effectiveness_score(record: &MemoryRecord) -> f64 {
    let total = u64::from(record.success_count) + u64::from(record.failure_count);
    if total == 0 {
        NEUTRAL_EFFECTIVENESS
    } else {
        record.success_count as f64 / total as f64
    }
}

/// Effectiveness as a whole percentage
pub fn effectiveness_percentage(record: &MemoryRecord) -> u8 {
    (effectiveness_score(record) * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Fractional days from `from` to `now`, never negative
pub fn days_since(from: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = now.signed_duration_since(from).num_milliseconds() as f64 / 1000.0;
    (seconds / SECONDS_PER_DAY).max(0.0)
}

/// Confidence decayed by inactivity: `confidence * e^(-days/180)`
pub fn decayed_confidence(record: &MemoryRecord, now: DateTime<Utc>) -> f64 {
    let days = days_since(record.last_occurrence, now);
    clamp_unit(record.confidence * (-days / DECAY_TIME_CONSTANT_DAYS).exp())
}

/// Classify a confidence value given the supporting observation count
pub fn confidence_level(confidence: f64, occurrence_count: u32) -> ConfidenceLevel {
    if occurrence_count >= 10 && confidence >= 0.7 {
        ConfidenceLevel::High
    } else if occurrence_count >= 5 && confidence >= 0.5 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Observations inside the recency window.
///
/// Floored at `min(occurrence_count, 3)` when any exist.
pub fn recent_occurrences(record: &MemoryRecord, now: DateTime<Utc>) -> u32 {
    let in_window = record
        .recent_dates
        .iter()
        .filter(|date| days_since(**date, now) <= RECENCY_WINDOW_DAYS)
        .count() as u32;

    if in_window == 0 {
        0
    } else {
        in_window.max(record.occurrence_count.min(3))
    }
}

/// Confidence level using decayed confidence and the windowed count
pub fn decayed_confidence_level(record: &MemoryRecord, now: DateTime<Utc>) -> ConfidenceLevel {
    confidence_level(
        decayed_confidence(record, now),
        recent_occurrences(record, now),
    )
}

/// Whether the record has gone unobserved for over six months
pub fn is_stale(record: &MemoryRecord, now: DateTime<Utc>) -> bool {
    days_since(record.last_occurrence, now) > STALE_AFTER_DAYS
}

/// Outbound summary of a record as seen at `now`
pub fn summarize(record: &MemoryRecord, now: DateTime<Utc>) -> MemorySummary {
    MemorySummary {
        record_id: record.id,
        memory_type: record.memory_type,
        symptom: record.symptom.clone(),
        trigger: record.trigger.clone(),
        resolution: record.resolution.clone(),
        occurrence_count: record.occurrence_count,
        confidence: record.confidence,
        decayed_confidence: decayed_confidence(record, now),
        confidence_level: decayed_confidence_level(record, now),
        effectiveness_percentage: effectiveness_percentage(record),
        is_stale: is_stale(record, now),
    }
}

/// Record invariants; a violation is a defect in this module
pub fn check_invariants(record: &MemoryRecord) -> bool {
    (0.0..=1.0).contains(&record.confidence)
        && record.occurrence_count >= 1
        && record.recent_dates.len() <= MAX_RECENT_DATES
        && !(record.user_confirmed && record.user_denied)
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
