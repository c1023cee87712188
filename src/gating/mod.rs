//! Gating / insufficient-data policy
//!
//! Decides whether enough evidence exists to surface specific insights or
//! recommendations. When it does not, the whole response is replaced by a
//! "still learning" message; nothing is appended as a caveat.

use crate::config::GatingConfig;
use crate::memory::confidence;
use crate::memory::types::{ConfidenceLevel, MemoryRecord, MemorySummary};
use crate::recommend::types::RankedRecommendation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Best record needs at least this many observations when its level is Low
const MIN_LOW_CONFIDENCE_OCCURRENCES: u32 = 3;

/// Structured "still learning" response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedsMoreDataMessage {
    pub text: String,
    pub data_needed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_progress: Option<String>,
}

/// Result of passing content through the gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Gated<T> {
    /// Enough evidence; content may be shown
    Ready(T),
    /// Not enough evidence; show the message instead
    NeedsMoreData(NeedsMoreDataMessage),
}

impl<T> Gated<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Gated::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Gated::Ready(content) => Some(content),
            Gated::NeedsMoreData(_) => None,
        }
    }

    pub fn message(&self) -> Option<&NeedsMoreDataMessage> {
        match self {
            Gated::Ready(_) => None,
            Gated::NeedsMoreData(message) => Some(message),
        }
    }
}

/// What an insight request is about, used to phrase the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Subject {
    Symptom(String),
    Trigger(String),
    General,
}

impl Subject {
    /// Subject from optional query filters, symptom first
    pub fn from_filters(symptom: Option<&str>, trigger: Option<&str>) -> Self {
        match (symptom, trigger) {
            (Some(symptom), _) => Subject::Symptom(symptom.to_string()),
            (None, Some(trigger)) => Subject::Trigger(trigger.to_string()),
            (None, None) => Subject::General,
        }
    }
}

/// Insufficient-data gate
#[derive(Debug, Clone)]
pub struct GatingPolicy {
    minimum_needed: u32,
}

impl GatingPolicy {
    /// Create a policy with the default minimum of 5 logs
    pub fn new() -> Self {
        Self::with_config(&GatingConfig::default())
    }

    pub fn with_config(config: &GatingConfig) -> Self {
        Self {
            minimum_needed: config.minimum_needed.max(1),
        }
    }

    pub fn minimum_needed(&self) -> u32 {
        self.minimum_needed
    }

    /// Whether the best record carries enough evidence to be shown
    pub fn has_sufficient_evidence(&self, best: Option<&MemoryRecord>) -> bool {
        match best {
            None => false,
            Some(record) => {
                let level = confidence::confidence_level(record.confidence, record.occurrence_count);
                !(level == ConfidenceLevel::Low
                    && record.occurrence_count < MIN_LOW_CONFIDENCE_OCCURRENCES)
            }
        }
    }

    /// Gate insights drawn from store query results.
    ///
    /// `records` must be in query order, best first.
    pub fn gate_insights(
        &self,
        subject: &Subject,
        records: &[&MemoryRecord],
        now: DateTime<Utc>,
    ) -> Gated<Vec<MemorySummary>> {
        let best = records.first().copied();
        if !self.has_sufficient_evidence(best) {
            let occurrences = best.map_or(0, |record| record.occurrence_count);
            tracing::debug!(?subject, occurrences, "Insufficient evidence for insights");
            return Gated::NeedsMoreData(self.still_learning(subject, occurrences));
        }

        Gated::Ready(
            records
                .iter()
                .map(|record| confidence::summarize(record, now))
                .collect(),
        )
    }

    /// Gate a ranked recommendation list
    pub fn gate_recommendations(
        &self,
        target: &BTreeSet<String>,
        ranked: Vec<RankedRecommendation>,
    ) -> Gated<Vec<RankedRecommendation>> {
        if target.is_empty() {
            tracing::debug!("Recommendation requested without target symptoms");
            return Gated::NeedsMoreData(self.insufficient_context());
        }

        if ranked.is_empty() {
            let symptoms: Vec<&str> = target.iter().map(String::as_str).collect();
            return Gated::NeedsMoreData(NeedsMoreDataMessage {
                text: format!(
                    "None of your saved protocols cover {} yet.",
                    symptoms.join(", ")
                ),
                data_needed: vec![
                    "A protocol that lists one of these symptoms".to_string(),
                    "Notes on what you tried and how it went".to_string(),
                ],
                current_progress: None,
            });
        }

        Gated::Ready(ranked)
    }

    /// Message for a request that names no symptoms at all
    pub fn insufficient_context(&self) -> NeedsMoreDataMessage {
        NeedsMoreDataMessage {
            text: "Tell me which symptoms you are dealing with so I can look through what you have logged."
                .to_string(),
            data_needed: vec!["At least one current symptom".to_string()],
            current_progress: None,
        }
    }

    fn still_learning(&self, subject: &Subject, occurrences: u32) -> NeedsMoreDataMessage {
        let progress = Some(format!(
            "{} of ~{} logs",
            occurrences, self.minimum_needed
        ));

        match subject {
            Subject::Symptom(symptom) => NeedsMoreDataMessage {
                text: format!(
                    "Still learning about your {}. Keep logging and patterns will show up here.",
                    symptom
                ),
                data_needed: vec![
                    format!("More {} logs", symptom),
                    "What was going on beforehand (foods, sleep, weather)".to_string(),
                    "What you tried for relief and whether it helped".to_string(),
                ],
                current_progress: progress,
            },
            Subject::Trigger(trigger) => NeedsMoreDataMessage {
                text: format!(
                    "Not enough logs yet to say what tends to follow {}.",
                    trigger
                ),
                data_needed: vec![
                    format!("Logs of symptoms that came after {}", trigger),
                    format!("Days with {} and no symptoms", trigger),
                ],
                current_progress: progress,
            },
            Subject::General => NeedsMoreDataMessage {
                text: "Still learning. Keep logging and patterns will show up here.".to_string(),
                data_needed: vec![
                    "Symptom logs".to_string(),
                    "What you tried for relief and whether it helped".to_string(),
                ],
                current_progress: progress,
            },
        }
    }
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self::new()
    }
}
