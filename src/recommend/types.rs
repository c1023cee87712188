//! Recommendation data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One logged use of a protocol, supplied by the log repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLog {
    /// Symptom severity at the time of the log
    pub severity: f64,
    /// Explicit 1-5 rating, when the user gave one; other values are ignored when scoring
    #[serde(default)]
    pub effectiveness_rating: Option<u8>,
    pub timestamp: DateTime<Utc>,
    /// Originating symptom record / user the log belongs to
    pub group_key: String,
}

impl UsageLog {
    pub fn new(group_key: impl Into<String>, severity: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            severity,
            effectiveness_rating: None,
            timestamp,
            group_key: group_key.into(),
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.effectiveness_rating = Some(rating);
        self
    }
}

/// Protocol definition as supplied by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolDefinition {
    pub id: String,
    pub symptoms: BTreeSet<String>,
}

impl ProtocolDefinition {
    pub fn new<I, S>(id: impl Into<String>, symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            symptoms: symptoms.into_iter().map(Into::into).collect(),
        }
    }
}

/// Protocol with its usage history, ready to be scored
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolCandidate {
    pub id: String,
    pub symptoms: BTreeSet<String>,
    pub usage_logs: Vec<UsageLog>,
}

impl ProtocolCandidate {
    pub fn new(definition: ProtocolDefinition, usage_logs: Vec<UsageLog>) -> Self {
        Self {
            id: definition.id,
            symptoms: definition.symptoms,
            usage_logs,
        }
    }
}

/// Inbound recommendation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub target_symptoms: BTreeSet<String>,
    pub candidate_protocols: Vec<ProtocolDefinition>,
}

/// Outbound ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecommendation {
    pub protocol_id: String,
    pub final_score: f64,
    pub match_score: f64,
    pub effectiveness_score: f64,
}
