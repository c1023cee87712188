//! Core data types for the Memory & Learning System

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Unique identifier for memory records
pub type MemoryId = uuid::Uuid;

/// Maximum number of observation timestamps kept per record
pub const MAX_RECENT_DATES: usize = 20;

/// Kind of association a memory record captures.
///
/// Fixed when the record is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A resolution that relieved a symptom
    WhatWorked,
    /// A resolution that did not help
    WhatDidntWork,
    /// Something that preceded a symptom
    Trigger,
    /// A recurring shape (time of day, weekday, ...)
    Pattern,
    /// Co-occurrence with an environmental factor
    Correlation,
    /// Stated user preference
    Preference,
}

impl MemoryType {
    /// All memory types, in declaration order
    pub const ALL: [MemoryType; 6] = [
        MemoryType::WhatWorked,
        MemoryType::WhatDidntWork,
        MemoryType::Trigger,
        MemoryType::Pattern,
        MemoryType::Correlation,
        MemoryType::Preference,
    ];

    /// Whether success/failure feedback shapes this record's confidence
    pub fn tracks_effectiveness(&self) -> bool {
        matches!(self, MemoryType::WhatWorked | MemoryType::WhatDidntWork)
    }

    /// Stable kebab-case label
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::WhatWorked => "what-worked",
            MemoryType::WhatDidntWork => "what-didnt-work",
            MemoryType::Trigger => "trigger",
            MemoryType::Pattern => "pattern",
            MemoryType::Correlation => "correlation",
            MemoryType::Preference => "preference",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse confidence classification shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        };
        f.write_str(label)
    }
}

/// Lookup key of a memory record: (type, symptom, trigger, resolution)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryKey {
    pub memory_type: MemoryType,
    pub symptom: Option<String>,
    pub trigger: Option<String>,
    pub resolution: Option<String>,
}

/// Inbound observation event supplied by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub memory_type: MemoryType,
    #[serde(default)]
    pub symptom: Option<String>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    /// Free-text bucket such as "within 2 hours"
    #[serde(default)]
    pub resolution_time_descriptor: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub environmental_factor: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
}

impl Observation {
    /// Create a bare observation of the given type
    pub fn new(memory_type: MemoryType, timestamp: DateTime<Utc>) -> Self {
        Self {
            memory_type,
            symptom: None,
            trigger: None,
            resolution: None,
            resolution_time_descriptor: None,
            timestamp,
            environmental_factor: None,
            time_of_day: None,
        }
    }

    pub fn with_symptom(mut self, symptom: impl Into<String>) -> Self {
        self.symptom = Some(symptom.into());
        self
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn with_resolution_time(mut self, descriptor: impl Into<String>) -> Self {
        self.resolution_time_descriptor = Some(descriptor.into());
        self
    }

    pub fn with_environmental_factor(mut self, factor: impl Into<String>) -> Self {
        self.environmental_factor = Some(factor.into());
        self
    }

    pub fn with_time_of_day(mut self, time_of_day: impl Into<String>) -> Self {
        self.time_of_day = Some(time_of_day.into());
        self
    }

    /// Key this observation upserts into
    pub fn key(&self) -> MemoryKey {
        MemoryKey {
            memory_type: self.memory_type,
            symptom: self.symptom.clone(),
            trigger: self.trigger.clone(),
            resolution: self.resolution.clone(),
        }
    }

    /// True when the observation names neither symptom, trigger nor resolution
    pub fn is_empty(&self) -> bool {
        self.symptom.is_none() && self.trigger.is_none() && self.resolution.is_none()
    }
}

/// Explicit outcome reported for a remedy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// Explicit user judgment on a learned association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserJudgment {
    Confirm,
    Deny,
}

/// Inbound feedback event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Outcome {
        memory_record_id: MemoryId,
        outcome: Outcome,
    },
    Judgment {
        memory_record_id: MemoryId,
        user_judgment: UserJudgment,
    },
}

impl FeedbackEvent {
    /// Record this feedback targets
    pub fn record_id(&self) -> MemoryId {
        match self {
            FeedbackEvent::Outcome { memory_record_id, .. }
            | FeedbackEvent::Judgment { memory_record_id, .. } => *memory_record_id,
        }
    }
}

/// MemoryRecord: one learned trigger/symptom/resolution association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique record identifier
    pub id: MemoryId,
    /// Association kind, immutable after creation
    pub memory_type: MemoryType,
    pub symptom: Option<String>,
    pub trigger: Option<String>,
    pub resolution: Option<String>,
    pub resolution_time_descriptor: Option<String>,
    pub related_environmental_factor: Option<String>,
    pub related_time_of_day: Option<String>,
    /// Observed instances, never below 1
    pub occurrence_count: u32,
    /// Explicit success outcomes
    pub success_count: u32,
    /// Explicit failure outcomes
    pub failure_count: u32,
    pub last_occurrence: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Most recent observation timestamps, oldest first
    pub recent_dates: VecDeque<DateTime<Utc>>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub user_confirmed: bool,
    pub user_denied: bool,
    /// Soft-delete flag
    pub is_active: bool,
}

impl MemoryRecord {
    /// Key this record is stored under
    pub fn key(&self) -> MemoryKey {
        MemoryKey {
            memory_type: self.memory_type,
            symptom: self.symptom.clone(),
            trigger: self.trigger.clone(),
            resolution: self.resolution.clone(),
        }
    }

    /// Whether this record matches every supplied filter
    pub fn matches(
        &self,
        symptom: Option<&str>,
        trigger: Option<&str>,
        memory_type: Option<MemoryType>,
    ) -> bool {
        symptom.map_or(true, |s| self.symptom.as_deref() == Some(s))
            && trigger.map_or(true, |t| self.trigger.as_deref() == Some(t))
            && memory_type.map_or(true, |m| self.memory_type == m)
    }
}

/// Outbound memory confidence summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySummary {
    pub record_id: MemoryId,
    pub memory_type: MemoryType,
    pub symptom: Option<String>,
    pub trigger: Option<String>,
    pub resolution: Option<String>,
    pub occurrence_count: u32,
    pub confidence: f64,
    pub decayed_confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub effectiveness_percentage: u8,
    pub is_stale: bool,
}
