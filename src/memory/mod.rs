//! Memory and Learning System
//!
//! Learns which triggers precede which symptoms and which remedies relieve
//! them, as decayable, feedback-shaped bookkeeping.
//!
//! Components:
//! - Types: memory records, observations, feedback events, summaries
//! - Confidence Engine: tiered confidence, user judgment, temporal decay
//! - Memory Store: keyed upsert/query/reset over records

pub mod confidence;
pub mod store;
pub mod types;

pub use store::{MemoryQuery, MemoryStore};
pub use types::{
    ConfidenceLevel, FeedbackEvent, MemoryId, MemoryKey, MemoryRecord, MemorySummary, MemoryType,
    Observation, Outcome, UserJudgment,
};
