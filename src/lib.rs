//! SymptomBuddy - symptom memory and remedy ranking
//!
//! Learns, from self-reported health events, which triggers tend to precede
//! which symptoms and which remedies relieve them. Every learned
//! association carries a confidence that grows with consistent evidence,
//! is shaped by outcome feedback, and decays with inactivity. It is
//! bookkeeping for the user's own logs and makes no medical claims.
//!
//! # Architecture
//!
//! - **memory**: record model, confidence engine, keyed store
//! - **recommend**: protocol ranking over target symptoms
//! - **gating**: "still learning" policy when evidence is thin
//! - **session**: per-user service and JSON persistence

pub mod errors;
pub mod memory;
pub mod recommend;
pub mod gating;

// Re-export commonly used types
pub use errors::{Result, SymptomError};
pub use gating::{Gated, GatingPolicy, NeedsMoreDataMessage};
pub use memory::{MemoryQuery, MemoryRecord, MemoryStore, MemoryType, Observation};
pub use recommend::{RankedRecommendation, RecommendationScorer};

// Host surfaces
pub mod cli;
pub mod config;
pub mod session;
pub mod telemetry;
