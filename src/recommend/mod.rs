//! Protocol recommendation
//!
//! Components:
//! - Types: protocol definitions, usage logs, ranked output
//! - Scorer: match + effectiveness ranking with deterministic ties
//! - Repository: async access to protocol usage history

pub mod repository;
pub mod scorer;
pub mod types;

pub use repository::{InMemoryLogRepository, LogRepository};
pub use scorer::{effectiveness_score, EffectivenessSource, RecommendationScorer};
pub use types::{
    ProtocolCandidate, ProtocolDefinition, RankedRecommendation, RecommendationRequest, UsageLog,
};
