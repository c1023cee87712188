//! Error types for SymptomBuddy
//!
//! The scoring core (confidence engine, memory store, scorer, gating) is
//! total and never returns these. They surface at the service boundary;
//! configuration and file handling report through `anyhow` instead.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for SymptomBuddy
#[derive(Error, Debug)]
pub enum SymptomError {
    /// Feedback referenced a record the store has never seen
    #[error("Memory record not found: {id}")]
    RecordNotFound { id: Uuid },

    /// Feedback referenced a record that was reset
    #[error("Memory record {id} is inactive")]
    RecordInactive { id: Uuid },

    /// Observation rejected before reaching the store
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// Persistence collaborator errors
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// Log repository errors
    #[error("Log repository error: {0}")]
    RepositoryError(String),
}

/// Result type alias for SymptomBuddy operations
pub type Result<T> = std::result::Result<T, SymptomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::nil();
        let err = SymptomError::RecordNotFound { id };
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_persistence_error_keeps_context() {
        let err = SymptomError::PersistenceError("Failed to write memory file: disk full".into());
        assert_eq!(err.to_string(), "Persistence error: Failed to write memory file: disk full");
    }
}
