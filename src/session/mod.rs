// Host-side session layer: persistence collaborator and the learning service
pub mod learning;
pub mod persistence;

pub use learning::{LearningConfig, LearningSystem};
pub use persistence::{MemoryPersistence, PersistenceConfig};
