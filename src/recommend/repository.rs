//! Log repository seam: read-only access to protocol usage history

use crate::errors::Result;
use crate::recommend::types::UsageLog;
use async_trait::async_trait;
use std::collections::HashMap;

/// Source of protocol usage logs.
///
/// Implemented by the host's storage layer; reads are the only suspension
/// points of a recommendation request.
#[async_trait]
pub trait LogRepository: Send + Sync {
    /// Usage logs recorded for a protocol, in any order
    async fn usage_logs_for(&self, protocol_id: &str) -> Result<Vec<UsageLog>>;
}

/// Log repository backed by a map, for hosts that already hold logs in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogRepository {
    logs: HashMap<String, Vec<UsageLog>>,
}

impl InMemoryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one log for a protocol
    pub fn insert(&mut self, protocol_id: impl Into<String>, log: UsageLog) {
        self.logs.entry(protocol_id.into()).or_default().push(log);
    }

    /// Append several logs for a protocol
    pub fn extend<I>(&mut self, protocol_id: impl Into<String>, logs: I)
    where
        I: IntoIterator<Item = UsageLog>,
    {
        self.logs.entry(protocol_id.into()).or_default().extend(logs);
    }

    /// Number of protocols with at least one log
    pub fn protocol_count(&self) -> usize {
        self.logs.len()
    }
}

impl From<HashMap<String, Vec<UsageLog>>> for InMemoryLogRepository {
    fn from(logs: HashMap<String, Vec<UsageLog>>) -> Self {
        Self { logs }
    }
}

#[async_trait]
impl LogRepository for InMemoryLogRepository {
    async fn usage_logs_for(&self, protocol_id: &str) -> Result<Vec<UsageLog>> {
        Ok(self.logs.get(protocol_id).cloned().unwrap_or_default())
    }
}
