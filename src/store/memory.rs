use crate::core::{PartitionKey, PartitionSink, PipelineError, RateRow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory partition store. Each write swaps the whole row-set under the
/// lock, so readers see either the old or the new partition.
#[derive(Clone, Default)]
pub struct MemoryPartitionStore {
    inner: Arc<Mutex<HashMap<PartitionKey, Vec<RateRow>>>>,
}

impl MemoryPartitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently holding data, in key order.
    pub async fn keys(&self) -> Vec<PartitionKey> {
        let partitions = self.inner.lock().await;
        let mut keys: Vec<PartitionKey> = partitions.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl PartitionSink for MemoryPartitionStore {
    async fn write(&self, key: &PartitionKey, rows: &[RateRow]) -> Result<String, PipelineError> {
        let mut partitions = self.inner.lock().await;
        partitions.insert(key.clone(), rows.to_vec());
        debug!("Memory partition PUT for key: {}", key);
        Ok(format!("memory://{key}"))
    }

    async fn read(&self, key: &PartitionKey) -> anyhow::Result<Option<Vec<RateRow>>> {
        let partitions = self.inner.lock().await;
        Ok(partitions.get(key).cloned())
    }
}
