use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::agent::types::AgentError;

use super::types::{RecordStoreBuilder, StoredRecord, TagQuery};

type RecordKey = (String, String);

/// `MemoryStore` is an in-process [`RecordStoreBuilder`]
///
/// All clones share the same records, it's mostly useful for tests and for short living agents
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<RecordKey, StoredRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl RecordStoreBuilder for MemoryStore {
    async fn add(&self, record: StoredRecord) -> Result<(), AgentError> {
        let mut records = self.records.write().await;
        let key = (record.get_type_name(), record.get_id());
        if records.contains_key(&key) {
            return Err(AgentError::StoreError(format!(
                "record already exists: {}:{}",
                key.0, key.1
            )));
        }

        records.insert(key, record);
        Ok(())
    }

    async fn update(&self, record: StoredRecord) -> Result<(), AgentError> {
        let mut records = self.records.write().await;
        let key = (record.get_type_name(), record.get_id());
        match records.get_mut(&key) {
            Some(current) => {
                *current = record;
                Ok(())
            }
            None => Err(AgentError::RecordNotFound(format!("{}:{}", key.0, key.1))),
        }
    }

    async fn get(&self, type_name: String, id: String) -> Result<StoredRecord, AgentError> {
        let records = self.records.read().await;
        records
            .get(&(type_name.clone(), id.clone()))
            .cloned()
            .ok_or(AgentError::RecordNotFound(format!("{}:{}", type_name, id)))
    }

    async fn delete(&self, type_name: String, id: String) -> Result<(), AgentError> {
        let mut records = self.records.write().await;
        records
            .remove(&(type_name.clone(), id.clone()))
            .map(|_| ())
            .ok_or(AgentError::RecordNotFound(format!("{}:{}", type_name, id)))
    }

    async fn search(
        &self,
        type_name: String,
        query: TagQuery,
    ) -> Result<Vec<StoredRecord>, AgentError> {
        let records = self.records.read().await;
        let mut found: Vec<StoredRecord> = records
            .values()
            .filter(|record| record.type_name == type_name && record.matches(&query))
            .cloned()
            .collect();

        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }
}
