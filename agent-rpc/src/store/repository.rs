use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::Mutex;
use rst_common::with_tracing::tracing::debug;

use rstdev_storage::engine::rocksdb::executor::Executor;
use rstdev_storage::engine::rocksdb::types::{
    Instruction as DbInstruction, OutputOpts as DbOutput,
};

use prople_agent_core::agent::store::types::{RecordStoreBuilder, StoredRecord, TagQuery};
use prople_agent_core::agent::types::AgentError;

use crate::common::types::CommonError;

use super::bucket::Bucket;

const RECORD_PREFIX: &str = "record";
const TAG_PREFIX: &str = "tag";
const TYPE_PREFIX: &str = "type";

/// `Repository` is a RocksDB [`RecordStoreBuilder`]
///
/// Each record is kept under `record:<type>:<id>`. Searching goes through buckets of ids,
/// one per type at `type:<type>` and one per tag value at `tag:<type>:<name>:<value>`.
/// Buckets are read-modify-written under a single lock shared by all clones
#[derive(Clone)]
pub struct Repository {
    db: Executor,
    index: Arc<Mutex<()>>,
}

impl Repository {
    pub fn new(db: Executor) -> Self {
        Self {
            db,
            index: Arc::new(Mutex::new(())),
        }
    }

    fn build_record_key(&self, type_name: &str, id: &str) -> String {
        format!("{}:{}:{}", RECORD_PREFIX, type_name, id)
    }

    fn build_tag_key(&self, type_name: &str, name: &str, value: &str) -> String {
        format!("{}:{}:{}:{}", TAG_PREFIX, type_name, name, value)
    }

    fn build_type_key(&self, type_name: &str) -> String {
        format!("{}:{}", TYPE_PREFIX, type_name)
    }

    fn index_keys(&self, record: &StoredRecord) -> Vec<String> {
        let type_name = record.get_type_name();
        let mut keys = vec![self.build_type_key(&type_name)];

        for (name, value) in record.get_tags() {
            keys.push(self.build_tag_key(&type_name, &name, &value));
        }

        keys
    }

    async fn read(&self, key: String) -> Result<Option<Vec<u8>>, CommonError> {
        let output = self
            .db
            .exec(DbInstruction::GetCf { key })
            .await
            .map_err(|err| CommonError::DbError(err.to_string()))?;

        match output {
            DbOutput::SingleByte { value } => Ok(value),
            _ => Err(CommonError::DbError("unknown output type".to_string())),
        }
    }

    async fn write(&self, key: String, value: Vec<u8>) -> Result<(), CommonError> {
        let _ = self
            .db
            .exec(DbInstruction::SaveCf { key, value })
            .await
            .map_err(|err| CommonError::DbError(err.to_string()))?;

        Ok(())
    }

    async fn remove(&self, key: String) -> Result<(), CommonError> {
        let _ = self
            .db
            .exec(DbInstruction::RemoveCf { key })
            .await
            .map_err(|err| CommonError::DbError(err.to_string()))?;

        Ok(())
    }

    async fn load_bucket(&self, key: String) -> Result<Bucket<String>, CommonError> {
        match self.read(key).await? {
            Some(value) => value.try_into(),
            None => Ok(Bucket::new()),
        }
    }

    async fn save_bucket(&self, key: String, bucket: Bucket<String>) -> Result<(), CommonError> {
        if bucket.is_empty() {
            return self.remove(key).await;
        }

        let value: Vec<u8> = bucket.try_into()?;
        self.write(key, value).await
    }

    async fn index(&self, record: &StoredRecord) -> Result<(), CommonError> {
        for key in self.index_keys(record) {
            let mut bucket = self.load_bucket(key.clone()).await?;
            bucket.add(record.get_id());
            self.save_bucket(key, bucket).await?;
        }

        Ok(())
    }

    async fn unindex(&self, record: &StoredRecord) -> Result<(), CommonError> {
        for key in self.index_keys(record) {
            let mut bucket = self.load_bucket(key.clone()).await?;
            bucket.remove(&record.get_id());
            self.save_bucket(key, bucket).await?;
        }

        Ok(())
    }

    async fn load(&self, type_name: &str, id: &str) -> Result<Option<StoredRecord>, AgentError> {
        let value = self.read(self.build_record_key(type_name, id)).await?;
        match value {
            Some(bytes) => Ok(Some(StoredRecord::try_from(bytes)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: StoredRecord) -> Result<(), AgentError> {
        let key = self.build_record_key(&record.get_type_name(), &record.get_id());
        let value: Vec<u8> = record.try_into()?;
        self.write(key, value).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStoreBuilder for Repository {
    async fn add(&self, record: StoredRecord) -> Result<(), AgentError> {
        let _guard = self.index.lock().await;

        let type_name = record.get_type_name();
        let id = record.get_id();
        if self.load(&type_name, &id).await?.is_some() {
            return Err(AgentError::StoreError(format!(
                "record already exists: {}:{}",
                type_name, id
            )));
        }

        self.index(&record).await?;
        self.save(record).await?;

        debug!(type_name = %type_name, id = %id, "record added");
        Ok(())
    }

    async fn update(&self, record: StoredRecord) -> Result<(), AgentError> {
        let _guard = self.index.lock().await;

        let type_name = record.get_type_name();
        let id = record.get_id();
        let current = self
            .load(&type_name, &id)
            .await?
            .ok_or(AgentError::RecordNotFound(format!("{}:{}", type_name, id)))?;

        self.unindex(&current).await?;
        self.index(&record).await?;
        self.save(record).await?;

        debug!(type_name = %type_name, id = %id, "record updated");
        Ok(())
    }

    async fn get(&self, type_name: String, id: String) -> Result<StoredRecord, AgentError> {
        self.load(&type_name, &id)
            .await?
            .ok_or(AgentError::RecordNotFound(format!("{}:{}", type_name, id)))
    }

    async fn delete(&self, type_name: String, id: String) -> Result<(), AgentError> {
        let _guard = self.index.lock().await;

        let current = self
            .load(&type_name, &id)
            .await?
            .ok_or(AgentError::RecordNotFound(format!("{}:{}", type_name, id)))?;

        self.unindex(&current).await?;
        self.remove(self.build_record_key(&type_name, &id)).await?;

        debug!(type_name = %type_name, id = %id, "record deleted");
        Ok(())
    }

    async fn search(
        &self,
        type_name: String,
        query: TagQuery,
    ) -> Result<Vec<StoredRecord>, AgentError> {
        // narrowest starting point is any one of the queried tags
        let key = match query.get_tags().into_iter().next() {
            Some((name, value)) => self.build_tag_key(&type_name, &name, &value),
            None => self.build_type_key(&type_name),
        };

        let ids = self.load_bucket(key).await?.items();

        let mut records = vec![];
        for id in ids {
            if let Some(record) = self.load(&type_name, &id).await? {
                if record.matches(&query) {
                    records.push(record);
                }
            }
        }

        Ok(records)
    }
}
