use std::collections::BTreeMap;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::de::DeserializeOwned;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::agent::types::AgentError;

/// `Tags` are the only searchable surface of a stored record
pub type Tags = BTreeMap<String, String>;

/// `RecordKind` is the closed registry of record types known by the agent
///
/// The stable type name is persisted together with each record and used to make sure
/// a stored record is always decoded to the entity it was written from
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecordKind {
    Connection,
    Credential,
    Proof,
    Schema,
    Definition,
    RevocationRegistry,
}

impl RecordKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            RecordKind::Connection => "ConnectionRecord",
            RecordKind::Credential => "CredentialRecord",
            RecordKind::Proof => "ProofRecord",
            RecordKind::Schema => "SchemaRecord",
            RecordKind::Definition => "DefinitionRecord",
            RecordKind::RevocationRegistry => "RevocationRegistryRecord",
        }
    }
}

impl TryFrom<&str> for RecordKind {
    type Error = AgentError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ConnectionRecord" => Ok(RecordKind::Connection),
            "CredentialRecord" => Ok(RecordKind::Credential),
            "ProofRecord" => Ok(RecordKind::Proof),
            "SchemaRecord" => Ok(RecordKind::Schema),
            "DefinitionRecord" => Ok(RecordKind::Definition),
            "RevocationRegistryRecord" => Ok(RecordKind::RevocationRegistry),
            _ => Err(AgentError::StoreError(format!(
                "unknown record type: {}",
                value
            ))),
        }
    }
}

/// `StoredRecord` is the persisted shape consumed and produced by the record store
///
/// The `value` is an opaque JSON blob, only `tags` can be searched
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct StoredRecord {
    pub(crate) type_name: String,
    pub(crate) id: String,
    pub(crate) value: String,
    pub(crate) tags: Tags,
}

impl StoredRecord {
    pub fn new(kind: RecordKind, id: String, value: String, tags: Tags) -> Self {
        Self {
            type_name: kind.type_name().to_string(),
            id,
            value,
            tags,
        }
    }

    pub fn get_type_name(&self) -> String {
        self.type_name.to_owned()
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_value(&self) -> String {
        self.value.to_owned()
    }

    pub fn get_tags(&self) -> Tags {
        self.tags.to_owned()
    }

    pub fn matches(&self, query: &TagQuery) -> bool {
        query
            .tags
            .iter()
            .all(|(name, value)| self.tags.get(name) == Some(value))
    }
}

impl ToJSON for StoredRecord {
    fn to_json(&self) -> Result<String, BaseError> {
        let json_str =
            serde_json::to_string(&self).map_err(|err| BaseError::ToJSONError(err.to_string()))?;

        Ok(json_str)
    }
}

impl TryInto<Vec<u8>> for StoredRecord {
    type Error = AgentError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        let json = serde_json::to_vec(&self).map_err(|err| AgentError::JSONError(err.to_string()))?;
        Ok(json)
    }
}

impl TryFrom<Vec<u8>> for StoredRecord {
    type Error = AgentError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        let record: StoredRecord =
            serde_json::from_slice(&value).map_err(|err| AgentError::JSONError(err.to_string()))?;
        Ok(record)
    }
}

/// `TagQuery` is a conjunction of tag equality filters
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TagQuery {
    pub(crate) tags: Tags,
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.tags.insert(name.to_string(), value.into());
        self
    }

    pub fn get_tags(&self) -> Tags {
        self.tags.to_owned()
    }
}

/// `RecordEntity` binds a domain record to its [`RecordKind`] at compile time
pub trait RecordEntity: Serialize + DeserializeOwned + Clone + Send + Sync {
    const KIND: RecordKind;

    fn record_id(&self) -> String;
    fn record_tags(&self) -> Tags;

    fn to_record(&self) -> Result<StoredRecord, AgentError> {
        let value =
            serde_json::to_string(self).map_err(|err| AgentError::JSONError(err.to_string()))?;

        Ok(StoredRecord::new(
            Self::KIND,
            self.record_id(),
            value,
            self.record_tags(),
        ))
    }

    fn from_record(record: StoredRecord) -> Result<Self, AgentError> {
        let kind = RecordKind::try_from(record.type_name.as_str())?;
        if kind != Self::KIND {
            return Err(AgentError::StoreError(format!(
                "expected {}, got {}",
                Self::KIND.type_name(),
                record.type_name
            )));
        }

        serde_json::from_str(&record.value).map_err(|err| AgentError::JSONError(err.to_string()))
    }
}

/// `RecordStoreBuilder` is the durable keyed storage used by all workflows
///
/// Semantics required from an implementer:
///
/// - `add` fails when a record with the same type and id already exists
/// - `update` and `delete` fail with [`AgentError::RecordNotFound`] when the record is missing
/// - `search` returns every record of the given type whose tags contain all query tags
#[async_trait]
pub trait RecordStoreBuilder: Clone + Send + Sync {
    async fn add(&self, record: StoredRecord) -> Result<(), AgentError>;
    async fn update(&self, record: StoredRecord) -> Result<(), AgentError>;
    async fn get(&self, type_name: String, id: String) -> Result<StoredRecord, AgentError>;
    async fn delete(&self, type_name: String, id: String) -> Result<(), AgentError>;
    async fn search(
        &self,
        type_name: String,
        query: TagQuery,
    ) -> Result<Vec<StoredRecord>, AgentError>;
}
