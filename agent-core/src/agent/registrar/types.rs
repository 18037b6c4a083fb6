use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

use crate::agent::messaging::messages::optional_field;
use crate::agent::store::types::{RecordEntity, RecordKind, Tags};

pub const TAG_NAME: &str = "name";
pub const TAG_VERSION: &str = "version";
pub const TAG_SCHEMA_ID: &str = "schema_id";
pub const TAG_DEFINITION_ID: &str = "definition_id";

/// `supports_revocation` checks if a credential definition carries revocation keys
pub fn supports_revocation(definition: &Value) -> bool {
    definition
        .get("value")
        .and_then(|value| value.get("revocation"))
        .map(|revocation| !revocation.is_null())
        .unwrap_or(false)
}

/// `tails_location` extracts the tails file location of a revocation registry definition
pub fn tails_location(revocation_definition: &Value) -> Option<String> {
    revocation_definition
        .get("value")
        .and_then(|value| optional_field(value, "tailsLocation"))
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct SchemaRecord {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) schema_json: Value,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,
}

impl SchemaRecord {
    pub fn new(id: String, schema_json: Value) -> Self {
        Self {
            name: optional_field(&schema_json, "name").unwrap_or_default(),
            version: optional_field(&schema_json, "version").unwrap_or_default(),
            id,
            schema_json,
            created_at: Utc::now(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_name(&self) -> String {
        self.name.to_owned()
    }

    pub fn get_version(&self) -> String {
        self.version.to_owned()
    }

    pub fn get_schema_json(&self) -> Value {
        self.schema_json.to_owned()
    }
}

impl RecordEntity for SchemaRecord {
    const KIND: RecordKind = RecordKind::Schema;

    fn record_id(&self) -> String {
        self.get_id()
    }

    fn record_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert(TAG_NAME.to_string(), self.name.to_owned());
        tags.insert(TAG_VERSION.to_string(), self.version.to_owned());
        tags
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct DefinitionRecord {
    pub(crate) id: String,
    pub(crate) schema_id: Option<String>,
    pub(crate) supports_revocation: bool,
    pub(crate) definition_json: Value,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,
}

impl DefinitionRecord {
    pub fn new(id: String, definition_json: Value) -> Self {
        Self {
            schema_id: optional_field(&definition_json, "schemaId"),
            supports_revocation: supports_revocation(&definition_json),
            id,
            definition_json,
            created_at: Utc::now(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_schema_id(&self) -> Option<String> {
        self.schema_id.to_owned()
    }

    pub fn is_revocable(&self) -> bool {
        self.supports_revocation
    }

    pub fn get_definition_json(&self) -> Value {
        self.definition_json.to_owned()
    }
}

impl RecordEntity for DefinitionRecord {
    const KIND: RecordKind = RecordKind::Definition;

    fn record_id(&self) -> String {
        self.get_id()
    }

    fn record_tags(&self) -> Tags {
        let mut tags = Tags::new();
        if let Some(schema_id) = &self.schema_id {
            tags.insert(TAG_SCHEMA_ID.to_string(), schema_id.to_owned());
        }

        tags
    }
}

/// `RevocationRegistryRecord` is kept by the issuer only, one per revocable definition
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct RevocationRegistryRecord {
    pub(crate) id: String,
    pub(crate) definition_id: String,
    pub(crate) tails_location: String,
    pub(crate) max_credentials: u32,
    pub(crate) definition_json: Value,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,
}

impl RevocationRegistryRecord {
    pub fn new(
        id: String,
        definition_id: String,
        tails_location: String,
        max_credentials: u32,
        definition_json: Value,
    ) -> Self {
        Self {
            id,
            definition_id,
            tails_location,
            max_credentials,
            definition_json,
            created_at: Utc::now(),
        }
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_definition_id(&self) -> String {
        self.definition_id.to_owned()
    }

    pub fn get_tails_location(&self) -> String {
        self.tails_location.to_owned()
    }

    pub fn get_max_credentials(&self) -> u32 {
        self.max_credentials
    }

    pub fn get_definition_json(&self) -> Value {
        self.definition_json.to_owned()
    }
}

impl RecordEntity for RevocationRegistryRecord {
    const KIND: RecordKind = RecordKind::RevocationRegistry;

    fn record_id(&self) -> String {
        self.get_id()
    }

    fn record_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert(TAG_DEFINITION_ID.to_string(), self.definition_id.to_owned());
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;

    #[test]
    fn test_definition_revocation_support() {
        let revocable = DefinitionRecord::new(
            "def-1".to_string(),
            json!({"schemaId": "schema-1", "value": {"primary": {}, "revocation": {"g": "1"}}}),
        );
        assert!(revocable.is_revocable());
        assert_eq!(revocable.get_schema_id(), Some("schema-1".to_string()));

        let plain = DefinitionRecord::new(
            "def-2".to_string(),
            json!({"schemaId": "schema-1", "value": {"primary": {}, "revocation": null}}),
        );
        assert!(!plain.is_revocable());
        assert_eq!(
            plain.record_tags().get(TAG_SCHEMA_ID),
            Some(&"schema-1".to_string())
        );
    }

    #[test]
    fn test_tails_location() {
        let definition = json!({"value": {"tailsLocation": "/tmp/tails/def-1"}});
        assert_eq!(
            tails_location(&definition),
            Some("/tmp/tails/def-1".to_string())
        );
        assert_eq!(tails_location(&json!({"value": {}})), None);
    }
}
