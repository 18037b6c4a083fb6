use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::standard::uuid::Uuid;

use crate::agent::machine::{StateMachine, TransitionError};
use crate::agent::store::types::{RecordEntity, RecordKind, Tags};

use super::types::{
    CredentialRole, CredentialState, CredentialTrigger, TAG_CONNECTION_ID, TAG_DEFINITION_ID,
    TAG_NONCE, TAG_ROLE, TAG_SCHEMA_ID, TAG_STATE,
};

/// `CredentialRecord` is one party's copy of a credential exchange
///
/// The issuer and the holder keep their own records, correlated through the offer `nonce`
/// and the `(schema_id, definition_id, connection_id)` triple
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct CredentialRecord {
    pub(crate) id: String,
    pub(crate) role: CredentialRole,
    pub(crate) connection_id: String,
    pub(crate) definition_id: String,
    pub(crate) schema_id: String,
    pub(crate) nonce: String,
    pub(crate) state: CredentialState,
    pub(crate) offer_json: Value,
    pub(crate) request_json: Option<Value>,
    pub(crate) request_metadata_json: Option<Value>,
    pub(crate) values_json: Option<Value>,
    pub(crate) credential_json: Option<Value>,
    pub(crate) credential_ref: Option<String>,
    pub(crate) revocation_registry_id: Option<String>,
    pub(crate) revocation_id: Option<String>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(
        role: CredentialRole,
        connection_id: String,
        definition_id: String,
        schema_id: String,
        nonce: String,
        offer_json: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            connection_id,
            definition_id,
            schema_id,
            nonce,
            state: CredentialState::Offered,
            offer_json,
            request_json: None,
            request_metadata_json: None,
            values_json: None,
            credential_json: None,
            credential_ref: None,
            revocation_registry_id: None,
            revocation_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, trigger: CredentialTrigger) -> Result<(), TransitionError> {
        self.state = self.state.fire(trigger)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_role(&self) -> CredentialRole {
        self.role
    }

    pub fn get_connection_id(&self) -> String {
        self.connection_id.to_owned()
    }

    pub fn get_definition_id(&self) -> String {
        self.definition_id.to_owned()
    }

    pub fn get_schema_id(&self) -> String {
        self.schema_id.to_owned()
    }

    pub fn get_nonce(&self) -> String {
        self.nonce.to_owned()
    }

    pub fn get_state(&self) -> CredentialState {
        self.state
    }

    pub fn get_offer_json(&self) -> Value {
        self.offer_json.to_owned()
    }

    pub fn get_request_json(&self) -> Option<Value> {
        self.request_json.to_owned()
    }

    pub fn get_values_json(&self) -> Option<Value> {
        self.values_json.to_owned()
    }

    pub fn get_credential_json(&self) -> Option<Value> {
        self.credential_json.to_owned()
    }

    pub fn get_credential_ref(&self) -> Option<String> {
        self.credential_ref.to_owned()
    }

    pub fn get_revocation_registry_id(&self) -> Option<String> {
        self.revocation_registry_id.to_owned()
    }

    pub fn get_revocation_id(&self) -> Option<String> {
        self.revocation_id.to_owned()
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl RecordEntity for CredentialRecord {
    const KIND: RecordKind = RecordKind::Credential;

    fn record_id(&self) -> String {
        self.get_id()
    }

    fn record_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert(TAG_NONCE.to_string(), self.nonce.to_owned());
        tags.insert(TAG_CONNECTION_ID.to_string(), self.connection_id.to_owned());
        tags.insert(TAG_DEFINITION_ID.to_string(), self.definition_id.to_owned());
        tags.insert(TAG_SCHEMA_ID.to_string(), self.schema_id.to_owned());
        tags.insert(TAG_STATE.to_string(), self.state.to_string());
        tags.insert(TAG_ROLE.to_string(), self.role.to_string());
        tags
    }
}
