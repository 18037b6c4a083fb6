use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::standard::uuid::Uuid;

use crate::agent::machine::{StateMachine, TransitionError};
use crate::agent::store::types::{RecordEntity, RecordKind, Tags};

use super::types::{ProofRole, ProofState, ProofTrigger, TAG_CONNECTION_ID, TAG_NONCE, TAG_ROLE, TAG_STATE};

/// `ProofRecord` is one party's copy of a disclosure exchange
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ProofRecord {
    pub(crate) id: String,
    pub(crate) role: ProofRole,
    pub(crate) connection_id: String,
    pub(crate) nonce: String,
    pub(crate) state: ProofState,
    pub(crate) request_json: Value,
    pub(crate) proof_json: Option<Value>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl ProofRecord {
    pub fn new(role: ProofRole, connection_id: String, nonce: String, request_json: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            connection_id,
            nonce,
            state: ProofState::Requested,
            request_json,
            proof_json: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, trigger: ProofTrigger) -> Result<(), TransitionError> {
        self.state = self.state.fire(trigger)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_role(&self) -> ProofRole {
        self.role
    }

    pub fn get_connection_id(&self) -> String {
        self.connection_id.to_owned()
    }

    pub fn get_nonce(&self) -> String {
        self.nonce.to_owned()
    }

    pub fn get_state(&self) -> ProofState {
        self.state
    }

    pub fn get_request_json(&self) -> Value {
        self.request_json.to_owned()
    }

    pub fn get_proof_json(&self) -> Option<Value> {
        self.proof_json.to_owned()
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl RecordEntity for ProofRecord {
    const KIND: RecordKind = RecordKind::Proof;

    fn record_id(&self) -> String {
        self.get_id()
    }

    fn record_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert(TAG_NONCE.to_string(), self.nonce.to_owned());
        tags.insert(TAG_CONNECTION_ID.to_string(), self.connection_id.to_owned());
        tags.insert(TAG_STATE.to_string(), self.state.to_string());
        tags.insert(TAG_ROLE.to_string(), self.role.to_string());
        tags
    }
}
