use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;

use crate::agent::machine::{StateMachine, TransitionError};
use crate::agent::messaging::types::AgentEndpoint;
use crate::agent::store::types::{RecordEntity, RecordKind, Tags};
use crate::agent::types::AgentError;

use super::types::{
    ConnectionState, ConnectionTrigger, TAG_CONNECTION_KEY, TAG_MY_VERKEY, TAG_STATE,
    TAG_THEIR_DID,
};

/// `ConnectionRecord` is a pairwise relationship with another agent
///
/// The `connection_key` is the ephemeral key of the invitation, on the inviter side it's our own
/// key, on the invitee side it's the inviter's key. Remote DID and key stay empty until the
/// other party sends its own DID through a request or a response
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ConnectionRecord {
    pub(crate) id: String,
    pub(crate) alias: Option<String>,
    pub(crate) state: ConnectionState,
    pub(crate) my_did: Option<String>,
    pub(crate) my_verkey: Option<String>,
    pub(crate) their_did: Option<String>,
    pub(crate) their_verkey: Option<String>,
    pub(crate) their_endpoint: Option<AgentEndpoint>,
    pub(crate) connection_key: Option<String>,
    pub(crate) tags: Tags,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "createdAt")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    #[serde(rename = "updatedAt")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn new(alias: Option<String>, tags: Tags) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alias,
            state: ConnectionState::Disconnected,
            my_did: None,
            my_verkey: None,
            their_did: None,
            their_verkey: None,
            their_endpoint: None,
            connection_key: None,
            tags,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn transition(&mut self, trigger: ConnectionTrigger) -> Result<(), TransitionError> {
        self.state = self.state.fire(trigger)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn get_id(&self) -> String {
        self.id.to_owned()
    }

    pub fn get_alias(&self) -> Option<String> {
        self.alias.to_owned()
    }

    pub fn get_state(&self) -> ConnectionState {
        self.state
    }

    pub fn get_my_did(&self) -> Option<String> {
        self.my_did.to_owned()
    }

    pub fn get_my_verkey(&self) -> Option<String> {
        self.my_verkey.to_owned()
    }

    pub fn get_their_did(&self) -> Option<String> {
        self.their_did.to_owned()
    }

    pub fn get_their_verkey(&self) -> Option<String> {
        self.their_verkey.to_owned()
    }

    pub fn get_their_endpoint(&self) -> Option<AgentEndpoint> {
        self.their_endpoint.to_owned()
    }

    pub fn get_connection_key(&self) -> Option<String> {
        self.connection_key.to_owned()
    }

    pub fn get_tags(&self) -> Tags {
        self.tags.to_owned()
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// `ensure_connected` used by the credential and proof workflows, both of them
    /// are only able to run over an established connection
    pub fn ensure_connected(&self) -> Result<(), AgentError> {
        if self.state != ConnectionState::Connected {
            return Err(AgentError::RecordInInvalidState(format!(
                "connection {} is {}, expected {}",
                self.id,
                self.state,
                ConnectionState::Connected
            )));
        }

        Ok(())
    }

    /// `outbound` returns everything needed to send a message through this connection:
    /// our own key, the remote key and the remote endpoint
    pub fn outbound(&self) -> Result<(String, String, AgentEndpoint), AgentError> {
        let missing = |field: &str| {
            AgentError::RecordInInvalidState(format!("connection {}: {} was missing", self.id, field))
        };

        let my_verkey = self.my_verkey.to_owned().ok_or_else(|| missing("my_verkey"))?;
        let their_verkey = self
            .their_verkey
            .to_owned()
            .ok_or_else(|| missing("their_verkey"))?;
        let endpoint = self
            .their_endpoint
            .to_owned()
            .ok_or_else(|| missing("their_endpoint"))?;

        Ok((my_verkey, their_verkey, endpoint))
    }
}

impl RecordEntity for ConnectionRecord {
    const KIND: RecordKind = RecordKind::Connection;

    fn record_id(&self) -> String {
        self.get_id()
    }

    fn record_tags(&self) -> Tags {
        let mut tags = self.tags.clone();
        tags.insert(TAG_STATE.to_string(), self.state.to_string());

        if let Some(key) = &self.connection_key {
            tags.insert(TAG_CONNECTION_KEY.to_string(), key.to_owned());
        }

        if let Some(verkey) = &self.my_verkey {
            tags.insert(TAG_MY_VERKEY.to_string(), verkey.to_owned());
        }

        if let Some(did) = &self.their_did {
            tags.insert(TAG_THEIR_DID.to_string(), did.to_owned());
        }

        tags
    }
}
