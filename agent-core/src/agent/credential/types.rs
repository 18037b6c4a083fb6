use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

use crate::agent::connection::ConnectionRecord;
use crate::agent::machine::StateMachine;
use crate::agent::messaging::messages::{CredentialIssue, CredentialOffer, CredentialRequest};
use crate::agent::types::AgentError;

use super::credential::CredentialRecord;

pub const TAG_NONCE: &str = "nonce";
pub const TAG_CONNECTION_ID: &str = "connection_id";
pub const TAG_DEFINITION_ID: &str = "definition_id";
pub const TAG_SCHEMA_ID: &str = "schema_id";
pub const TAG_STATE: &str = "state";
pub const TAG_ROLE: &str = "role";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(crate = "self::serde")]
pub enum CredentialRole {
    Issuer,
    Holder,
}

/// `CredentialState` is the lifecycle of a single credential exchange
///
/// Transitions only move forward, `Rejected` is a terminal branch reachable from
/// `Offered` and `Requested`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(crate = "self::serde")]
pub enum CredentialState {
    Offered,
    Requested,
    Issued,
    Revoked,
    Rejected,
}

impl CredentialState {
    /// `is_in_flight` is true while the exchange still waits for the other party
    pub fn is_in_flight(&self) -> bool {
        matches!(self, CredentialState::Offered | CredentialState::Requested)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CredentialTrigger {
    Request,
    Issue,
    Revoke,
    RejectOffer,
    RejectRequest,
}

impl StateMachine for CredentialState {
    type Trigger = CredentialTrigger;

    fn next(&self, trigger: Self::Trigger) -> Option<Self> {
        match (self, trigger) {
            (CredentialState::Offered, CredentialTrigger::Request) => {
                Some(CredentialState::Requested)
            }
            (CredentialState::Requested, CredentialTrigger::Issue) => Some(CredentialState::Issued),
            (CredentialState::Issued, CredentialTrigger::Revoke) => Some(CredentialState::Revoked),
            (CredentialState::Offered, CredentialTrigger::RejectOffer) => {
                Some(CredentialState::Rejected)
            }
            (CredentialState::Requested, CredentialTrigger::RejectRequest) => {
                Some(CredentialState::Rejected)
            }
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, CredentialState::Revoked | CredentialState::Rejected)
    }
}

/// `CredentialAPI` is the main entrypoint of the `credential` workflow
///
/// Every operation that needs the other party runs over an established connection, the
/// `process_*` methods receive the connection already resolved from the inbound envelope
#[async_trait]
pub trait CredentialAPI: Clone + Send + Sync {
    /// `create_offer` stores a new issuer record in [`CredentialState::Offered`] without sending it
    async fn create_offer(
        &self,
        connection_id: String,
        definition_id: String,
        values: Option<Value>,
    ) -> Result<(CredentialOffer, CredentialRecord), AgentError>;

    /// `send_offer` creates an offer and sends it, the record is deleted when the
    /// offer cannot be delivered
    async fn send_offer(
        &self,
        connection_id: String,
        definition_id: String,
        values: Option<Value>,
    ) -> Result<CredentialRecord, AgentError>;

    async fn process_offer(
        &self,
        offer: CredentialOffer,
        connection: ConnectionRecord,
    ) -> Result<CredentialRecord, AgentError>;

    async fn accept_offer(
        &self,
        credential_id: String,
        values: Option<Value>,
    ) -> Result<CredentialRecord, AgentError>;

    async fn process_credential_request(
        &self,
        request: CredentialRequest,
        connection: ConnectionRecord,
    ) -> Result<CredentialRecord, AgentError>;

    async fn issue_credential(
        &self,
        credential_id: String,
        values: Option<Value>,
    ) -> Result<CredentialRecord, AgentError>;

    async fn process_credential(
        &self,
        credential: CredentialIssue,
        connection: ConnectionRecord,
    ) -> Result<CredentialRecord, AgentError>;

    async fn revoke_credential(&self, credential_id: String) -> Result<CredentialRecord, AgentError>;
    async fn reject_offer(&self, credential_id: String) -> Result<CredentialRecord, AgentError>;

    async fn reject_credential_request(
        &self,
        credential_id: String,
    ) -> Result<CredentialRecord, AgentError>;

    async fn get_credential(&self, credential_id: String) -> Result<CredentialRecord, AgentError>;

    async fn list_credentials(
        &self,
        state: Option<CredentialState>,
    ) -> Result<Vec<CredentialRecord>, AgentError>;
}
