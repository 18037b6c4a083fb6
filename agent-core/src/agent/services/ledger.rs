use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

use crate::agent::types::AgentError;

/// `LedgerReply` is the response of a ledger write
///
/// Only `Reply` means the transaction was accepted, both `Reject` and `ReqNack` carry
/// the ledger's reason
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
#[serde(tag = "op", content = "result")]
pub enum LedgerReply {
    Reply(Value),
    Reject(String),
    ReqNack(String),
}

impl LedgerReply {
    pub fn into_result(self) -> Result<Value, AgentError> {
        match self {
            LedgerReply::Reply(value) => Ok(value),
            LedgerReply::Reject(reason) => Err(AgentError::LedgerOperationRejected(format!(
                "REJECT: {}",
                reason
            ))),
            LedgerReply::ReqNack(reason) => Err(AgentError::LedgerOperationRejected(format!(
                "REQNACK: {}",
                reason
            ))),
        }
    }
}

/// `RevocationSnapshot` is a revocation delta or registry value as accepted by the
/// ledger at `timestamp`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct RevocationSnapshot {
    pub value: Value,
    pub timestamp: u64,
}

/// `LedgerBuilder` is the Ledger service
#[async_trait]
pub trait LedgerBuilder: Clone + Send + Sync {
    async fn register_schema(
        &self,
        submitter_did: String,
        schema_id: String,
        schema: Value,
    ) -> Result<LedgerReply, AgentError>;

    async fn register_definition(
        &self,
        submitter_did: String,
        definition_id: String,
        definition: Value,
    ) -> Result<LedgerReply, AgentError>;

    async fn register_revocation_registry(
        &self,
        submitter_did: String,
        registry_id: String,
        definition: Value,
        entry: Value,
    ) -> Result<LedgerReply, AgentError>;

    async fn send_revocation_delta(
        &self,
        submitter_did: String,
        registry_id: String,
        delta: Value,
    ) -> Result<LedgerReply, AgentError>;

    async fn lookup_schema(&self, schema_id: String) -> Result<Value, AgentError>;
    async fn lookup_definition(&self, definition_id: String) -> Result<Value, AgentError>;
    async fn lookup_revocation_definition(&self, registry_id: String) -> Result<Value, AgentError>;

    async fn lookup_revocation_delta(
        &self,
        registry_id: String,
        from: Option<u64>,
        to: u64,
    ) -> Result<RevocationSnapshot, AgentError>;

    async fn lookup_revocation_registry(
        &self,
        registry_id: String,
        timestamp: u64,
    ) -> Result<RevocationSnapshot, AgentError>;
}
