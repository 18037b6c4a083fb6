use std::collections::{BTreeMap, BTreeSet};

use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

use crate::agent::connection::ConnectionRecord;
use crate::agent::machine::StateMachine;
use crate::agent::messaging::messages::{ProofMessage, ProofRequestMessage};
use crate::agent::types::AgentError;

use super::proof::ProofRecord;

pub const TAG_NONCE: &str = "nonce";
pub const TAG_CONNECTION_ID: &str = "connection_id";
pub const TAG_STATE: &str = "state";
pub const TAG_ROLE: &str = "role";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(crate = "self::serde")]
pub enum ProofRole {
    Verifier,
    Prover,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(crate = "self::serde")]
pub enum ProofState {
    Requested,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProofTrigger {
    Accept,
    Reject,
}

impl StateMachine for ProofState {
    type Trigger = ProofTrigger;

    fn next(&self, trigger: Self::Trigger) -> Option<Self> {
        match (self, trigger) {
            (ProofState::Requested, ProofTrigger::Accept) => Some(ProofState::Accepted),
            (ProofState::Requested, ProofTrigger::Reject) => Some(ProofState::Rejected),
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, ProofState::Requested)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct AttributeInfo {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub restrictions: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct PredicateInfo {
    pub name: String,
    pub p_type: String,
    pub p_value: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub restrictions: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct NonRevokedInterval {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub from: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub to: Option<u64>,
}

/// `ProofRequest` is the disclosure request built by a verifier
///
/// The `nonce` is the correlation token of the whole exchange
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ProofRequest {
    pub name: String,
    pub version: String,
    pub nonce: String,
    pub requested_attributes: BTreeMap<String, AttributeInfo>,
    pub requested_predicates: BTreeMap<String, PredicateInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl ProofRequest {
    pub fn new(name: String, version: String, nonce: String) -> Self {
        Self {
            name,
            version,
            nonce,
            requested_attributes: BTreeMap::new(),
            requested_predicates: BTreeMap::new(),
            non_revoked: None,
        }
    }

    pub fn with_attribute(mut self, referent: &str, name: &str) -> Self {
        self.requested_attributes.insert(
            referent.to_string(),
            AttributeInfo {
                name: name.to_string(),
                restrictions: None,
            },
        );
        self
    }

    pub fn with_predicate(mut self, referent: &str, name: &str, p_type: &str, p_value: i64) -> Self {
        self.requested_predicates.insert(
            referent.to_string(),
            PredicateInfo {
                name: name.to_string(),
                p_type: p_type.to_string(),
                p_value,
                restrictions: None,
            },
        );
        self
    }

    pub fn with_non_revoked(mut self, from: Option<u64>, to: Option<u64>) -> Self {
        self.non_revoked = Some(NonRevokedInterval { from, to });
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct RequestedAttribute {
    pub cred_id: String,
    pub revealed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub timestamp: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct RequestedPredicate {
    pub cred_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// `RequestedCredentials` tells which stored credential answers each referent of a
/// proof request, the optional `timestamp` is the non-revocation moment to prove
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(crate = "self::serde")]
pub struct RequestedCredentials {
    pub self_attested_attributes: BTreeMap<String, String>,
    pub requested_attributes: BTreeMap<String, RequestedAttribute>,
    pub requested_predicates: BTreeMap<String, RequestedPredicate>,
}

impl RequestedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(
        mut self,
        referent: &str,
        cred_id: &str,
        revealed: bool,
        timestamp: Option<u64>,
    ) -> Self {
        self.requested_attributes.insert(
            referent.to_string(),
            RequestedAttribute {
                cred_id: cred_id.to_string(),
                revealed,
                timestamp,
            },
        );
        self
    }

    pub fn with_predicate(mut self, referent: &str, cred_id: &str, timestamp: Option<u64>) -> Self {
        self.requested_predicates.insert(
            referent.to_string(),
            RequestedPredicate {
                cred_id: cred_id.to_string(),
                timestamp,
            },
        );
        self
    }

    /// `referenced` returns the distinct `(credential, timestamp)` pairs used by this answer
    pub fn referenced(&self) -> BTreeSet<(String, Option<u64>)> {
        let attributes = self
            .requested_attributes
            .values()
            .map(|attribute| (attribute.cred_id.to_owned(), attribute.timestamp));

        let predicates = self
            .requested_predicates
            .values()
            .map(|predicate| (predicate.cred_id.to_owned(), predicate.timestamp));

        attributes.chain(predicates).collect()
    }
}

/// `ProofIdentifier` is one entry of the `identifiers` list of a built proof, it tells
/// the verifier which ledger artifacts the proof was built from
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ProofIdentifier {
    pub schema_id: String,
    pub cred_def_id: String,

    #[serde(default)]
    pub rev_reg_id: Option<String>,

    #[serde(default)]
    pub timestamp: Option<u64>,
}

/// `ProofAPI` is the main entrypoint of the `proof` workflow
#[async_trait]
pub trait ProofAPI: Clone + Send + Sync {
    async fn create_proof_request(
        &self,
        connection_id: String,
        request: ProofRequest,
    ) -> Result<ProofRecord, AgentError>;

    /// `send_proof_request` creates and sends a proof request. The stored record is kept even
    /// when the request cannot be delivered, the caller retries with `resend_proof_request`
    async fn send_proof_request(
        &self,
        connection_id: String,
        request: ProofRequest,
    ) -> Result<ProofRecord, AgentError>;

    async fn resend_proof_request(&self, proof_id: String) -> Result<ProofRecord, AgentError>;

    async fn process_proof_request(
        &self,
        request: ProofRequestMessage,
        connection: ConnectionRecord,
    ) -> Result<ProofRecord, AgentError>;

    /// `create_proof` builds the proof from the holder's credentials and sends it, the
    /// record is restored when the proof cannot be delivered
    async fn create_proof(
        &self,
        proof_id: String,
        requested: RequestedCredentials,
    ) -> Result<ProofRecord, AgentError>;

    async fn process_proof(
        &self,
        proof: ProofMessage,
        connection: ConnectionRecord,
    ) -> Result<ProofRecord, AgentError>;

    /// `verify_proof` has no side effect on the record, it only reads and computes
    async fn verify_proof(&self, proof_id: String) -> Result<bool, AgentError>;

    async fn reject_proof_request(&self, proof_id: String) -> Result<ProofRecord, AgentError>;
    async fn get_proof(&self, proof_id: String) -> Result<ProofRecord, AgentError>;
    async fn list_proofs(&self, state: Option<ProofState>) -> Result<Vec<ProofRecord>, AgentError>;
}
