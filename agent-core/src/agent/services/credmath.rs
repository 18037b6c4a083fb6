use std::collections::BTreeMap;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

use crate::agent::types::AgentError;

/// `TailsReader` is an opened reader over a revocation registry tails file
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct TailsReader {
    pub handle: String,
    pub location: String,
}

/// `LedgerArtifact` is a schema or credential definition produced locally and
/// ready to be published
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct LedgerArtifact {
    pub id: String,
    pub value: Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct RevocationRegistryArtifact {
    pub id: String,
    pub definition: Value,
    pub entry: Value,
}

/// `CredentialRequestArtifact` is the blinded request sent to the issuer, the
/// `metadata` never leaves the holder and is needed to store the issued credential
///
/// The `request` payload must carry the `nonce` of the offer it answers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct CredentialRequestArtifact {
    pub request: Value,
    pub metadata: Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct IssuedCredential {
    pub credential: Value,
    pub revocation_id: Option<String>,
    pub delta: Option<Value>,
}

/// `CredentialInfo` describes a credential stored in the holder's wallet
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct CredentialInfo {
    pub referent: String,
    pub attrs: BTreeMap<String, String>,
    pub schema_id: String,
    pub cred_def_id: String,
    pub rev_reg_id: Option<String>,
    pub cred_rev_id: Option<String>,
}

/// `ProofArtifacts` gathers the ledger artifacts needed to build or to verify a proof
///
/// The `revocation` map is keyed by registry id and then by timestamp. When building a
/// proof it contains revocation states, when verifying it contains revocation registries
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(crate = "self::serde")]
pub struct ProofArtifacts {
    pub schemas: BTreeMap<String, Value>,
    pub definitions: BTreeMap<String, Value>,
    pub revocation_definitions: BTreeMap<String, Value>,
    pub revocation: BTreeMap<String, BTreeMap<u64, Value>>,
}

/// `CredentialMathBuilder` is the Credential-Math service
///
/// Every payload is an opaque JSON value, the protocol layer only extracts the
/// correlation fields it needs (`nonce`, `schema_id`, `cred_def_id`, `rev_reg_id`)
#[async_trait]
pub trait CredentialMathBuilder: Clone + Send + Sync {
    async fn create_schema(
        &self,
        issuer_did: String,
        name: String,
        version: String,
        attributes: Vec<String>,
    ) -> Result<LedgerArtifact, AgentError>;

    async fn create_definition(
        &self,
        issuer_did: String,
        schema: Value,
        tag: String,
        supports_revocation: bool,
    ) -> Result<LedgerArtifact, AgentError>;

    async fn create_revocation_registry(
        &self,
        issuer_did: String,
        definition_id: String,
        tails_location: String,
        max_credentials: u32,
    ) -> Result<RevocationRegistryArtifact, AgentError>;

    async fn create_offer(&self, definition_id: String) -> Result<Value, AgentError>;

    async fn create_request(
        &self,
        prover_did: String,
        offer: Value,
        definition: Value,
        master_secret_id: String,
    ) -> Result<CredentialRequestArtifact, AgentError>;

    async fn create_credential(
        &self,
        offer: Value,
        request: Value,
        values: Value,
        revocation_registry_id: Option<String>,
        tails: Option<TailsReader>,
    ) -> Result<IssuedCredential, AgentError>;

    async fn store_credential(
        &self,
        request_metadata: Value,
        credential: Value,
        definition: Value,
        revocation_definition: Option<Value>,
    ) -> Result<String, AgentError>;

    async fn get_credential(&self, credential_ref: String) -> Result<CredentialInfo, AgentError>;

    async fn revoke_credential(
        &self,
        tails: TailsReader,
        revocation_registry_id: String,
        revocation_id: String,
    ) -> Result<Value, AgentError>;

    async fn create_revocation_state(
        &self,
        tails: TailsReader,
        revocation_definition: Value,
        delta: Value,
        timestamp: u64,
        revocation_id: String,
    ) -> Result<Value, AgentError>;

    async fn create_proof(
        &self,
        proof_request: Value,
        requested_credentials: Value,
        master_secret_id: String,
        artifacts: ProofArtifacts,
    ) -> Result<Value, AgentError>;

    async fn verify_proof(
        &self,
        proof_request: Value,
        proof: Value,
        artifacts: ProofArtifacts,
    ) -> Result<bool, AgentError>;

    async fn open_tails_reader(&self, location: String) -> Result<TailsReader, AgentError>;
}
