use std::collections::{BTreeMap, BTreeSet};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_tracing::tracing::{debug, info, warn};

use crate::agent::connection::ConnectionRecord;
use crate::agent::machine::StateMachine;
use crate::agent::messaging::messages::{ProofMessage, ProofRequestMessage};
use crate::agent::messaging::messenger::Messenger;
use crate::agent::messaging::types::{AgentMessage, DispatcherBuilder};
use crate::agent::provisioning::ProvisioningRecord;
use crate::agent::registrar::Registrar;
use crate::agent::services::credmath::{CredentialMathBuilder, ProofArtifacts};
use crate::agent::services::crypto::CryptoBuilder;
use crate::agent::services::ledger::LedgerBuilder;
use crate::agent::store::types::{RecordStoreBuilder, TagQuery};
use crate::agent::store::{Repository, Rollback};
use crate::agent::types::AgentError;

use super::proof::ProofRecord;
use super::types::{
    ProofAPI, ProofIdentifier, ProofRequest, ProofRole, ProofState, ProofTrigger,
    RequestedCredentials, TAG_CONNECTION_ID, TAG_NONCE, TAG_ROLE, TAG_STATE,
};

fn ensure_role(record: &ProofRecord, role: ProofRole) -> Result<(), AgentError> {
    if record.get_role() != role {
        return Err(AgentError::RecordInInvalidState(format!(
            "proof {} is kept by the {}, expected {}",
            record.get_id(),
            record.get_role(),
            role
        )));
    }

    Ok(())
}

fn proof_identifiers(proof: &Value) -> Result<Vec<ProofIdentifier>, AgentError> {
    let identifiers = proof
        .get("identifiers")
        .cloned()
        .ok_or(AgentError::InvalidMessage("identifiers was missing".to_string()))?;

    serde_json::from_value(identifiers).map_err(|err| AgentError::InvalidMessage(err.to_string()))
}

/// `Usecase` is the implementation of [`ProofAPI`]
#[derive(Clone)]
pub struct Usecase<TStore, TCrypto, TDispatcher, TMath, TLedger>
where
    TStore: RecordStoreBuilder,
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
    TMath: CredentialMathBuilder,
    TLedger: LedgerBuilder,
{
    repo: Repository<TStore>,
    messenger: Messenger<TCrypto, TDispatcher>,
    math: TMath,
    registrar: Registrar<TStore, TMath, TLedger>,
    provisioning: ProvisioningRecord,
}

impl<TStore, TCrypto, TDispatcher, TMath, TLedger> Usecase<TStore, TCrypto, TDispatcher, TMath, TLedger>
where
    TStore: RecordStoreBuilder,
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
    TMath: CredentialMathBuilder,
    TLedger: LedgerBuilder,
{
    pub fn new(
        store: TStore,
        messenger: Messenger<TCrypto, TDispatcher>,
        math: TMath,
        registrar: Registrar<TStore, TMath, TLedger>,
        provisioning: ProvisioningRecord,
    ) -> Self {
        Self {
            repo: Repository::new(store),
            messenger,
            math,
            registrar,
            provisioning,
        }
    }

    async fn connected(&self, connection_id: &str) -> Result<ConnectionRecord, AgentError> {
        let connection = self.repo.get::<ConnectionRecord>(connection_id).await?;
        connection.ensure_connected()?;
        Ok(connection)
    }

    /// `ensure_unique_nonce` allows a single non terminal proof per nonce in the wallet
    async fn ensure_unique_nonce(&self, nonce: &str) -> Result<(), AgentError> {
        let found = self
            .repo
            .search::<ProofRecord>(TagQuery::new().with(TAG_NONCE, nonce))
            .await?;

        if found.iter().any(|record| !record.get_state().is_terminal()) {
            return Err(AgentError::RecordInInvalidState(format!(
                "nonce {} already used by a pending proof",
                nonce
            )));
        }

        Ok(())
    }

    async fn send_request(&self, record: &ProofRecord) -> Result<(), AgentError> {
        let connection = self.connected(&record.get_connection_id()).await?;
        let (my_verkey, their_verkey, endpoint) = connection.outbound()?;

        let message = ProofRequestMessage::new(record.get_request_json());
        self.messenger
            .send(&message, Some(my_verkey), their_verkey, &endpoint)
            .await
    }

    /// `gather_artifacts` builds the deduplicated ledger artifacts needed by the prover,
    /// a revocation state is built once per registry and timestamp
    async fn gather_artifacts(
        &self,
        requested: &RequestedCredentials,
    ) -> Result<ProofArtifacts, AgentError> {
        let mut artifacts = ProofArtifacts::default();
        let mut schema_ids = BTreeSet::new();
        let mut definition_ids = BTreeSet::new();

        for (cred_id, timestamp) in requested.referenced() {
            let info = self.math.get_credential(cred_id.clone()).await?;
            schema_ids.insert(info.schema_id.clone());
            definition_ids.insert(info.cred_def_id.clone());

            let (registry_id, timestamp) = match (info.rev_reg_id.clone(), timestamp) {
                (Some(registry_id), Some(timestamp)) => (registry_id, timestamp),
                _ => continue,
            };

            let built = artifacts
                .revocation
                .get(&registry_id)
                .map(|states| states.contains_key(&timestamp))
                .unwrap_or(false);

            if built {
                continue;
            }

            let revocation_id = info.cred_rev_id.clone().ok_or(AgentError::CredentialMathError(
                format!("credential {} has no revocation index", cred_id),
            ))?;

            let definition = match artifacts.revocation_definitions.get(&registry_id) {
                Some(definition) => definition.clone(),
                None => {
                    self.registrar
                        .lookup_revocation_definition(registry_id.clone())
                        .await?
                }
            };

            let delta = self
                .registrar
                .ledger()
                .lookup_revocation_delta(registry_id.clone(), None, timestamp)
                .await?;

            let tails = self.registrar.open_tails_for(&definition).await?;
            let state = self
                .math
                .create_revocation_state(
                    tails,
                    definition.clone(),
                    delta.value,
                    delta.timestamp,
                    revocation_id,
                )
                .await?;

            debug!(registry = %registry_id, timestamp, "revocation state built");
            artifacts
                .revocation_definitions
                .insert(registry_id.clone(), definition);
            artifacts
                .revocation
                .entry(registry_id)
                .or_insert_with(BTreeMap::new)
                .insert(timestamp, state);
        }

        for schema_id in schema_ids {
            let schema = self.registrar.lookup_schema(schema_id.clone()).await?;
            artifacts.schemas.insert(schema_id, schema);
        }

        for definition_id in definition_ids {
            let definition = self.registrar.lookup_definition(definition_id.clone()).await?;
            artifacts.definitions.insert(definition_id, definition);
        }

        Ok(artifacts)
    }

    /// `verification_artifacts` re-derives the artifact sets from the identifiers of a
    /// received proof, revocation registries are read at the proven timestamps
    async fn verification_artifacts(
        &self,
        identifiers: Vec<ProofIdentifier>,
    ) -> Result<ProofArtifacts, AgentError> {
        let mut artifacts = ProofArtifacts::default();

        for identifier in identifiers {
            if !artifacts.schemas.contains_key(&identifier.schema_id) {
                let schema = self
                    .registrar
                    .lookup_schema(identifier.schema_id.clone())
                    .await?;
                artifacts.schemas.insert(identifier.schema_id.clone(), schema);
            }

            if !artifacts.definitions.contains_key(&identifier.cred_def_id) {
                let definition = self
                    .registrar
                    .lookup_definition(identifier.cred_def_id.clone())
                    .await?;
                artifacts
                    .definitions
                    .insert(identifier.cred_def_id.clone(), definition);
            }

            let (registry_id, timestamp) = match (identifier.rev_reg_id, identifier.timestamp) {
                (Some(registry_id), Some(timestamp)) => (registry_id, timestamp),
                _ => continue,
            };

            if !artifacts.revocation_definitions.contains_key(&registry_id) {
                let definition = self
                    .registrar
                    .lookup_revocation_definition(registry_id.clone())
                    .await?;
                artifacts
                    .revocation_definitions
                    .insert(registry_id.clone(), definition);
            }

            let known = artifacts
                .revocation
                .get(&registry_id)
                .map(|registries| registries.contains_key(&timestamp))
                .unwrap_or(false);

            if !known {
                let registry = self
                    .registrar
                    .ledger()
                    .lookup_revocation_registry(registry_id.clone(), timestamp)
                    .await?;

                artifacts
                    .revocation
                    .entry(registry_id)
                    .or_insert_with(BTreeMap::new)
                    .insert(timestamp, registry.value);
            }
        }

        Ok(artifacts)
    }
}

#[async_trait]
impl<TStore, TCrypto, TDispatcher, TMath, TLedger> ProofAPI
    for Usecase<TStore, TCrypto, TDispatcher, TMath, TLedger>
where
    TStore: RecordStoreBuilder,
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
    TMath: CredentialMathBuilder,
    TLedger: LedgerBuilder,
{
    async fn create_proof_request(
        &self,
        connection_id: String,
        request: ProofRequest,
    ) -> Result<ProofRecord, AgentError> {
        if request.nonce.is_empty() {
            return Err(AgentError::ValidationError(
                "proof request nonce was missing".to_string(),
            ));
        }

        let _ = self.connected(&connection_id).await?;
        self.ensure_unique_nonce(&request.nonce).await?;

        let request_json =
            serde_json::to_value(&request).map_err(|err| AgentError::JSONError(err.to_string()))?;

        let record = ProofRecord::new(
            ProofRole::Verifier,
            connection_id,
            request.nonce,
            request_json,
        );
        self.repo.add(&record).await?;

        debug!(id = %record.get_id(), "proof request created");
        Ok(record)
    }

    async fn send_proof_request(
        &self,
        connection_id: String,
        request: ProofRequest,
    ) -> Result<ProofRecord, AgentError> {
        let record = self.create_proof_request(connection_id, request).await?;
        self.send_request(&record).await.map_err(|err| {
            warn!(id = %record.get_id(), error = %err, "proof request kept, not delivered");
            err
        })?;

        info!(id = %record.get_id(), "proof request sent");
        Ok(record)
    }

    async fn resend_proof_request(&self, proof_id: String) -> Result<ProofRecord, AgentError> {
        let record = self.repo.get::<ProofRecord>(&proof_id).await?;
        ensure_role(&record, ProofRole::Verifier)?;
        let _ = record.get_state().fire(ProofTrigger::Accept)?;

        self.send_request(&record).await?;

        info!(id = %record.get_id(), "proof request sent again");
        Ok(record)
    }

    async fn process_proof_request(
        &self,
        request: ProofRequestMessage,
        connection: ConnectionRecord,
    ) -> Result<ProofRecord, AgentError> {
        request.validate_type()?;
        connection.ensure_connected()?;

        let nonce = request.nonce()?;
        self.ensure_unique_nonce(&nonce).await?;

        let record = ProofRecord::new(
            ProofRole::Prover,
            connection.get_id(),
            nonce,
            request.get_request_json(),
        );
        self.repo.add(&record).await?;

        info!(id = %record.get_id(), "proof request received");
        Ok(record)
    }

    async fn create_proof(
        &self,
        proof_id: String,
        requested: RequestedCredentials,
    ) -> Result<ProofRecord, AgentError> {
        let snapshot = self.repo.get::<ProofRecord>(&proof_id).await?;
        ensure_role(&snapshot, ProofRole::Prover)?;
        let _ = snapshot.get_state().fire(ProofTrigger::Accept)?;

        let connection = self.connected(&snapshot.get_connection_id()).await?;
        let (my_verkey, their_verkey, endpoint) = connection.outbound()?;

        let artifacts = self.gather_artifacts(&requested).await?;
        let requested_json = serde_json::to_value(&requested)
            .map_err(|err| AgentError::JSONError(err.to_string()))?;

        let proof = self
            .math
            .create_proof(
                snapshot.get_request_json(),
                requested_json,
                self.provisioning.get_master_secret_id(),
                artifacts,
            )
            .await?;

        let mut record = snapshot.clone();
        record.proof_json = Some(proof.clone());
        record.transition(ProofTrigger::Accept)?;

        self.repo.update(&record).await?;

        let message = ProofMessage::new(record.get_nonce(), proof);
        self.repo
            .with_compensation(
                Rollback::Restore(snapshot),
                self.messenger
                    .send(&message, Some(my_verkey), their_verkey, &endpoint),
            )
            .await?;

        info!(id = %record.get_id(), "proof sent");
        Ok(record)
    }

    async fn process_proof(
        &self,
        proof: ProofMessage,
        connection: ConnectionRecord,
    ) -> Result<ProofRecord, AgentError> {
        proof.validate_type()?;
        connection.ensure_connected()?;

        let mut record = self
            .repo
            .find_active::<ProofRecord, _>(
                TagQuery::new()
                    .with(TAG_NONCE, proof.nonce()?)
                    .with(TAG_CONNECTION_ID, connection.get_id())
                    .with(TAG_ROLE, ProofRole::Verifier.to_string()),
                |record: &ProofRecord| !record.get_state().is_terminal(),
            )
            .await?;

        record.transition(ProofTrigger::Accept)?;
        record.proof_json = Some(proof.get_proof_json());

        self.repo.update(&record).await?;

        info!(id = %record.get_id(), "proof received");
        Ok(record)
    }

    async fn verify_proof(&self, proof_id: String) -> Result<bool, AgentError> {
        let record = self.repo.get::<ProofRecord>(&proof_id).await?;
        ensure_role(&record, ProofRole::Verifier)?;

        let proof = record
            .get_proof_json()
            .ok_or(AgentError::RecordInInvalidState(format!(
                "proof {} has not been presented",
                proof_id
            )))?;

        let artifacts = self
            .verification_artifacts(proof_identifiers(&proof)?)
            .await?;

        let verified = self
            .math
            .verify_proof(record.get_request_json(), proof, artifacts)
            .await?;

        info!(id = %record.get_id(), verified, "proof verified");
        Ok(verified)
    }

    async fn reject_proof_request(&self, proof_id: String) -> Result<ProofRecord, AgentError> {
        let mut record = self.repo.get::<ProofRecord>(&proof_id).await?;
        record.transition(ProofTrigger::Reject)?;
        self.repo.update(&record).await?;
        Ok(record)
    }

    async fn get_proof(&self, proof_id: String) -> Result<ProofRecord, AgentError> {
        self.repo.get::<ProofRecord>(&proof_id).await
    }

    async fn list_proofs(&self, state: Option<ProofState>) -> Result<Vec<ProofRecord>, AgentError> {
        let query = match state {
            Some(state) => TagQuery::new().with(TAG_STATE, state.to_string()),
            None => TagQuery::new(),
        };

        self.repo.search::<ProofRecord>(query).await
    }
}
