use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::Value;
use rst_common::with_tracing::tracing::{debug, info};

use crate::agent::connection::ConnectionRecord;
use crate::agent::machine::StateMachine;
use crate::agent::messaging::messages::{CredentialIssue, CredentialOffer, CredentialRequest};
use crate::agent::messaging::messenger::Messenger;
use crate::agent::messaging::types::{AgentMessage, DispatcherBuilder};
use crate::agent::provisioning::ProvisioningRecord;
use crate::agent::registrar::types::supports_revocation;
use crate::agent::registrar::Registrar;
use crate::agent::services::credmath::CredentialMathBuilder;
use crate::agent::services::crypto::CryptoBuilder;
use crate::agent::services::ledger::LedgerBuilder;
use crate::agent::store::types::{RecordStoreBuilder, TagQuery};
use crate::agent::store::{Repository, Rollback};
use crate::agent::types::AgentError;

use super::credential::CredentialRecord;
use super::types::{
    CredentialAPI, CredentialRole, CredentialState, CredentialTrigger, TAG_CONNECTION_ID,
    TAG_DEFINITION_ID, TAG_NONCE, TAG_ROLE, TAG_SCHEMA_ID, TAG_STATE,
};

fn ensure_role(record: &CredentialRecord, role: CredentialRole) -> Result<(), AgentError> {
    if record.get_role() != role {
        return Err(AgentError::RecordInInvalidState(format!(
            "credential {} is kept by the {}, expected {}",
            record.get_id(),
            record.get_role(),
            role
        )));
    }

    Ok(())
}

/// `merge_values` extends the current attribute values with the given ones, the
/// given values win on conflicts
fn merge_values(current: Option<Value>, given: Option<Value>) -> Option<Value> {
    match (current, given) {
        (Some(Value::Object(mut current)), Some(Value::Object(given))) => {
            current.extend(given);
            Some(Value::Object(current))
        }
        (current, None) => current,
        (_, given) => given,
    }
}

/// `Usecase` is the implementation of [`CredentialAPI`]
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

    /// `ensure_unique_nonce` keeps the offer nonce unique among in-flight exchanges
    /// of the same connection
    async fn ensure_unique_nonce(&self, connection_id: &str, nonce: &str) -> Result<(), AgentError> {
        let found = self
            .repo
            .search::<CredentialRecord>(
                TagQuery::new()
                    .with(TAG_NONCE, nonce)
                    .with(TAG_CONNECTION_ID, connection_id),
            )
            .await?;

        if found.iter().any(|record| record.get_state().is_in_flight()) {
            return Err(AgentError::RecordInInvalidState(format!(
                "nonce {} already used by an in-flight credential",
                nonce
            )));
        }

        Ok(())
    }

    async fn send_through<T: AgentMessage>(
        &self,
        message: &T,
        connection: &ConnectionRecord,
        rollback: Rollback<CredentialRecord>,
    ) -> Result<(), AgentError> {
        let (my_verkey, their_verkey, endpoint) = connection.outbound()?;
        self.repo
            .with_compensation(
                rollback,
                self.messenger
                    .send(message, Some(my_verkey), their_verkey, &endpoint),
            )
            .await
    }
}

#[async_trait]
impl<TStore, TCrypto, TDispatcher, TMath, TLedger> CredentialAPI
    for Usecase<TStore, TCrypto, TDispatcher, TMath, TLedger>
where
    TStore: RecordStoreBuilder,
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
    TMath: CredentialMathBuilder,
    TLedger: LedgerBuilder,
{
    async fn create_offer(
        &self,
        connection_id: String,
        definition_id: String,
        values: Option<Value>,
    ) -> Result<(CredentialOffer, CredentialRecord), AgentError> {
        let _ = self.connected(&connection_id).await?;

        let offer = CredentialOffer::new(self.math.create_offer(definition_id.clone()).await?);
        let nonce = offer.nonce()?;
        self.ensure_unique_nonce(&connection_id, &nonce).await?;

        let mut record = CredentialRecord::new(
            CredentialRole::Issuer,
            connection_id,
            definition_id,
            offer.schema_id()?,
            nonce,
            offer.get_offer_json(),
        );
        record.values_json = values;

        self.repo.add(&record).await?;

        debug!(id = %record.get_id(), "credential offer created");
        Ok((offer, record))
    }

    async fn send_offer(
        &self,
        connection_id: String,
        definition_id: String,
        values: Option<Value>,
    ) -> Result<CredentialRecord, AgentError> {
        let (offer, record) = self
            .create_offer(connection_id.clone(), definition_id, values)
            .await?;

        let connection = self.connected(&connection_id).await?;
        self.send_through(&offer, &connection, Rollback::Delete(record.clone()))
            .await?;

        info!(id = %record.get_id(), "credential offer sent");
        Ok(record)
    }

    async fn process_offer(
        &self,
        offer: CredentialOffer,
        connection: ConnectionRecord,
    ) -> Result<CredentialRecord, AgentError> {
        offer.validate_type()?;
        connection.ensure_connected()?;

        let nonce = offer.nonce()?;
        self.ensure_unique_nonce(&connection.get_id(), &nonce).await?;

        let record = CredentialRecord::new(
            CredentialRole::Holder,
            connection.get_id(),
            offer.definition_id()?,
            offer.schema_id()?,
            nonce,
            offer.get_offer_json(),
        );

        self.repo.add(&record).await?;

        info!(id = %record.get_id(), "credential offer received");
        Ok(record)
    }

    async fn accept_offer(
        &self,
        credential_id: String,
        values: Option<Value>,
    ) -> Result<CredentialRecord, AgentError> {
        let snapshot = self.repo.get::<CredentialRecord>(&credential_id).await?;
        ensure_role(&snapshot, CredentialRole::Holder)?;
        let _ = snapshot.get_state().fire(CredentialTrigger::Request)?;

        let connection = self.connected(&snapshot.get_connection_id()).await?;
        let prover_did = connection.get_my_did().ok_or(AgentError::RecordInInvalidState(
            "connection did was missing".to_string(),
        ))?;

        let definition = self
            .registrar
            .lookup_definition(snapshot.get_definition_id())
            .await?;

        let artifact = self
            .math
            .create_request(
                prover_did,
                snapshot.get_offer_json(),
                definition,
                self.provisioning.get_master_secret_id(),
            )
            .await?;

        let mut record = snapshot.clone();
        record.request_json = Some(artifact.request.clone());
        record.request_metadata_json = Some(artifact.metadata);
        record.values_json = merge_values(record.values_json.take(), values.clone());
        record.transition(CredentialTrigger::Request)?;

        self.repo.update(&record).await?;

        let request = CredentialRequest::new(artifact.request, values);
        self.send_through(&request, &connection, Rollback::Restore(snapshot))
            .await?;

        info!(id = %record.get_id(), "credential offer accepted");
        Ok(record)
    }

    async fn process_credential_request(
        &self,
        request: CredentialRequest,
        connection: ConnectionRecord,
    ) -> Result<CredentialRecord, AgentError> {
        request.validate_type()?;
        connection.ensure_connected()?;

        let nonce = request.nonce()?;
        let mut record = self
            .repo
            .find_active::<CredentialRecord, _>(
                TagQuery::new()
                    .with(TAG_NONCE, nonce)
                    .with(TAG_CONNECTION_ID, connection.get_id())
                    .with(TAG_ROLE, CredentialRole::Issuer.to_string()),
                |record: &CredentialRecord| record.get_state().is_in_flight(),
            )
            .await?;

        record.transition(CredentialTrigger::Request)?;
        record.request_json = Some(request.get_request_json());
        record.values_json = merge_values(record.values_json.take(), request.get_values_json());

        self.repo.update(&record).await?;

        info!(id = %record.get_id(), "credential request received");
        Ok(record)
    }

    async fn issue_credential(
        &self,
        credential_id: String,
        values: Option<Value>,
    ) -> Result<CredentialRecord, AgentError> {
        let snapshot = self.repo.get::<CredentialRecord>(&credential_id).await?;
        ensure_role(&snapshot, CredentialRole::Issuer)?;
        let _ = snapshot.get_state().fire(CredentialTrigger::Issue)?;

        let connection = self.connected(&snapshot.get_connection_id()).await?;
        let request_json = snapshot
            .get_request_json()
            .ok_or(AgentError::RecordInInvalidState(
                "credential request was missing".to_string(),
            ))?;

        let values = merge_values(snapshot.get_values_json(), values).ok_or(
            AgentError::ValidationError("credential values was missing".to_string()),
        )?;

        let definition = self
            .registrar
            .lookup_definition(snapshot.get_definition_id())
            .await?;

        let (registry_id, tails) = if supports_revocation(&definition) {
            let registry = self
                .registrar
                .revocation_registry_for(snapshot.get_definition_id())
                .await?;

            let tails = self
                .registrar
                .open_tails(registry.get_tails_location())
                .await?;

            (Some(registry.get_id()), Some(tails))
        } else {
            (None, None)
        };

        let issued = self
            .math
            .create_credential(
                snapshot.get_offer_json(),
                request_json,
                values.clone(),
                registry_id.clone(),
                tails,
            )
            .await?;

        if let (Some(registry_id), Some(delta)) = (registry_id.clone(), issued.delta.clone()) {
            let _ = self
                .registrar
                .ledger()
                .send_revocation_delta(self.provisioning.issuer_did()?, registry_id, delta)
                .await?
                .into_result()?;
        }

        let mut record = snapshot.clone();
        record.values_json = Some(values);
        record.credential_json = Some(issued.credential.clone());
        record.revocation_registry_id = registry_id.clone();
        record.revocation_id = issued.revocation_id;
        record.transition(CredentialTrigger::Issue)?;

        self.repo.update(&record).await?;

        let message = CredentialIssue::new(issued.credential, registry_id);
        self.send_through(&message, &connection, Rollback::Restore(snapshot))
            .await?;

        info!(id = %record.get_id(), "credential issued");
        Ok(record)
    }

    async fn process_credential(
        &self,
        credential: CredentialIssue,
        connection: ConnectionRecord,
    ) -> Result<CredentialRecord, AgentError> {
        credential.validate_type()?;
        connection.ensure_connected()?;

        let definition_id = credential.definition_id()?;
        let mut record = self
            .repo
            .find_active::<CredentialRecord, _>(
                TagQuery::new()
                    .with(TAG_SCHEMA_ID, credential.schema_id()?)
                    .with(TAG_DEFINITION_ID, definition_id.clone())
                    .with(TAG_CONNECTION_ID, connection.get_id())
                    .with(TAG_ROLE, CredentialRole::Holder.to_string()),
                |record: &CredentialRecord| record.get_state() == CredentialState::Requested,
            )
            .await?;

        let metadata = record
            .request_metadata_json
            .to_owned()
            .ok_or(AgentError::RecordInInvalidState(
                "credential request metadata was missing".to_string(),
            ))?;

        let definition = self.registrar.lookup_definition(definition_id).await?;
        let registry_id = credential.get_revocation_registry_id();
        let revocation_definition = match registry_id.clone() {
            Some(registry_id) => Some(
                self.registrar
                    .lookup_revocation_definition(registry_id)
                    .await?,
            ),
            None => None,
        };

        let credential_ref = self
            .math
            .store_credential(
                metadata,
                credential.get_credential_json(),
                definition,
                revocation_definition,
            )
            .await?;

        let info = self.math.get_credential(credential_ref.clone()).await?;

        record.transition(CredentialTrigger::Issue)?;
        record.credential_json = Some(credential.get_credential_json());
        record.credential_ref = Some(credential_ref);
        record.revocation_registry_id = registry_id;
        record.revocation_id = info.cred_rev_id;

        self.repo.update(&record).await?;

        info!(id = %record.get_id(), "credential stored");
        Ok(record)
    }

    async fn revoke_credential(&self, credential_id: String) -> Result<CredentialRecord, AgentError> {
        let mut record = self.repo.get::<CredentialRecord>(&credential_id).await?;
        ensure_role(&record, CredentialRole::Issuer)?;
        let _ = record.get_state().fire(CredentialTrigger::Revoke)?;

        let not_revocable = || {
            AgentError::RecordInInvalidState(format!(
                "credential {} is not revocable",
                credential_id
            ))
        };

        let registry_id = record.get_revocation_registry_id().ok_or_else(not_revocable)?;
        let revocation_id = record.get_revocation_id().ok_or_else(not_revocable)?;

        let registry = self
            .registrar
            .revocation_registry_for(record.get_definition_id())
            .await?;

        let tails = self
            .registrar
            .open_tails(registry.get_tails_location())
            .await?;

        let delta = self
            .math
            .revoke_credential(tails, registry_id.clone(), revocation_id)
            .await?;

        let _ = self
            .registrar
            .ledger()
            .send_revocation_delta(self.provisioning.issuer_did()?, registry_id, delta)
            .await?
            .into_result()?;

        record.transition(CredentialTrigger::Revoke)?;
        self.repo.update(&record).await?;

        info!(id = %record.get_id(), "credential revoked");
        Ok(record)
    }

    async fn reject_offer(&self, credential_id: String) -> Result<CredentialRecord, AgentError> {
        let mut record = self.repo.get::<CredentialRecord>(&credential_id).await?;
        ensure_role(&record, CredentialRole::Holder)?;
        record.transition(CredentialTrigger::RejectOffer)?;
        self.repo.update(&record).await?;
        Ok(record)
    }

    async fn reject_credential_request(
        &self,
        credential_id: String,
    ) -> Result<CredentialRecord, AgentError> {
        let mut record = self.repo.get::<CredentialRecord>(&credential_id).await?;
        ensure_role(&record, CredentialRole::Issuer)?;
        record.transition(CredentialTrigger::RejectRequest)?;
        self.repo.update(&record).await?;
        Ok(record)
    }

    async fn get_credential(&self, credential_id: String) -> Result<CredentialRecord, AgentError> {
        self.repo.get::<CredentialRecord>(&credential_id).await
    }

    async fn list_credentials(
        &self,
        state: Option<CredentialState>,
    ) -> Result<Vec<CredentialRecord>, AgentError> {
        let query = match state {
            Some(state) => TagQuery::new().with(TAG_STATE, state.to_string()),
            None => TagQuery::new(),
        };

        self.repo.search::<CredentialRecord>(query).await
    }
}
