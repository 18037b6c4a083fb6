use rst_common::standard::async_trait::async_trait;
use rst_common::with_tracing::tracing::{debug, info};

use crate::agent::machine::StateMachine;
use crate::agent::messaging::messages::{ConnectionInvitation, ConnectionRequest, ConnectionResponse};
use crate::agent::messaging::messenger::Messenger;
use crate::agent::messaging::types::{AgentMessage, DispatcherBuilder, MessageContext};
use crate::agent::provisioning::ProvisioningRecord;
use crate::agent::services::crypto::CryptoBuilder;
use crate::agent::store::types::{RecordStoreBuilder, TagQuery, Tags};
use crate::agent::store::{Repository, Rollback};
use crate::agent::types::AgentError;

use super::connection::ConnectionRecord;
use super::types::{
    ConnectionAPI, ConnectionState, ConnectionTrigger, InviteConfig, UsecaseBuilder,
    TAG_CONNECTION_KEY, TAG_MY_VERKEY, TAG_STATE,
};

fn ensure_sender(context: &MessageContext, verkey: &str) -> Result<(), AgentError> {
    match &context.sender_key {
        Some(sender) if sender != verkey => Err(AgentError::InvalidMessage(
            "message sender does not own the declared verkey".to_string(),
        )),
        _ => Ok(()),
    }
}

fn ensure_not_empty(value: &str, field: &str) -> Result<(), AgentError> {
    if value.is_empty() {
        return Err(AgentError::InvalidMessage(format!("{} was missing", field)));
    }

    Ok(())
}

/// `Usecase` is the implementation of [`ConnectionAPI`]
///
/// This object depends on the implementation of [`RecordStoreBuilder`], [`CryptoBuilder`] and
/// [`DispatcherBuilder`]
#[derive(Clone)]
pub struct Usecase<TStore, TCrypto, TDispatcher>
where
    TStore: RecordStoreBuilder,
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
{
    repo: Repository<TStore>,
    crypto: TCrypto,
    messenger: Messenger<TCrypto, TDispatcher>,
    provisioning: ProvisioningRecord,
}

impl<TStore, TCrypto, TDispatcher> Usecase<TStore, TCrypto, TDispatcher>
where
    TStore: RecordStoreBuilder,
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
{
    pub fn new(
        store: TStore,
        crypto: TCrypto,
        dispatcher: TDispatcher,
        provisioning: ProvisioningRecord,
    ) -> Self {
        Self {
            repo: Repository::new(store),
            messenger: Messenger::new(crypto.clone(), dispatcher),
            crypto,
            provisioning,
        }
    }
}

impl<TStore, TCrypto, TDispatcher> UsecaseBuilder for Usecase<TStore, TCrypto, TDispatcher>
where
    TStore: RecordStoreBuilder,
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
{
    type StoreImplementer = TStore;
    type CryptoImplementer = TCrypto;
    type DispatcherImplementer = TDispatcher;

    fn repo(&self) -> Repository<Self::StoreImplementer> {
        self.repo.clone()
    }

    fn crypto(&self) -> Self::CryptoImplementer {
        self.crypto.clone()
    }

    fn messenger(&self) -> Messenger<Self::CryptoImplementer, Self::DispatcherImplementer> {
        self.messenger.clone()
    }
}

#[async_trait]
impl<TStore, TCrypto, TDispatcher> ConnectionAPI for Usecase<TStore, TCrypto, TDispatcher>
where
    TStore: RecordStoreBuilder,
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
{
    async fn create_invitation(
        &self,
        config: InviteConfig,
    ) -> Result<(ConnectionInvitation, ConnectionRecord), AgentError> {
        let connection_key = self.crypto().create_key().await?;

        let mut record = ConnectionRecord::new(config.alias, config.tags);
        record.connection_key = Some(connection_key.clone());
        record.transition(ConnectionTrigger::InvitationSent)?;

        self.repo().add(&record).await?;

        let owner = self.provisioning.get_owner();
        let invitation = ConnectionInvitation::new(
            owner.get_name(),
            connection_key,
            self.provisioning.get_endpoint(),
        )
        .with_image_url(owner.get_image_url());

        info!(id = %record.get_id(), "invitation created");
        Ok((invitation, record))
    }

    async fn accept_invitation(
        &self,
        invitation: ConnectionInvitation,
    ) -> Result<ConnectionRecord, AgentError> {
        invitation.validate_type()?;
        invitation.endpoint.validate()?;
        ensure_not_empty(&invitation.recipient_key, "recipient_key")?;

        let mut record = ConnectionRecord::new(Some(invitation.get_label()), Tags::new());
        record.transition(ConnectionTrigger::InvitationAccepted)?;

        let did = self.crypto().create_and_store_did().await?;
        record.my_did = Some(did.did.clone());
        record.my_verkey = Some(did.verkey.clone());
        record.connection_key = Some(invitation.get_recipient_key());
        record.their_endpoint = Some(invitation.get_endpoint());

        self.repo().add(&record).await?;

        let request = ConnectionRequest::new(
            self.provisioning.get_owner().get_name(),
            did.did,
            did.verkey.clone(),
            self.provisioning.get_endpoint(),
        );

        let messenger = self.messenger();
        let endpoint = invitation.get_endpoint();
        self.repo()
            .with_compensation(
                Rollback::Delete(record.clone()),
                messenger.send(
                    &request,
                    Some(did.verkey),
                    invitation.get_recipient_key(),
                    &endpoint,
                ),
            )
            .await?;

        info!(id = %record.get_id(), "invitation accepted");
        Ok(record)
    }

    async fn process_request(
        &self,
        request: ConnectionRequest,
        context: MessageContext,
    ) -> Result<ConnectionRecord, AgentError> {
        request.validate_type()?;
        request.endpoint.validate()?;
        ensure_not_empty(&request.did, "did")?;
        ensure_not_empty(&request.verkey, "verkey")?;
        ensure_sender(&context, &request.verkey)?;

        let mut record = self
            .repo()
            .find_one::<ConnectionRecord>(
                TagQuery::new().with(TAG_CONNECTION_KEY, context.recipient_key.clone()),
            )
            .await?;

        record.transition(ConnectionTrigger::RequestReceived)?;
        record.their_did = Some(request.get_did());
        record.their_verkey = Some(request.get_verkey());
        record.their_endpoint = Some(request.endpoint.clone());

        self.repo().update(&record).await?;

        debug!(id = %record.get_id(), "connection request processed");
        Ok(record)
    }

    async fn accept_request(&self, connection_id: String) -> Result<ConnectionRecord, AgentError> {
        let snapshot = self.repo().get::<ConnectionRecord>(&connection_id).await?;
        let _ = snapshot.get_state().fire(ConnectionTrigger::RequestAccepted)?;

        let their_verkey = snapshot.get_their_verkey().ok_or(AgentError::RecordInInvalidState(
            "their_verkey was missing".to_string(),
        ))?;
        let their_endpoint = snapshot
            .get_their_endpoint()
            .ok_or(AgentError::RecordInInvalidState(
                "their_endpoint was missing".to_string(),
            ))?;

        let did = self.crypto().create_and_store_did().await?;

        let mut record = snapshot.clone();
        record.my_did = Some(did.did.clone());
        record.my_verkey = Some(did.verkey.clone());
        record.transition(ConnectionTrigger::RequestAccepted)?;

        self.repo().update(&record).await?;

        let response =
            ConnectionResponse::new(did.did, did.verkey.clone(), self.provisioning.get_endpoint());

        let messenger = self.messenger();
        self.repo()
            .with_compensation(
                Rollback::Restore(snapshot),
                messenger.send(&response, Some(did.verkey), their_verkey, &their_endpoint),
            )
            .await?;

        info!(id = %record.get_id(), "connection established");
        Ok(record)
    }

    async fn process_response(
        &self,
        response: ConnectionResponse,
        context: MessageContext,
    ) -> Result<ConnectionRecord, AgentError> {
        response.validate_type()?;
        response.endpoint.validate()?;
        ensure_not_empty(&response.did, "did")?;
        ensure_not_empty(&response.verkey, "verkey")?;
        ensure_sender(&context, &response.verkey)?;

        let mut record = self.find_by_local_key(context.recipient_key).await?;
        record.transition(ConnectionTrigger::ResponseReceived)?;
        record.their_did = Some(response.get_did());
        record.their_verkey = Some(response.get_verkey());
        record.their_endpoint = Some(response.endpoint.clone());

        self.repo().update(&record).await?;

        info!(id = %record.get_id(), "connection established");
        Ok(record)
    }

    async fn get_connection(&self, id: String) -> Result<ConnectionRecord, AgentError> {
        self.repo().get::<ConnectionRecord>(&id).await
    }

    async fn list_connections(
        &self,
        state: Option<ConnectionState>,
    ) -> Result<Vec<ConnectionRecord>, AgentError> {
        let query = match state {
            Some(state) => TagQuery::new().with(TAG_STATE, state.to_string()),
            None => TagQuery::new(),
        };

        self.repo().search::<ConnectionRecord>(query).await
    }

    async fn find_by_local_key(&self, verkey: String) -> Result<ConnectionRecord, AgentError> {
        self.repo()
            .find_one::<ConnectionRecord>(TagQuery::new().with(TAG_MY_VERKEY, verkey))
            .await
    }

    async fn delete_connection(&self, id: String) -> Result<(), AgentError> {
        self.repo().delete::<ConnectionRecord>(&id).await
    }
}
