//! `inbound` routes a received wire payload to the workflow owning its message kind
use rst_common::standard::async_trait::async_trait;
use rst_common::with_tracing::tracing::{debug, warn};

use super::connection::types::ConnectionAPI;
use super::connection::ConnectionRecord;
use super::credential::types::CredentialAPI;
use super::credential::CredentialRecord;
use super::messaging::envelope::{EnvelopeCodec, UnpackedMessage};
use super::messaging::messages::{
    ConnectionRequest, ConnectionResponse, CredentialIssue, CredentialOffer, CredentialRequest,
    ProofMessage, ProofRequestMessage,
};
use super::messaging::types::MessageKind;
use super::proof::types::ProofAPI;
use super::proof::ProofRecord;
use super::services::crypto::CryptoBuilder;
use super::types::AgentError;

/// `InboundOutcome` is the record touched by a processed inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    Connection(ConnectionRecord),
    Credential(CredentialRecord),
    Proof(ProofRecord),
}

#[async_trait]
pub trait InboundAPI: Send + Sync {
    async fn receive(&self, payload: Vec<u8>) -> Result<InboundOutcome, AgentError>;
}

#[derive(Clone)]
pub struct InboundProcessor<TCrypto, TConnection, TCredential, TProof>
where
    TCrypto: CryptoBuilder,
    TConnection: ConnectionAPI,
    TCredential: CredentialAPI,
    TProof: ProofAPI,
{
    codec: EnvelopeCodec<TCrypto>,
    connections: TConnection,
    credentials: TCredential,
    proofs: TProof,
}

impl<TCrypto, TConnection, TCredential, TProof> InboundProcessor<TCrypto, TConnection, TCredential, TProof>
where
    TCrypto: CryptoBuilder,
    TConnection: ConnectionAPI,
    TCredential: CredentialAPI,
    TProof: ProofAPI,
{
    pub fn new(
        codec: EnvelopeCodec<TCrypto>,
        connections: TConnection,
        credentials: TCredential,
        proofs: TProof,
    ) -> Self {
        Self {
            codec,
            connections,
            credentials,
            proofs,
        }
    }

    /// `resolve_connection` finds the connected connection owning the key which received
    /// the message. The message must be authenticated by the remote key of that connection
    async fn resolve_connection(
        &self,
        unpacked: &UnpackedMessage,
    ) -> Result<ConnectionRecord, AgentError> {
        let connection = self
            .connections
            .find_by_local_key(unpacked.context.recipient_key.clone())
            .await?;

        connection.ensure_connected()?;

        let sender = unpacked.context.sender_key.as_ref().ok_or_else(|| {
            AgentError::InvalidMessage(format!(
                "anonymous message on connection {}",
                connection.get_id()
            ))
        })?;

        if connection.get_their_verkey().as_ref() != Some(sender) {
            return Err(AgentError::InvalidMessage(format!(
                "sender is not the remote party of connection {}",
                connection.get_id()
            )));
        }

        Ok(connection)
    }

    async fn route(&self, unpacked: UnpackedMessage) -> Result<InboundOutcome, AgentError> {
        match unpacked.kind {
            MessageKind::ConnectionInvitation => Err(AgentError::InvalidMessage(
                "invitations are only exchanged out of band".to_string(),
            )),
            MessageKind::ConnectionRequest => {
                let request = unpacked.decode::<ConnectionRequest>()?;
                self.connections
                    .process_request(request, unpacked.context)
                    .await
                    .map(InboundOutcome::Connection)
            }
            MessageKind::ConnectionResponse => {
                let response = unpacked.decode::<ConnectionResponse>()?;
                self.connections
                    .process_response(response, unpacked.context)
                    .await
                    .map(InboundOutcome::Connection)
            }
            MessageKind::CredentialOffer => {
                let connection = self.resolve_connection(&unpacked).await?;
                self.credentials
                    .process_offer(unpacked.decode::<CredentialOffer>()?, connection)
                    .await
                    .map(InboundOutcome::Credential)
            }
            MessageKind::CredentialRequest => {
                let connection = self.resolve_connection(&unpacked).await?;
                self.credentials
                    .process_credential_request(unpacked.decode::<CredentialRequest>()?, connection)
                    .await
                    .map(InboundOutcome::Credential)
            }
            MessageKind::CredentialIssue => {
                let connection = self.resolve_connection(&unpacked).await?;
                self.credentials
                    .process_credential(unpacked.decode::<CredentialIssue>()?, connection)
                    .await
                    .map(InboundOutcome::Credential)
            }
            MessageKind::ProofRequest => {
                let connection = self.resolve_connection(&unpacked).await?;
                self.proofs
                    .process_proof_request(unpacked.decode::<ProofRequestMessage>()?, connection)
                    .await
                    .map(InboundOutcome::Proof)
            }
            MessageKind::Proof => {
                let connection = self.resolve_connection(&unpacked).await?;
                self.proofs
                    .process_proof(unpacked.decode::<ProofMessage>()?, connection)
                    .await
                    .map(InboundOutcome::Proof)
            }
        }
    }
}

#[async_trait]
impl<TCrypto, TConnection, TCredential, TProof> InboundAPI
    for InboundProcessor<TCrypto, TConnection, TCredential, TProof>
where
    TCrypto: CryptoBuilder,
    TConnection: ConnectionAPI,
    TCredential: CredentialAPI,
    TProof: ProofAPI,
{
    async fn receive(&self, payload: Vec<u8>) -> Result<InboundOutcome, AgentError> {
        let unpacked = self.codec.unpack(payload).await?;
        let kind = unpacked.kind;
        debug!(kind = ?kind, "inbound message");

        self.route(unpacked).await.map_err(|err| {
            warn!(kind = ?kind, error = %err, "inbound message rejected");
            err
        })
    }
}
