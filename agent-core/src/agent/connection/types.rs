use derive_more::Display;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use crate::agent::machine::StateMachine;
use crate::agent::messaging::messages::{ConnectionInvitation, ConnectionRequest, ConnectionResponse};
use crate::agent::messaging::messenger::Messenger;
use crate::agent::messaging::types::{DispatcherBuilder, MessageContext};
use crate::agent::services::crypto::CryptoBuilder;
use crate::agent::store::types::{RecordStoreBuilder, Tags};
use crate::agent::store::Repository;
use crate::agent::types::AgentError;

use super::connection::ConnectionRecord;

pub const TAG_CONNECTION_KEY: &str = "connection_key";
pub const TAG_MY_VERKEY: &str = "my_verkey";
pub const TAG_THEIR_DID: &str = "their_did";
pub const TAG_STATE: &str = "state";

/// `ConnectionState` represent the lifecycle of a pairwise relationship
///
/// The inviter starts at [`ConnectionState::Invited`], the invitee starts at
/// [`ConnectionState::Negotiating`], both of them end at [`ConnectionState::Connected`].
/// A freshly built record is [`ConnectionState::Disconnected`] and never persisted in that state
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Display)]
#[serde(crate = "self::serde")]
pub enum ConnectionState {
    Disconnected,
    Invited,
    Negotiating,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionTrigger {
    InvitationSent,
    InvitationAccepted,
    RequestReceived,
    RequestAccepted,
    ResponseReceived,
}

impl StateMachine for ConnectionState {
    type Trigger = ConnectionTrigger;

    fn next(&self, trigger: Self::Trigger) -> Option<Self> {
        match (self, trigger) {
            (ConnectionState::Disconnected, ConnectionTrigger::InvitationSent) => {
                Some(ConnectionState::Invited)
            }
            (ConnectionState::Disconnected, ConnectionTrigger::InvitationAccepted) => {
                Some(ConnectionState::Negotiating)
            }
            (ConnectionState::Invited, ConnectionTrigger::RequestReceived) => {
                Some(ConnectionState::Negotiating)
            }
            (ConnectionState::Negotiating, ConnectionTrigger::RequestAccepted) => {
                Some(ConnectionState::Connected)
            }
            (ConnectionState::Negotiating, ConnectionTrigger::ResponseReceived) => {
                Some(ConnectionState::Connected)
            }
            _ => None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// `InviteConfig` used to customize a generated invitation
///
/// The `alias` is a local name of the future connection, the `tags` will be attached
/// to the stored record and able to be used to search it later
#[derive(Debug, Clone, Default)]
pub struct InviteConfig {
    pub alias: Option<String>,
    pub tags: Tags,
}

/// `ConnectionAPI` is the main entrypoint of the `connection` workflow
///
/// The `process_*` methods are called with the decrypted inbound messages, the
/// [`MessageContext`] tells which of our keys received the message
#[async_trait]
pub trait ConnectionAPI: Clone + Send + Sync {
    /// `create_invitation` generates a fresh ephemeral connection key and stores
    /// a new record in [`ConnectionState::Invited`]
    async fn create_invitation(
        &self,
        config: InviteConfig,
    ) -> Result<(ConnectionInvitation, ConnectionRecord), AgentError>;

    /// `accept_invitation` creates a new record in [`ConnectionState::Negotiating`] and
    /// sends a connection request to the inviter. When the request cannot be delivered
    /// the new record is deleted
    async fn accept_invitation(
        &self,
        invitation: ConnectionInvitation,
    ) -> Result<ConnectionRecord, AgentError>;

    async fn process_request(
        &self,
        request: ConnectionRequest,
        context: MessageContext,
    ) -> Result<ConnectionRecord, AgentError>;

    /// `accept_request` answers a processed request with a connection response. When
    /// the response cannot be delivered the record is restored to its previous value
    async fn accept_request(&self, connection_id: String) -> Result<ConnectionRecord, AgentError>;

    async fn process_response(
        &self,
        response: ConnectionResponse,
        context: MessageContext,
    ) -> Result<ConnectionRecord, AgentError>;

    async fn get_connection(&self, id: String) -> Result<ConnectionRecord, AgentError>;

    async fn list_connections(
        &self,
        state: Option<ConnectionState>,
    ) -> Result<Vec<ConnectionRecord>, AgentError>;

    /// `find_by_local_key` resolves the connection owning one of our own pairwise keys
    async fn find_by_local_key(&self, verkey: String) -> Result<ConnectionRecord, AgentError>;

    async fn delete_connection(&self, id: String) -> Result<(), AgentError>;
}

/// `UsecaseBuilder` exposes the collaborators used by a [`ConnectionAPI`] implementer
pub trait UsecaseBuilder: ConnectionAPI {
    type StoreImplementer: RecordStoreBuilder;
    type CryptoImplementer: CryptoBuilder;
    type DispatcherImplementer: DispatcherBuilder;

    fn repo(&self) -> Repository<Self::StoreImplementer>;
    fn crypto(&self) -> Self::CryptoImplementer;
    fn messenger(&self) -> Messenger<Self::CryptoImplementer, Self::DispatcherImplementer>;
}
