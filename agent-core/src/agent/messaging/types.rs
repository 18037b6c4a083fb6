use std::fmt::Debug;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::de::DeserializeOwned;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use crate::agent::types::AgentError;

/// The content type token identifying the agent wire format
pub const AGENT_WIRE_CONTENT_TYPE: &str = "application/ssi-agent-wire";

pub const MESSAGE_TYPE_PREFIX: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec";

/// `AgentEndpoint` is the declared service endpoint of an agent
///
/// The `verkey` is the routing key used to encrypt the outer envelope, the agent
/// listening at `uri` owns it
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct AgentEndpoint {
    pub(crate) uri: String,
    pub(crate) verkey: String,
}

impl AgentEndpoint {
    pub fn new(uri: String, verkey: String) -> Self {
        Self { uri, verkey }
    }

    pub fn get_uri(&self) -> String {
        self.uri.to_owned()
    }

    pub fn get_verkey(&self) -> String {
        self.verkey.to_owned()
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.uri.is_empty() {
            return Err(AgentError::InvalidMessage(
                "endpoint uri was missing".to_string(),
            ));
        }

        if self.verkey.is_empty() {
            return Err(AgentError::InvalidMessage(
                "endpoint verkey was missing".to_string(),
            ));
        }

        Ok(())
    }
}

/// `MessageKind` is the closed set of protocol messages understood by this agent
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MessageKind {
    ConnectionInvitation,
    ConnectionRequest,
    ConnectionResponse,
    CredentialOffer,
    CredentialRequest,
    CredentialIssue,
    ProofRequest,
    Proof,
}

impl MessageKind {
    fn path(&self) -> &'static str {
        match self {
            MessageKind::ConnectionInvitation => "connections/1.0/invitation",
            MessageKind::ConnectionRequest => "connections/1.0/request",
            MessageKind::ConnectionResponse => "connections/1.0/response",
            MessageKind::CredentialOffer => "issue-credential/1.0/offer-credential",
            MessageKind::CredentialRequest => "issue-credential/1.0/request-credential",
            MessageKind::CredentialIssue => "issue-credential/1.0/issue-credential",
            MessageKind::ProofRequest => "present-proof/1.0/request-presentation",
            MessageKind::Proof => "present-proof/1.0/presentation",
        }
    }

    pub fn type_uri(&self) -> String {
        format!("{}/{}", MESSAGE_TYPE_PREFIX, self.path())
    }

    pub fn all() -> Vec<MessageKind> {
        vec![
            MessageKind::ConnectionInvitation,
            MessageKind::ConnectionRequest,
            MessageKind::ConnectionResponse,
            MessageKind::CredentialOffer,
            MessageKind::CredentialRequest,
            MessageKind::CredentialIssue,
            MessageKind::ProofRequest,
            MessageKind::Proof,
        ]
    }
}

impl TryFrom<&str> for MessageKind {
    type Error = AgentError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        MessageKind::all()
            .into_iter()
            .find(|kind| kind.type_uri() == value)
            .ok_or(AgentError::InvalidMessage(format!(
                "unknown message type: {}",
                value
            )))
    }
}

/// `AgentMessage` implemented by all protocol content messages
///
/// Each message carries `@id` and `@type`, the `@type` must equal the type uri of
/// its [`MessageKind`]
pub trait AgentMessage: Serialize + DeserializeOwned + Clone + Debug + Send + Sync {
    const KIND: MessageKind;

    fn get_id(&self) -> String;
    fn get_type(&self) -> String;

    fn validate_type(&self) -> Result<(), AgentError> {
        let kind = MessageKind::try_from(self.get_type().as_str())?;
        if kind != Self::KIND {
            return Err(AgentError::InvalidMessage(format!(
                "unexpected message type: {}",
                self.get_type()
            )));
        }

        Ok(())
    }
}

/// `MessageContext` describes how an inbound message was addressed
///
/// The `recipient_key` is one of our own keys, the `sender_key` is only known when the
/// inner envelope was authenticated-encrypted
#[derive(Debug, Clone, PartialEq)]
pub struct MessageContext {
    pub recipient_key: String,
    pub sender_key: Option<String>,
}

impl MessageContext {
    pub fn new(recipient_key: String, sender_key: Option<String>) -> Self {
        Self {
            recipient_key,
            sender_key,
        }
    }
}

/// `DispatcherBuilder` delivers packed envelope bytes to an endpoint uri
///
/// Any delivery failure, including timeouts, must be reported as
/// [`AgentError::MessageTransmissionFailure`] and must never be retried silently
#[async_trait]
pub trait DispatcherBuilder: Clone + Send + Sync {
    async fn dispatch(&self, uri: String, payload: Vec<u8>) -> Result<(), AgentError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test::table_test;

    #[test]
    fn test_message_kind_from_type_uri() {
        let table = vec![
            (
                "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/request",
                MessageKind::ConnectionRequest,
            ),
            (
                "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/issue-credential/1.0/offer-credential",
                MessageKind::CredentialOffer,
            ),
            (
                "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/presentation",
                MessageKind::Proof,
            ),
        ];

        for (validator, input, expected) in table_test!(table) {
            let kind = MessageKind::try_from(input);
            assert!(!kind.is_err());

            validator
                .given(input)
                .when("parse type uri")
                .then(&format!("{:?}", expected))
                .assert_eq(expected, kind.unwrap());
        }
    }

    #[test]
    fn test_unknown_message_type() {
        let kind = MessageKind::try_from("did:sov:unknown;spec/routing/1.0/forward");
        assert!(kind.is_err());
        assert!(matches!(kind.unwrap_err(), AgentError::InvalidMessage(_)));
    }

    #[test]
    fn test_validate_endpoint() {
        let endpoint = AgentEndpoint::new("".to_string(), "verkey".to_string());
        assert!(matches!(
            endpoint.validate().unwrap_err(),
            AgentError::InvalidMessage(_)
        ));

        let endpoint = AgentEndpoint::new("http://localhost:8181/agent".to_string(), "".to_string());
        assert!(endpoint.validate().is_err());

        let endpoint = AgentEndpoint::new(
            "http://localhost:8181/agent".to_string(),
            "verkey".to_string(),
        );
        assert!(!endpoint.validate().is_err());
    }
}
