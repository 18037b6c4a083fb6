use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_tracing::tracing::debug;

use crate::agent::services::crypto::CryptoBuilder;
use crate::agent::types::AgentError;

use super::types::{AgentMessage, MessageContext, MessageKind};

/// `Envelope` is the inner, content carrying envelope
///
/// The `from` field is only present when the content was authenticated-encrypted
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct Envelope {
    pub(crate) to: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub(crate) from: Option<String>,

    pub(crate) message: String,
}

/// `ForwardEnvelope` used by both the forwarding wrapper and the outer envelope
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ForwardEnvelope {
    pub(crate) to: String,
    pub(crate) message: String,
}

/// `UnpackedMessage` is a decrypted inbound protocol message
#[derive(Clone, Debug, PartialEq)]
pub struct UnpackedMessage {
    pub kind: MessageKind,
    pub payload: Value,
    pub context: MessageContext,
}

impl UnpackedMessage {
    pub fn decode<T: AgentMessage>(&self) -> Result<T, AgentError> {
        if self.kind != T::KIND {
            return Err(AgentError::InvalidMessage(format!(
                "expected {:?}, got {:?}",
                T::KIND,
                self.kind
            )));
        }

        serde_json::from_value(self.payload.clone())
            .map_err(|err| AgentError::InvalidMessage(err.to_string()))
    }
}

fn decode_base64(value: &str, layer: &str) -> Result<Vec<u8>, AgentError> {
    STANDARD
        .decode(value)
        .map_err(|err| AgentError::InvalidMessage(format!("{}: {}", layer, err)))
}

fn parse_json<T: for<'de> Deserialize<'de>>(bytes: &[u8], layer: &str) -> Result<T, AgentError> {
    serde_json::from_slice(bytes)
        .map_err(|err| AgentError::InvalidMessage(format!("{}: {}", layer, err)))
}

fn to_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, AgentError> {
    serde_json::to_vec(value).map_err(|err| AgentError::JSONError(err.to_string()))
}

/// `EnvelopeCodec` builds and parses the two-layer wire envelope
///
/// Packing steps:
///
/// - the protocol message is serialized and encrypted for the final recipient key,
///   authenticated when a sender key is given, anonymous otherwise
/// - the inner envelope is wrapped by a forwarding wrapper addressed to the same recipient key
/// - the forwarding wrapper is anonymous-encrypted for the endpoint routing key, producing the
///   outer envelope
#[derive(Clone)]
pub struct EnvelopeCodec<TCrypto>
where
    TCrypto: CryptoBuilder,
{
    crypto: TCrypto,
}

impl<TCrypto> EnvelopeCodec<TCrypto>
where
    TCrypto: CryptoBuilder,
{
    pub fn new(crypto: TCrypto) -> Self {
        Self { crypto }
    }

    pub async fn pack<T: AgentMessage>(
        &self,
        message: &T,
        sender_key: Option<String>,
        recipient_key: String,
        routing_key: String,
    ) -> Result<Vec<u8>, AgentError> {
        let content = to_json_bytes(message)?;
        let ciphertext = match sender_key.clone() {
            Some(sender) => {
                self.crypto
                    .auth_crypt(sender, recipient_key.clone(), content)
                    .await?
            }
            None => {
                self.crypto
                    .anon_crypt(recipient_key.clone(), content)
                    .await?
            }
        };

        let inner = Envelope {
            to: recipient_key.clone(),
            from: sender_key,
            message: STANDARD.encode(ciphertext),
        };

        let forward = ForwardEnvelope {
            to: recipient_key,
            message: STANDARD.encode(to_json_bytes(&inner)?),
        };

        let forward_ciphertext = self
            .crypto
            .anon_crypt(routing_key.clone(), to_json_bytes(&forward)?)
            .await?;

        let outer = ForwardEnvelope {
            to: routing_key,
            message: STANDARD.encode(forward_ciphertext),
        };

        debug!(kind = ?T::KIND, to = %inner.to, "envelope packed");
        to_json_bytes(&outer)
    }

    pub async fn unpack(&self, payload: Vec<u8>) -> Result<UnpackedMessage, AgentError> {
        let outer: ForwardEnvelope = parse_json(&payload, "outer envelope")?;
        let forward_bytes = self
            .crypto
            .anon_decrypt(outer.to.clone(), decode_base64(&outer.message, "outer envelope")?)
            .await?;

        let forward: ForwardEnvelope = parse_json(&forward_bytes, "forwarding wrapper")?;
        let inner: Envelope = parse_json(
            &decode_base64(&forward.message, "forwarding wrapper")?,
            "inner envelope",
        )?;

        if inner.to != forward.to {
            return Err(AgentError::InvalidMessage(
                "forwarding wrapper and inner envelope recipients differ".to_string(),
            ));
        }

        let ciphertext = decode_base64(&inner.message, "inner envelope")?;
        let content = match inner.from.clone() {
            Some(from) => {
                let decrypted = self
                    .crypto
                    .auth_decrypt(inner.to.clone(), ciphertext)
                    .await?;

                if decrypted.sender_verkey != from {
                    return Err(AgentError::InvalidMessage(
                        "sender key does not match the authenticated sender".to_string(),
                    ));
                }

                decrypted.message
            }
            None => self.crypto.anon_decrypt(inner.to.clone(), ciphertext).await?,
        };

        let payload: Value = parse_json(&content, "content")?;
        let message_type = payload
            .get("@type")
            .and_then(|value| value.as_str())
            .ok_or(AgentError::InvalidMessage("@type was missing".to_string()))?;

        let kind = MessageKind::try_from(message_type)?;
        debug!(kind = ?kind, to = %inner.to, "envelope unpacked");

        Ok(UnpackedMessage {
            kind,
            payload,
            context: MessageContext::new(inner.to, inner.from),
        })
    }
}
