use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::{self, Value};
use rst_common::standard::uuid::Uuid;

use crate::agent::types::AgentError;

use super::types::{AgentEndpoint, AgentMessage, MessageKind};

const INVITATION_URL_PARAM: &str = "c_i";

/// `required_field` extracts a mandatory string field from a protocol payload
pub(crate) fn required_field(payload: &Value, field: &str) -> Result<String, AgentError> {
    payload
        .get(field)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
        .ok_or(AgentError::InvalidMessage(format!("{} was missing", field)))
}

pub(crate) fn optional_field(payload: &Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
}

/// `ConnectionInvitation` is exchanged out of band, it never travels inside an envelope
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ConnectionInvitation {
    #[serde(rename = "@id")]
    pub(crate) id: String,

    #[serde(rename = "@type")]
    pub(crate) message_type: String,

    pub(crate) label: String,
    pub(crate) recipient_key: String,
    pub(crate) endpoint: AgentEndpoint,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub(crate) image_url: Option<String>,
}

impl ConnectionInvitation {
    pub fn new(label: String, recipient_key: String, endpoint: AgentEndpoint) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: Self::KIND.type_uri(),
            label,
            recipient_key,
            endpoint,
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn get_label(&self) -> String {
        self.label.to_owned()
    }

    pub fn get_recipient_key(&self) -> String {
        self.recipient_key.to_owned()
    }

    pub fn get_endpoint(&self) -> AgentEndpoint {
        self.endpoint.to_owned()
    }

    /// `to_url` encodes the invitation as a query parameter of the given base url
    pub fn to_url(&self, base_url: &str) -> Result<String, AgentError> {
        let json =
            serde_json::to_vec(self).map_err(|err| AgentError::JSONError(err.to_string()))?;

        Ok(format!(
            "{}?{}={}",
            base_url,
            INVITATION_URL_PARAM,
            URL_SAFE_NO_PAD.encode(json)
        ))
    }

    pub fn from_url(url: &str) -> Result<Self, AgentError> {
        let (_, query) = url
            .split_once('?')
            .ok_or(AgentError::InvalidMessage("invitation query was missing".to_string()))?;

        let encoded = query
            .split('&')
            .find_map(|pair| pair.strip_prefix(&format!("{}=", INVITATION_URL_PARAM)))
            .ok_or(AgentError::InvalidMessage(
                "invitation parameter was missing".to_string(),
            ))?;

        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|err| AgentError::InvalidMessage(err.to_string()))?;

        let invitation: ConnectionInvitation = serde_json::from_slice(&json)
            .map_err(|err| AgentError::InvalidMessage(err.to_string()))?;

        invitation.validate_type()?;
        invitation.endpoint.validate()?;
        Ok(invitation)
    }
}

impl AgentMessage for ConnectionInvitation {
    const KIND: MessageKind = MessageKind::ConnectionInvitation;

    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_type(&self) -> String {
        self.message_type.to_owned()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ConnectionRequest {
    #[serde(rename = "@id")]
    pub(crate) id: String,

    #[serde(rename = "@type")]
    pub(crate) message_type: String,

    pub(crate) label: String,
    pub(crate) did: String,
    pub(crate) verkey: String,
    pub(crate) endpoint: AgentEndpoint,
}

impl ConnectionRequest {
    pub fn new(label: String, did: String, verkey: String, endpoint: AgentEndpoint) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: Self::KIND.type_uri(),
            label,
            did,
            verkey,
            endpoint,
        }
    }

    pub fn get_did(&self) -> String {
        self.did.to_owned()
    }

    pub fn get_verkey(&self) -> String {
        self.verkey.to_owned()
    }
}

impl AgentMessage for ConnectionRequest {
    const KIND: MessageKind = MessageKind::ConnectionRequest;

    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_type(&self) -> String {
        self.message_type.to_owned()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ConnectionResponse {
    #[serde(rename = "@id")]
    pub(crate) id: String,

    #[serde(rename = "@type")]
    pub(crate) message_type: String,

    pub(crate) did: String,
    pub(crate) verkey: String,
    pub(crate) endpoint: AgentEndpoint,
}

impl ConnectionResponse {
    pub fn new(did: String, verkey: String, endpoint: AgentEndpoint) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: Self::KIND.type_uri(),
            did,
            verkey,
            endpoint,
        }
    }

    pub fn get_did(&self) -> String {
        self.did.to_owned()
    }

    pub fn get_verkey(&self) -> String {
        self.verkey.to_owned()
    }
}

impl AgentMessage for ConnectionResponse {
    const KIND: MessageKind = MessageKind::ConnectionResponse;

    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_type(&self) -> String {
        self.message_type.to_owned()
    }
}

/// `CredentialOffer` carries the offer produced by the issuer's Credential-Math service
///
/// The offer payload must contain `nonce`, `schema_id` and `cred_def_id`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct CredentialOffer {
    #[serde(rename = "@id")]
    pub(crate) id: String,

    #[serde(rename = "@type")]
    pub(crate) message_type: String,

    pub(crate) offer_json: Value,
}

impl CredentialOffer {
    pub fn new(offer_json: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: Self::KIND.type_uri(),
            offer_json,
        }
    }

    pub fn get_offer_json(&self) -> Value {
        self.offer_json.to_owned()
    }

    pub fn nonce(&self) -> Result<String, AgentError> {
        required_field(&self.offer_json, "nonce")
    }

    pub fn schema_id(&self) -> Result<String, AgentError> {
        required_field(&self.offer_json, "schema_id")
    }

    pub fn definition_id(&self) -> Result<String, AgentError> {
        required_field(&self.offer_json, "cred_def_id")
    }
}

impl AgentMessage for CredentialOffer {
    const KIND: MessageKind = MessageKind::CredentialOffer;

    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_type(&self) -> String {
        self.message_type.to_owned()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct CredentialRequest {
    #[serde(rename = "@id")]
    pub(crate) id: String,

    #[serde(rename = "@type")]
    pub(crate) message_type: String,

    pub(crate) request_json: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub(crate) values_json: Option<Value>,
}

impl CredentialRequest {
    pub fn new(request_json: Value, values_json: Option<Value>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: Self::KIND.type_uri(),
            request_json,
            values_json,
        }
    }

    pub fn get_request_json(&self) -> Value {
        self.request_json.to_owned()
    }

    pub fn get_values_json(&self) -> Option<Value> {
        self.values_json.to_owned()
    }

    pub fn nonce(&self) -> Result<String, AgentError> {
        required_field(&self.request_json, "nonce")
    }
}

impl AgentMessage for CredentialRequest {
    const KIND: MessageKind = MessageKind::CredentialRequest;

    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_type(&self) -> String {
        self.message_type.to_owned()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct CredentialIssue {
    #[serde(rename = "@id")]
    pub(crate) id: String,

    #[serde(rename = "@type")]
    pub(crate) message_type: String,

    pub(crate) credential_json: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub(crate) revocation_registry_id: Option<String>,
}

impl CredentialIssue {
    pub fn new(credential_json: Value, revocation_registry_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: Self::KIND.type_uri(),
            credential_json,
            revocation_registry_id,
        }
    }

    pub fn get_credential_json(&self) -> Value {
        self.credential_json.to_owned()
    }

    pub fn get_revocation_registry_id(&self) -> Option<String> {
        self.revocation_registry_id
            .to_owned()
            .or(optional_field(&self.credential_json, "rev_reg_id"))
    }

    pub fn schema_id(&self) -> Result<String, AgentError> {
        required_field(&self.credential_json, "schema_id")
    }

    pub fn definition_id(&self) -> Result<String, AgentError> {
        required_field(&self.credential_json, "cred_def_id")
    }
}

impl AgentMessage for CredentialIssue {
    const KIND: MessageKind = MessageKind::CredentialIssue;

    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_type(&self) -> String {
        self.message_type.to_owned()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ProofRequestMessage {
    #[serde(rename = "@id")]
    pub(crate) id: String,

    #[serde(rename = "@type")]
    pub(crate) message_type: String,

    pub(crate) request_json: Value,
}

impl ProofRequestMessage {
    pub fn new(request_json: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: Self::KIND.type_uri(),
            request_json,
        }
    }

    pub fn get_request_json(&self) -> Value {
        self.request_json.to_owned()
    }

    pub fn nonce(&self) -> Result<String, AgentError> {
        required_field(&self.request_json, "nonce")
    }
}

impl AgentMessage for ProofRequestMessage {
    const KIND: MessageKind = MessageKind::ProofRequest;

    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_type(&self) -> String {
        self.message_type.to_owned()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ProofMessage {
    #[serde(rename = "@id")]
    pub(crate) id: String,

    #[serde(rename = "@type")]
    pub(crate) message_type: String,

    pub(crate) request_nonce: String,
    pub(crate) proof_json: Value,
}

impl ProofMessage {
    pub fn new(request_nonce: String, proof_json: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type: Self::KIND.type_uri(),
            request_nonce,
            proof_json,
        }
    }

    pub fn get_proof_json(&self) -> Value {
        self.proof_json.to_owned()
    }

    pub fn nonce(&self) -> Result<String, AgentError> {
        if self.request_nonce.is_empty() {
            return Err(AgentError::InvalidMessage(
                "request_nonce was missing".to_string(),
            ));
        }

        Ok(self.request_nonce.to_owned())
    }
}

impl AgentMessage for ProofMessage {
    const KIND: MessageKind = MessageKind::Proof;

    fn get_id(&self) -> String {
        self.id.to_owned()
    }

    fn get_type(&self) -> String {
        self.message_type.to_owned()
    }
}
