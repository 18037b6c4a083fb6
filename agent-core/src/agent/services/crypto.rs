use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};

use crate::agent::types::AgentError;

/// `DidInfo` is a local DID and its verification key, both generated and kept
/// by the crypto service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct DidInfo {
    pub did: String,
    pub verkey: String,
}

/// `AuthDecrypted` is the output of an authenticated decryption, the `sender_verkey`
/// is recovered from the ciphertext itself
#[derive(Clone, Debug, PartialEq)]
pub struct AuthDecrypted {
    pub sender_verkey: String,
    pub message: Vec<u8>,
}

/// `CryptoBuilder` is the Crypto/DID service
///
/// Decryption with a key that is not owned by the service must fail with
/// [`AgentError::CryptoError`]
#[async_trait]
pub trait CryptoBuilder: Clone + Send + Sync {
    async fn create_key(&self) -> Result<String, AgentError>;
    async fn create_and_store_did(&self) -> Result<DidInfo, AgentError>;

    async fn auth_crypt(
        &self,
        sender_verkey: String,
        recipient_verkey: String,
        message: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError>;

    async fn auth_decrypt(
        &self,
        recipient_verkey: String,
        ciphertext: Vec<u8>,
    ) -> Result<AuthDecrypted, AgentError>;

    async fn anon_crypt(
        &self,
        recipient_verkey: String,
        message: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError>;

    async fn anon_decrypt(
        &self,
        recipient_verkey: String,
        ciphertext: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError>;
}
