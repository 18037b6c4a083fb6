use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

use super::machine::TransitionError;

/// `ErrorCode` is a stable code attached to each [`AgentError`]
///
/// The code will never change even if the error message changes, a caller should
/// use it to decide how to react to a failed operation
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub enum ErrorCode {
    RecordNotFound,
    RecordInInvalidState,
    RecordAmbiguous,
    MessageTransmissionFailure,
    InvalidMessage,
    LedgerOperationRejected,
    StoreFailure,
    CryptoFailure,
    CredentialMathFailure,
    LedgerFailure,
    ValidationFailure,
    JSONFailure,
}

/// `AgentError` is a base error types for all protocol operations
///
/// All errors are raised to the calling operation, there is no error swallowed
/// inside a state machine transition
#[derive(Debug, PartialEq, Error, Serialize, Deserialize, Clone)]
#[serde(crate = "self::serde")]
pub enum AgentError {
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("record in invalid state: {0}")]
    RecordInInvalidState(String),

    #[error("ambiguous correlation: {0}")]
    AmbiguousCorrelation(String),

    #[error("message transmission failure: {0}")]
    MessageTransmissionFailure(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("ledger operation rejected: {0}")]
    LedgerOperationRejected(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("crypto error: {0}")]
    CryptoError(String),

    #[error("credential math error: {0}")]
    CredentialMathError(String),

    #[error("ledger error: {0}")]
    LedgerError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("json error: {0}")]
    JSONError(String),
}

impl AgentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AgentError::RecordNotFound(_) => ErrorCode::RecordNotFound,
            AgentError::RecordInInvalidState(_) => ErrorCode::RecordInInvalidState,
            AgentError::AmbiguousCorrelation(_) => ErrorCode::RecordAmbiguous,
            AgentError::MessageTransmissionFailure(_) => ErrorCode::MessageTransmissionFailure,
            AgentError::InvalidMessage(_) => ErrorCode::InvalidMessage,
            AgentError::LedgerOperationRejected(_) => ErrorCode::LedgerOperationRejected,
            AgentError::StoreError(_) => ErrorCode::StoreFailure,
            AgentError::CryptoError(_) => ErrorCode::CryptoFailure,
            AgentError::CredentialMathError(_) => ErrorCode::CredentialMathFailure,
            AgentError::LedgerError(_) => ErrorCode::LedgerFailure,
            AgentError::ValidationError(_) => ErrorCode::ValidationFailure,
            AgentError::JSONError(_) => ErrorCode::JSONFailure,
        }
    }

    /// `into_transmission_failure` classifies any error raised while sending a message
    /// as a transmission failure, keeping the original message
    pub fn into_transmission_failure(self) -> AgentError {
        match self {
            AgentError::MessageTransmissionFailure(_) => self,
            other => AgentError::MessageTransmissionFailure(other.to_string()),
        }
    }
}

impl From<TransitionError> for AgentError {
    fn from(value: TransitionError) -> Self {
        AgentError::RecordInInvalidState(value.to_string())
    }
}
