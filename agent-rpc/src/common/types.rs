use rst_common::with_errors::thiserror::{self, Error};

use prople_agent_core::agent::types::AgentError;

#[derive(Debug, PartialEq, Error)]
pub enum CommonError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("db error: {0}")]
    DbError(String),

    #[error("json error: {0}")]
    JSONError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("transport error: {0}")]
    TransportError(String),
}

impl From<CommonError> for AgentError {
    fn from(value: CommonError) -> Self {
        match value {
            CommonError::ValidationError(msg) => AgentError::ValidationError(msg),
            CommonError::JSONError(msg) => AgentError::JSONError(msg),
            other => AgentError::StoreError(other.to_string()),
        }
    }
}

pub trait ToValidate {
    fn validate(&self) -> Result<(), CommonError>;
}
