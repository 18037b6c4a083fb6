use std::time::Duration;

use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

pub const DEFAULT_CONTENT_TYPE: &str = "application/ssi-agent-wire";

fn default_timeout() -> u64 {
    10
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// `Transport` drives the outbound HTTP dispatcher
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "self::serde")]
pub struct Transport {
    #[serde(default = "default_timeout")]
    pub(super) timeout: u64,

    #[serde(default = "default_content_type")]
    pub(super) content_type: String,
}

impl Transport {
    pub fn new(timeout: u64, content_type: String) -> Self {
        Self {
            timeout,
            content_type,
        }
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn get_content_type(&self) -> String {
        self.content_type.to_owned()
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            content_type: default_content_type(),
        }
    }
}

impl ToValidate for Transport {
    fn validate(&self) -> Result<(), CommonError> {
        if self.timeout == 0 {
            return Err(CommonError::ValidationError(
                "config: transport:timeout must be greater than zero".to_string(),
            ));
        }

        if self.content_type.is_empty() {
            return Err(CommonError::ValidationError(
                "config: transport:content_type is missing".to_string(),
            ));
        }

        Ok(())
    }
}
