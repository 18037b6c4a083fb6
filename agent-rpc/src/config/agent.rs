use rst_common::standard::serde::{self, Deserialize};

use prople_agent_core::agent::messaging::types::AgentEndpoint;
use prople_agent_core::agent::provisioning::{AgentOwner, ProvisioningRecord};

use crate::common::types::{CommonError, ToValidate};

/// `Agent` is the static identity of the running agent, turned into the
/// [`ProvisioningRecord`] used by every workflow
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Agent {
    pub(super) endpoint: String,
    pub(super) verkey: String,
    pub(super) name: String,
    pub(super) master_secret_id: String,

    #[serde(default)]
    pub(super) image_url: Option<String>,

    #[serde(default)]
    pub(super) issuer_did: Option<String>,

    #[serde(default)]
    pub(super) tails_base_location: Option<String>,
}

impl Agent {
    pub fn provisioning(&self) -> ProvisioningRecord {
        let endpoint = AgentEndpoint::new(self.endpoint.to_owned(), self.verkey.to_owned());
        let owner = AgentOwner::new(self.name.to_owned(), self.image_url.to_owned());
        let mut record = ProvisioningRecord::new(endpoint, owner, self.master_secret_id.to_owned());

        if let Some(did) = &self.issuer_did {
            record = record.with_issuer_did(did.to_owned());
        }

        if let Some(location) = &self.tails_base_location {
            record = record.with_tails_base_location(location.to_owned());
        }

        record
    }
}

impl ToValidate for Agent {
    fn validate(&self) -> Result<(), CommonError> {
        let required = [
            ("endpoint", &self.endpoint),
            ("verkey", &self.verkey),
            ("name", &self.name),
            ("master_secret_id", &self.master_secret_id),
        ];

        for (field, value) in required {
            if value.is_empty() {
                return Err(CommonError::ValidationError(format!(
                    "config: agent:{} is missing",
                    field
                )));
            }
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(CommonError::ValidationError(format!(
                "config: agent:endpoint is not an http uri: {}",
                self.endpoint
            )));
        }

        self.provisioning()
            .get_endpoint()
            .validate()
            .map_err(|err| CommonError::ValidationError(format!("config: agent:endpoint {}", err)))
    }
}
