use rst_common::standard::serde::{self, Deserialize, Serialize};

use super::messaging::types::AgentEndpoint;
use super::types::AgentError;

/// `AgentOwner` is the display metadata of the agent's owner, it is used as the
/// label of the generated invitations and connection requests
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct AgentOwner {
    pub(crate) name: String,
    pub(crate) image_url: Option<String>,
}

impl AgentOwner {
    pub fn new(name: String, image_url: Option<String>) -> Self {
        Self { name, image_url }
    }

    pub fn get_name(&self) -> String {
        self.name.to_owned()
    }

    pub fn get_image_url(&self) -> Option<String> {
        self.image_url.to_owned()
    }
}

/// `ProvisioningRecord` is read-only configuration shared by all protocol workflows
///
/// It is created once per wallet, usually built from the agent configuration file
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(crate = "self::serde")]
pub struct ProvisioningRecord {
    pub(crate) endpoint: AgentEndpoint,
    pub(crate) owner: AgentOwner,
    pub(crate) issuer_did: Option<String>,
    pub(crate) master_secret_id: String,
    pub(crate) tails_base_location: Option<String>,
}

impl ProvisioningRecord {
    pub fn new(endpoint: AgentEndpoint, owner: AgentOwner, master_secret_id: String) -> Self {
        Self {
            endpoint,
            owner,
            master_secret_id,
            issuer_did: None,
            tails_base_location: None,
        }
    }

    pub fn with_issuer_did(mut self, did: String) -> Self {
        self.issuer_did = Some(did);
        self
    }

    pub fn with_tails_base_location(mut self, location: String) -> Self {
        self.tails_base_location = Some(location);
        self
    }

    pub fn get_endpoint(&self) -> AgentEndpoint {
        self.endpoint.to_owned()
    }

    pub fn get_owner(&self) -> AgentOwner {
        self.owner.to_owned()
    }

    pub fn get_master_secret_id(&self) -> String {
        self.master_secret_id.to_owned()
    }

    pub fn get_tails_base_location(&self) -> Option<String> {
        self.tails_base_location.to_owned()
    }

    /// `issuer_did` returns the configured issuer DID, an agent that has never been
    /// provisioned as an issuer is not able to publish anything to the ledger
    pub fn issuer_did(&self) -> Result<String, AgentError> {
        self.issuer_did
            .to_owned()
            .ok_or(AgentError::ValidationError(
                "issuer did was missing".to_string(),
            ))
    }
}
