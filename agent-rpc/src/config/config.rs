use rst_common::standard::serde::{self, Deserialize};

use crate::common::types::{CommonError, ToValidate};

use super::{Agent, App, Database, Transport};

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(crate = "self::serde")]
pub struct Config {
    pub(super) database: Database,
    pub(super) app: App,

    #[serde(default)]
    pub(super) transport: Transport,

    pub(super) agent: Agent,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn db(&self) -> &Database {
        &self.database
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

impl ToValidate for Config {
    fn validate(&self) -> Result<(), CommonError> {
        self.app.validate()?;
        self.database.validate()?;
        self.transport.validate()?;
        self.agent.validate()?;

        Ok(())
    }
}
