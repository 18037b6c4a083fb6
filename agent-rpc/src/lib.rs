//! `prople-agent-rpc` wires the agent protocol to its infrastructure
//!
//! It provides the TOML configuration, the RocksDB wallets, the HTTP dispatcher and the
//! inbound endpoint. [`AgentRPC`] builds each of them from a single configuration file
use std::sync::Arc;

use rst_common::with_http_tokio::axum::Router;

use prople_agent_core::agent::inbound::InboundAPI;
use prople_agent_core::agent::provisioning::ProvisioningRecord;

pub mod common;
pub mod server;
pub mod store;
pub mod telemetry;
pub mod transport;

mod config;
pub use config::{Agent, App, Config, Database, RocksDBCommon, RocksDBOptions, Transport, Wallet};

use config::Parser as ConfigManager;

use common::helpers;
use common::types::CommonError;
use store::Wallets;
use transport::HttpDispatcher;

pub struct AgentRPC {
    config: Config,
}

impl AgentRPC {
    pub fn new(conf_file: &str) -> Result<Self, CommonError> {
        let config = ConfigManager::new(conf_file.to_string())
            .parse()
            .map_err(|err| CommonError::ConfigError(err.to_string()))?;

        helpers::validate(config.clone())?;
        Ok(Self { config })
    }

    pub fn build_app_config(&self) -> App {
        self.config.app().clone()
    }

    pub fn build_provisioning(&self) -> ProvisioningRecord {
        self.config.agent().provisioning()
    }

    pub fn build_dispatcher(&self) -> Result<HttpDispatcher, CommonError> {
        HttpDispatcher::new(self.config.transport())
    }

    pub fn build_wallets(&self) -> Wallets {
        let wallet = self.config.db().wallet.clone();
        Wallets::new(wallet.get_common(), wallet.get_db_options())
    }

    pub fn build_router(&self, inbound: Arc<dyn InboundAPI>) -> Router {
        server::router(inbound, self.config.transport().get_timeout())
    }
}
