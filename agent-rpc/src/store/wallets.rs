use rst_common::with_tracing::tracing::info;

use prople_agent_core::agent::cache::HandleCache;
use prople_agent_core::agent::types::AgentError;

use crate::config::{RocksDBCommon, RocksDBOptions};

use super::builder::open_executor;
use super::repository::Repository;

/// `Wallets` opens one RocksDB store per named wallet under a shared base path
///
/// Opened wallets are cached, asking twice for the same name gives back clones of the
/// same [`Repository`]
#[derive(Clone)]
pub struct Wallets {
    common: RocksDBCommon,
    opts: RocksDBOptions,
    cache: HandleCache<Repository>,
}

impl Wallets {
    pub fn new(common: RocksDBCommon, opts: RocksDBOptions) -> Self {
        Self {
            common,
            opts,
            cache: HandleCache::new(),
        }
    }

    pub async fn open(&self, name: &str) -> Result<Repository, AgentError> {
        if name.is_empty() {
            return Err(AgentError::ValidationError(
                "wallet name is missing".to_string(),
            ));
        }

        let (base, cf_name) = self.common.get();
        let common = RocksDBCommon::new(format!("{}/{}", base, name), cf_name);
        let opts = self.opts.for_wallet(name);

        self.cache
            .get_or_open(name, || async move {
                info!(path = %common.get().0, "opening wallet");
                let db = open_executor(common, opts)?;
                Ok(Repository::new(db))
            })
            .await
    }

    /// `close` drops the cached handle, the database is released once every clone
    /// handed out by [`Wallets::open`] is dropped too
    pub async fn close(&self, name: &str) -> bool {
        self.cache.close(name).await.is_some()
    }

    pub async fn close_all(&self) -> usize {
        self.cache.close_all().await.len()
    }

    pub async fn opened(&self) -> usize {
        self.cache.len().await
    }
}
