use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use rst_common::with_tokio::tokio::sync::{Mutex, OnceCell};
use rst_common::with_tracing::tracing::debug;

use super::types::AgentError;

type Slot<T> = Arc<OnceCell<T>>;

/// `HandleCache` keeps opened handles keyed by name
///
/// A handle is opened the first time it is requested through [`HandleCache::get_or_open`] and
/// stays cached until it is explicitly closed. The cache is an ordinary value, the owner
/// injects it into the components that need shared handles
#[derive(Clone)]
pub struct HandleCache<T>
where
    T: Clone + Send + Sync,
{
    slots: Arc<Mutex<HashMap<String, Slot<T>>>>,
}

impl<T> HandleCache<T>
where
    T: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn slot(&self, key: &str) -> Slot<T> {
        let mut slots = self.slots.lock().await;
        slots
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// `get_or_open` returns the cached handle or opens and caches a new one
    ///
    /// Concurrent callers asking for the same key never open it twice. Opening a key
    /// only waits on that key, other handles stay reachable meanwhile. A failed open
    /// leaves the key empty for the next caller
    pub async fn get_or_open<F, Fut>(&self, key: &str, open: F) -> Result<T, AgentError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, AgentError>> + Send,
    {
        let slot = self.slot(key).await;
        let handle = slot
            .get_or_try_init(|| {
                debug!(key, "opening handle");
                open()
            })
            .await?;

        Ok(handle.clone())
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let slots = self.slots.lock().await;
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// `close` removes the handle from the cache and gives it back to the caller,
    /// dropping it releases the underlying resource
    pub async fn close(&self, key: &str) -> Option<T> {
        debug!(key, "closing handle");
        let slot = self.slots.lock().await.remove(key)?;
        slot.get().cloned()
    }

    pub async fn close_all(&self) -> Vec<T> {
        let mut slots = self.slots.lock().await;
        slots
            .drain()
            .filter_map(|(_, slot)| slot.get().cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }
}

impl<T> Default for HandleCache<T>
where
    T: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
