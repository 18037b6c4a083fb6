use std::future::Future;

use rst_common::with_tracing::tracing::{debug, warn};

use crate::agent::types::AgentError;

use super::compensation::Rollback;
use super::types::{RecordEntity, RecordStoreBuilder, TagQuery};

/// `Repository` is a typed facade over any [`RecordStoreBuilder`]
///
/// It resolves the record type through [`RecordEntity::KIND`] and encodes or decodes
/// the JSON value blob on each call
#[derive(Clone)]
pub struct Repository<TStore>
where
    TStore: RecordStoreBuilder,
{
    store: TStore,
}

impl<TStore> Repository<TStore>
where
    TStore: RecordStoreBuilder,
{
    pub fn new(store: TStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> TStore {
        self.store.clone()
    }

    pub async fn add<T: RecordEntity>(&self, entity: &T) -> Result<(), AgentError> {
        let record = entity.to_record()?;
        self.store.add(record).await
    }

    pub async fn update<T: RecordEntity>(&self, entity: &T) -> Result<(), AgentError> {
        let record = entity.to_record()?;
        self.store.update(record).await
    }

    pub async fn get<T: RecordEntity>(&self, id: &str) -> Result<T, AgentError> {
        let record = self
            .store
            .get(T::KIND.type_name().to_string(), id.to_string())
            .await?;

        T::from_record(record)
    }

    pub async fn delete<T: RecordEntity>(&self, id: &str) -> Result<(), AgentError> {
        self.store
            .delete(T::KIND.type_name().to_string(), id.to_string())
            .await
    }

    pub async fn search<T: RecordEntity>(&self, query: TagQuery) -> Result<Vec<T>, AgentError> {
        let records = self
            .store
            .search(T::KIND.type_name().to_string(), query)
            .await?;

        records.into_iter().map(T::from_record).collect()
    }

    /// `find_one` expects exactly one match
    ///
    /// Zero matches raises [`AgentError::RecordNotFound`], more than one match raises
    /// [`AgentError::AmbiguousCorrelation`], it never picks one of them arbitrarily
    pub async fn find_one<T: RecordEntity>(&self, query: TagQuery) -> Result<T, AgentError> {
        let mut found = self.search::<T>(query.clone()).await?;
        match found.len() {
            0 => Err(AgentError::RecordNotFound(format!(
                "{} matching {:?}",
                T::KIND.type_name(),
                query.get_tags()
            ))),
            1 => found
                .pop()
                .ok_or(AgentError::RecordNotFound(T::KIND.type_name().to_string())),
            total => Err(AgentError::AmbiguousCorrelation(format!(
                "{} {} records matching {:?}",
                total,
                T::KIND.type_name(),
                query.get_tags()
            ))),
        }
    }

    /// `find_active` correlates an inbound message to the single active record among
    /// all matching records
    ///
    /// No match at all raises [`AgentError::RecordNotFound`]. When records match but none of
    /// them is active, the message is a replay and [`AgentError::RecordInInvalidState`] is raised
    pub async fn find_active<T, F>(&self, query: TagQuery, is_active: F) -> Result<T, AgentError>
    where
        T: RecordEntity,
        F: Fn(&T) -> bool + Send,
    {
        let found = self.search::<T>(query.clone()).await?;
        if found.is_empty() {
            return Err(AgentError::RecordNotFound(format!(
                "{} matching {:?}",
                T::KIND.type_name(),
                query.get_tags()
            )));
        }

        let total = found.len();
        let mut active: Vec<T> = found.into_iter().filter(|entity| is_active(entity)).collect();
        match active.len() {
            0 => Err(AgentError::RecordInInvalidState(format!(
                "{} {} records matching {:?}, none of them active",
                total,
                T::KIND.type_name(),
                query.get_tags()
            ))),
            1 => active
                .pop()
                .ok_or(AgentError::RecordNotFound(T::KIND.type_name().to_string())),
            count => Err(AgentError::AmbiguousCorrelation(format!(
                "{} active {} records matching {:?}",
                count,
                T::KIND.type_name(),
                query.get_tags()
            ))),
        }
    }

    pub async fn compensate<T: RecordEntity>(&self, rollback: Rollback<T>) -> Result<(), AgentError> {
        match rollback {
            Rollback::Delete(entity) => {
                debug!(id = %entity.record_id(), "compensation: delete record");
                self.delete::<T>(&entity.record_id()).await
            }
            Rollback::Restore(snapshot) => {
                debug!(id = %snapshot.record_id(), "compensation: restore snapshot");
                self.update(&snapshot).await
            }
        }
    }

    /// `with_compensation` runs the given side effect and applies the compensating action
    /// when it fails, the original error is re-raised afterwards
    ///
    /// When the compensation itself fails the record may be left advanced, that failure is
    /// the one reported to the caller
    pub async fn with_compensation<T, F>(&self, rollback: Rollback<T>, action: F) -> Result<(), AgentError>
    where
        T: RecordEntity,
        F: Future<Output = Result<(), AgentError>> + Send,
    {
        match action.await {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(error = %err, "side effect failed, compensating");
                self.compensate(rollback).await.map_err(|compensation_err| {
                    AgentError::StoreError(format!(
                        "compensation failed after [{}]: {}",
                        err, compensation_err
                    ))
                })?;

                Err(err)
            }
        }
    }
}
