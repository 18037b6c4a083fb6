use rst_common::standard::serde_json::Value;
use rst_common::with_tracing::tracing::{debug, info};

use crate::agent::cache::HandleCache;
use crate::agent::provisioning::ProvisioningRecord;
use crate::agent::services::credmath::{CredentialMathBuilder, TailsReader};
use crate::agent::services::ledger::LedgerBuilder;
use crate::agent::store::types::{RecordEntity, RecordStoreBuilder, TagQuery};
use crate::agent::store::Repository;
use crate::agent::types::AgentError;

use super::types::{
    tails_location, DefinitionRecord, RevocationRegistryRecord, SchemaRecord, TAG_DEFINITION_ID,
};

/// `Registrar` coordinates the publication of schemas and credential definitions between
/// the ledger and the local record store
///
/// Published artifacts are cached as records, a lookup reads the local record first and only
/// asks the ledger on a miss. Tails readers are cached through an injected [`HandleCache`]
#[derive(Clone)]
pub struct Registrar<TStore, TMath, TLedger>
where
    TStore: RecordStoreBuilder,
    TMath: CredentialMathBuilder,
    TLedger: LedgerBuilder,
{
    repo: Repository<TStore>,
    math: TMath,
    ledger: TLedger,
    provisioning: ProvisioningRecord,
    tails: HandleCache<TailsReader>,
}

impl<TStore, TMath, TLedger> Registrar<TStore, TMath, TLedger>
where
    TStore: RecordStoreBuilder,
    TMath: CredentialMathBuilder,
    TLedger: LedgerBuilder,
{
    pub fn new(
        store: TStore,
        math: TMath,
        ledger: TLedger,
        provisioning: ProvisioningRecord,
        tails: HandleCache<TailsReader>,
    ) -> Self {
        Self {
            repo: Repository::new(store),
            math,
            ledger,
            provisioning,
            tails,
        }
    }

    pub fn ledger(&self) -> TLedger {
        self.ledger.clone()
    }

    pub async fn register_schema(
        &self,
        name: String,
        version: String,
        attributes: Vec<String>,
    ) -> Result<SchemaRecord, AgentError> {
        if attributes.is_empty() {
            return Err(AgentError::ValidationError(
                "schema attributes was missing".to_string(),
            ));
        }

        let issuer_did = self.provisioning.issuer_did()?;
        let schema = self
            .math
            .create_schema(issuer_did.clone(), name, version, attributes)
            .await?;

        let _ = self
            .ledger
            .register_schema(issuer_did, schema.id.clone(), schema.value.clone())
            .await?
            .into_result()?;

        let record = SchemaRecord::new(schema.id, schema.value);
        self.repo.add(&record).await?;

        info!(id = %record.get_id(), "schema registered");
        Ok(record)
    }

    /// `register_definition` publishes a credential definition of a known schema
    ///
    /// When `max_credentials` is given, the definition supports revocation and a revocation
    /// registry is created and published too, its tails file is placed under the provisioned
    /// tails base location
    pub async fn register_definition(
        &self,
        schema_id: String,
        tag: String,
        max_credentials: Option<u32>,
    ) -> Result<DefinitionRecord, AgentError> {
        let issuer_did = self.provisioning.issuer_did()?;
        let schema = self.lookup_schema(schema_id).await?;

        let definition = self
            .math
            .create_definition(issuer_did.clone(), schema, tag, max_credentials.is_some())
            .await?;

        let _ = self
            .ledger
            .register_definition(
                issuer_did.clone(),
                definition.id.clone(),
                definition.value.clone(),
            )
            .await?
            .into_result()?;

        let record = DefinitionRecord::new(definition.id.clone(), definition.value);
        self.repo.add(&record).await?;

        if let Some(max_credentials) = max_credentials {
            let registry = self
                .register_revocation_registry(issuer_did, definition.id, max_credentials)
                .await?;

            debug!(registry = %registry.get_id(), "revocation registry registered");
        }

        info!(id = %record.get_id(), "credential definition registered");
        Ok(record)
    }

    async fn register_revocation_registry(
        &self,
        issuer_did: String,
        definition_id: String,
        max_credentials: u32,
    ) -> Result<RevocationRegistryRecord, AgentError> {
        let base = self
            .provisioning
            .get_tails_base_location()
            .ok_or(AgentError::ValidationError(
                "tails base location was missing".to_string(),
            ))?;

        let location = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            definition_id.replace(':', "_")
        );

        let registry = self
            .math
            .create_revocation_registry(
                issuer_did.clone(),
                definition_id.clone(),
                location.clone(),
                max_credentials,
            )
            .await?;

        let _ = self
            .ledger
            .register_revocation_registry(
                issuer_did,
                registry.id.clone(),
                registry.definition.clone(),
                registry.entry,
            )
            .await?
            .into_result()?;

        let record = RevocationRegistryRecord::new(
            registry.id,
            definition_id,
            location,
            max_credentials,
            registry.definition,
        );

        self.repo.add(&record).await?;
        Ok(record)
    }

    /// `fill_cache` stores a ledger artifact fetched after a cache miss. Another lookup of
    /// the same id may have stored it in the meantime, finding it cached is a success
    async fn fill_cache<T: RecordEntity>(&self, entity: &T) -> Result<(), AgentError> {
        match self.repo.add(entity).await {
            Ok(()) => Ok(()),
            Err(AgentError::StoreError(msg)) => match self.repo.get::<T>(&entity.record_id()).await {
                Ok(_) => {
                    debug!(id = %entity.record_id(), "already cached");
                    Ok(())
                }
                Err(_) => Err(AgentError::StoreError(msg)),
            },
            Err(err) => Err(err),
        }
    }

    pub async fn lookup_schema(&self, schema_id: String) -> Result<Value, AgentError> {
        match self.repo.get::<SchemaRecord>(&schema_id).await {
            Ok(record) => return Ok(record.get_schema_json()),
            Err(AgentError::RecordNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        debug!(id = %schema_id, "schema cache miss");
        let schema = self.ledger.lookup_schema(schema_id.clone()).await?;
        self.fill_cache(&SchemaRecord::new(schema_id, schema.clone()))
            .await?;

        Ok(schema)
    }

    pub async fn lookup_definition(&self, definition_id: String) -> Result<Value, AgentError> {
        match self.repo.get::<DefinitionRecord>(&definition_id).await {
            Ok(record) => return Ok(record.get_definition_json()),
            Err(AgentError::RecordNotFound(_)) => {}
            Err(err) => return Err(err),
        }

        debug!(id = %definition_id, "credential definition cache miss");
        let definition = self.ledger.lookup_definition(definition_id.clone()).await?;
        self.fill_cache(&DefinitionRecord::new(definition_id, definition.clone()))
            .await?;

        Ok(definition)
    }

    /// `lookup_revocation_definition` prefers our own registry record, a holder or a
    /// verifier always reads it from the ledger
    pub async fn lookup_revocation_definition(
        &self,
        registry_id: String,
    ) -> Result<Value, AgentError> {
        match self.repo.get::<RevocationRegistryRecord>(&registry_id).await {
            Ok(record) => Ok(record.get_definition_json()),
            Err(AgentError::RecordNotFound(_)) => {
                self.ledger.lookup_revocation_definition(registry_id).await
            }
            Err(err) => Err(err),
        }
    }

    pub async fn revocation_registry_for(
        &self,
        definition_id: String,
    ) -> Result<RevocationRegistryRecord, AgentError> {
        self.repo
            .find_one::<RevocationRegistryRecord>(
                TagQuery::new().with(TAG_DEFINITION_ID, definition_id),
            )
            .await
    }

    pub async fn open_tails(&self, location: String) -> Result<TailsReader, AgentError> {
        let math = self.math.clone();
        let opened = location.clone();

        self.tails
            .get_or_open(&location, || async move { math.open_tails_reader(opened).await })
            .await
    }

    /// `open_tails_for` opens the tails reader declared by a revocation registry definition
    pub async fn open_tails_for(
        &self,
        revocation_definition: &Value,
    ) -> Result<TailsReader, AgentError> {
        let location = tails_location(revocation_definition).ok_or(AgentError::LedgerError(
            "tailsLocation was missing".to_string(),
        ))?;

        self.open_tails(location).await
    }

    pub async fn close_tails(&self, location: String) -> Option<TailsReader> {
        self.tails.close(&location).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rst_common::with_tokio::tokio;

    use rst_common::standard::async_trait::async_trait;

    use crate::agent::fixtures::{FakeCredentialMath, FakeLedger, Party};
    use crate::agent::store::types::StoredRecord;
    use crate::agent::store::MemoryStore;

    /// `SlowStore` gives way to other tasks right after each read
    #[derive(Clone, Default)]
    struct SlowStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl RecordStoreBuilder for SlowStore {
        async fn add(&self, record: StoredRecord) -> Result<(), AgentError> {
            self.inner.add(record).await
        }

        async fn update(&self, record: StoredRecord) -> Result<(), AgentError> {
            self.inner.update(record).await
        }

        async fn get(&self, type_name: String, id: String) -> Result<StoredRecord, AgentError> {
            let found = self.inner.get(type_name, id).await;
            tokio::task::yield_now().await;
            found
        }

        async fn delete(&self, type_name: String, id: String) -> Result<(), AgentError> {
            self.inner.delete(type_name, id).await
        }

        async fn search(
            &self,
            type_name: String,
            query: TagQuery,
        ) -> Result<Vec<StoredRecord>, AgentError> {
            self.inner.search(type_name, query).await
        }
    }

    fn build_registrar(
        ledger: FakeLedger,
        issuer: bool,
    ) -> Registrar<MemoryStore, FakeCredentialMath, FakeLedger> {
        let mut provisioning = Party::provisioning_for("faber", "faber-routing".to_string());
        if issuer {
            provisioning = provisioning
                .with_issuer_did("did:sov:faber".to_string())
                .with_tails_base_location("/tmp/tails".to_string());
        }

        Registrar::new(
            MemoryStore::new(),
            FakeCredentialMath::new(),
            ledger,
            provisioning,
            HandleCache::new(),
        )
    }

    #[tokio::test]
    async fn test_register_schema_and_definition() {
        let ledger = FakeLedger::new();
        let registrar = build_registrar(ledger.clone(), true);

        let schema = registrar
            .register_schema(
                "degree".to_string(),
                "1.0".to_string(),
                vec!["first_name".to_string(), "last_name".to_string()],
            )
            .await;
        assert!(!schema.is_err());

        let schema = schema.unwrap();
        assert_eq!(schema.get_name(), "degree".to_string());
        assert!(!ledger.lookup_schema(schema.get_id()).await.is_err());

        let definition = registrar
            .register_definition(schema.get_id(), "tag1".to_string(), Some(100))
            .await;
        assert!(!definition.is_err());

        let definition = definition.unwrap();
        assert!(definition.is_revocable());
        assert_eq!(definition.get_schema_id(), Some(schema.get_id()));

        let registry = registrar
            .revocation_registry_for(definition.get_id())
            .await
            .unwrap();
        assert_eq!(registry.get_definition_id(), definition.get_id());
        assert_eq!(registry.get_max_credentials(), 100);
        assert!(registry.get_tails_location().starts_with("/tmp/tails/"));
    }

    #[tokio::test]
    async fn test_register_without_issuer_did() {
        let registrar = build_registrar(FakeLedger::new(), false);
        let schema = registrar
            .register_schema("degree".to_string(), "1.0".to_string(), vec!["name".to_string()])
            .await;

        assert!(matches!(schema.unwrap_err(), AgentError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_register_rejected_by_ledger() {
        let ledger = FakeLedger::new();
        ledger.set_rejecting(true);

        let registrar = build_registrar(ledger, true);
        let schema = registrar
            .register_schema("degree".to_string(), "1.0".to_string(), vec!["name".to_string()])
            .await;

        assert!(matches!(
            schema.unwrap_err(),
            AgentError::LedgerOperationRejected(_)
        ));
    }

    #[tokio::test]
    async fn test_lookup_falls_back_to_ledger() {
        let ledger = FakeLedger::new();
        let issuer = build_registrar(ledger.clone(), true);
        let schema = issuer
            .register_schema("degree".to_string(), "1.0".to_string(), vec!["name".to_string()])
            .await
            .unwrap();

        let holder = build_registrar(ledger.clone(), false);
        let found = holder.lookup_schema(schema.get_id()).await;
        assert!(!found.is_err());
        assert_eq!(found.unwrap(), schema.get_schema_json());

        // cached locally, the ledger is not consulted anymore
        ledger.forget(&schema.get_id());
        let cached = holder.lookup_schema(schema.get_id()).await;
        assert!(!cached.is_err());

        let missing = holder.lookup_definition("unknown".to_string()).await;
        assert!(matches!(missing.unwrap_err(), AgentError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_cache_fill() {
        let ledger = FakeLedger::new();
        let issuer = build_registrar(ledger.clone(), true);
        let schema = issuer
            .register_schema("degree".to_string(), "1.0".to_string(), vec!["name".to_string()])
            .await
            .unwrap();
        let definition = issuer
            .register_definition(schema.get_id(), "tag1".to_string(), None)
            .await
            .unwrap();

        let verifier = Registrar::new(
            SlowStore::default(),
            FakeCredentialMath::new(),
            ledger,
            Party::provisioning_for("acme", "acme-routing".to_string()),
            HandleCache::new(),
        );

        let (first, second) = tokio::join!(
            verifier.lookup_schema(schema.get_id()),
            verifier.lookup_schema(schema.get_id())
        );
        assert_eq!(first.unwrap(), schema.get_schema_json());
        assert_eq!(second.unwrap(), schema.get_schema_json());

        let (first, second) = tokio::join!(
            verifier.lookup_definition(definition.get_id()),
            verifier.lookup_definition(definition.get_id())
        );
        assert_eq!(first.unwrap(), definition.get_definition_json());
        assert_eq!(second.unwrap(), definition.get_definition_json());
    }

    #[tokio::test]
    async fn test_open_tails_cached() {
        let registrar = build_registrar(FakeLedger::new(), true);

        let first = registrar.open_tails("/tmp/tails/a".to_string()).await.unwrap();
        let second = registrar.open_tails("/tmp/tails/a".to_string()).await.unwrap();
        assert_eq!(first, second);

        let closed = registrar.close_tails("/tmp/tails/a".to_string()).await;
        assert_eq!(closed, Some(first.clone()));

        let reopened = registrar.open_tails("/tmp/tails/a".to_string()).await.unwrap();
        assert_ne!(reopened.handle, first.handle);
    }
}
