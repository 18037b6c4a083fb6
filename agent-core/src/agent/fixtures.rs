//! In-process fakes of the external collaborators and a small harness wiring two agents
//! together, shared by the workflow tests
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{self, json, Value};
use rst_common::standard::uuid::Uuid;

use super::cache::HandleCache;
use super::connection::types::{ConnectionAPI, InviteConfig};
use super::connection::{ConnectionRecord, Usecase as ConnectionUsecase};
use super::credential::types::CredentialAPI;
use super::credential::{CredentialRecord, Usecase as CredentialUsecase};
use super::inbound::{InboundAPI, InboundOutcome, InboundProcessor};
use super::messaging::envelope::EnvelopeCodec;
use super::messaging::messenger::Messenger;
use super::messaging::types::{AgentEndpoint, DispatcherBuilder};
use super::proof::Usecase as ProofUsecase;
use super::provisioning::{AgentOwner, ProvisioningRecord};
use super::registrar::types::DefinitionRecord;
use super::registrar::Registrar;
use super::services::credmath::{
    CredentialInfo, CredentialMathBuilder, CredentialRequestArtifact, IssuedCredential,
    LedgerArtifact, ProofArtifacts, RevocationRegistryArtifact, TailsReader,
};
use super::services::crypto::{AuthDecrypted, CryptoBuilder, DidInfo};
use super::services::ledger::{LedgerBuilder, LedgerReply, RevocationSnapshot};
use super::store::MemoryStore;
use super::types::AgentError;

fn signature_of(value: &Value) -> String {
    let mut hasher = DefaultHasher::new();
    value.to_string().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

fn signed(mut body: Value) -> Value {
    let signature = signature_of(&body);
    if let Some(object) = body.as_object_mut() {
        object.insert("signature".to_string(), json!(signature));
    }
    body
}

fn has_valid_signature(value: &Value) -> bool {
    let mut body = value.clone();
    let signature = body
        .as_object_mut()
        .and_then(|object| object.remove("signature"));

    match signature {
        Some(Value::String(signature)) => signature == signature_of(&body),
        _ => false,
    }
}

fn math_error(message: &str) -> AgentError {
    AgentError::CredentialMathError(message.to_string())
}

/// `FakeCrypto` seals payloads into a readable json box, only the owner of the
/// recipient key is able to open it
#[derive(Clone, Default)]
pub(crate) struct FakeCrypto {
    keys: Arc<Mutex<BTreeSet<String>>>,
}

impl FakeCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    fn owns(&self, key: &str) -> bool {
        self.keys.lock().unwrap().contains(key)
    }

    fn generate(&self) -> String {
        let key = format!("vk-{}", Uuid::new_v4().simple());
        self.keys.lock().unwrap().insert(key.clone());
        key
    }

    fn seal(scheme: &str, sender: Option<String>, recipient: String, message: Vec<u8>) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "scheme": scheme,
            "sender": sender,
            "recipient": recipient,
            "body": STANDARD.encode(message),
        }))
        .unwrap()
    }

    fn open(
        &self,
        scheme: &str,
        recipient: &str,
        ciphertext: &[u8],
    ) -> Result<(Option<String>, Vec<u8>), AgentError> {
        let sealed: Value = serde_json::from_slice(ciphertext)
            .map_err(|_| AgentError::CryptoError("malformed ciphertext".to_string()))?;

        if !self.owns(recipient) || sealed["recipient"] != json!(recipient) {
            return Err(AgentError::CryptoError(format!(
                "unable to decrypt for {}",
                recipient
            )));
        }

        if sealed["scheme"] != json!(scheme) {
            return Err(AgentError::CryptoError("unexpected scheme".to_string()));
        }

        let body = sealed["body"]
            .as_str()
            .and_then(|body| STANDARD.decode(body).ok())
            .ok_or(AgentError::CryptoError("malformed body".to_string()))?;

        Ok((sealed["sender"].as_str().map(|sender| sender.to_string()), body))
    }
}

#[async_trait]
impl CryptoBuilder for FakeCrypto {
    async fn create_key(&self) -> Result<String, AgentError> {
        Ok(self.generate())
    }

    async fn create_and_store_did(&self) -> Result<DidInfo, AgentError> {
        let verkey = self.generate();
        let did = format!("did:sov:{}", &Uuid::new_v4().simple().to_string()[..22]);
        Ok(DidInfo { did, verkey })
    }

    async fn auth_crypt(
        &self,
        sender_verkey: String,
        recipient_verkey: String,
        message: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError> {
        if !self.owns(&sender_verkey) {
            return Err(AgentError::CryptoError(format!(
                "sender key {} is not owned",
                sender_verkey
            )));
        }

        Ok(Self::seal("auth", Some(sender_verkey), recipient_verkey, message))
    }

    async fn auth_decrypt(
        &self,
        recipient_verkey: String,
        ciphertext: Vec<u8>,
    ) -> Result<AuthDecrypted, AgentError> {
        let (sender, message) = self.open("auth", &recipient_verkey, &ciphertext)?;
        let sender_verkey =
            sender.ok_or(AgentError::CryptoError("sender was missing".to_string()))?;

        Ok(AuthDecrypted {
            sender_verkey,
            message,
        })
    }

    async fn anon_crypt(
        &self,
        recipient_verkey: String,
        message: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError> {
        Ok(Self::seal("anon", None, recipient_verkey, message))
    }

    async fn anon_decrypt(
        &self,
        recipient_verkey: String,
        ciphertext: Vec<u8>,
    ) -> Result<Vec<u8>, AgentError> {
        self.open("anon", &recipient_verkey, &ciphertext)
            .map(|(_, message)| message)
    }
}

#[derive(Default)]
struct MathWallet {
    definitions: HashMap<String, Value>,
    credentials: HashMap<String, CredentialInfo>,
    revocation_counters: HashMap<String, u32>,
}

/// `FakeCredentialMath` signs artifacts with a plain hash, a tampered payload fails
/// its signature check
#[derive(Clone, Default)]
pub(crate) struct FakeCredentialMath {
    wallet: Arc<Mutex<MathWallet>>,
}

impl FakeCredentialMath {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialMathBuilder for FakeCredentialMath {
    async fn create_schema(
        &self,
        issuer_did: String,
        name: String,
        version: String,
        attributes: Vec<String>,
    ) -> Result<LedgerArtifact, AgentError> {
        let id = format!("{}:2:{}:{}", issuer_did, name, version);
        Ok(LedgerArtifact {
            id: id.clone(),
            value: json!({
                "id": id,
                "name": name,
                "version": version,
                "attrNames": attributes,
            }),
        })
    }

    async fn create_definition(
        &self,
        issuer_did: String,
        schema: Value,
        tag: String,
        supports_revocation: bool,
    ) -> Result<LedgerArtifact, AgentError> {
        let schema_id = schema["id"]
            .as_str()
            .ok_or(math_error("schema id was missing"))?;

        let id = format!("{}:3:CL:{}:{}", issuer_did, schema_id, tag);
        let revocation = if supports_revocation {
            json!({"accum_key": Uuid::new_v4().simple().to_string()})
        } else {
            Value::Null
        };

        let value = json!({
            "id": id,
            "schemaId": schema_id,
            "tag": tag,
            "value": {
                "primary": {"n": Uuid::new_v4().simple().to_string()},
                "revocation": revocation,
            },
        });

        self.wallet
            .lock()
            .unwrap()
            .definitions
            .insert(id.clone(), value.clone());

        Ok(LedgerArtifact { id, value })
    }

    async fn create_revocation_registry(
        &self,
        issuer_did: String,
        definition_id: String,
        tails_location: String,
        max_credentials: u32,
    ) -> Result<RevocationRegistryArtifact, AgentError> {
        let id = format!("{}:4:{}:CL_ACCUM:TAG1", issuer_did, definition_id);
        Ok(RevocationRegistryArtifact {
            id: id.clone(),
            definition: json!({
                "id": id,
                "credDefId": definition_id,
                "value": {
                    "tailsLocation": tails_location,
                    "maxCredNum": max_credentials,
                },
            }),
            entry: json!({"accum": "0"}),
        })
    }

    async fn create_offer(&self, definition_id: String) -> Result<Value, AgentError> {
        let wallet = self.wallet.lock().unwrap();
        let definition = wallet
            .definitions
            .get(&definition_id)
            .ok_or(math_error("unknown credential definition"))?;

        Ok(json!({
            "schema_id": definition["schemaId"],
            "cred_def_id": definition_id,
            "nonce": Uuid::new_v4().as_u128().to_string(),
        }))
    }

    async fn create_request(
        &self,
        prover_did: String,
        offer: Value,
        definition: Value,
        master_secret_id: String,
    ) -> Result<CredentialRequestArtifact, AgentError> {
        if definition["id"] != offer["cred_def_id"] {
            return Err(math_error("offer and definition differ"));
        }

        Ok(CredentialRequestArtifact {
            request: json!({
                "prover_did": prover_did,
                "cred_def_id": offer["cred_def_id"],
                "nonce": offer["nonce"],
            }),
            metadata: json!({
                "master_secret_id": master_secret_id,
                "nonce": offer["nonce"],
            }),
        })
    }

    async fn create_credential(
        &self,
        offer: Value,
        request: Value,
        values: Value,
        revocation_registry_id: Option<String>,
        tails: Option<TailsReader>,
    ) -> Result<IssuedCredential, AgentError> {
        if offer["nonce"] != request["nonce"] {
            return Err(math_error("request does not answer the offer"));
        }

        let revocation_id = match (&revocation_registry_id, tails) {
            (Some(registry_id), Some(_)) => {
                let mut wallet = self.wallet.lock().unwrap();
                let counter = wallet
                    .revocation_counters
                    .entry(registry_id.clone())
                    .or_insert(0);
                *counter += 1;
                Some(counter.to_string())
            }
            (Some(_), None) => return Err(math_error("tails reader was missing")),
            _ => None,
        };

        let credential = signed(json!({
            "schema_id": offer["schema_id"],
            "cred_def_id": offer["cred_def_id"],
            "rev_reg_id": revocation_registry_id,
            "cred_rev_id": revocation_id,
            "values": values,
        }));

        let delta = revocation_id
            .as_ref()
            .map(|revocation_id| json!({"issued": [revocation_id]}));

        Ok(IssuedCredential {
            credential,
            revocation_id,
            delta,
        })
    }

    async fn store_credential(
        &self,
        _request_metadata: Value,
        credential: Value,
        definition: Value,
        _revocation_definition: Option<Value>,
    ) -> Result<String, AgentError> {
        if !has_valid_signature(&credential) {
            return Err(math_error("credential signature mismatch"));
        }

        if definition["id"] != credential["cred_def_id"] {
            return Err(math_error("credential definition mismatch"));
        }

        let attrs = credential["values"]
            .as_object()
            .ok_or(math_error("credential values was missing"))?
            .iter()
            .map(|(name, value)| {
                let raw = value
                    .as_str()
                    .map(|value| value.to_string())
                    .unwrap_or(value.to_string());
                (name.to_owned(), raw)
            })
            .collect();

        let referent = Uuid::new_v4().to_string();
        let info = CredentialInfo {
            referent: referent.clone(),
            attrs,
            schema_id: credential["schema_id"].as_str().unwrap_or_default().to_string(),
            cred_def_id: credential["cred_def_id"].as_str().unwrap_or_default().to_string(),
            rev_reg_id: credential["rev_reg_id"].as_str().map(|id| id.to_string()),
            cred_rev_id: credential["cred_rev_id"].as_str().map(|id| id.to_string()),
        };

        self.wallet
            .lock()
            .unwrap()
            .credentials
            .insert(referent.clone(), info);

        Ok(referent)
    }

    async fn get_credential(&self, credential_ref: String) -> Result<CredentialInfo, AgentError> {
        self.wallet
            .lock()
            .unwrap()
            .credentials
            .get(&credential_ref)
            .cloned()
            .ok_or(math_error("credential not found"))
    }

    async fn revoke_credential(
        &self,
        _tails: TailsReader,
        _revocation_registry_id: String,
        revocation_id: String,
    ) -> Result<Value, AgentError> {
        Ok(json!({"revoked": [revocation_id]}))
    }

    async fn create_revocation_state(
        &self,
        _tails: TailsReader,
        revocation_definition: Value,
        delta: Value,
        timestamp: u64,
        revocation_id: String,
    ) -> Result<Value, AgentError> {
        Ok(json!({
            "rev_reg_id": revocation_definition["id"],
            "timestamp": timestamp,
            "cred_rev_id": revocation_id,
            "revoked": delta["revoked"],
        }))
    }

    async fn create_proof(
        &self,
        proof_request: Value,
        requested_credentials: Value,
        _master_secret_id: String,
        artifacts: ProofArtifacts,
    ) -> Result<Value, AgentError> {
        let wallet = self.wallet.lock().unwrap();
        let requested = requested_credentials["requested_attributes"]
            .as_object()
            .cloned()
            .unwrap_or_default();

        let mut identifiers: Vec<Value> = vec![];
        let mut non_revocation: Vec<Value> = vec![];
        let mut revealed = serde_json::Map::new();

        for (referent, answer) in requested {
            let cred_id = answer["cred_id"]
                .as_str()
                .ok_or(math_error("cred_id was missing"))?;
            let info = wallet
                .credentials
                .get(cred_id)
                .ok_or(math_error("credential not found"))?;

            let name = proof_request["requested_attributes"][&referent]["name"]
                .as_str()
                .ok_or(math_error("unknown referent"))?;
            let raw = info
                .attrs
                .get(name)
                .ok_or(math_error("attribute not found in credential"))?;

            let timestamp = answer["timestamp"].as_u64();
            let identifier = json!({
                "schema_id": info.schema_id,
                "cred_def_id": info.cred_def_id,
                "rev_reg_id": info.rev_reg_id,
                "timestamp": timestamp,
            });

            let index = match identifiers.iter().position(|known| known == &identifier) {
                Some(index) => index,
                None => {
                    identifiers.push(identifier);
                    identifiers.len() - 1
                }
            };

            if let (Some(registry_id), Some(timestamp)) = (&info.rev_reg_id, timestamp) {
                let state = artifacts
                    .revocation
                    .get(registry_id)
                    .and_then(|states| states.get(&timestamp))
                    .ok_or(math_error("revocation state was missing"))?;

                non_revocation.push(json!({
                    "rev_reg_id": registry_id,
                    "timestamp": timestamp,
                    "cred_rev_id": state["cred_rev_id"],
                }));
            }

            revealed.insert(
                referent,
                json!({"raw": raw, "sub_proof_index": index}),
            );
        }

        Ok(signed(json!({
            "nonce": proof_request["nonce"],
            "requested_proof": {"revealed_attrs": revealed},
            "identifiers": identifiers,
            "non_revocation": non_revocation,
        })))
    }

    async fn verify_proof(
        &self,
        proof_request: Value,
        proof: Value,
        artifacts: ProofArtifacts,
    ) -> Result<bool, AgentError> {
        if !has_valid_signature(&proof) || proof["nonce"] != proof_request["nonce"] {
            return Ok(false);
        }

        for identifier in proof["identifiers"].as_array().cloned().unwrap_or_default() {
            let schema_id = identifier["schema_id"].as_str().unwrap_or_default();
            let definition_id = identifier["cred_def_id"].as_str().unwrap_or_default();
            if !artifacts.schemas.contains_key(schema_id)
                || !artifacts.definitions.contains_key(definition_id)
            {
                return Err(math_error("proof artifacts were missing"));
            }
        }

        for entry in proof["non_revocation"].as_array().cloned().unwrap_or_default() {
            let registry_id = entry["rev_reg_id"].as_str().unwrap_or_default();
            let timestamp = entry["timestamp"].as_u64().unwrap_or_default();
            let registry = artifacts
                .revocation
                .get(registry_id)
                .and_then(|registries| registries.get(&timestamp))
                .ok_or(math_error("revocation registry was missing"))?;

            let revoked = registry["revoked"].as_array().cloned().unwrap_or_default();
            if revoked.contains(&entry["cred_rev_id"]) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    async fn open_tails_reader(&self, location: String) -> Result<TailsReader, AgentError> {
        Ok(TailsReader {
            handle: Uuid::new_v4().to_string(),
            location,
        })
    }
}

#[derive(Default)]
struct LedgerState {
    clock: u64,
    rejecting: bool,
    artifacts: HashMap<String, Value>,
    revocations: HashMap<String, Vec<(u64, Vec<Value>)>>,
}

/// `FakeLedger` is a shared in-memory ledger with a logical clock, each accepted
/// write moves the clock by one
#[derive(Clone, Default)]
pub(crate) struct FakeLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.state.lock().unwrap().clock
    }

    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.lock().unwrap().rejecting = rejecting;
    }

    pub fn forget(&self, id: &str) {
        self.state.lock().unwrap().artifacts.remove(id);
    }

    fn write<F>(&self, apply: F) -> LedgerReply
    where
        F: FnOnce(&mut LedgerState, u64),
    {
        let mut state = self.state.lock().unwrap();
        if state.rejecting {
            return LedgerReply::Reject("client request invalid".to_string());
        }

        state.clock += 1;
        let clock = state.clock;
        apply(&mut state, clock);
        LedgerReply::Reply(json!({"seqNo": clock, "txnTime": clock}))
    }

    fn lookup(&self, id: &str) -> Result<Value, AgentError> {
        self.state
            .lock()
            .unwrap()
            .artifacts
            .get(id)
            .cloned()
            .ok_or(AgentError::RecordNotFound(format!("ledger: {}", id)))
    }

    fn revocation_at(&self, registry_id: &str, timestamp: u64) -> Result<RevocationSnapshot, AgentError> {
        let state = self.state.lock().unwrap();
        let log = state
            .revocations
            .get(registry_id)
            .ok_or(AgentError::RecordNotFound(format!("ledger: {}", registry_id)))?;

        let snapshot = log
            .iter()
            .rev()
            .find(|(at, _)| *at <= timestamp)
            .map(|(at, revoked)| RevocationSnapshot {
                value: json!({"revoked": revoked}),
                timestamp: *at,
            })
            .unwrap_or(RevocationSnapshot {
                value: json!({"revoked": []}),
                timestamp: 0,
            });

        Ok(snapshot)
    }
}

#[async_trait]
impl LedgerBuilder for FakeLedger {
    async fn register_schema(
        &self,
        _submitter_did: String,
        schema_id: String,
        schema: Value,
    ) -> Result<LedgerReply, AgentError> {
        Ok(self.write(|state, _| {
            state.artifacts.insert(schema_id, schema);
        }))
    }

    async fn register_definition(
        &self,
        _submitter_did: String,
        definition_id: String,
        definition: Value,
    ) -> Result<LedgerReply, AgentError> {
        Ok(self.write(|state, _| {
            state.artifacts.insert(definition_id, definition);
        }))
    }

    async fn register_revocation_registry(
        &self,
        _submitter_did: String,
        registry_id: String,
        definition: Value,
        _entry: Value,
    ) -> Result<LedgerReply, AgentError> {
        Ok(self.write(|state, clock| {
            state.artifacts.insert(registry_id.clone(), definition);
            state.revocations.insert(registry_id, vec![(clock, vec![])]);
        }))
    }

    async fn send_revocation_delta(
        &self,
        _submitter_did: String,
        registry_id: String,
        delta: Value,
    ) -> Result<LedgerReply, AgentError> {
        Ok(self.write(|state, clock| {
            let log = state.revocations.entry(registry_id).or_default();
            let mut revoked = log
                .last()
                .map(|(_, revoked)| revoked.clone())
                .unwrap_or_default();

            for id in delta["revoked"].as_array().cloned().unwrap_or_default() {
                if !revoked.contains(&id) {
                    revoked.push(id);
                }
            }

            log.push((clock, revoked));
        }))
    }

    async fn lookup_schema(&self, schema_id: String) -> Result<Value, AgentError> {
        self.lookup(&schema_id)
    }

    async fn lookup_definition(&self, definition_id: String) -> Result<Value, AgentError> {
        self.lookup(&definition_id)
    }

    async fn lookup_revocation_definition(&self, registry_id: String) -> Result<Value, AgentError> {
        self.lookup(&registry_id)
    }

    async fn lookup_revocation_delta(
        &self,
        registry_id: String,
        _from: Option<u64>,
        to: u64,
    ) -> Result<RevocationSnapshot, AgentError> {
        self.revocation_at(&registry_id, to)
    }

    async fn lookup_revocation_registry(
        &self,
        registry_id: String,
        timestamp: u64,
    ) -> Result<RevocationSnapshot, AgentError> {
        self.revocation_at(&registry_id, timestamp)
    }
}

/// `RecordingDispatcher` keeps every dispatched payload instead of sending it
#[derive(Clone, Default)]
pub(crate) struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn last(&self) -> Option<(String, Vec<u8>)> {
        self.sent.lock().unwrap().last().cloned()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl DispatcherBuilder for RecordingDispatcher {
    async fn dispatch(&self, uri: String, payload: Vec<u8>) -> Result<(), AgentError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AgentError::MessageTransmissionFailure(format!(
                "{}: connection refused",
                uri
            )));
        }

        self.sent.lock().unwrap().push((uri, payload));
        Ok(())
    }
}

pub(crate) type TestConnections = ConnectionUsecase<MemoryStore, FakeCrypto, RecordingDispatcher>;
pub(crate) type TestRegistrar = Registrar<MemoryStore, FakeCredentialMath, FakeLedger>;
pub(crate) type TestCredentials =
    CredentialUsecase<MemoryStore, FakeCrypto, RecordingDispatcher, FakeCredentialMath, FakeLedger>;
pub(crate) type TestProofs =
    ProofUsecase<MemoryStore, FakeCrypto, RecordingDispatcher, FakeCredentialMath, FakeLedger>;
pub(crate) type TestInbound = InboundProcessor<FakeCrypto, TestConnections, TestCredentials, TestProofs>;

/// `Party` is a whole agent wired with fakes, its outbound messages are kept by its
/// dispatcher until delivered with [`Party::deliver_to`]
pub(crate) struct Party {
    pub store: MemoryStore,
    pub crypto: FakeCrypto,
    pub math: FakeCredentialMath,
    pub ledger: FakeLedger,
    pub dispatcher: RecordingDispatcher,
    pub provisioning: ProvisioningRecord,
    pub tails: HandleCache<TailsReader>,
}

impl Party {
    pub async fn new(name: &str, ledger: FakeLedger) -> Self {
        let crypto = FakeCrypto::new();
        let routing_key = crypto.create_key().await.unwrap();
        let provisioning = Self::provisioning_for(name, routing_key)
            .with_issuer_did(format!("did:sov:{}", name))
            .with_tails_base_location(format!("/tmp/{}/tails", name));

        Self {
            store: MemoryStore::new(),
            crypto,
            math: FakeCredentialMath::new(),
            ledger,
            dispatcher: RecordingDispatcher::new(),
            provisioning,
            tails: HandleCache::new(),
        }
    }

    pub fn provisioning_for(name: &str, routing_key: String) -> ProvisioningRecord {
        ProvisioningRecord::new(
            AgentEndpoint::new(format!("http://{}/agent", name), routing_key),
            AgentOwner::new(name.to_string(), None),
            format!("{}-master-secret", name),
        )
    }

    pub fn messenger(&self) -> Messenger<FakeCrypto, RecordingDispatcher> {
        Messenger::new(self.crypto.clone(), self.dispatcher.clone())
    }

    pub fn connections(&self) -> TestConnections {
        ConnectionUsecase::new(
            self.store.clone(),
            self.crypto.clone(),
            self.dispatcher.clone(),
            self.provisioning.clone(),
        )
    }

    pub fn registrar(&self) -> TestRegistrar {
        Registrar::new(
            self.store.clone(),
            self.math.clone(),
            self.ledger.clone(),
            self.provisioning.clone(),
            self.tails.clone(),
        )
    }

    pub fn credentials(&self) -> TestCredentials {
        CredentialUsecase::new(
            self.store.clone(),
            self.messenger(),
            self.math.clone(),
            self.registrar(),
            self.provisioning.clone(),
        )
    }

    pub fn proofs(&self) -> TestProofs {
        ProofUsecase::new(
            self.store.clone(),
            self.messenger(),
            self.math.clone(),
            self.registrar(),
            self.provisioning.clone(),
        )
    }

    pub fn inbound(&self) -> TestInbound {
        InboundProcessor::new(
            EnvelopeCodec::new(self.crypto.clone()),
            self.connections(),
            self.credentials(),
            self.proofs(),
        )
    }

    /// `deliver_to` hands the last dispatched payload to the other party's inbound processor
    pub async fn deliver_to(&self, other: &Party) -> Result<InboundOutcome, AgentError> {
        let (uri, payload) = self
            .dispatcher
            .last()
            .ok_or(AgentError::MessageTransmissionFailure("nothing was sent".to_string()))?;

        assert_eq!(uri, other.provisioning.get_endpoint().get_uri());
        other.inbound().receive(payload).await
    }

    pub async fn publish_definition(&self, revocable: bool) -> DefinitionRecord {
        let registrar = self.registrar();
        let schema = registrar
            .register_schema(
                "degree".to_string(),
                "1.0".to_string(),
                vec!["first_name".to_string(), "last_name".to_string()],
            )
            .await
            .unwrap();

        let max_credentials = if revocable { Some(100) } else { None };
        registrar
            .register_definition(schema.get_id(), "tag1".to_string(), max_credentials)
            .await
            .unwrap()
    }
}

fn expect_connection(outcome: Result<InboundOutcome, AgentError>) -> ConnectionRecord {
    match outcome {
        Ok(InboundOutcome::Connection(record)) => record,
        other => panic!("expected connection outcome, got {:?}", other),
    }
}

fn expect_credential(outcome: Result<InboundOutcome, AgentError>) -> CredentialRecord {
    match outcome {
        Ok(InboundOutcome::Credential(record)) => record,
        other => panic!("expected credential outcome, got {:?}", other),
    }
}

/// `connect` runs the whole handshake, returns the inviter's and the invitee's records
pub(crate) async fn connect(
    inviter: &Party,
    invitee: &Party,
) -> (ConnectionRecord, ConnectionRecord) {
    let (invitation, _) = inviter
        .connections()
        .create_invitation(InviteConfig::default())
        .await
        .unwrap();

    let _ = invitee
        .connections()
        .accept_invitation(invitation)
        .await
        .unwrap();

    let requested = expect_connection(invitee.deliver_to(inviter).await);
    let _ = inviter
        .connections()
        .accept_request(requested.get_id())
        .await
        .unwrap();

    let invitee_conn = expect_connection(inviter.deliver_to(invitee).await);
    let inviter_conn = inviter
        .connections()
        .get_connection(requested.get_id())
        .await
        .unwrap();

    (inviter_conn, invitee_conn)
}

/// `issue_credential` runs offer, request and issue, returns the issuer's and the holder's records
pub(crate) async fn issue_credential(
    issuer: &Party,
    holder: &Party,
    issuer_conn: &ConnectionRecord,
    definition: &DefinitionRecord,
    values: Value,
) -> (CredentialRecord, CredentialRecord) {
    let _ = issuer
        .credentials()
        .send_offer(issuer_conn.get_id(), definition.get_id(), Some(values))
        .await
        .unwrap();

    let offered = expect_credential(issuer.deliver_to(holder).await);
    let _ = holder
        .credentials()
        .accept_offer(offered.get_id(), None)
        .await
        .unwrap();

    let requested = expect_credential(holder.deliver_to(issuer).await);
    let issued = issuer
        .credentials()
        .issue_credential(requested.get_id(), None)
        .await
        .unwrap();

    let stored = expect_credential(issuer.deliver_to(holder).await);
    (issued, stored)
}
