//! In-process protocol network.
//!
//! `LocalNetwork` hands out [`ProtocolClient`] sessions that share one
//! in-memory world: identifiers, registries, per-agent credential stores,
//! notification inboxes and exchange messages. It keeps the observable
//! contract of a remote agent (operations that finish later, records that
//! replicate late, grants that arrive as notifications) without real key
//! management or witness traffic. Timing is counted in status checks rather
//! than wall time, so behavior is deterministic under test.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use uuid::Uuid;
use vlei_core::{CredentialKind, WitnessPolicy};
use vlei_crypto::{digest_qb64, salt_qb64, saidify};

use crate::error::ProtocolError;
use crate::protocol::{
    AdmitRequest, CredentialRecord, GrantRequest, Notification, Operation, ProtocolClient,
    SessionConnector, ADMIT_ROUTE, GRANT_ROUTE,
};

const MIN_PASSCODE_LEN: usize = 21;
const INTRODUCTION_HOST: &str = "http://127.0.0.1:3902";
const ACDC_VERSION: &str = "ACDC10JSON000000_";
const KERI_VERSION: &str = "KERI10JSON000000_";

/// How issuance operations finish.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IssuanceBehavior {
    /// Done with the said in the response.
    #[default]
    Complete,
    /// Never reports done; the said is only in the metadata.
    MetadataOnly,
    /// Never reports done and never exposes a said.
    Stall,
    /// Done with this error.
    Fail(String),
}

/// Timing and fault knobs of the network.
#[derive(Debug, Clone)]
pub struct NetworkOptions {
    /// Status checks an operation stays pending for.
    pub operation_lag: u32,
    /// Lookups that miss before an issued record is readable by its issuer.
    pub record_lag: u32,
    pub issuance: IssuanceBehavior,
    /// When false, grants reach the holder without a notification.
    pub deliver_grant_notifications: bool,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        Self {
            operation_lag: 0,
            record_lag: 0,
            issuance: IssuanceBehavior::Complete,
            deliver_grant_notifications: true,
        }
    }
}

struct PendingOperation {
    finished: Operation,
    pending_checks: u32,
    never_done: bool,
}

impl PendingOperation {
    fn pending_view(&self) -> Operation {
        Operation {
            name: self.finished.name.clone(),
            done: false,
            error: None,
            response: None,
            metadata: self.finished.metadata.clone(),
        }
    }
}

struct StoredRecord {
    record: CredentialRecord,
    misses_remaining: u32,
}

struct IdentifierState {
    prefix: String,
    roles: HashSet<String>,
    registries: Vec<(String, String)>,
    sequence: u64,
}

#[derive(Clone)]
struct ExchangeMessage {
    sender: String,
    recipient: String,
    record: CredentialRecord,
}

struct AgentState {
    prefix: String,
    identifiers: DashMap<String, IdentifierState>,
    operations: DashMap<String, PendingOperation>,
    records: DashMap<String, StoredRecord>,
    notifications: DashMap<String, Notification>,
    contacts: DashMap<String, String>,
}

impl AgentState {
    fn new(passcode: &str) -> Self {
        Self {
            prefix: digest_qb64(format!("agent:{}", passcode).as_bytes()),
            identifiers: DashMap::new(),
            operations: DashMap::new(),
            records: DashMap::new(),
            notifications: DashMap::new(),
            contacts: DashMap::new(),
        }
    }

    fn notify(&self, route: &str, message_said: &str) {
        let id = Uuid::now_v7().to_string();
        self.notifications.insert(
            id.clone(),
            Notification {
                id,
                read: false,
                route: route.to_string(),
                message_said: message_said.to_string(),
            },
        );
    }
}

#[derive(Default)]
struct NetworkState {
    options: RwLock<NetworkOptions>,
    agents: DashMap<String, Arc<AgentState>>,
    owners: DashMap<String, Arc<AgentState>>,
    exchanges: DashMap<String, ExchangeMessage>,
}

impl NetworkState {
    fn options(&self) -> NetworkOptions {
        match self.options.read() {
            Ok(options) => options.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Shared in-memory network. Cloning yields another handle to the same world.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    state: Arc<NetworkState>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: NetworkOptions) -> Self {
        let network = Self::new();
        network.set_options(options);
        network
    }

    /// Replace the options; applies to operations submitted afterwards.
    pub fn set_options(&self, options: NetworkOptions) {
        match self.state.options.write() {
            Ok(mut current) => *current = options,
            Err(poisoned) => *poisoned.into_inner() = options,
        }
    }

    pub fn agent_count(&self) -> usize {
        self.state.agents.len()
    }

    pub fn identifier_count(&self) -> usize {
        self.state.owners.len()
    }

    /// Grants sent across the network so far.
    pub fn grant_count(&self) -> usize {
        self.state.exchanges.len()
    }

    /// Notify the recipient of an already sent grant. Returns false when the
    /// grant or its recipient is unknown.
    pub fn deliver_grant(&self, grant_said: &str) -> bool {
        let Some(recipient) = self
            .state
            .exchanges
            .get(grant_said)
            .map(|message| message.recipient.clone())
        else {
            return false;
        };
        let Some(agent) = self.state.owners.get(&recipient).map(|agent| agent.clone()) else {
            return false;
        };
        agent.notify(GRANT_ROUTE, grant_said);
        true
    }
}

#[async_trait]
impl SessionConnector for LocalNetwork {
    async fn connect(&self, passcode: &str) -> Result<Arc<dyn ProtocolClient>, ProtocolError> {
        if passcode.len() < MIN_PASSCODE_LEN {
            return Err(ProtocolError::Rejected(format!(
                "passcode must be at least {} characters",
                MIN_PASSCODE_LEN
            )));
        }
        let agent = self
            .state
            .agents
            .entry(passcode.to_string())
            .or_insert_with(|| Arc::new(AgentState::new(passcode)))
            .clone();

        tracing::debug!(agent = %agent.prefix, "local agent connected");
        Ok(Arc::new(LocalAgent {
            network: self.state.clone(),
            agent,
        }))
    }
}

/// One session on a [`LocalNetwork`].
pub struct LocalAgent {
    network: Arc<NetworkState>,
    agent: Arc<AgentState>,
}

impl LocalAgent {
    fn prefix_of(&self, alias: &str) -> Result<String, ProtocolError> {
        self.agent
            .identifiers
            .get(alias)
            .map(|state| state.prefix.clone())
            .ok_or_else(|| ProtocolError::NotFound(format!("identifier {}", alias)))
    }

    fn submit(&self, finished: Operation, lag: u32, never_done: bool) -> Operation {
        let pending = PendingOperation {
            finished,
            pending_checks: lag,
            never_done,
        };
        let view = if never_done || lag > 0 {
            pending.pending_view()
        } else {
            pending.finished.clone()
        };
        self.agent.operations.insert(view.name.clone(), pending);
        view
    }

    fn finished(kind: &str, response: Value) -> Operation {
        Operation {
            name: format!("{}.{}", kind, Uuid::now_v7()),
            done: true,
            error: None,
            response: Some(response),
            metadata: None,
        }
    }

    fn failed(kind: &str, message: String) -> Operation {
        Operation {
            name: format!("{}.{}", kind, Uuid::now_v7()),
            done: true,
            error: Some(json!({ "message": message })),
            response: None,
            metadata: None,
        }
    }
}

fn rejected(e: vlei_crypto::CryptoError) -> ProtocolError {
    ProtocolError::Rejected(e.to_string())
}

/// Assemble the stored form of an issued credential: body, issuance event,
/// anchoring event and anchor attachment.
fn build_record(issuer: &str, sequence: u64, body: &Value) -> Result<CredentialRecord, ProtocolError> {
    let registry = body
        .get("ri")
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::Rejected("credential body has no registry".into()))?;
    let subject = body
        .get("a")
        .and_then(Value::as_object)
        .ok_or_else(|| ProtocolError::Rejected("credential body has no attributes".into()))?;
    let now = Utc::now().to_rfc3339();

    let mut attributes = Map::new();
    attributes.insert("d".into(), Value::String(String::new()));
    for (key, value) in subject {
        attributes.insert(key.clone(), value.clone());
    }
    if !attributes.contains_key("dt") {
        attributes.insert("dt".into(), Value::String(now.clone()));
    }
    let (_, attributes) = saidify(&Value::Object(attributes)).map_err(rejected)?;

    let mut sad = Map::new();
    sad.insert("v".into(), json!(ACDC_VERSION));
    sad.insert("d".into(), json!(""));
    sad.insert("i".into(), json!(issuer));
    sad.insert("ri".into(), json!(registry));
    sad.insert("s".into(), body.get("s").cloned().unwrap_or(Value::Null));
    if let Some(salt) = body.get("u") {
        sad.insert("u".into(), salt.clone());
    }
    sad.insert("a".into(), attributes);
    for section in ["e", "r"] {
        if let Some(value) = body.get(section) {
            sad.insert(section.into(), value.clone());
        }
    }
    let (said, sad) = saidify(&Value::Object(sad)).map_err(rejected)?;

    let (iss_said, iss) = saidify(&json!({
        "v": KERI_VERSION,
        "t": "iss",
        "d": "",
        "i": said,
        "s": "0",
        "ri": registry,
        "dt": now,
    }))
    .map_err(rejected)?;

    let (_, anc) = saidify(&json!({
        "v": KERI_VERSION,
        "t": "ixn",
        "d": "",
        "i": issuer,
        "s": format!("{:x}", sequence),
        "a": [{ "i": said, "s": "0", "d": iss_said }],
    }))
    .map_err(rejected)?;

    Ok(CredentialRecord {
        sad,
        iss: Some(iss),
        anc: Some(anc),
        ancatc: Some(format!("-VAn-AABAA{}", &iss_said[1..])),
    })
}

#[async_trait]
impl ProtocolClient for LocalAgent {
    fn agent_prefix(&self) -> String {
        self.agent.prefix.clone()
    }

    async fn create_identifier(
        &self,
        alias: &str,
        policy: &WitnessPolicy,
    ) -> Result<Operation, ProtocolError> {
        if self.agent.identifiers.contains_key(alias) {
            return Err(ProtocolError::Rejected(format!(
                "alias {} already in use",
                alias
            )));
        }
        if policy.threshold > policy.witnesses.len() {
            return Err(ProtocolError::Rejected(format!(
                "witness threshold {} exceeds {} witnesses",
                policy.threshold,
                policy.witnesses.len()
            )));
        }

        let inception = json!({
            "alias": alias,
            "agent": self.agent.prefix,
            "salt": salt_qb64(),
            "wits": policy.witnesses,
        });
        let prefix = digest_qb64(inception.to_string().as_bytes());
        self.agent.identifiers.insert(
            alias.to_string(),
            IdentifierState {
                prefix: prefix.clone(),
                roles: HashSet::new(),
                registries: Vec::new(),
                sequence: 0,
            },
        );
        self.network.owners.insert(prefix.clone(), self.agent.clone());

        let options = self.network.options();
        let finished = Self::finished(
            "witness",
            json!({ "i": prefix, "toad": policy.threshold, "wits": policy.witnesses }),
        );
        Ok(self.submit(finished, options.operation_lag, false))
    }

    async fn add_end_role(&self, alias: &str, role: &str) -> Result<Operation, ProtocolError> {
        let prefix = {
            let mut state = self
                .agent
                .identifiers
                .get_mut(alias)
                .ok_or_else(|| ProtocolError::NotFound(format!("identifier {}", alias)))?;
            state.roles.insert(role.to_string());
            state.prefix.clone()
        };
        let options = self.network.options();
        let finished = Self::finished(
            "endrole",
            json!({ "cid": prefix, "role": role, "eid": self.agent.prefix }),
        );
        Ok(self.submit(finished, options.operation_lag, false))
    }

    async fn get_introduction(&self, alias: &str, role: &str) -> Result<Vec<String>, ProtocolError> {
        let state = self
            .agent
            .identifiers
            .get(alias)
            .ok_or_else(|| ProtocolError::NotFound(format!("identifier {}", alias)))?;
        if !state.roles.contains(role) {
            return Ok(Vec::new());
        }
        Ok(vec![format!(
            "{}/oobi/{}/{}/{}",
            INTRODUCTION_HOST, state.prefix, role, self.agent.prefix
        )])
    }

    async fn resolve_introduction(
        &self,
        link: &str,
        contact_alias: &str,
    ) -> Result<Operation, ProtocolError> {
        let prefix = link
            .split("/oobi/")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .filter(|prefix| !prefix.is_empty())
            .ok_or_else(|| ProtocolError::Rejected(format!("malformed introduction link {}", link)))?;

        let options = self.network.options();
        if !self.network.owners.contains_key(prefix) {
            let finished = Self::failed("oobi", format!("unable to resolve {}", link));
            return Ok(self.submit(finished, options.operation_lag, false));
        }

        self.agent
            .contacts
            .insert(contact_alias.to_string(), prefix.to_string());
        let finished = Self::finished("oobi", json!({ "i": prefix, "alias": contact_alias }));
        Ok(self.submit(finished, options.operation_lag, false))
    }

    async fn create_registry(
        &self,
        alias: &str,
        registry_name: &str,
    ) -> Result<Operation, ProtocolError> {
        let identifier = {
            let mut state = self
                .agent
                .identifiers
                .get_mut(alias)
                .ok_or_else(|| ProtocolError::NotFound(format!("identifier {}", alias)))?;
            if state.registries.iter().any(|(name, _)| name == registry_name) {
                return Err(ProtocolError::Rejected(format!(
                    "registry {} already exists for {}",
                    registry_name, alias
                )));
            }
            let seed = json!({ "name": registry_name, "owner": state.prefix, "salt": salt_qb64() });
            let identifier = digest_qb64(seed.to_string().as_bytes());
            state.registries.push((registry_name.to_string(), identifier.clone()));
            state.sequence += 1;
            identifier
        };

        let options = self.network.options();
        let finished = Self::finished(
            "registry",
            json!({ "anchor": { "i": identifier, "s": "0" } }),
        );
        Ok(self.submit(finished, options.operation_lag, false))
    }

    async fn issue(&self, issuer_alias: &str, body: &Value) -> Result<Operation, ProtocolError> {
        let schema = body
            .get("s")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::Rejected("credential body has no schema".into()))?;
        if CredentialKind::from_schema(schema).is_none() {
            return Err(ProtocolError::Rejected(format!(
                "schema {} has not been resolved",
                schema
            )));
        }

        let (issuer, sequence) = {
            let mut state = self
                .agent
                .identifiers
                .get_mut(issuer_alias)
                .ok_or_else(|| ProtocolError::NotFound(format!("identifier {}", issuer_alias)))?;
            let registry = body.get("ri").and_then(Value::as_str).unwrap_or_default();
            if !state.registries.iter().any(|(_, id)| id == registry) {
                return Err(ProtocolError::Rejected(format!(
                    "registry {} is not owned by {}",
                    registry, issuer_alias
                )));
            }
            state.sequence += 1;
            (state.prefix.clone(), state.sequence)
        };

        let options = self.network.options();
        let record = build_record(&issuer, sequence, body)?;
        let said = record
            .said()
            .map(str::to_string)
            .ok_or_else(|| ProtocolError::InvalidResponse("record has no said".into()))?;
        let ced = json!({ "ced": record.sad.clone() });

        let (finished, never_done) = match &options.issuance {
            IssuanceBehavior::Complete => (
                Operation {
                    metadata: Some(ced.clone()),
                    ..Self::finished("credential", ced)
                },
                false,
            ),
            IssuanceBehavior::MetadataOnly => (
                Operation {
                    metadata: Some(ced.clone()),
                    ..Self::finished("credential", ced)
                },
                true,
            ),
            IssuanceBehavior::Stall => (Self::finished("credential", ced), true),
            IssuanceBehavior::Fail(message) => (Self::failed("credential", message.clone()), false),
        };

        if !matches!(options.issuance, IssuanceBehavior::Fail(_)) {
            self.agent.records.insert(
                said.clone(),
                StoredRecord {
                    record,
                    misses_remaining: options.record_lag,
                },
            );
        }

        tracing::debug!(issuer = %issuer, said = %said, "credential submitted");
        Ok(self.submit(finished, options.operation_lag, never_done))
    }

    async fn get_operation(&self, name: &str) -> Result<Operation, ProtocolError> {
        let mut pending = self
            .agent
            .operations
            .get_mut(name)
            .ok_or_else(|| ProtocolError::NotFound(format!("operation {}", name)))?;
        if pending.never_done {
            return Ok(pending.pending_view());
        }
        if pending.pending_checks > 0 {
            pending.pending_checks -= 1;
            return Ok(pending.pending_view());
        }
        Ok(pending.finished.clone())
    }

    async fn delete_operation(&self, name: &str) -> Result<(), ProtocolError> {
        self.agent
            .operations
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ProtocolError::NotFound(format!("operation {}", name)))
    }

    async fn get_record(&self, said: &str) -> Result<CredentialRecord, ProtocolError> {
        let mut stored = self
            .agent
            .records
            .get_mut(said)
            .ok_or_else(|| ProtocolError::NotFound(format!("credential {}", said)))?;
        if stored.misses_remaining > 0 {
            stored.misses_remaining -= 1;
            return Err(ProtocolError::NotFound(format!("credential {}", said)));
        }
        Ok(stored.record.clone())
    }

    async fn grant(&self, request: GrantRequest) -> Result<Operation, ProtocolError> {
        let sender = self.prefix_of(&request.sender_alias)?;
        let missing = request.record.missing_parts();
        if !missing.is_empty() {
            return Err(ProtocolError::Rejected(format!(
                "credential record is missing {}",
                missing.join(", ")
            )));
        }
        let recipient = self
            .network
            .owners
            .get(&request.recipient)
            .map(|agent| agent.clone())
            .ok_or_else(|| ProtocolError::NotFound(format!("recipient {}", request.recipient)))?;

        let (grant_said, _) = saidify(&json!({
            "v": KERI_VERSION,
            "t": "exn",
            "d": "",
            "i": sender,
            "rp": request.recipient,
            "p": "",
            "dt": request.datetime,
            "r": "/ipex/grant",
            "a": { "m": "", "i": request.recipient },
            "e": {
                "acdc": request.record.sad,
                "iss": request.record.iss,
                "anc": request.record.anc,
            },
        }))
        .map_err(rejected)?;

        self.network.exchanges.insert(
            grant_said.clone(),
            ExchangeMessage {
                sender: sender.clone(),
                recipient: request.recipient.clone(),
                record: request.record.clone(),
            },
        );

        let options = self.network.options();
        if options.deliver_grant_notifications {
            recipient.notify(GRANT_ROUTE, &grant_said);
        }

        tracing::debug!(sender = %sender, recipient = %request.recipient, grant = %grant_said, "grant sent");
        let finished = Self::finished("exchange", json!({ "said": grant_said }));
        Ok(self.submit(finished, options.operation_lag, false))
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>, ProtocolError> {
        let mut notes: Vec<Notification> = self
            .agent
            .notifications
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        notes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(notes)
    }

    async fn mark_notification(&self, id: &str) -> Result<(), ProtocolError> {
        let mut note = self
            .agent
            .notifications
            .get_mut(id)
            .ok_or_else(|| ProtocolError::NotFound(format!("notification {}", id)))?;
        note.read = true;
        Ok(())
    }

    async fn admit(&self, request: AdmitRequest) -> Result<Operation, ProtocolError> {
        let sender = self.prefix_of(&request.sender_alias)?;
        let grant = self
            .network
            .exchanges
            .get(&request.grant_said)
            .map(|message| message.clone())
            .ok_or_else(|| ProtocolError::NotFound(format!("grant {}", request.grant_said)))?;
        if grant.recipient != sender {
            return Err(ProtocolError::Rejected(format!(
                "grant {} is not addressed to {}",
                request.grant_said, request.sender_alias
            )));
        }
        if grant.sender != request.recipient {
            return Err(ProtocolError::Rejected(format!(
                "grant {} was not sent by {}",
                request.grant_said, request.recipient
            )));
        }

        let said = grant
            .record
            .said()
            .map(str::to_string)
            .ok_or_else(|| ProtocolError::InvalidResponse("granted record has no said".into()))?;
        self.agent.records.insert(
            said,
            StoredRecord {
                record: grant.record.clone(),
                misses_remaining: 0,
            },
        );

        let (admit_said, _) = saidify(&json!({
            "v": KERI_VERSION,
            "t": "exn",
            "d": "",
            "i": sender,
            "rp": request.recipient,
            "p": request.grant_said,
            "dt": request.datetime,
            "r": "/ipex/admit",
            "a": { "m": request.message },
        }))
        .map_err(rejected)?;

        if let Some(issuer) = self.network.owners.get(&grant.sender) {
            issuer.notify(ADMIT_ROUTE, &admit_said);
        }

        let options = self.network.options();
        let finished = Self::finished("exchange", json!({ "said": admit_said }));
        Ok(self.submit(finished, options.operation_lag, false))
    }
}
