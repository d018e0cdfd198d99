use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::time::Instant;
use vlei_core::{standard_rules, Credential, CredentialKind, CredentialStatus, Edge, ProtocolConfig};
use vlei_crypto::{salt_qb64, saidify};
use vlei_identity::{discard_operation, CredentialRecord, Operation, Session};

use crate::error::CredentialError;

/// What to issue: registry, schema, holder, subject attributes and the
/// optional edge and rules blocks.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub issuer_alias: String,
    pub registry: String,
    pub schema: String,
    pub holder: String,
    pub attributes: Map<String, Value>,
    pub edges: Option<BTreeMap<String, Edge>>,
    pub rules: Option<Value>,
}

impl IssueRequest {
    pub fn new(
        issuer_alias: impl Into<String>,
        registry: impl Into<String>,
        kind: CredentialKind,
        holder: impl Into<String>,
    ) -> Self {
        Self {
            issuer_alias: issuer_alias.into(),
            registry: registry.into(),
            schema: kind.schema().to_string(),
            holder: holder.into(),
            attributes: Map::new(),
            edges: None,
            rules: None,
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn edge(mut self, name: impl Into<String>, edge: Edge) -> Self {
        self.edges
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), edge);
        self
    }

    pub fn rules(mut self, rules: Value) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Credential body as submitted to the protocol client.
    pub fn body(&self) -> Result<Value, CredentialError> {
        let mut subject = Map::new();
        subject.insert("i".into(), Value::String(self.holder.clone()));
        for (name, value) in &self.attributes {
            if name != "i" {
                subject.insert(name.clone(), value.clone());
            }
        }

        let mut body = Map::new();
        body.insert("ri".into(), Value::String(self.registry.clone()));
        body.insert("s".into(), Value::String(self.schema.clone()));
        body.insert("u".into(), Value::String(salt_qb64()));
        body.insert("a".into(), Value::Object(subject));

        if let Some(edges) = &self.edges {
            let mut block = Map::new();
            block.insert("d".into(), Value::String(String::new()));
            for (name, edge) in edges {
                block.insert(name.clone(), serde_json::to_value(edge)?);
            }
            let (_, block) = saidify(&Value::Object(block))?;
            body.insert("e".into(), block);
        }

        let mut rules = Map::new();
        rules.insert("d".into(), Value::String(String::new()));
        if let Value::Object(entries) = self.rules.clone().unwrap_or_else(standard_rules) {
            rules.extend(entries.into_iter().filter(|(key, _)| key != "d"));
        }
        let (_, rules) = saidify(&Value::Object(rules))?;
        body.insert("r".into(), rules);

        Ok(Value::Object(body))
    }
}

/// How the issuance operation finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The operation reported done.
    Witnessed,
    /// The deadline passed with the said known from the operation metadata.
    Unwitnessed,
}

#[derive(Debug, Clone)]
pub struct Issued {
    pub said: String,
    pub record: CredentialRecord,
    pub completion: Completion,
}

impl Issued {
    /// Persistable form of the issued record.
    pub fn to_credential(&self) -> Result<Credential, CredentialError> {
        credential_from_record(&self.record)
    }
}

/// Drives one issuance to a retrievable record.
pub struct IssuanceCoordinator {
    config: ProtocolConfig,
}

impl IssuanceCoordinator {
    pub fn new(config: ProtocolConfig) -> Self {
        Self { config }
    }

    pub async fn issue(
        &self,
        session: &Session,
        request: &IssueRequest,
    ) -> Result<Issued, CredentialError> {
        let client = session.client();
        let body = request.body()?;
        let op = client
            .issue(&request.issuer_alias, &body)
            .await
            .map_err(|e| CredentialError::IssuanceFailed(e.to_string()))?;
        let name = op.name.clone();

        let (said, completion) = self.await_said(session, op).await?;
        let record = self.fetch_record(session, &said).await?;
        discard_operation(client, &name).await;

        tracing::info!(
            issuer = %request.issuer_alias,
            said = %said,
            schema = %request.schema,
            ?completion,
            "credential issued"
        );
        Ok(Issued {
            said,
            record,
            completion,
        })
    }

    async fn await_said(
        &self,
        session: &Session,
        operation: Operation,
    ) -> Result<(String, Completion), CredentialError> {
        let client = session.client();
        let timeout = self.config.operation_timeout();
        let deadline = Instant::now() + timeout;
        let mut current = operation;

        loop {
            if current.done {
                if let Some(reason) = current.error_message() {
                    return Err(CredentialError::IssuanceFailed(reason));
                }
                let said = current
                    .response_said()
                    .or_else(|| current.metadata_said())
                    .ok_or_else(|| {
                        CredentialError::IssuanceFailed(format!(
                            "operation {} finished without a credential said",
                            current.name
                        ))
                    })?;
                return Ok((said.to_string(), Completion::Witnessed));
            }

            if Instant::now() >= deadline {
                if let Some(said) = current.metadata_said() {
                    tracing::warn!(
                        operation = %current.name,
                        said,
                        "issuance not confirmed before deadline; continuing with metadata said"
                    );
                    return Ok((said.to_string(), Completion::Unwitnessed));
                }
                return Err(CredentialError::IssuanceTimeout {
                    operation: current.name,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            tokio::time::sleep(self.config.poll_interval()).await;
            current = client.get_operation(&current.name).await?;
        }
    }

    async fn fetch_record(
        &self,
        session: &Session,
        said: &str,
    ) -> Result<CredentialRecord, CredentialError> {
        let retry = &self.config.record_retry;
        tokio::time::sleep(self.config.record_initial_delay()).await;

        let mut last_error = String::from("no attempt made");
        for attempt in 1..=retry.attempts {
            match session.client().get_record(said).await {
                Ok(record) => return Ok(record),
                Err(e) => {
                    tracing::debug!(said, attempt, error = %e, "credential not yet retrievable");
                    last_error = e.to_string();
                }
            }
            if attempt < retry.attempts {
                tokio::time::sleep(retry.delay()).await;
            }
        }

        Err(CredentialError::CredentialUnavailable {
            said: said.to_string(),
            attempts: retry.attempts,
            reason: last_error,
        })
    }
}

/// Map a stored credential record to its persisted form.
pub fn credential_from_record(record: &CredentialRecord) -> Result<Credential, CredentialError> {
    let field = |name: &str, value: Option<&str>| {
        value
            .map(str::to_string)
            .ok_or_else(|| CredentialError::IncompleteRecord {
                said: record.said().unwrap_or_default().to_string(),
                missing: name.to_string(),
            })
    };
    let said = field("d", record.said())?;
    let schema = field("s", record.schema())?;

    let attributes: Map<String, Value> = record
        .sad
        .get("a")
        .and_then(Value::as_object)
        .map(|subject| {
            subject
                .iter()
                .filter(|(key, _)| !matches!(key.as_str(), "d" | "i" | "dt"))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    let edges = match record.sad.get("e").and_then(Value::as_object) {
        Some(block) => {
            let mut edges = BTreeMap::new();
            for (name, value) in block.iter().filter(|(key, _)| key.as_str() != "d") {
                edges.insert(name.clone(), serde_json::from_value::<Edge>(value.clone())?);
            }
            Some(edges)
        }
        None => None,
    };

    // Issuance time comes from the subject block; records without a
    // parseable `dt` are stamped with the mapping time.
    let issued_at = record
        .sad
        .pointer("/a/dt")
        .and_then(Value::as_str)
        .and_then(|dt| DateTime::parse_from_rfc3339(dt).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let credential_type = CredentialKind::from_schema(&schema)
        .map(|kind| kind.label().to_string())
        .unwrap_or_else(|| schema.clone());

    Ok(Credential {
        said,
        credential_type,
        issuer: field("i", record.issuer())?,
        issuee: record.issuee().unwrap_or_default().to_string(),
        schema,
        registry: field("ri", record.registry())?,
        status: CredentialStatus::Issued,
        lei: attributes
            .get("LEI")
            .and_then(Value::as_str)
            .map(str::to_string),
        attributes,
        edges,
        rules: record.sad.get("r").cloned(),
        issued_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vlei_crypto::verify_said;
    use vlei_identity::{IssuanceBehavior, LocalNetwork, NetworkOptions, SessionManager};

    async fn issuer_setup(network: &LocalNetwork) -> (Session, String, String) {
        let sessions = SessionManager::new(Arc::new(network.clone()), ProtocolConfig::fast());
        let policy = sessions.config().witness_policy.clone();
        let session = sessions.create_session().await.unwrap();
        sessions.create_identity(&session, "gleif", &policy).await.unwrap();
        let registry = sessions
            .create_registry(&session, "gleif", "gleif-registry")
            .await
            .unwrap();
        (session, registry, "EQviHolderPrefix".to_string())
    }

    fn qvi_request(registry: &str, holder: &str) -> IssueRequest {
        IssueRequest::new("gleif", registry, CredentialKind::Qvi, holder)
            .attribute("LEI", "254900OPPU84GM83MG36")
    }

    #[test]
    fn test_body_layout() {
        let request = qvi_request("Ereg", "Eholder").edge(
            "qvi",
            Edge::new("Esaid", CredentialKind::Qvi.schema()),
        );
        let body = request.body().unwrap();
        let subject = body["a"].as_object().unwrap();
        assert_eq!(subject.keys().next().unwrap(), "i");
        assert_eq!(subject["i"], "Eholder");
        assert_eq!(body["u"].as_str().unwrap().len(), 24);
        assert!(verify_said(&body["e"]).unwrap());
        assert!(verify_said(&body["r"]).unwrap());
        assert_eq!(body["e"]["qvi"]["n"], "Esaid");
        assert!(body["r"].get("usageDisclaimer").is_some());
    }

    #[test]
    fn test_body_without_edges() {
        let body = qvi_request("Ereg", "Eholder").body().unwrap();
        assert!(body.get("e").is_none());
    }

    #[tokio::test]
    async fn test_issue_and_map_record() {
        let network = LocalNetwork::with_options(NetworkOptions {
            operation_lag: 2,
            record_lag: 2,
            ..Default::default()
        });
        let (session, registry, holder) = issuer_setup(&network).await;
        let coordinator = IssuanceCoordinator::new(ProtocolConfig::fast());

        let issued = coordinator
            .issue(&session, &qvi_request(&registry, &holder))
            .await
            .unwrap();
        assert_eq!(issued.completion, Completion::Witnessed);
        assert_eq!(issued.said.len(), 44);
        assert!(issued.record.missing_parts().is_empty());

        let credential = issued.to_credential().unwrap();
        assert_eq!(credential.said, issued.said);
        assert_eq!(credential.issuee, holder);
        assert_eq!(credential.kind(), Some(CredentialKind::Qvi));
        assert_eq!(credential.lei.as_deref(), Some("254900OPPU84GM83MG36"));
        assert!(credential.edges.is_none());
    }

    #[tokio::test]
    async fn test_metadata_fallback_at_deadline() {
        let network = LocalNetwork::new();
        let (session, registry, holder) = issuer_setup(&network).await;
        network.set_options(NetworkOptions {
            issuance: IssuanceBehavior::MetadataOnly,
            ..Default::default()
        });
        let coordinator = IssuanceCoordinator::new(ProtocolConfig::fast());

        let issued = coordinator
            .issue(&session, &qvi_request(&registry, &holder))
            .await
            .unwrap();
        assert_eq!(issued.completion, Completion::Unwitnessed);
    }

    #[tokio::test]
    async fn test_stalled_issuance_times_out() {
        let network = LocalNetwork::new();
        let (session, registry, holder) = issuer_setup(&network).await;
        network.set_options(NetworkOptions {
            issuance: IssuanceBehavior::Stall,
            ..Default::default()
        });
        let coordinator = IssuanceCoordinator::new(ProtocolConfig::fast());

        let result = coordinator
            .issue(&session, &qvi_request(&registry, &holder))
            .await;
        assert!(matches!(result, Err(CredentialError::IssuanceTimeout { .. })));
    }

    #[tokio::test]
    async fn test_failed_issuance() {
        let network = LocalNetwork::new();
        let (session, registry, holder) = issuer_setup(&network).await;
        network.set_options(NetworkOptions {
            issuance: IssuanceBehavior::Fail("schema not resolved".into()),
            ..Default::default()
        });
        let coordinator = IssuanceCoordinator::new(ProtocolConfig::fast());

        let result = coordinator
            .issue(&session, &qvi_request(&registry, &holder))
            .await;
        assert!(matches!(result, Err(CredentialError::IssuanceFailed(reason)) if reason.contains("schema")));
    }

    #[tokio::test]
    async fn test_record_never_replicates() {
        let network = LocalNetwork::new();
        let (session, registry, holder) = issuer_setup(&network).await;
        network.set_options(NetworkOptions {
            record_lag: u32::MAX,
            ..Default::default()
        });
        let coordinator = IssuanceCoordinator::new(ProtocolConfig::fast());

        let result = coordinator
            .issue(&session, &qvi_request(&registry, &holder))
            .await;
        match result {
            Err(CredentialError::CredentialUnavailable { attempts, .. }) => {
                assert_eq!(attempts, ProtocolConfig::fast().record_retry.attempts)
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_record_with_edges_maps() {
        let record = CredentialRecord {
            sad: serde_json::json!({
                "d": "Ecred",
                "i": "Eissuer",
                "ri": "Ereg",
                "s": CredentialKind::LegalEntity.schema(),
                "a": { "d": "Eattr", "i": "Eholder", "dt": "2026-01-01T00:00:00Z", "LEI": "5493001KJTIIGC8Y1R17" },
                "e": { "d": "Eedges", "qvi": { "n": "Eqvi", "s": CredentialKind::Qvi.schema() } },
            }),
            iss: None,
            anc: None,
            ancatc: None,
        };
        let credential = credential_from_record(&record).unwrap();
        assert_eq!(credential.credential_type, "Legal Entity vLEI");
        assert_eq!(credential.edge("qvi").unwrap().target_said, "Eqvi");
        assert!(credential.attributes.get("dt").is_none());
        assert_eq!(credential.attribute_str("LEI"), Some("5493001KJTIIGC8Y1R17"));
        assert_eq!(credential.issued_at.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_record_issuance_time() {
        let record = |dt: Value| CredentialRecord {
            sad: serde_json::json!({
                "d": "Ecred",
                "i": "Eissuer",
                "ri": "Ereg",
                "s": CredentialKind::Qvi.schema(),
                "a": { "d": "Eattr", "i": "Eholder", "dt": dt, "LEI": "254900OPPU84GM83MG36" },
            }),
            iss: None,
            anc: None,
            ancatc: None,
        };

        let stamped = credential_from_record(&record(Value::String(
            "2025-06-30T12:15:00.000000+02:00".into(),
        )))
        .unwrap();
        assert_eq!(stamped.issued_at.to_rfc3339(), "2025-06-30T10:15:00+00:00");

        let before = Utc::now();
        let fallback = credential_from_record(&record(Value::String("yesterday".into()))).unwrap();
        assert!(fallback.issued_at >= before);
        let missing = credential_from_record(&record(Value::Null)).unwrap();
        assert!(missing.issued_at >= before);
    }
}
