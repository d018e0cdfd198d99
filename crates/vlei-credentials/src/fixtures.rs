//! Prebuilt credential graphs for tests.
//!
//! Saids are fixed strings rather than real digests; the verifier only
//! compares them.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use vlei_core::{ActorRole, Credential, CredentialKind, CredentialStatus, Edge, Identity};

use crate::graph::CredentialGraph;

pub const LEI: &str = "5493001KJTIIGC8Y1R17";
pub const PERSON_NAME: &str = "Jane Doe";
pub const OFFICIAL_ROLE: &str = "Chief Procurement Officer";
pub const ENGAGEMENT_ROLE: &str = "Procurement Agent";

pub const GLEIF_PREFIX: &str = "EGleifRootIdentifier000000000000000000000000";
pub const QVI_PREFIX: &str = "EQviIdentifier00000000000000000000000000000";
pub const LE_PREFIX: &str = "ELegalEntityIdentifier000000000000000000000";
pub const PERSON_PREFIX: &str = "EPersonIdentifier0000000000000000000000000";
pub const AGENT_PREFIX: &str = "EAgentIdentifier00000000000000000000000000";

fn credential(
    said: &str,
    kind: CredentialKind,
    issuer: &str,
    issuee: &str,
    attributes: Value,
    edges: &[(&str, &Credential)],
    issued_at: DateTime<Utc>,
) -> Credential {
    let attributes: Map<String, Value> = match attributes {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let edges: BTreeMap<String, Edge> = edges
        .iter()
        .map(|(name, target)| (name.to_string(), Edge::new(&target.said, &target.schema)))
        .collect();
    Credential {
        said: said.into(),
        credential_type: kind.label().into(),
        issuer: issuer.into(),
        issuee: issuee.into(),
        schema: kind.schema().into(),
        registry: format!("Ereg-{}", issuer),
        status: CredentialStatus::Issued,
        lei: attributes.get("LEI").and_then(Value::as_str).map(str::to_string),
        attributes,
        edges: (!edges.is_empty()).then_some(edges),
        rules: None,
        issued_at,
    }
}

fn identities(person_role: &str) -> Vec<Identity> {
    vec![
        Identity::new("gleif", GLEIF_PREFIX, ActorRole::Root),
        Identity::new("qvi", QVI_PREFIX, ActorRole::IntermediateIssuer),
        Identity::new("acme", LE_PREFIX, ActorRole::Organization).with_lei(LEI),
        Identity::new("person-1", PERSON_PREFIX, ActorRole::Person)
            .with_lei(LEI)
            .with_title(person_role),
        Identity::new("agent-1", AGENT_PREFIX, ActorRole::Agent)
            .with_lei(LEI)
            .with_title(format!("{} (AI)", ENGAGEMENT_ROLE)),
    ]
}

/// Complete chain issued along the official flow.
#[derive(Debug, Clone)]
pub struct OfficialChain {
    pub qvi: Credential,
    pub le: Credential,
    pub oor_auth: Credential,
    pub oor: Credential,
    pub ecr: Credential,
    /// Additional credentials placed in the graph.
    pub extra: Vec<Credential>,
}

impl OfficialChain {
    pub fn new() -> Self {
        let base = Utc::now() - Duration::hours(1);
        let qvi = credential(
            "EQviCredential",
            CredentialKind::Qvi,
            GLEIF_PREFIX,
            QVI_PREFIX,
            json!({ "LEI": "254900OPPU84GM83MG36" }),
            &[],
            base,
        );
        let le = credential(
            "ELegalEntityCredential",
            CredentialKind::LegalEntity,
            QVI_PREFIX,
            LE_PREFIX,
            json!({ "LEI": LEI }),
            &[("qvi", &qvi)],
            base + Duration::minutes(1),
        );
        let oor_auth = credential(
            "EOorAuthCredential",
            CredentialKind::OorAuth,
            LE_PREFIX,
            QVI_PREFIX,
            json!({
                "AID": "",
                "LEI": LEI,
                "personLegalName": PERSON_NAME,
                "officialRole": OFFICIAL_ROLE,
            }),
            &[("le", &le)],
            base + Duration::minutes(2),
        );
        let oor = credential(
            "EOorCredential",
            CredentialKind::Oor,
            QVI_PREFIX,
            PERSON_PREFIX,
            json!({
                "personLegalName": PERSON_NAME,
                "officialRole": OFFICIAL_ROLE,
                "LEI": LEI,
            }),
            &[("auth", &oor_auth)],
            base + Duration::minutes(3),
        );
        let ecr = credential(
            "EEcrCredential",
            CredentialKind::Ecr,
            LE_PREFIX,
            AGENT_PREFIX,
            json!({
                "engagementContextRole": ENGAGEMENT_ROLE,
                "agentType": "AI",
                "personLegalName": PERSON_NAME,
                "LEI": LEI,
            }),
            &[("le", &le)],
            base + Duration::minutes(4),
        );
        Self {
            qvi,
            le,
            oor_auth,
            oor,
            ecr,
            extra: Vec::new(),
        }
    }

    pub fn identities(&self) -> Vec<Identity> {
        identities(OFFICIAL_ROLE)
    }

    pub fn credentials(&self) -> Vec<Credential> {
        let mut all = vec![
            self.qvi.clone(),
            self.le.clone(),
            self.oor_auth.clone(),
            self.oor.clone(),
            self.ecr.clone(),
        ];
        all.extend(self.extra.iter().cloned());
        all
    }

    pub fn graph(&self) -> CredentialGraph {
        CredentialGraph::new(self.identities(), self.credentials())
    }
}

impl Default for OfficialChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete chain issued along the direct flow.
#[derive(Debug, Clone)]
pub struct DirectChain {
    pub qvi: Credential,
    pub le: Credential,
    pub oor: Credential,
    pub ecr: Credential,
}

impl DirectChain {
    pub fn new() -> Self {
        let official = OfficialChain::new();
        let qvi = official.qvi;
        let le = official.le;
        let oor = credential(
            "EOorCredential",
            CredentialKind::Oor,
            LE_PREFIX,
            PERSON_PREFIX,
            json!({
                "personLegalName": PERSON_NAME,
                "officialRole": OFFICIAL_ROLE,
                "LEI": LEI,
            }),
            &[("le", &le)],
            le.issued_at + Duration::minutes(1),
        );
        let ecr = credential(
            "EEcrCredential",
            CredentialKind::Ecr,
            PERSON_PREFIX,
            AGENT_PREFIX,
            json!({
                "engagementContextRole": ENGAGEMENT_ROLE,
                "agentType": "AI",
                "personLegalName": PERSON_NAME,
                "LEI": LEI,
            }),
            &[("oor", &oor)],
            le.issued_at + Duration::minutes(2),
        );
        Self { qvi, le, oor, ecr }
    }

    pub fn credentials(&self) -> Vec<Credential> {
        vec![
            self.qvi.clone(),
            self.le.clone(),
            self.oor.clone(),
            self.ecr.clone(),
        ]
    }

    pub fn graph(&self) -> CredentialGraph {
        CredentialGraph::new(identities(OFFICIAL_ROLE), self.credentials())
    }
}

impl Default for DirectChain {
    fn default() -> Self {
        Self::new()
    }
}

pub fn official_graph() -> CredentialGraph {
    OfficialChain::new().graph()
}

pub fn direct_graph() -> CredentialGraph {
    DirectChain::new().graph()
}
