use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::CredentialKind;
use crate::credential_state::CredentialStatus;
use crate::error::CoreError;

/// Position of an actor in the delegation hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorRole {
    /// Root of trust (GLEIF).
    Root,
    /// Qualified issuer delegated by the root.
    #[serde(alias = "qvi")]
    IntermediateIssuer,
    /// Legal entity.
    #[serde(alias = "legal-entity")]
    Organization,
    /// Person holding an official role at an organization.
    Person,
    /// Automated agent acting in an engagement context.
    Agent,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::IntermediateIssuer => "intermediate-issuer",
            Self::Organization => "organization",
            Self::Person => "person",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" | "gleif" => Ok(Self::Root),
            "intermediate-issuer" | "qvi" => Ok(Self::IntermediateIssuer),
            "organization" | "legal-entity" => Ok(Self::Organization),
            "person" => Ok(Self::Person),
            "agent" => Ok(Self::Agent),
            other => Err(CoreError::ValidationError(format!(
                "unknown actor role: {}",
                other
            ))),
        }
    }
}

/// An actor's persisted identity, keyed by alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Unique human key.
    pub alias: String,
    /// Opaque identifier assigned by the protocol client.
    pub prefix: String,
    pub role: ActorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lei: Option<String>,
    /// Official role for persons, engagement role for agents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, alias = "oobis")]
    pub introduction_links: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(alias: impl Into<String>, prefix: impl Into<String>, role: ActorRole) -> Self {
        Self {
            alias: alias.into(),
            prefix: prefix.into(),
            role,
            lei: None,
            title: None,
            registry: None,
            introduction_links: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_lei(mut self, lei: impl Into<String>) -> Self {
        self.lei = Some(lei.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    /// Introduction links are append-only.
    pub fn add_introduction_link(&mut self, link: impl Into<String>) {
        self.introduction_links.push(link.into());
    }
}

/// A named, typed pointer from a credential to its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Content address of the predecessor credential.
    #[serde(rename = "n")]
    pub target_said: String,
    /// Schema id the predecessor is declared to carry.
    #[serde(rename = "s")]
    pub target_schema: String,
    #[serde(rename = "o", default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}

impl Edge {
    pub fn new(target_said: impl Into<String>, target_schema: impl Into<String>) -> Self {
        Self {
            target_said: target_said.into(),
            target_schema: target_schema.into(),
            operator: None,
        }
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }
}

/// A persisted credential, keyed by its content address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub said: String,
    /// Display label, e.g. "Legal Entity vLEI".
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Issuer protocol identifier.
    pub issuer: String,
    /// Issuee protocol identifier.
    pub issuee: String,
    pub schema: String,
    pub registry: String,
    pub status: CredentialStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lei: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<BTreeMap<String, Edge>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Value>,
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    /// Credential kind, resolved by schema id first and display label second.
    pub fn kind(&self) -> Option<CredentialKind> {
        CredentialKind::from_schema(&self.schema)
            .or_else(|| CredentialKind::from_label(&self.credential_type))
    }

    pub fn edge(&self, name: &str) -> Option<&Edge> {
        self.edges.as_ref().and_then(|edges| edges.get(name))
    }

    pub fn has_edges(&self) -> bool {
        self.edges.as_ref().is_some_and(|edges| !edges.is_empty())
    }

    /// String attribute lookup. The top-level `lei` backs `LEI`.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name).and_then(Value::as_str) {
            Some(value) => Some(value),
            None if name == "LEI" => self.lei.as_deref(),
            None => None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.status == CredentialStatus::Revoked
    }

    /// Move the credential to `revoked`.
    pub fn revoke(&mut self) -> Result<(), CoreError> {
        self.status = self.status.revoke()?;
        Ok(())
    }
}

/// Namespace an issuing actor anchors its credentials in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub name: String,
    pub identifier: String,
    pub owner_alias: String,
    pub owner_prefix: String,
    pub created_at: DateTime<Utc>,
}

/// An accepted introduction between two actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionRecord {
    /// Actor that resolved the link.
    pub alias: String,
    pub link: String,
    /// Label the resolving actor knows the contact by.
    pub contact_alias: String,
    pub resolved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CredentialKind;

    fn sample_credential() -> Credential {
        let mut attributes = Map::new();
        attributes.insert("LEI".into(), Value::String("5493001KJTIIGC8Y1R17".into()));
        attributes.insert("personLegalName".into(), Value::String("Ada Lovelace".into()));
        Credential {
            said: "Eabc".into(),
            credential_type: CredentialKind::Oor.label().into(),
            issuer: "Eissuer".into(),
            issuee: "Eissuee".into(),
            schema: CredentialKind::Oor.schema().into(),
            registry: "Ereg".into(),
            status: CredentialStatus::Issued,
            lei: None,
            attributes,
            edges: Some(BTreeMap::from([(
                "auth".to_string(),
                Edge::new("Eauth", CredentialKind::OorAuth.schema()).with_operator("I2I"),
            )])),
            rules: None,
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_aliases() {
        let role: ActorRole = serde_json::from_str("\"qvi\"").unwrap();
        assert_eq!(role, ActorRole::IntermediateIssuer);
        let role: ActorRole = serde_json::from_str("\"legal-entity\"").unwrap();
        assert_eq!(role, ActorRole::Organization);
        assert_eq!(
            serde_json::to_string(&ActorRole::IntermediateIssuer).unwrap(),
            "\"intermediate-issuer\""
        );
        assert_eq!("agent".parse::<ActorRole>().unwrap(), ActorRole::Agent);
        assert!("tenant".parse::<ActorRole>().is_err());
    }

    #[test]
    fn test_identity_accepts_oobis_field() {
        let json = r#"{
            "alias": "jupiter",
            "prefix": "EJup",
            "role": "legal-entity",
            "oobis": ["http://localhost:3902/oobi/EJup/agent/EAg"],
            "createdAt": "2025-01-01T00:00:00Z"
        }"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.role, ActorRole::Organization);
        assert_eq!(identity.introduction_links.len(), 1);
        assert!(identity.lei.is_none());
    }

    #[test]
    fn test_edge_wire_names() {
        let edge = Edge::new("Esaid", "Eschema");
        let value = serde_json::to_value(&edge).unwrap();
        assert_eq!(value["n"], "Esaid");
        assert_eq!(value["s"], "Eschema");
        assert!(value.get("o").is_none());
    }

    #[test]
    fn test_credential_accessors() {
        let cred = sample_credential();
        assert_eq!(cred.kind(), Some(CredentialKind::Oor));
        assert_eq!(cred.edge("auth").unwrap().operator.as_deref(), Some("I2I"));
        assert!(cred.edge("le").is_none());
        assert!(cred.has_edges());
        assert_eq!(cred.attribute_str("personLegalName"), Some("Ada Lovelace"));
    }

    #[test]
    fn test_lei_falls_back_to_top_level() {
        let mut cred = sample_credential();
        cred.attributes.remove("LEI");
        cred.lei = Some("984500AAAAAAAAAAAA01".into());
        assert_eq!(cred.attribute_str("LEI"), Some("984500AAAAAAAAAAAA01"));
    }

    #[test]
    fn test_revoke_once() {
        let mut cred = sample_credential();
        cred.revoke().unwrap();
        assert!(cred.is_revoked());
        assert!(cred.revoke().is_err());
    }

    #[test]
    fn test_credential_json_uses_type_key() {
        let cred = sample_credential();
        let value = serde_json::to_value(&cred).unwrap();
        assert_eq!(value["type"], "Official Organizational Role");
        assert_eq!(value["status"], "issued");
        assert!(value.get("issuedAt").is_some());
        let back: Credential = serde_json::from_value(value).unwrap();
        assert_eq!(back, cred);
    }
}
