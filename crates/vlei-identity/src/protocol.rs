//! Boundary to the identifier/credential protocol client.
//!
//! Every mutating call returns an [`Operation`] that completes
//! asynchronously; callers poll it with [`crate::operation`] helpers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vlei_core::WitnessPolicy;

use crate::error::ProtocolError;

/// Exchange route of a credential grant.
pub const GRANT_ROUTE: &str = "/exn/ipex/grant";
/// Exchange route of a credential admit.
pub const ADMIT_ROUTE: &str = "/exn/ipex/admit";

/// A long-running protocol operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Operation {
    /// New identifier prefix (`response.i`).
    pub fn response_prefix(&self) -> Option<&str> {
        self.response.as_ref()?.get("i")?.as_str()
    }

    /// New registry identifier (`response.anchor.i`).
    pub fn registry_identifier(&self) -> Option<&str> {
        self.response.as_ref()?.get("anchor")?.get("i")?.as_str()
    }

    /// Issued credential said reported on completion (`response.ced.d`).
    pub fn response_said(&self) -> Option<&str> {
        self.response.as_ref()?.get("ced")?.get("d")?.as_str()
    }

    /// Issued credential said known before completion (`metadata.ced.d`).
    pub fn metadata_said(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("ced")?.get("d")?.as_str()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|error| match error.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => error.to_string(),
        })
    }
}

/// A credential as served from an actor's local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Credential body.
    pub sad: Value,
    /// Issuance event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<Value>,
    /// Anchoring event in the issuer's history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anc: Option<Value>,
    /// Attachment proving the anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancatc: Option<String>,
}

impl CredentialRecord {
    pub fn said(&self) -> Option<&str> {
        self.sad.get("d")?.as_str()
    }

    pub fn issuer(&self) -> Option<&str> {
        self.sad.get("i")?.as_str()
    }

    pub fn issuee(&self) -> Option<&str> {
        self.sad.get("a")?.get("i")?.as_str()
    }

    pub fn schema(&self) -> Option<&str> {
        self.sad.get("s")?.as_str()
    }

    pub fn registry(&self) -> Option<&str> {
        self.sad.get("ri")?.as_str()
    }

    /// Names of the parts a grant needs that this record lacks.
    pub fn missing_parts(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.said().is_none() {
            missing.push("sad");
        }
        if self.iss.is_none() {
            missing.push("iss");
        }
        if self.anc.is_none() {
            missing.push("anc");
        }
        if self.ancatc.is_none() {
            missing.push("ancatc");
        }
        missing
    }
}

/// An inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub read: bool,
    pub route: String,
    /// Said of the exchange message that raised the notification.
    pub message_said: String,
}

/// Grant of an issued credential to its holder.
#[derive(Debug, Clone)]
pub struct GrantRequest {
    pub sender_alias: String,
    pub record: CredentialRecord,
    pub recipient: String,
    pub datetime: String,
}

/// Admission of a granted credential.
#[derive(Debug, Clone)]
pub struct AdmitRequest {
    pub sender_alias: String,
    pub grant_said: String,
    pub recipient: String,
    pub message: String,
    pub datetime: String,
}

/// One actor's connection to the identifier/credential protocol.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Prefix of the cloud agent serving this session.
    fn agent_prefix(&self) -> String;

    async fn create_identifier(
        &self,
        alias: &str,
        policy: &WitnessPolicy,
    ) -> Result<Operation, ProtocolError>;

    async fn add_end_role(&self, alias: &str, role: &str) -> Result<Operation, ProtocolError>;

    /// Introduction links for `alias` under `role`.
    async fn get_introduction(&self, alias: &str, role: &str) -> Result<Vec<String>, ProtocolError>;

    async fn resolve_introduction(
        &self,
        link: &str,
        contact_alias: &str,
    ) -> Result<Operation, ProtocolError>;

    async fn create_registry(
        &self,
        alias: &str,
        registry_name: &str,
    ) -> Result<Operation, ProtocolError>;

    /// Submit a credential body (`ri`, `s`, `u`, `a`, `e`, `r`).
    async fn issue(&self, issuer_alias: &str, body: &Value) -> Result<Operation, ProtocolError>;

    async fn get_operation(&self, name: &str) -> Result<Operation, ProtocolError>;

    async fn delete_operation(&self, name: &str) -> Result<(), ProtocolError>;

    async fn get_record(&self, said: &str) -> Result<CredentialRecord, ProtocolError>;

    async fn grant(&self, request: GrantRequest) -> Result<Operation, ProtocolError>;

    async fn list_notifications(&self) -> Result<Vec<Notification>, ProtocolError>;

    async fn mark_notification(&self, id: &str) -> Result<(), ProtocolError>;

    async fn admit(&self, request: AdmitRequest) -> Result<Operation, ProtocolError>;
}

/// Opens protocol-client sessions.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Boot or reconnect the agent bound to `passcode`.
    async fn connect(&self, passcode: &str) -> Result<Arc<dyn ProtocolClient>, ProtocolError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_accessors() {
        let op = Operation {
            name: "credential.1".into(),
            done: false,
            error: None,
            response: Some(json!({ "i": "EPre", "anchor": { "i": "EReg" }, "ced": { "d": "ESaid" } })),
            metadata: Some(json!({ "ced": { "d": "ESaid" } })),
        };
        assert_eq!(op.response_prefix(), Some("EPre"));
        assert_eq!(op.registry_identifier(), Some("EReg"));
        assert_eq!(op.response_said(), Some("ESaid"));
        assert_eq!(op.metadata_said(), Some("ESaid"));
        assert!(op.error_message().is_none());
    }

    #[test]
    fn test_error_message() {
        let op = Operation {
            name: "x".into(),
            done: true,
            error: Some(json!({ "message": "unknown registry" })),
            response: None,
            metadata: None,
        };
        assert_eq!(op.error_message().as_deref(), Some("unknown registry"));

        let op = Operation {
            error: Some(json!({ "code": 500 })),
            ..op
        };
        assert_eq!(op.error_message().as_deref(), Some("{\"code\":500}"));
    }

    #[test]
    fn test_record_missing_parts() {
        let record = CredentialRecord {
            sad: json!({ "d": "ESaid", "i": "EIss", "s": "ESchema", "ri": "EReg", "a": { "i": "EHold" } }),
            iss: Some(json!({})),
            anc: None,
            ancatc: None,
        };
        assert_eq!(record.missing_parts(), vec!["anc", "ancatc"]);
        assert_eq!(record.issuee(), Some("EHold"));
        assert_eq!(record.registry(), Some("EReg"));
    }

    #[test]
    fn test_notification_json() {
        let note: Notification = serde_json::from_value(json!({
            "id": "n1", "read": false, "route": GRANT_ROUTE, "messageSaid": "EGrant"
        }))
        .unwrap();
        assert_eq!(note.route, "/exn/ipex/grant");
        assert!(!note.read);
    }
}
