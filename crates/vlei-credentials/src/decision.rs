//! Verification decision report for a trading counterparty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vlei_core::{CredentialKind, CredentialStatus};

use crate::error::CredentialError;
use crate::flow::ChainFlow;
use crate::graph::CredentialGraph;
use crate::trust_score::{ScoreInputs, TrustDecision};
use crate::verifier::{ChainVerifier, LinkFault};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub alias: String,
    pub prefix: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub name: String,
    pub lei: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub agent: AgentSummary,
    pub company: CompanySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    #[serde(flatten)]
    pub trust: TrustDecision,
    pub reasoning: Vec<String>,
}

/// One verified chain element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    pub position: usize,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub said: String,
    pub issuer: String,
    pub issuee: String,
    pub status: CredentialStatus,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSummary {
    pub complete: bool,
    /// Chain and edges both valid.
    pub valid: bool,
    /// Length of the full built chain.
    pub credential_count: usize,
    pub all_credentials_valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub verification_id: String,
    pub timestamp: DateTime<Utc>,
    pub seller: SellerSummary,
    pub decision: Decision,
    pub credentials: Vec<CredentialSummary>,
    pub chain_verification: ChainSummary,
    pub warnings: Vec<String>,
    pub red_flags: Vec<String>,
}

/// Verify the chain held by `alias` and turn the structural results into a
/// decision.
pub fn report(
    graph: &CredentialGraph,
    flow: ChainFlow,
    alias: &str,
) -> Result<VerificationReport, CredentialError> {
    let verifier = ChainVerifier::new(graph, flow);
    let chain = verifier.build_chain(alias)?;
    let verification = verifier.verify_built(&chain);
    let edges = verifier.verify_built_edges(&chain);

    let inputs = ScoreInputs {
        chain_valid: verification.valid,
        edges_valid: edges.valid,
        chain_length: chain.len(),
        expected_length: chain.expected_length,
        all_links_valid: verification.all_links_valid(),
    };
    let trust = inputs.decision();
    let invalid_links = verification.invalid_links().count();

    let mut reasoning = Vec::new();
    reasoning.push(if verification.valid {
        format!("Seller has valid {}-credential chain", chain.expected_length)
    } else {
        "Seller credential chain has issues".to_string()
    });
    reasoning.push(if edges.valid {
        "All credential edges properly linked".to_string()
    } else {
        "Some credential edges are invalid".to_string()
    });
    if trust.trust_score >= 90 {
        reasoning.push("High trust score indicates reliable seller".to_string());
    } else if trust.trust_score < 60 {
        reasoning.push("Low trust score indicates potential risks".to_string());
    }
    reasoning.push(if invalid_links == 0 {
        "No revocations or red flags detected".to_string()
    } else {
        format!("{} credential(s) have issues", invalid_links)
    });

    let mut warnings = chain.warnings.clone();
    if !edges.valid {
        warnings.push(format!(
            "{} credential edge(s) are invalid",
            edges.invalid_count()
        ));
    }
    if verification.links.len() < chain.expected_length {
        warnings.push("Incomplete credential chain detected".to_string());
    }

    let mut red_flags = Vec::new();
    if verification
        .invalid_links()
        .any(|link| link.fault == Some(LinkFault::Revoked))
    {
        red_flags.push("CRITICAL: One or more credentials revoked".to_string());
    }
    if !verification.valid {
        red_flags.push("CRITICAL: Credential chain verification failed".to_string());
    }

    let credentials = verification
        .links
        .iter()
        .zip(verification.chain.iter())
        .map(|(link, credential)| CredentialSummary {
            position: link.position,
            credential_type: credential.credential_type.clone(),
            said: credential.said.clone(),
            issuer: credential.issuer.clone(),
            issuee: credential.issuee.clone(),
            status: credential.status,
            valid: link.valid,
            reason: link.reason.clone(),
        })
        .collect();

    let seller = seller_summary(graph, &chain.elements, alias);
    let verification_id = format!(
        "VER-{}-{}",
        Utc::now().timestamp_millis(),
        alias.chars().take(8).collect::<String>()
    );

    tracing::info!(
        verification_id = %verification_id,
        alias,
        score = trust.trust_score,
        approved = trust.approved,
        "trading partner verified"
    );

    Ok(VerificationReport {
        verification_id,
        timestamp: Utc::now(),
        seller,
        decision: Decision { trust, reasoning },
        credentials,
        chain_verification: ChainSummary {
            complete: chain.is_complete(),
            valid: verification.valid && edges.valid,
            credential_count: chain.len(),
            all_credentials_valid: verification.all_links_valid(),
        },
        warnings,
        red_flags,
    })
}

fn seller_summary(
    graph: &CredentialGraph,
    elements: &[crate::verifier::ChainElement],
    alias: &str,
) -> SellerSummary {
    let identity = graph.identity(alias);
    let leaf = elements.first().map(|element| &element.credential);

    let name = leaf
        .and_then(|credential| credential.attribute_str("personLegalName"))
        .unwrap_or(UNKNOWN)
        .to_string();
    let role = identity
        .and_then(|identity| identity.title.clone())
        .or_else(|| {
            leaf.and_then(|credential| credential.attribute_str("engagementContextRole"))
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNKNOWN.to_string());

    let entity = elements
        .iter()
        .find(|element| element.credential.kind() == Some(CredentialKind::LegalEntity))
        .map(|element| &element.credential);
    let company_name = entity
        .and_then(|credential| graph.identity(&credential.issuee))
        .map(|identity| identity.alias.clone())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let lei = leaf
        .and_then(|credential| credential.attribute_str("LEI"))
        .or_else(|| identity.and_then(|identity| identity.lei.as_deref()))
        .unwrap_or(UNKNOWN)
        .to_string();

    SellerSummary {
        agent: AgentSummary {
            alias: alias.to_string(),
            prefix: identity
                .map(|identity| identity.prefix.clone())
                .unwrap_or_default(),
            name,
            role,
        },
        company: CompanySummary {
            name: company_name,
            lei,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{OfficialChain, LEI, PERSON_NAME};
    use crate::trust_score::{Recommendation, RiskLevel};

    #[test]
    fn test_clean_chain_approved() {
        let graph = OfficialChain::new().graph();
        let report = report(&graph, ChainFlow::official(), "agent-1").unwrap();

        assert!(report.decision.trust.approved);
        assert_eq!(report.decision.trust.trust_score, 100);
        assert_eq!(report.decision.trust.recommendation, Recommendation::Approved);
        assert_eq!(report.decision.reasoning[0], "Seller has valid 5-credential chain");
        assert!(report.red_flags.is_empty());
        assert!(report.warnings.is_empty());
        assert_eq!(report.credentials.len(), 5);
        assert!(report.verification_id.starts_with("VER-"));
        assert!(report.verification_id.ends_with("-agent-1"));

        assert_eq!(report.seller.agent.name, PERSON_NAME);
        assert_eq!(report.seller.company.name, "acme");
        assert_eq!(report.seller.company.lei, LEI);
        assert!(report.chain_verification.valid);
    }

    #[test]
    fn test_revocation_is_red_flag() {
        let mut fixture = OfficialChain::new();
        fixture.le.revoke().unwrap();
        let graph = fixture.graph();
        let report = report(&graph, ChainFlow::official(), "agent-1").unwrap();

        assert!(!report.decision.trust.approved);
        assert!(report
            .red_flags
            .contains(&"CRITICAL: One or more credentials revoked".to_string()));
        assert!(report
            .red_flags
            .contains(&"CRITICAL: Credential chain verification failed".to_string()));
        assert!(report
            .warnings
            .contains(&"Incomplete credential chain detected".to_string()));
        assert_eq!(report.credentials.len(), 4);
        assert_eq!(report.chain_verification.credential_count, 5);
        assert!(report
            .decision
            .reasoning
            .contains(&"1 credential(s) have issues".to_string()));
    }

    #[test]
    fn test_edge_schema_mismatch_scores() {
        let mut fixture = OfficialChain::new();
        fixture
            .oor_auth
            .edges
            .as_mut()
            .unwrap()
            .get_mut("le")
            .unwrap()
            .target_schema = CredentialKind::Qvi.schema().into();
        let graph = fixture.graph();
        let report = report(&graph, ChainFlow::official(), "agent-1").unwrap();

        // The chain link also sees the schema mismatch.
        assert!(!report.chain_verification.valid);
        assert!(report
            .warnings
            .contains(&"1 credential edge(s) are invalid".to_string()));
        assert_eq!(report.decision.trust.risk_level, RiskLevel::Critical);
        assert_eq!(report.decision.trust.recommendation, Recommendation::Rejected);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let graph = OfficialChain::new().graph();
        let report = report(&graph, ChainFlow::official(), "agent-1").unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["decision"]["trustScore"], 100);
        assert_eq!(json["decision"]["riskLevel"], "LOW");
        assert!(json["chainVerification"]["allCredentialsValid"].as_bool().unwrap());
        assert_eq!(json["credentials"][0]["type"], "Engagement Context Role");
        assert!(json["redFlags"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_seller() {
        let graph = OfficialChain::new().graph();
        assert!(matches!(
            report(&graph, ChainFlow::official(), "ghost"),
            Err(CredentialError::NotFound(_))
        ));
    }
}
