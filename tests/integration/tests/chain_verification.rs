//! Integration test: chain verification over persisted credentials.
//!
//! Fixture chains are written through the node's storage, reloaded as a
//! graph and scored, covering broken links and revocation.

use vlei_core::CredentialKind;
use vlei_credentials::fixtures::{DirectChain, OfficialChain, LEI};
use vlei_credentials::{report, ChainFlow, ChainVerifier, LinkFault, Recommendation, RiskLevel};
use vlei_integration_tests::TempStore;

const AGENT: &str = "agent-1";

fn persisted(fixture: &OfficialChain) -> TempStore {
    let store = TempStore::new();
    store.seed(fixture.identities(), fixture.credentials());
    store
}

// =========================================================================
// Clean chains
// =========================================================================

#[test]
fn test_official_chain_from_storage_approved() {
    let store = persisted(&OfficialChain::new());
    let graph = store.storage.graph().unwrap();

    let result = report(&graph, ChainFlow::official(), AGENT).unwrap();
    assert!(result.decision.trust.approved);
    assert_eq!(result.decision.trust.trust_score, 100);
    assert_eq!(result.decision.trust.recommendation, Recommendation::Approved);
    assert_eq!(result.seller.company.lei, LEI);

    let types: Vec<_> = result
        .credentials
        .iter()
        .map(|c| c.credential_type.as_str())
        .collect();
    assert_eq!(
        types,
        vec![
            CredentialKind::Ecr.label(),
            CredentialKind::Oor.label(),
            CredentialKind::OorAuth.label(),
            CredentialKind::LegalEntity.label(),
            CredentialKind::Qvi.label(),
        ]
    );
}

#[test]
fn test_direct_chain_from_storage_approved() {
    let fixture = DirectChain::new();
    let store = TempStore::new();
    store.seed(OfficialChain::new().identities(), fixture.credentials());
    let graph = store.storage.graph().unwrap();

    let verification = ChainVerifier::new(&graph, ChainFlow::direct())
        .verify_chain(AGENT)
        .unwrap();
    assert!(verification.valid);
    assert_eq!(verification.chain.len(), 4);

    let result = report(&graph, ChainFlow::direct(), AGENT).unwrap();
    assert_eq!(result.decision.trust.trust_score, 100);
}

#[test]
fn test_official_flow_rejects_direct_chain() {
    let store = TempStore::new();
    store.seed(OfficialChain::new().identities(), DirectChain::new().credentials());
    let graph = store.storage.graph().unwrap();

    let result = report(&graph, ChainFlow::official(), AGENT).unwrap();
    assert!(!result.decision.trust.approved);
}

// =========================================================================
// Broken chains
// =========================================================================

#[test]
fn test_broken_authorization_edge_truncates_chain() {
    let mut fixture = OfficialChain::new();
    fixture
        .oor_auth
        .edges
        .as_mut()
        .unwrap()
        .get_mut("le")
        .unwrap()
        .target_said = "EMissingLegalEntityCredential".into();
    let store = persisted(&fixture);
    let graph = store.storage.graph().unwrap();

    let verification = ChainVerifier::new(&graph, ChainFlow::official())
        .verify_chain(AGENT)
        .unwrap();
    assert!(!verification.valid);
    assert!(!verification.complete);
    assert_eq!(verification.chain.len(), 3);
    assert!(matches!(
        verification.invalid_links().next().and_then(|l| l.fault.clone()),
        Some(LinkFault::PredecessorNotFound { .. })
    ));

    let result = report(&graph, ChainFlow::official(), AGENT).unwrap();
    assert!(!result.decision.trust.approved);
    assert_eq!(result.decision.trust.risk_level, RiskLevel::Critical);
    assert_eq!(result.decision.trust.recommendation, Recommendation::Rejected);
}

#[test]
fn test_edge_schema_mismatch_rejected() {
    let mut fixture = OfficialChain::new();
    fixture
        .le
        .edges
        .as_mut()
        .unwrap()
        .get_mut("qvi")
        .unwrap()
        .target_schema = CredentialKind::LegalEntity.schema().into();
    let store = persisted(&fixture);
    let graph = store.storage.graph().unwrap();

    let verifier = ChainVerifier::new(&graph, ChainFlow::official());
    let edges = verifier.verify_edges(AGENT).unwrap();
    assert!(!edges.valid);
    assert_eq!(edges.invalid_count(), 1);

    let result = report(&graph, ChainFlow::official(), AGENT).unwrap();
    assert!(!result.decision.trust.approved);
    assert!(!result.chain_verification.valid);
}

#[test]
fn test_revoked_legal_entity_flags() {
    let fixture = OfficialChain::new();
    let store = persisted(&fixture);

    let mut revoked = fixture.le.clone();
    revoked.revoke().unwrap();
    store.storage.save_credential(&revoked).unwrap();
    assert_eq!(store.storage.credentials().unwrap().len(), 5);

    let graph = store.storage.graph().unwrap();
    let result = report(&graph, ChainFlow::official(), AGENT).unwrap();
    assert!(!result.decision.trust.approved);
    assert!(!result.red_flags.is_empty());
    assert_eq!(result.credentials.len(), 4);
    assert!(!result.credentials[3].valid);
}

#[test]
fn test_unknown_seller_not_found() {
    let store = persisted(&OfficialChain::new());
    let graph = store.storage.graph().unwrap();
    assert!(report(&graph, ChainFlow::official(), "nobody").is_err());
}
