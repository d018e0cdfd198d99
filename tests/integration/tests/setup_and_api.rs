//! Integration test: actor setup on an in-process network, then
//! trading-partner verification through the HTTP API.

use serde_json::{json, Value};
use vlei_credentials::{report, FlowVariant};
use vlei_integration_tests::{run_sample_setup, spawn_api, TempStore};

const SELLER: &str = "jupiterSellerAgent";

// =========================================================================
// Setup
// =========================================================================

#[tokio::test]
async fn test_official_setup_scores_full_trust() {
    let store = TempStore::new();
    let summary = run_sample_setup(&store, FlowVariant::Official).await;
    assert_eq!(summary.credentials.len(), 5);
    assert_eq!(store.storage.credentials().unwrap().len(), 5);
    assert_eq!(store.storage.registries().unwrap().len(), 3);

    let graph = store.storage.graph().unwrap();
    let result = report(&graph, FlowVariant::Official.flow(), SELLER).unwrap();
    assert!(result.decision.trust.approved);
    assert_eq!(result.decision.trust.trust_score, 100);
    assert_eq!(result.chain_verification.credential_count, 5);
}

#[tokio::test]
async fn test_direct_setup_scores_full_trust() {
    let store = TempStore::new();
    let summary = run_sample_setup(&store, FlowVariant::Direct).await;
    assert_eq!(summary.credentials.len(), 4);

    let graph = store.storage.graph().unwrap();
    let result = report(&graph, FlowVariant::Direct.flow(), SELLER).unwrap();
    assert!(result.decision.trust.approved);
    assert_eq!(result.decision.trust.trust_score, 100);
    assert_eq!(result.chain_verification.credential_count, 4);
}

#[tokio::test]
async fn test_rerun_upserts_identities() {
    let store = TempStore::new();
    run_sample_setup(&store, FlowVariant::Direct).await;
    let first_agent = store.storage.identity(SELLER).unwrap().unwrap();

    run_sample_setup(&store, FlowVariant::Direct).await;
    let identities = store.storage.identities().unwrap();
    assert_eq!(identities.len(), 5);
    let second_agent = store.storage.identity(SELLER).unwrap().unwrap();
    assert_ne!(first_agent.prefix, second_agent.prefix);

    // Credentials accumulate; the chain follows the newest agent identifier.
    assert_eq!(store.storage.credentials().unwrap().len(), 8);
    let graph = store.storage.graph().unwrap();
    let result = report(&graph, FlowVariant::Direct.flow(), SELLER).unwrap();
    assert_eq!(result.decision.trust.trust_score, 100);
    assert_eq!(result.seller.agent.prefix, second_agent.prefix);
}

// =========================================================================
// HTTP API
// =========================================================================

#[tokio::test]
async fn test_health_after_setup() {
    let store = TempStore::new();
    run_sample_setup(&store, FlowVariant::Official).await;
    let base = spawn_api(&store, FlowVariant::Official).await;

    let health: Value = reqwest::get(format!("{}/api/v1/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["data"]["identitiesLoaded"], 5);
    assert_eq!(health["data"]["credentialsLoaded"], 5);
    assert_eq!(health["data"]["agentsAvailable"], 1);
}

#[tokio::test]
async fn test_verify_trading_partner_over_http() {
    let store = TempStore::new();
    run_sample_setup(&store, FlowVariant::Official).await;
    let base = spawn_api(&store, FlowVariant::Official).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/v1/verify/trading-partner", base))
        .json(&json!({ "seller": { "identifier": SELLER } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["decision"]["approved"], true);
    assert_eq!(body["decision"]["trustScore"], 100);
    assert_eq!(body["decision"]["recommendation"], "APPROVED");
    assert_eq!(body["seller"]["agent"]["alias"], SELLER);
    assert_eq!(body["credentials"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_verify_errors_over_http() {
    let store = TempStore::new();
    let base = spawn_api(&store, FlowVariant::Official).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/verify/trading-partner", base);

    let resp = client.post(&url).json(&json!({})).send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "seller.identifier is required");

    let resp = client
        .post(&url)
        .json(&json!({ "seller": { "identifier": "ghost" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_chain_endpoint_after_revocation() {
    let store = TempStore::new();
    let summary = run_sample_setup(&store, FlowVariant::Official).await;
    let le_said = &summary.credentials[1].said;
    let mut le = store.storage.credential(le_said).unwrap().unwrap();
    le.revoke().unwrap();
    store.storage.save_credential(&le).unwrap();

    let base = spawn_api(&store, FlowVariant::Official).await;
    let body: Value = reqwest::get(format!("{}/api/v1/chain/{}", base, SELLER))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["chain"]["valid"], false);
    assert_eq!(body["chain"]["links"].as_array().unwrap().len(), 4);
    assert_eq!(body["chain"]["links"][3]["reason"], "credential status is revoked");
}
