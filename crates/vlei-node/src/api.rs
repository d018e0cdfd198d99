//! HTTP API server for the vLEI node.
//!
//! Provides REST endpoints for health, agent listing, trading-partner
//! verification and chain inspection.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use vlei_credentials::{
    report, ChainVerification, ChainVerifier, CredentialError, CredentialGraph, EdgeVerification,
    VerificationReport,
};

use crate::state::NodeState;

// --- Request / response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub identities_loaded: usize,
    pub credentials_loaded: usize,
    pub agents_available: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
    pub data: HealthData,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInfo {
    pub alias: String,
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lei: Option<String>,
}

#[derive(Serialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentInfo>,
    pub count: usize,
}

#[derive(Deserialize, Default)]
pub struct SellerRef {
    #[serde(default)]
    pub identifier: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct VerifyRequest {
    #[serde(default)]
    pub seller: Option<SellerRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainResponse {
    pub alias: String,
    pub chain: ChainVerification,
    pub edges: EdgeVerification,
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn load_graph(state: &NodeState) -> Result<CredentialGraph, ApiError> {
    state.storage.graph().map_err(|e| {
        tracing::error!(error = %e, "failed to load credential graph");
        error(StatusCode::INTERNAL_SERVER_ERROR, "failed to load credential store")
    })
}

fn verification_error(e: CredentialError) -> ApiError {
    match e {
        CredentialError::NotFound(_) => error(StatusCode::NOT_FOUND, "Agent not found"),
        other => error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

// --- Handlers ---

async fn handle_health(
    State(state): State<Arc<NodeState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    let graph = load_graph(&state)?;
    Ok(Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        timestamp: Utc::now(),
        data: HealthData {
            identities_loaded: graph.identity_count(),
            credentials_loaded: graph.credential_count(),
            agents_available: graph.agents().count(),
        },
    }))
}

async fn handle_agents(
    State(state): State<Arc<NodeState>>,
) -> Result<Json<AgentsResponse>, ApiError> {
    let graph = load_graph(&state)?;
    let agents: Vec<AgentInfo> = graph
        .agents()
        .map(|identity| AgentInfo {
            alias: identity.alias.clone(),
            prefix: identity.prefix.clone(),
            role: identity.title.clone(),
            lei: identity.lei.clone(),
        })
        .collect();
    let count = agents.len();
    Ok(Json(AgentsResponse { agents, count }))
}

async fn handle_verify_trading_partner(
    State(state): State<Arc<NodeState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerificationReport>, ApiError> {
    let identifier = req
        .seller
        .and_then(|seller| seller.identifier)
        .filter(|identifier| !identifier.is_empty())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "seller.identifier is required"))?;

    let graph = load_graph(&state)?;
    let result = report(&graph, state.flow.clone(), &identifier).map_err(verification_error)?;
    Ok(Json(result))
}

async fn handle_chain(
    State(state): State<Arc<NodeState>>,
    Path(alias): Path<String>,
) -> Result<Json<ChainResponse>, ApiError> {
    let graph = load_graph(&state)?;
    let verifier = ChainVerifier::new(&graph, state.flow.clone());
    let chain = verifier.build_chain(&alias).map_err(verification_error)?;
    Ok(Json(ChainResponse {
        chain: verifier.verify_built(&chain),
        edges: verifier.verify_built_edges(&chain),
        warnings: chain.warnings,
        alias,
    }))
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handle_health))
        .route("/api/v1/agents", get(handle_agents))
        .route(
            "/api/v1/verify/trading-partner",
            post(handle_verify_trading_partner),
        )
        .route("/api/v1/chain/{alias}", get(handle_chain))
        .with_state(state)
}

pub async fn start_api_server(listen_addr: SocketAddr, state: Arc<NodeState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
