//! Helpers shared by the integration scenarios.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use vlei_core::ProtocolConfig;
use vlei_credentials::FlowVariant;
use vlei_identity::LocalNetwork;
use vlei_node::api::build_router;
use vlei_node::{NodeState, SetupOrchestrator, SetupPlan, SetupSummary, Storage};

/// A throwaway data directory, removed on drop.
pub struct TempStore {
    pub dir: PathBuf,
    pub storage: Arc<Storage>,
}

impl TempStore {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("vlei-it-{}", rand::random::<u64>()));
        let storage = Arc::new(Storage::open(&dir).expect("open storage"));
        Self { dir, storage }
    }

    /// Persist every identity and credential of a fixture.
    pub fn seed(
        &self,
        identities: Vec<vlei_core::Identity>,
        credentials: Vec<vlei_core::Credential>,
    ) {
        for identity in &identities {
            self.storage.save_identity(identity).expect("save identity");
        }
        for credential in &credentials {
            self.storage.save_credential(credential).expect("save credential");
        }
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempStore {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

/// Run the sample plan against a fresh in-process network.
pub async fn run_sample_setup(store: &TempStore, flow: FlowVariant) -> SetupSummary {
    let orchestrator = SetupOrchestrator::new(
        Arc::new(LocalNetwork::new()),
        store.storage.clone(),
        ProtocolConfig::fast(),
        flow,
    );
    orchestrator
        .run(&SetupPlan::sample())
        .await
        .expect("setup should succeed")
}

/// Serve the API on an ephemeral port; returns the base URL.
pub async fn spawn_api(store: &TempStore, flow: FlowVariant) -> String {
    let state = Arc::new(NodeState::new(store.storage.clone(), flow.flow()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.ok();
    });
    format!("http://{}", addr)
}
