//! Shared node state for HTTP handlers.

use std::sync::Arc;
use std::time::Instant;

use vlei_credentials::ChainFlow;

use crate::storage::Storage;

/// State shared by every request. Verification reloads the graph from
/// storage per request, so setup runs are picked up without a restart.
pub struct NodeState {
    pub storage: Arc<Storage>,
    /// Flow used to build and verify chains.
    pub flow: ChainFlow,
    /// When the node started.
    pub start_time: Instant,
}

impl NodeState {
    pub fn new(storage: Arc<Storage>, flow: ChainFlow) -> Self {
        Self {
            storage,
            flow,
            start_time: Instant::now(),
        }
    }
}
