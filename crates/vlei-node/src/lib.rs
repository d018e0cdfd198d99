//! vLEI node: flat-file persistence, actor-hierarchy setup and the
//! trading-partner verification API.

pub mod api;
pub mod config;
pub mod setup;
pub mod state;
pub mod storage;

pub use config::NodeConfig;
pub use setup::{SetupOrchestrator, SetupPlan, SetupSummary};
pub use state::NodeState;
pub use storage::Storage;
