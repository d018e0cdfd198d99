//! vLEI Core: data model, credential catalog, transfer state machine and
//! protocol configuration for the vLEI trust chain.

pub mod catalog;
pub mod config;
pub mod credential_state;
pub mod error;
pub mod types;

pub use catalog::{ecr_rules, oor_rules, standard_rules, CredentialKind, ISSUER_TO_ISSUEE};
pub use config::{ProtocolConfig, RetryPolicy, WitnessPolicy};
pub use credential_state::{CredentialStatus, TransferEvent, TransferState, TransferStateMachine};
pub use error::CoreError;
pub use types::{ActorRole, Credential, Edge, Identity, IntroductionRecord, Registry};
