//! vLEI Identity Layer
//!
//! Actor sessions on top of the identifier/credential protocol:
//! - `ProtocolClient` boundary and operation types
//! - bounded sleep-and-recheck operation polling
//! - `SessionManager` for identifiers, end roles, introductions and registries
//! - `LocalNetwork`, an in-process protocol network

pub mod error;
pub mod local;
pub mod operation;
pub mod protocol;
pub mod session;

pub use error::{IdentityError, ProtocolError};
pub use local::{IssuanceBehavior, LocalAgent, LocalNetwork, NetworkOptions};
pub use operation::{complete_operation, discard_operation, wait_for_operation};
pub use protocol::{
    AdmitRequest, CredentialRecord, GrantRequest, Notification, Operation, ProtocolClient,
    SessionConnector, ADMIT_ROUTE, GRANT_ROUTE,
};
pub use session::{Session, SessionManager};
