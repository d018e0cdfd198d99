use crate::credential_state::{CredentialStatus, TransferState};

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid transfer transition from {from} to {to}")]
    InvalidStateTransition {
        from: TransferState,
        to: TransferState,
    },

    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: CredentialStatus,
        to: CredentialStatus,
    },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("unknown credential kind: {0}")]
    UnknownCredentialKind(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
