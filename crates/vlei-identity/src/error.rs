/// Failures reported by a protocol client.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("operation {name} failed: {reason}")]
    OperationFailed { name: String, reason: String },

    #[error("operation {name} did not complete within {timeout_ms}ms")]
    OperationTimeout { name: String, timeout_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Identity layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("session setup failed at {step}: {reason}")]
    SessionSetupFailure { step: &'static str, reason: String },

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl IdentityError {
    pub(crate) fn setup(step: &'static str, reason: impl ToString) -> Self {
        Self::SessionSetupFailure {
            step,
            reason: reason.to_string(),
        }
    }
}
