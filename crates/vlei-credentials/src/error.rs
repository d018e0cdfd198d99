/// Credential issuance, transfer and verification errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("issuance operation {operation} timed out after {timeout_ms}ms")]
    IssuanceTimeout { operation: String, timeout_ms: u64 },

    #[error("issuance failed: {0}")]
    IssuanceFailed(String),

    #[error("credential {said} not available after {attempts} attempts: {reason}")]
    CredentialUnavailable {
        said: String,
        attempts: u32,
        reason: String,
    },

    #[error("credential record {said} is missing {missing}")]
    IncompleteRecord { said: String, missing: String },

    #[error("grant failed: {0}")]
    GrantFailed(String),

    #[error("no grant notification after {attempts} attempts")]
    GrantNotificationTimeout { attempts: u32 },

    #[error("admit failed: {0}")]
    AdmitFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] vlei_identity::ProtocolError),

    #[error("identity error: {0}")]
    Identity(#[from] vlei_identity::IdentityError),

    #[error("crypto error: {0}")]
    Crypto(#[from] vlei_crypto::CryptoError),

    #[error("core error: {0}")]
    Core(#[from] vlei_core::CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
