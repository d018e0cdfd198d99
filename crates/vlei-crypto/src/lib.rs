pub mod error;
pub mod hashing;
pub mod said;

pub use error::CryptoError;
pub use hashing::{digest_qb64, hash, salt_qb64};
pub use said::{saidify, saidify_with_label, verify_said, SAID_LENGTH};
