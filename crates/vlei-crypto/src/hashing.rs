use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// BLAKE3 hash (32 bytes).
pub type Hash = [u8; 32];

/// Derivation code for a BLAKE3-256 digest.
pub const BLAKE3_256_CODE: &str = "E";

/// Derivation code for a 128-bit random salt.
pub const SALT_128_CODE: &str = "0A";

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 digest rendered as a 44-character qualified base64 string.
pub fn digest_qb64(data: &[u8]) -> String {
    format!("{}{}", BLAKE3_256_CODE, URL_SAFE_NO_PAD.encode(hash(data)))
}

/// Fresh 128-bit salt in qualified base64, used as the credential `u` field.
pub fn salt_qb64() -> String {
    let mut raw = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut raw);
    format!("{}{}", SALT_128_CODE, URL_SAFE_NO_PAD.encode(raw))
}
