//! Self-addressing identifiers for JSON blocks.
//!
//! A block is made self-addressing by filling its label field (`d`) with a
//! placeholder of the final length, digesting the compact serialization, and
//! writing the digest back into the label. Key order is preserved, so the
//! same block always yields the same identifier.

use serde_json::{Map, Value};

use crate::error::CryptoError;
use crate::hashing::digest_qb64;

/// Length of a qualified BLAKE3-256 identifier.
pub const SAID_LENGTH: usize = 44;

const DEFAULT_LABEL: &str = "d";
const PLACEHOLDER: char = '#';

/// SAIDify `block` under the `d` label.
pub fn saidify(block: &Value) -> Result<(String, Value), CryptoError> {
    saidify_with_label(block, DEFAULT_LABEL)
}

/// SAIDify `block` under `label`. The label keeps its position when already
/// present and is placed first otherwise.
pub fn saidify_with_label(block: &Value, label: &str) -> Result<(String, Value), CryptoError> {
    let fields = block
        .as_object()
        .ok_or_else(|| CryptoError::InvalidInput("only JSON objects can be SAIDified".into()))?;

    let placeholder = Value::String(PLACEHOLDER.to_string().repeat(SAID_LENGTH));
    let mut padded = with_label(fields, label, placeholder);

    let serialized = serde_json::to_vec(&Value::Object(padded.clone()))?;
    let said = digest_qb64(&serialized);

    if let Some(slot) = padded.get_mut(label) {
        *slot = Value::String(said.clone());
    }

    tracing::trace!(said = %said, label, "block saidified");
    Ok((said, Value::Object(padded)))
}

/// Whether the block's label field matches its recomputed identifier.
pub fn verify_said(block: &Value) -> Result<bool, CryptoError> {
    let claimed = block
        .get(DEFAULT_LABEL)
        .and_then(Value::as_str)
        .ok_or_else(|| CryptoError::InvalidInput("block carries no said".into()))?;
    let (computed, _) = saidify(block)?;
    Ok(computed == claimed)
}

fn with_label(fields: &Map<String, Value>, label: &str, value: Value) -> Map<String, Value> {
    let mut out = Map::with_capacity(fields.len() + 1);
    if !fields.contains_key(label) {
        out.insert(label.to_string(), value.clone());
    }
    for (key, existing) in fields {
        if key == label {
            out.insert(key.clone(), value.clone());
        } else {
            out.insert(key.clone(), existing.clone());
        }
    }
    out
}
