//! Stable configuration hashing
//!
//! Only fields that change transcription output take part in the hash.
//! The selected fields are encoded through [`serde_json::Value`], whose
//! object map keeps keys sorted, so the byte encoding is identical for
//! equal configurations no matter how they were assembled.

use crate::config::{AppConfig, ComputeType, Device, TimestampPolicy};
use crate::{Error, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// The hashed subset of [`AppConfig`]
///
/// Secrets, TTLs and the fallback switch are not part of the hash.
#[derive(Debug, Clone, Serialize)]
pub struct HashInput<'a> {
    /// Engine name
    pub engine: &'a str,
    /// Model name
    pub model: &'a str,
    /// Requested language, omitted when detection is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a str>,
    /// Compute device
    pub device: Device,
    /// Numerical precision
    pub compute_type: ComputeType,
    /// Timestamp policy
    pub timestamps: TimestampPolicy,
    /// Provider options, omitted when empty
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub engine_options: &'a BTreeMap<String, serde_json::Value>,
}

impl<'a> From<&'a AppConfig> for HashInput<'a> {
    fn from(config: &'a AppConfig) -> Self {
        Self {
            engine: &config.engine,
            model: &config.model,
            language: config.language.as_deref(),
            device: config.device,
            compute_type: config.compute_type,
            timestamps: config.timestamps,
            engine_options: &config.engine_options,
        }
    }
}

/// Canonical bytes of any serializable value: sorted keys, compact
///
/// Null fields of the top-level object are dropped so an unset optional
/// field hashes like an absent one. Nulls nested deeper, such as inside
/// `engine_options`, are kept: `{"k": null}` and `{}` hash differently.
///
/// # Errors
///
/// Returns a serialization error if the value cannot be represented as JSON.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut value = serde_json::to_value(value)
        .map_err(|e| Error::serialization(format!("failed to encode hash input: {e}")))?;
    if let serde_json::Value::Object(map) = &mut value {
        map.retain(|_, v| !v.is_null());
    }
    serde_json::to_vec(&value)
        .map_err(|e| Error::serialization(format!("failed to encode hash input: {e}")))
}

/// Lowercase hex SHA-256 of `bytes`
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash of the output-relevant configuration fields
///
/// # Errors
///
/// Returns a serialization error if the hash input cannot be encoded.
pub fn config_hash(config: &AppConfig) -> Result<String> {
    let input = HashInput::from(config);
    let bytes = canonical_json(&input)?;
    let digest = sha256_hex(&bytes);
    tracing::trace!(engine = %config.engine, model = %config.model, hash = %digest, "Computed config hash");
    Ok(digest)
}
