//! Base64 handling for opaque byte fields.
//!
//! Encrypted payloads and vault keys are never interpreted by VaultKeep;
//! they only cross text boundaries (JSON output, command-line input) as
//! standard base64.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::errors::{Result, VaultKeepError};

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

/// Decode a base64 argument, naming the field in the error.
pub fn decode_field(field: &str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value.trim())
        .map_err(|e| VaultKeepError::Validation(format!("{field} is not valid base64: {e}")))
}

/// Encode bytes for display.
pub fn encode(data: &[u8]) -> String {
    BASE64.encode(data)
}
