//! The at-rest envelope and its wire format.
//!
//! ```text
//! base64( {"data": {"ciphertext": b64, "iv": b64, "tag": b64,
//!                   "keyId": str, "algorithm": str, "version": int},
//!          "encryptedKey": b64} )
//! ```
//!
//! The two-level shape and the field names are fixed for compatibility with
//! envelopes already in storage. Decoding reads `data.version` first and only
//! then parses the rest, so a future format fails as `UnsupportedVersion`
//! rather than as a parse error.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{NONCE_LEN, TAG_LEN};
use crate::error::{FieldVaultError, Result};

/// Algorithm identifier written into every envelope.
pub const ALGORITHM: &str = "AES-256-GCM";

/// Current envelope format version.
pub const ENVELOPE_VERSION: u64 = 1;

/// Ciphertext and everything needed to decrypt it, except the authority to
/// unwrap `wrapped_data_key`.
///
/// Envelopes are immutable: updating a field means producing a new envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
    pub key_id: String,
    pub algorithm: String,
    pub version: u64,
    pub wrapped_data_key: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    data: WireData,
    #[serde(rename = "encryptedKey")]
    encrypted_key: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireData {
    ciphertext: String,
    iv: String,
    tag: String,
    key_id: String,
    algorithm: String,
    version: u64,
}

fn decode_b64(field: &str, value: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(value)
        .map_err(|_| FieldVaultError::MalformedEnvelope(format!("`{field}` is not base64")))
}

fn decode_fixed<const N: usize>(field: &str, value: &str) -> Result<[u8; N]> {
    decode_b64(field, value)?
        .try_into()
        .map_err(|_| FieldVaultError::MalformedEnvelope(format!("`{field}` must be {N} bytes")))
}

impl EncryptedEnvelope {
    /// Serialize to the base64 JSON wire string.
    pub fn to_wire(&self) -> Result<String> {
        let wire = WireEnvelope {
            data: WireData {
                ciphertext: STANDARD.encode(&self.ciphertext),
                iv: STANDARD.encode(self.iv),
                tag: STANDARD.encode(self.tag),
                key_id: self.key_id.clone(),
                algorithm: self.algorithm.clone(),
                version: self.version,
            },
            encrypted_key: STANDARD.encode(&self.wrapped_data_key),
        };
        let json = serde_json::to_vec(&wire)
            .map_err(|e| FieldVaultError::MalformedEnvelope(e.to_string()))?;
        Ok(STANDARD.encode(json))
    }

    /// Parse a wire string.
    ///
    /// Fails with `UnsupportedVersion` for any version other than
    /// [`ENVELOPE_VERSION`] and with `UnsupportedAlgorithm` for anything but
    /// [`ALGORITHM`].
    pub fn from_wire(wire: &str) -> Result<Self> {
        let json = STANDARD
            .decode(wire.trim())
            .map_err(|_| FieldVaultError::MalformedEnvelope("envelope is not base64".into()))?;
        let value: Value = serde_json::from_slice(&json)
            .map_err(|_| FieldVaultError::MalformedEnvelope("envelope is not JSON".into()))?;

        // Any number is a version; only 1 is one we can read.
        match value.pointer("/data/version") {
            Some(Value::Number(n)) if n.as_u64() == Some(ENVELOPE_VERSION) => {}
            Some(Value::Number(n)) => {
                return Err(FieldVaultError::UnsupportedVersion(n.to_string()));
            }
            _ => {
                return Err(FieldVaultError::MalformedEnvelope(
                    "missing numeric `data.version`".into(),
                ));
            }
        }

        let wire: WireEnvelope = serde_json::from_value(value)
            .map_err(|e| FieldVaultError::MalformedEnvelope(e.to_string()))?;
        if wire.data.algorithm != ALGORITHM {
            return Err(FieldVaultError::UnsupportedAlgorithm(wire.data.algorithm));
        }

        Ok(Self {
            ciphertext: decode_b64("ciphertext", &wire.data.ciphertext)?,
            iv: decode_fixed("iv", &wire.data.iv)?,
            tag: decode_fixed("tag", &wire.data.tag)?,
            key_id: wire.data.key_id,
            algorithm: wire.data.algorithm,
            version: wire.data.version,
            wrapped_data_key: decode_b64("encryptedKey", &wire.encrypted_key)?,
        })
    }
}
