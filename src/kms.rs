//! Key provider client.
//!
//! [`KmsTransport`] is the seam to the external key-management service: two
//! calls, `generate_data_key` and `decrypt`, over whatever transport the host
//! provides. [`KeyProviderClient`] sits in front of it, owns the master key
//! id, and refuses any response that does not carry a usable key. There is no
//! retry and no caching here; a failed call surfaces immediately as
//! [`FieldVaultError::KeyService`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::error::{FieldVaultError, Result};
use crate::keys::{DataKey, GeneratedDataKey, MasterKey};

/// Raw answer to a `GenerateDataKey` call.
pub struct KmsDataKey {
    pub plaintext: Zeroizing<Vec<u8>>,
    pub wrapped: Vec<u8>,
    pub key_id: String,
}

/// The two operations the core needs from an external KMS.
///
/// Implementations must return an error rather than an empty success. Timeouts
/// and retries belong to the implementation's transport.
pub trait KmsTransport: Send + Sync {
    /// Generate a fresh 256-bit data key under `master_key_id`.
    fn generate_data_key(&self, master_key_id: &str) -> Result<KmsDataKey>;

    /// Unwrap a previously wrapped data key.
    fn decrypt(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Validating front for a [`KmsTransport`], constructed once at bootstrap and
/// passed to the envelope codec.
#[derive(Clone)]
pub struct KeyProviderClient {
    transport: Arc<dyn KmsTransport>,
    master_key_id: String,
}

impl KeyProviderClient {
    pub fn new(transport: Arc<dyn KmsTransport>, master_key_id: impl Into<String>) -> Self {
        Self {
            transport,
            master_key_id: master_key_id.into(),
        }
    }

    /// The master key new data keys are generated under.
    pub fn master_key_id(&self) -> &str {
        &self.master_key_id
    }

    /// Generate a data key, returning both the plaintext and wrapped copies.
    pub fn generate_data_key(&self) -> Result<GeneratedDataKey> {
        let response = self.transport.generate_data_key(&self.master_key_id)?;

        if response.wrapped.is_empty() {
            return Err(FieldVaultError::KeyService("empty wrapped key in response".into()));
        }
        if response.key_id.is_empty() {
            return Err(FieldVaultError::KeyService("missing key id in response".into()));
        }
        let plaintext = DataKey::from_slice(&response.plaintext).map_err(|_| {
            FieldVaultError::KeyService(format!(
                "expected {KEY_LEN}-byte plaintext key, got {} bytes",
                response.plaintext.len()
            ))
        })?;

        Ok(GeneratedDataKey {
            plaintext,
            wrapped: response.wrapped,
            key_id: response.key_id,
        })
    }

    /// Unwrap a stored data key back to plaintext.
    pub fn unwrap_data_key(&self, wrapped: &[u8]) -> Result<DataKey> {
        if wrapped.is_empty() {
            return Err(FieldVaultError::KeyService("empty wrapped key".into()));
        }
        let plaintext = self.transport.decrypt(wrapped)?;
        DataKey::from_slice(&plaintext).map_err(|_| {
            FieldVaultError::KeyService(format!(
                "expected {KEY_LEN}-byte plaintext key, got {} bytes",
                plaintext.len()
            ))
        })
    }
}

impl std::fmt::Debug for KeyProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProviderClient")
            .field("master_key_id", &self.master_key_id)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// In-process KMS
// ---------------------------------------------------------------------------

struct LocalMasterKey {
    key: MasterKey,
    enabled: bool,
}

/// In-process KMS for development and tests.
///
/// Wrapped keys are laid out as:
/// ```text
/// [ key_id_len (u16 BE) ][ key_id ][ nonce (16) ][ tag (16) ][ ciphertext (32) ]
/// ```
/// so `decrypt` can find the master key without being told its id, the way a
/// real KMS embeds key metadata in its ciphertext blob.
#[derive(Default)]
pub struct LocalKms {
    keys: RwLock<HashMap<String, LocalMasterKey>>,
}

impl LocalKms {
    pub fn new() -> Self {
        Self::default()
    }

    /// A KMS holding one freshly generated master key.
    pub fn with_master_key(key_id: impl Into<String>) -> Result<Arc<Self>> {
        let kms = Self::new();
        kms.add_master_key(key_id, crate::generate_master_key()?);
        Ok(Arc::new(kms))
    }

    /// Register (or replace) a master key.
    pub fn add_master_key(&self, key_id: impl Into<String>, key: MasterKey) {
        self.keys
            .write()
            .insert(key_id.into(), LocalMasterKey { key, enabled: true });
    }

    /// Disable a master key. Every envelope wrapped under it stops decrypting.
    pub fn revoke(&self, key_id: &str) {
        if let Some(entry) = self.keys.write().get_mut(key_id) {
            entry.enabled = false;
        }
    }

    fn with_key<T>(&self, key_id: &str, f: impl FnOnce(&MasterKey) -> Result<T>) -> Result<T> {
        let keys = self.keys.read();
        let entry = keys
            .get(key_id)
            .ok_or_else(|| FieldVaultError::KeyService(format!("unknown master key: {key_id}")))?;
        if !entry.enabled {
            return Err(FieldVaultError::KeyService(format!("master key disabled: {key_id}")));
        }
        f(&entry.key)
    }
}

impl KmsTransport for LocalKms {
    fn generate_data_key(&self, master_key_id: &str) -> Result<KmsDataKey> {
        let key_id_len = u16::try_from(master_key_id.len())
            .map_err(|_| FieldVaultError::KeyService("master key id too long".into()))?;

        self.with_key(master_key_id, |master| {
            let dek = Zeroizing::new(crypto::generate_random_key()?);
            let sealed = crypto::seal(master.as_bytes(), dek.as_slice(), master_key_id.as_bytes())?;

            let mut wrapped =
                Vec::with_capacity(2 + master_key_id.len() + NONCE_LEN + TAG_LEN + KEY_LEN);
            wrapped.extend_from_slice(&key_id_len.to_be_bytes());
            wrapped.extend_from_slice(master_key_id.as_bytes());
            wrapped.extend_from_slice(&sealed.nonce);
            wrapped.extend_from_slice(&sealed.tag);
            wrapped.extend_from_slice(&sealed.ciphertext);

            Ok(KmsDataKey {
                plaintext: Zeroizing::new(dek.to_vec()),
                wrapped,
                key_id: master_key_id.to_string(),
            })
        })
    }

    fn decrypt(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let malformed = || FieldVaultError::KeyService("malformed wrapped key".into());

        let (len_bytes, rest) = wrapped.split_first_chunk::<2>().ok_or_else(malformed)?;
        let key_id_len = usize::from(u16::from_be_bytes(*len_bytes));
        if rest.len() < key_id_len + NONCE_LEN + TAG_LEN {
            return Err(malformed());
        }
        let (key_id, rest) = rest.split_at(key_id_len);
        let key_id = std::str::from_utf8(key_id).map_err(|_| malformed())?;
        let (nonce, rest) = rest.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        self.with_key(key_id, |master| {
            crypto::open(master.as_bytes(), ciphertext, nonce, tag, key_id.as_bytes())
                .map(Zeroizing::new)
                .map_err(|_| FieldVaultError::KeyService("data key unwrap failed".into()))
        })
    }
}
