//! Key material ownership.
//!
//! Two key types exist:
//! 1. [`DataKey`]: a per-field data-encryption key handed out by the key
//!    provider. One is generated for every field encryption and dropped as
//!    soon as the cipher call returns.
//! 2. [`MasterKey`]: the wrapping key held by [`crate::kms::LocalKms`]. With a
//!    real KMS the master key never leaves the service and this type is unused.
//!
//! Both are opaque, not `Clone`, and zeroised on drop. Zeroisation covers the
//! owned buffer only: copies made by the compiler (moves, spills) or by the
//! allocator before the key reached this type are outside its reach, so this
//! is best-effort hygiene rather than a guarantee.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::KEY_LEN;
use crate::error::{FieldVaultError, Result};

/// A plaintext data-encryption key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    bytes: [u8; KEY_LEN],
}

impl DataKey {
    /// Copy a key out of a provider response. The slice must be exactly
    /// [`KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| FieldVaultError::InvalidKey)?;
        Ok(Self { bytes })
    }

    /// Borrow the raw key bytes for a cipher call.
    ///
    /// `pub(crate)`: raw bytes never leave the crate.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey(..)")
    }
}

/// A data key as returned by [`crate::kms::KeyProviderClient::generate_data_key`].
#[derive(Debug)]
pub struct GeneratedDataKey {
    /// Plaintext key, used once and dropped.
    pub plaintext: DataKey,
    /// The same key wrapped by the provider's master key. Safe to persist.
    pub wrapped: Vec<u8>,
    /// Identifier of the master key that wrapped `wrapped`.
    pub key_id: String,
}

/// A KMS master key held in process by [`crate::kms::LocalKms`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Construct a `MasterKey` from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(..)")
    }
}
