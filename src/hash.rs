//! Salted one-way hash for equality lookups over encrypted columns.
//!
//! `hash` produces `"salt_hex:digest_hex"` using PBKDF2-HMAC-SHA256. With a
//! random salt (the default) equal inputs hash differently; for an indexed
//! column, use a [`ColumnHasher`] with one salt per column so equal values
//! produce equal index entries.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use ring::pbkdf2;

use crate::crypto::fill_random;
use crate::error::{FieldVaultError, Result};

/// PBKDF2 iteration count for searchable hashes.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Length of a generated salt in bytes.
pub const SALT_LEN: usize = 16;

/// Accepted length range for caller-supplied salts.
pub const MIN_SALT_LEN: usize = 16;
pub const MAX_SALT_LEN: usize = 32;

fn iterations() -> NonZeroU32 {
    // PBKDF2_ITERATIONS is a non-zero literal.
    NonZeroU32::new(PBKDF2_ITERATIONS).unwrap_or(NonZeroU32::MIN)
}

/// A parsed `salt:digest` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchableHash {
    salt: Vec<u8>,
    digest: [u8; DIGEST_LEN],
}

impl SearchableHash {
    /// Hash `value` with `salt`.
    pub fn compute(value: &str, salt: &[u8]) -> Result<Self> {
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt.len()) {
            return Err(FieldVaultError::InvalidSalt(salt.len()));
        }
        let mut digest = [0u8; DIGEST_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations(),
            salt,
            value.as_bytes(),
            &mut digest,
        );
        Ok(Self {
            salt: salt.to_vec(),
            digest,
        })
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Constant-time check of `value` against this hash.
    pub fn matches(&self, value: &str) -> bool {
        pbkdf2::verify(
            pbkdf2::PBKDF2_HMAC_SHA256,
            iterations(),
            &self.salt,
            value.as_bytes(),
            &self.digest,
        )
        .is_ok()
    }
}

impl fmt::Display for SearchableHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(&self.salt), hex::encode(self.digest))
    }
}

impl FromStr for SearchableHash {
    type Err = FieldVaultError;

    fn from_str(s: &str) -> Result<Self> {
        let (salt_hex, digest_hex) = s.split_once(':').ok_or(FieldVaultError::MalformedHash)?;
        let salt = hex::decode(salt_hex).map_err(|_| FieldVaultError::MalformedHash)?;
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt.len()) {
            return Err(FieldVaultError::MalformedHash);
        }
        let digest = hex::decode(digest_hex)
            .ok()
            .and_then(|d| <[u8; DIGEST_LEN]>::try_from(d).ok())
            .ok_or(FieldVaultError::MalformedHash)?;
        Ok(Self { salt, digest })
    }
}

/// Hash `value`, generating a random salt when none is given.
pub fn hash(value: &str, salt: Option<&[u8]>) -> Result<String> {
    let hashed = match salt {
        Some(salt) => SearchableHash::compute(value, salt)?,
        None => {
            let mut salt = [0u8; SALT_LEN];
            fill_random(&mut salt)?;
            SearchableHash::compute(value, &salt)?
        }
    };
    Ok(hashed.to_string())
}

/// Check `value` against a stored `"salt:hash"` string.
///
/// A mismatch is `Ok(false)`; only a malformed `stored` string is an error.
pub fn verify(value: &str, stored: &str) -> Result<bool> {
    Ok(stored.parse::<SearchableHash>()?.matches(value))
}

/// Fixed-salt hasher for one indexed column.
///
/// Every value hashed by the same `ColumnHasher` uses the same salt, so the
/// output can be stored in an index and compared for equality.
#[derive(Clone)]
pub struct ColumnHasher {
    salt: Vec<u8>,
}

impl ColumnHasher {
    pub fn new(salt: impl Into<Vec<u8>>) -> Result<Self> {
        let salt = salt.into();
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt.len()) {
            return Err(FieldVaultError::InvalidSalt(salt.len()));
        }
        Ok(Self { salt })
    }

    /// A hasher with a fresh random salt. Persist [`ColumnHasher::salt`].
    pub fn generate() -> Result<Self> {
        let mut salt = vec![0u8; SALT_LEN];
        fill_random(&mut salt)?;
        Ok(Self { salt })
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// The `salt:hash` index value for `value`.
    pub fn index_value(&self, value: &str) -> Result<String> {
        hash(value, Some(self.salt.as_slice()))
    }
}

impl fmt::Debug for ColumnHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnHasher").finish_non_exhaustive()
    }
}
