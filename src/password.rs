//! Password-based encryption for low-criticality client-side blobs.
//!
//! No key provider is involved: the key is derived from the password with
//! PBKDF2-HMAC-SHA256 and a per-blob salt. Blob layout before base64:
//!
//! ```text
//! [ salt (32) ][ nonce (16) ][ tag (16) ][ ciphertext (N) ]
//! ```

use std::num::NonZeroU32;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ring::pbkdf2;
use zeroize::Zeroizing;

use crate::crypto::{self, fill_random, KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::error::{FieldVaultError, Result};

/// Salt length embedded in each blob.
pub const SALT_LEN: usize = 32;

/// PBKDF2 iteration count for password-derived keys.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const HEADER_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).unwrap_or(NonZeroU32::MIN);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        password.as_bytes(),
        key.as_mut_slice(),
    );
    key
}

/// Encrypt `plaintext` under a key derived from `password`.
pub fn encrypt_with_password(plaintext: &str, password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt)?;
    let key = derive_key(password, &salt);

    let sealed = crypto::seal(key.as_slice(), plaintext.as_bytes(), &[])?;

    let mut blob = Vec::with_capacity(HEADER_LEN + sealed.ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&sealed.nonce);
    blob.extend_from_slice(&sealed.tag);
    blob.extend_from_slice(&sealed.ciphertext);
    Ok(STANDARD.encode(blob))
}

/// Decrypt a blob produced by [`encrypt_with_password`].
///
/// A wrong password and a corrupted blob are indistinguishable: both fail
/// with [`FieldVaultError::Authentication`].
pub fn decrypt_with_password(blob: &str, password: &str) -> Result<String> {
    let raw = STANDARD
        .decode(blob.trim())
        .map_err(|_| FieldVaultError::MalformedBlob)?;
    if raw.len() < HEADER_LEN {
        return Err(FieldVaultError::MalformedBlob);
    }

    let (salt, rest) = raw.split_at(SALT_LEN);
    let (nonce, rest) = rest.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let key = derive_key(password, salt);
    let plaintext = crypto::open(key.as_slice(), ciphertext, nonce, tag, &[])?;
    String::from_utf8(plaintext).map_err(|_| FieldVaultError::Encoding)
}
