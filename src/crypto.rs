//! Low-level authenticated encryption.
//!
//! Every other module in the crate encrypts and decrypts exclusively through
//! [`seal`] and [`open`].
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM with a detached 128-bit tag
//! - **Nonce**: 128 bits (16 bytes), generated fresh per call via `SystemRandom`
//! - **Key size**: 256 bits (32 bytes)
//!
//! The 16-byte nonce is part of the stored envelope format, which is why the
//! cipher is `AesGcm<Aes256, U16>` rather than the 12-byte-nonce default.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{FieldVaultError, Result};

/// AES-256-GCM parameterised with a 16-byte nonce.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Size of the nonce in bytes (128 bits).
pub const NONCE_LEN: usize = 16;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Size of a master or data key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Output of a single [`seal`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
}

/// Fill `buf` from the system CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    SystemRandom::new()
        .fill(buf)
        .map_err(|_| FieldVaultError::Randomness)
}

/// Generate a cryptographically secure random key.
pub fn generate_random_key() -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    fill_random(&mut key)?;
    Ok(key)
}

fn cipher(key: &[u8]) -> Result<Aes256Gcm16> {
    if key.len() != KEY_LEN {
        return Err(FieldVaultError::InvalidKey);
    }
    Aes256Gcm16::new_from_slice(key).map_err(|_| FieldVaultError::InvalidKey)
}

/// Encrypt `plaintext` under `key`, binding `aad` into the tag.
///
/// The nonce is generated here and only here; callers cannot supply one.
/// Ciphertext length equals plaintext length.
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let cipher = cipher(key)?;

    let mut nonce = [0u8; NONCE_LEN];
    fill_random(&mut nonce)?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&nonce), aad, &mut buffer)
        .map_err(|_| FieldVaultError::PlaintextTooLong)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(Sealed {
        ciphertext: buffer,
        nonce,
        tag: tag_bytes,
    })
}

/// Decrypt and authenticate a sealed payload.
///
/// Any tag failure (tampered ciphertext or tag, wrong key, different AAD)
/// yields [`FieldVaultError::Authentication`]. The caller receives no partial
/// plaintext.
pub fn open(
    key: &[u8],
    ciphertext: &[u8],
    nonce: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = cipher(key)?;
    if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(FieldVaultError::Authentication);
    }

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            aad,
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| FieldVaultError::Authentication)?;

    Ok(buffer)
}
