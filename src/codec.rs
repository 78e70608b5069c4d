//! Envelope codec: single-field encryption and decryption.
//!
//! Encrypt:
//! 1. Generate a data key (plaintext + wrapped) from the key provider
//! 2. Seal the value under the data key with the context AAD
//! 3. Drop the plaintext data key
//! 4. Assemble the envelope, audit, return
//!
//! Decrypt runs the same steps backwards: parse, check version, unwrap the
//! data key, open with the same AAD, audit.
//!
//! Every attempt is audited, success or failure. Failures are reported as
//! [`FieldVaultError::Encryption`] / [`FieldVaultError::Decryption`], which
//! carry only the field name and error class.

use crate::audit::{AuditEvent, AuditTrail, Operation};
use crate::context::EncryptionContext;
use crate::crypto;
use crate::envelope::{EncryptedEnvelope, ALGORITHM, ENVELOPE_VERSION};
use crate::error::{FieldVaultError, Result};
use crate::kms::KeyProviderClient;

/// Combines the key provider and the authenticated cipher.
///
/// Holds no mutable state; one instance can serve any number of threads.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    keys: KeyProviderClient,
    audit: AuditTrail,
}

impl EnvelopeCodec {
    pub fn new(keys: KeyProviderClient, audit: AuditTrail) -> Self {
        Self { keys, audit }
    }

    pub fn key_provider(&self) -> &KeyProviderClient {
        &self.keys
    }

    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit
    }

    /// Encrypt `plaintext` and return the serialized envelope.
    pub fn encrypt_field(&self, plaintext: &str, ctx: &EncryptionContext) -> Result<String> {
        self.audited(ctx, Operation::Encrypt, || {
            let envelope = self.seal_envelope(plaintext, ctx)?;
            Ok((envelope.to_wire()?, envelope.key_id))
        })
    }

    /// Encrypt `plaintext` and return the typed envelope.
    pub fn seal_field(
        &self,
        plaintext: &str,
        ctx: &EncryptionContext,
    ) -> Result<EncryptedEnvelope> {
        self.audited(ctx, Operation::Encrypt, || {
            let envelope = self.seal_envelope(plaintext, ctx)?;
            let key_id = envelope.key_id.clone();
            Ok((envelope, key_id))
        })
    }

    /// Decrypt a serialized envelope.
    pub fn decrypt_field(&self, wire: &str, ctx: &EncryptionContext) -> Result<String> {
        self.audited(ctx, Operation::Decrypt, || {
            let envelope = EncryptedEnvelope::from_wire(wire)?;
            let plaintext = self.open_envelope(&envelope, ctx)?;
            Ok((plaintext, envelope.key_id))
        })
    }

    /// Decrypt a typed envelope.
    pub fn open_field(
        &self,
        envelope: &EncryptedEnvelope,
        ctx: &EncryptionContext,
    ) -> Result<String> {
        self.audited(ctx, Operation::Decrypt, || {
            let plaintext = self.open_envelope(envelope, ctx)?;
            Ok((plaintext, envelope.key_id.clone()))
        })
    }

    /// Decrypt and re-encrypt under a fresh data key and the client's current
    /// master key. Produces a new envelope; the old one should be discarded.
    pub fn reencrypt_field(&self, wire: &str, ctx: &EncryptionContext) -> Result<String> {
        let plaintext = zeroize::Zeroizing::new(self.decrypt_field(wire, ctx)?);
        self.encrypt_field(&plaintext, ctx)
    }

    fn seal_envelope(&self, plaintext: &str, ctx: &EncryptionContext) -> Result<EncryptedEnvelope> {
        let generated = self.keys.generate_data_key()?;
        let aad = ctx.to_aad();

        let sealed = crypto::seal(generated.plaintext.as_bytes(), plaintext.as_bytes(), &aad);
        // Zeroised on drop; dropped before anything else happens.
        drop(generated.plaintext);
        let sealed = sealed?;

        Ok(EncryptedEnvelope {
            ciphertext: sealed.ciphertext,
            iv: sealed.nonce,
            tag: sealed.tag,
            key_id: generated.key_id,
            algorithm: ALGORITHM.to_string(),
            version: ENVELOPE_VERSION,
            wrapped_data_key: generated.wrapped,
        })
    }

    fn open_envelope(
        &self,
        envelope: &EncryptedEnvelope,
        ctx: &EncryptionContext,
    ) -> Result<String> {
        if envelope.version != ENVELOPE_VERSION {
            return Err(FieldVaultError::UnsupportedVersion(envelope.version.to_string()));
        }
        if envelope.algorithm != ALGORITHM {
            return Err(FieldVaultError::UnsupportedAlgorithm(envelope.algorithm.clone()));
        }

        let data_key = self.keys.unwrap_data_key(&envelope.wrapped_data_key)?;
        let aad = ctx.to_aad();
        let plaintext = crypto::open(
            data_key.as_bytes(),
            &envelope.ciphertext,
            &envelope.iv,
            &envelope.tag,
            &aad,
        );
        drop(data_key);

        String::from_utf8(plaintext?).map_err(|_| FieldVaultError::Encoding)
    }

    fn audited<T>(
        &self,
        ctx: &EncryptionContext,
        operation: Operation,
        f: impl FnOnce() -> Result<(T, String)>,
    ) -> Result<T> {
        match f() {
            Ok((value, key_id)) => {
                tracing::debug!(
                    entity_kind = %ctx.entity_kind,
                    field = %ctx.field_name,
                    %key_id,
                    ?operation,
                    "field operation succeeded"
                );
                self.audit.record(AuditEvent::success(ctx, operation));
                Ok(value)
            }
            Err(err) => {
                let kind = err.kind();
                tracing::warn!(
                    entity_kind = %ctx.entity_kind,
                    field = %ctx.field_name,
                    %kind,
                    ?operation,
                    "field operation failed"
                );
                self.audit.record(AuditEvent::failure(ctx, operation, kind));
                let field = ctx.field_name.clone();
                Err(match operation {
                    Operation::Encrypt => FieldVaultError::Encryption { field, kind },
                    Operation::Decrypt => FieldVaultError::Decryption { field, kind },
                })
            }
        }
    }
}
