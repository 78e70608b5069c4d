//! # fieldvault
//!
//! Field-level envelope encryption.
//!
//! Each sensitive field value is encrypted with its own AES-256-GCM data key.
//! The data key is generated and wrapped by an external KMS, stored wrapped
//! next to the ciphertext, and unwrapped again only to decrypt. The
//! ciphertext is bound to the record it belongs to (user, entity kind, field)
//! through additional authenticated data, and every attempt is audited.
//!
//! Alongside the envelope path:
//! - [`hash`]: salted PBKDF2 hashes for equality lookups over encrypted columns
//! - [`password`]: password-derived encryption for client-side blobs
//!
//! ## Bootstrap
//!
//! ```no_run
//! use std::sync::Arc;
//! use fieldvault::{audit::AuditTrail, config::VaultConfig, kms::LocalKms, FieldVault};
//!
//! # fn main() -> fieldvault::error::Result<()> {
//! let config = VaultConfig::from_file("fieldvault.json")?;
//! let kms = LocalKms::with_master_key(config.master_key_id.clone())?;
//! let vault = FieldVault::from_config(&config, kms, AuditTrail::new())?;
//! # let _ = vault;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod batch;
pub mod codec;
pub mod config;
pub mod context;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod keys;
pub mod kms;
pub mod password;
pub mod policy;

use std::sync::Arc;

pub use batch::{DecryptedRecord, FieldOutcome, Record, RecordEncryptor};
pub use codec::EnvelopeCodec;
pub use context::EncryptionContext;
pub use envelope::EncryptedEnvelope;
pub use error::{ErrorKind, FieldVaultError};
pub use password::{decrypt_with_password, encrypt_with_password};

use audit::AuditTrail;
use config::VaultConfig;
use keys::MasterKey;
use kms::{KeyProviderClient, KmsTransport};

/// Generate a cryptographically secure master key for [`kms::LocalKms`].
///
/// Production deployments keep master keys inside the KMS and never call this.
pub fn generate_master_key() -> error::Result<MasterKey> {
    let bytes = crypto::generate_random_key()?;
    Ok(MasterKey::from_bytes(bytes))
}

/// Everything the host process wires up once at startup: key provider,
/// field policy, audit trail.
#[derive(Debug, Clone)]
pub struct FieldVault {
    records: RecordEncryptor,
}

impl FieldVault {
    pub fn from_config(
        config: &VaultConfig,
        transport: Arc<dyn KmsTransport>,
        audit: AuditTrail,
    ) -> error::Result<Self> {
        let policy = config.build_policy()?;
        let keys = KeyProviderClient::new(transport, config.master_key_id.clone());
        let codec = EnvelopeCodec::new(keys, audit);
        Ok(Self {
            records: RecordEncryptor::new(codec, Arc::new(policy)),
        })
    }

    pub fn codec(&self) -> &EnvelopeCodec {
        self.records.codec()
    }

    pub fn records(&self) -> &RecordEncryptor {
        &self.records
    }

    /// See [`EnvelopeCodec::encrypt_field`].
    pub fn encrypt_field(&self, plaintext: &str, ctx: &EncryptionContext) -> error::Result<String> {
        self.codec().encrypt_field(plaintext, ctx)
    }

    /// See [`EnvelopeCodec::decrypt_field`].
    pub fn decrypt_field(&self, wire: &str, ctx: &EncryptionContext) -> error::Result<String> {
        self.codec().decrypt_field(wire, ctx)
    }

    /// See [`RecordEncryptor::encrypt_fields`].
    pub fn encrypt_fields(
        &self,
        record: &Record,
        entity_kind: &str,
        user_id: &str,
    ) -> error::Result<Record> {
        self.records.encrypt_fields(record, entity_kind, user_id)
    }

    /// See [`RecordEncryptor::decrypt_fields`].
    pub fn decrypt_fields(
        &self,
        record: &Record,
        entity_kind: &str,
        user_id: &str,
    ) -> error::Result<DecryptedRecord> {
        self.records.decrypt_fields(record, entity_kind, user_id)
    }
}
