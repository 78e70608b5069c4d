//! Error types for fieldvault.
//!
//! Every variant is a distinct failure mode of the envelope pipeline. Messages
//! say *what* failed and never carry plaintext, key material, or wrapped keys.
//! The field-level umbrellas (`Encryption`, `Decryption`) keep only the field
//! name and an [`ErrorKind`], which is all a caller outside the crate gets to
//! see.

use std::fmt;

use thiserror::Error;

/// The class of a failure, stripped of any detail.
///
/// This is what the audit trail records and what the field-level API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The key provider was unreachable, refused the call, or answered with
    /// an unusable payload.
    KeyService,
    /// AEAD tag verification failed.
    Authentication,
    /// The envelope format version is not understood by this build.
    UnsupportedVersion,
    /// The envelope names an algorithm other than AES-256-GCM.
    UnsupportedAlgorithm,
    /// The envelope could not be decoded.
    MalformedEnvelope,
    /// Key, nonce, or randomness failure inside the cipher layer.
    Cipher,
    /// Decrypted bytes were not valid UTF-8.
    Encoding,
    /// Caller-supplied data was rejected before any cryptography ran: unknown
    /// entity kind, non-string field value, bad salt, malformed hash or blob.
    InvalidInput,
    /// Configuration could not be loaded or is inconsistent.
    Config,
    /// File or stream I/O failed.
    Io,
}

impl ErrorKind {
    /// Stable identifier used in audit events.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyService => "KeyServiceError",
            Self::Authentication => "AuthenticationError",
            Self::UnsupportedVersion => "UnsupportedVersionError",
            Self::UnsupportedAlgorithm => "UnsupportedAlgorithmError",
            Self::MalformedEnvelope => "MalformedEnvelopeError",
            Self::Cipher => "CipherError",
            Self::Encoding => "EncodingError",
            Self::InvalidInput => "InvalidInputError",
            Self::Config => "ConfigError",
            Self::Io => "IoError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type for all fieldvault operations.
#[derive(Debug, Error)]
pub enum FieldVaultError {
    /// The key provider call failed or returned an empty/incomplete key.
    #[error("key service error: {0}")]
    KeyService(String),

    /// Tag verification failed: tampered ciphertext, wrong key, or an AAD
    /// mismatch.
    #[error("authentication failed")]
    Authentication,

    /// Envelope version is not supported.
    /// Carries the version exactly as it appeared in the envelope.
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(String),

    /// Envelope algorithm is not supported.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Envelope could not be parsed.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Stored searchable hash is not a `salt:hash` hex pair.
    #[error("malformed searchable hash")]
    MalformedHash,

    /// Password-encrypted blob is truncated or not base64.
    #[error("malformed encrypted blob")]
    MalformedBlob,

    /// A key had the wrong length.
    #[error("invalid key")]
    InvalidKey,

    /// A caller-supplied salt had the wrong length.
    #[error("invalid salt length: {0}")]
    InvalidSalt(usize),

    /// The plaintext exceeds the cipher's per-message length limit.
    #[error("plaintext too long for a single message")]
    PlaintextTooLong,

    /// The system random number generator failed.
    #[error("randomness source failed")]
    Randomness,

    /// Decrypted bytes were not valid UTF-8.
    #[error("decrypted value is not valid UTF-8")]
    Encoding,

    /// Field-level encryption failed.
    #[error("encryption of field `{field}` failed: {kind}")]
    Encryption { field: String, kind: ErrorKind },

    /// Field-level decryption failed.
    #[error("decryption of field `{field}` failed: {kind}")]
    Decryption { field: String, kind: ErrorKind },

    /// No field policy is registered for the entity kind.
    #[error("no field policy for entity kind `{0}`")]
    PolicyNotFound(String),

    /// An in-scope field held a value that is neither a string nor null.
    #[error("field `{0}` must be a string or null")]
    InvalidFieldValue(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure (configuration file, file audit sink).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FieldVaultError {
    /// Classify this error. Umbrella variants report their inner class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyService(_) => ErrorKind::KeyService,
            Self::Authentication => ErrorKind::Authentication,
            Self::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            Self::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Self::MalformedEnvelope(_) => ErrorKind::MalformedEnvelope,
            Self::Encoding => ErrorKind::Encoding,
            Self::InvalidKey | Self::PlaintextTooLong | Self::Randomness => ErrorKind::Cipher,
            Self::MalformedHash
            | Self::MalformedBlob
            | Self::InvalidSalt(_)
            | Self::PolicyNotFound(_)
            | Self::InvalidFieldValue(_) => ErrorKind::InvalidInput,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Encryption { kind, .. } | Self::Decryption { kind, .. } => *kind,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FieldVaultError>;
