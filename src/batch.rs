//! Record-level encryption across the fields a policy names.
//!
//! Encryption and decryption fail differently:
//! - `encrypt_fields` is all-or-nothing. A sensitive field that cannot be
//!   encrypted aborts the whole record; the input is never partially mutated.
//! - `decrypt_fields` isolates failures per field. A field that cannot be
//!   decrypted is set to `null` and reported in [`DecryptedRecord::outcomes`];
//!   the remaining fields are still returned.
//!
//! Both fail closed on programmer error (unknown entity kind, non-string
//! value in an encrypted field on the encrypt path).

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::codec::EnvelopeCodec;
use crate::context::EncryptionContext;
use crate::error::{ErrorKind, FieldVaultError, Result};
use crate::policy::FieldEncryptionPolicy;

/// A record as handed over by the storage layer.
pub type Record = Map<String, Value>;

/// What happened to one in-scope field during `decrypt_fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Decrypted { field: String },
    Failed { field: String, kind: ErrorKind },
}

impl FieldOutcome {
    pub fn field(&self) -> &str {
        match self {
            Self::Decrypted { field } | Self::Failed { field, .. } => field,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of `decrypt_fields`: the record with every decryptable field
/// restored, plus one outcome per in-scope field that held a value.
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptedRecord {
    pub record: Record,
    pub outcomes: Vec<FieldOutcome>,
}

impl DecryptedRecord {
    pub fn is_complete(&self) -> bool {
        !self.outcomes.iter().any(FieldOutcome::is_failed)
    }

    pub fn failed_fields(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failed())
            .map(FieldOutcome::field)
    }
}

/// Applies the envelope codec to every field the policy names for a kind.
#[derive(Debug, Clone)]
pub struct RecordEncryptor {
    codec: EnvelopeCodec,
    policy: Arc<FieldEncryptionPolicy>,
}

impl RecordEncryptor {
    pub fn new(codec: EnvelopeCodec, policy: Arc<FieldEncryptionPolicy>) -> Self {
        Self { codec, policy }
    }

    pub fn codec(&self) -> &EnvelopeCodec {
        &self.codec
    }

    pub fn policy(&self) -> &FieldEncryptionPolicy {
        &self.policy
    }

    fn fields(&self, entity_kind: &str) -> Result<&[String]> {
        self.policy
            .fields_for(entity_kind)
            .ok_or_else(|| FieldVaultError::PolicyNotFound(entity_kind.to_string()))
    }

    /// Return a copy of `record` with every present, non-empty in-scope field
    /// replaced by its serialized envelope.
    pub fn encrypt_fields(
        &self,
        record: &Record,
        entity_kind: &str,
        user_id: &str,
    ) -> Result<Record> {
        let fields = self.fields(entity_kind)?;
        let mut out = record.clone();

        for field in fields {
            let plaintext = match out.get(field) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if s.is_empty() => continue,
                Some(Value::String(s)) => s,
                Some(_) => return Err(FieldVaultError::InvalidFieldValue(field.clone())),
            };
            let ctx = EncryptionContext::new(user_id, entity_kind, field.as_str());
            let wire = self.codec.encrypt_field(plaintext, &ctx)?;
            out.insert(field.clone(), Value::String(wire));
        }

        Ok(out)
    }

    /// Return a copy of `record` with in-scope fields decrypted. A field that
    /// fails becomes `null` and is reported as [`FieldOutcome::Failed`].
    pub fn decrypt_fields(
        &self,
        record: &Record,
        entity_kind: &str,
        user_id: &str,
    ) -> Result<DecryptedRecord> {
        let fields = self.fields(entity_kind)?;
        let mut out = record.clone();
        let mut outcomes = Vec::with_capacity(fields.len());

        for field in fields {
            let result = match out.get(field) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if s.is_empty() => continue,
                Some(Value::String(wire)) => {
                    let ctx = EncryptionContext::new(user_id, entity_kind, field.as_str());
                    self.codec.decrypt_field(wire, &ctx)
                }
                Some(_) => Err(FieldVaultError::InvalidFieldValue(field.clone())),
            };

            match result {
                Ok(plaintext) => {
                    out.insert(field.clone(), Value::String(plaintext));
                    outcomes.push(FieldOutcome::Decrypted { field: field.clone() });
                }
                Err(err) => {
                    let kind = err.kind();
                    tracing::warn!(
                        entity_kind,
                        field = %field,
                        %kind,
                        "field left undecrypted"
                    );
                    out.insert(field.clone(), Value::Null);
                    outcomes.push(FieldOutcome::Failed { field: field.clone(), kind });
                }
            }
        }

        Ok(DecryptedRecord { record: out, outcomes })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::audit::AuditTrail;
    use crate::kms::{KeyProviderClient, LocalKms};

    fn encryptor() -> RecordEncryptor {
        let kms = LocalKms::with_master_key("mk").unwrap();
        let codec = EnvelopeCodec::new(KeyProviderClient::new(kms, "mk"), AuditTrail::new());
        let policy = FieldEncryptionPolicy::builder()
            .entity("api_keys", ["secret", "token"])
            .build()
            .unwrap();
        RecordEncryptor::new(codec, Arc::new(policy))
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn out_of_scope_and_empty_fields_pass_through() {
        let enc = encryptor();
        let input = record(json!({"name": "ci", "secret": "", "token": null, "n": 3}));
        let out = enc.encrypt_fields(&input, "api_keys", "u1").unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn non_string_in_scope_value_aborts_encrypt() {
        let enc = encryptor();
        let input = record(json!({"secret": "s", "token": 42}));
        assert!(matches!(
            enc.encrypt_fields(&input, "api_keys", "u1"),
            Err(FieldVaultError::InvalidFieldValue(ref f)) if f == "token"
        ));
    }

    #[test]
    fn unknown_kind_is_rejected_both_ways() {
        let enc = encryptor();
        let input = record(json!({"secret": "s"}));
        assert!(matches!(
            enc.encrypt_fields(&input, "users", "u1"),
            Err(FieldVaultError::PolicyNotFound(_))
        ));
        assert!(matches!(
            enc.decrypt_fields(&input, "users", "u1"),
            Err(FieldVaultError::PolicyNotFound(_))
        ));
    }

    #[test]
    fn plaintext_left_in_encrypted_column_is_reported() {
        let enc = encryptor();
        let input = record(json!({"secret": "never-encrypted", "token": 7}));
        let out = enc.decrypt_fields(&input, "api_keys", "u1").unwrap();
        assert_eq!(out.record["secret"], Value::Null);
        assert_eq!(out.record["token"], Value::Null);
        assert_eq!(out.failed_fields().collect::<Vec<_>>(), ["secret", "token"]);
        assert_eq!(
            out.outcomes,
            [
                FieldOutcome::Failed {
                    field: "secret".into(),
                    kind: ErrorKind::MalformedEnvelope
                },
                FieldOutcome::Failed {
                    field: "token".into(),
                    kind: ErrorKind::InvalidInput
                },
            ]
        );
        assert!(!out.is_complete());
    }
}
