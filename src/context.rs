//! Encryption context and its AAD encoding.
//!
//! The context ties a ciphertext to the record and field it belongs to. Only
//! `user_id`, `entity_kind` and `field_name` are authenticated. `timestamp`
//! becomes the timestamp of the audit event for the operation and is left out
//! of the AAD: a decrypt-time context never has the encrypt-time timestamp,
//! and including it would make every decryption fail.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Provenance of a single field encryption or decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionContext {
    pub user_id: String,
    pub entity_kind: String,
    pub field_name: String,
    pub timestamp: DateTime<Utc>,
}

/// The authenticated subset of [`EncryptionContext`], in fixed key order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AadBinding<'a> {
    user_id: &'a str,
    entity_kind: &'a str,
    field_name: &'a str,
}

impl EncryptionContext {
    /// A context stamped with the current time.
    pub fn new(
        user_id: impl Into<String>,
        entity_kind: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            entity_kind: entity_kind.into(),
            field_name: field_name.into(),
            timestamp: Utc::now(),
        }
    }

    /// Deterministic AAD bytes:
    /// `{"userId":"..","entityKind":"..","fieldName":".."}`.
    pub fn to_aad(&self) -> Vec<u8> {
        let binding = AadBinding {
            user_id: &self.user_id,
            entity_kind: &self.entity_kind,
            field_name: &self.field_name,
        };
        // A struct of three &str fields always serializes.
        serde_json::to_vec(&binding).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn aad_has_fixed_shape() {
        let ctx = EncryptionContext::new("u1", "financial_accounts", "account_number_encrypted");
        assert_eq!(
            String::from_utf8(ctx.to_aad()).unwrap(),
            concat!(
                r#"{"userId":"u1","entityKind":"financial_accounts","#,
                r#""fieldName":"account_number_encrypted"}"#
            )
        );
    }

    #[test]
    fn timestamp_does_not_affect_aad() {
        let a = EncryptionContext::new("u1", "k", "f");
        let mut b = a.clone();
        b.timestamp = a.timestamp - Duration::days(30);
        assert_eq!(a.to_aad(), b.to_aad());
    }

    #[test]
    fn separators_cannot_be_smuggled() {
        let a = EncryptionContext::new("u1\",\"entityKind\":\"x", "k", "f");
        let b = EncryptionContext::new("u1", "x", "f");
        assert_ne!(a.to_aad(), b.to_aad());
    }
}
