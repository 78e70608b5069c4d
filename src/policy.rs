//! Which fields of which entity kinds are encrypted.
//!
//! Built once at startup (from [`crate::config::VaultConfig`] or the builder)
//! and never mutated afterwards. Share it behind an `Arc`.

use std::collections::HashMap;

use crate::error::{FieldVaultError, Result};

/// Immutable map of entity kind to the ordered set of encrypted field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldEncryptionPolicy {
    kinds: HashMap<String, Vec<String>>,
}

impl FieldEncryptionPolicy {
    pub fn builder() -> FieldEncryptionPolicyBuilder {
        FieldEncryptionPolicyBuilder::default()
    }

    /// Encrypted fields for `entity_kind`, in declaration order.
    pub fn fields_for(&self, entity_kind: &str) -> Option<&[String]> {
        self.kinds.get(entity_kind).map(Vec::as_slice)
    }

    pub fn is_encrypted(&self, entity_kind: &str, field_name: &str) -> bool {
        self.fields_for(entity_kind)
            .is_some_and(|fields| fields.iter().any(|f| f == field_name))
    }

    pub fn entity_kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

/// Accumulates entity kinds and fields, then validates once in [`build`].
///
/// [`build`]: FieldEncryptionPolicyBuilder::build
#[derive(Debug, Default)]
pub struct FieldEncryptionPolicyBuilder {
    kinds: Vec<(String, Vec<String>)>,
}

impl FieldEncryptionPolicyBuilder {
    /// Declare the encrypted fields of one entity kind. Repeated calls for the
    /// same kind append.
    pub fn entity<I, S>(mut self, entity_kind: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds
            .push((entity_kind.into(), fields.into_iter().map(Into::into).collect()));
        self
    }

    /// Validate and freeze. Empty names are rejected; duplicate field names
    /// keep their first position.
    pub fn build(self) -> Result<FieldEncryptionPolicy> {
        let mut kinds: HashMap<String, Vec<String>> = HashMap::new();
        for (kind, fields) in self.kinds {
            if kind.trim().is_empty() {
                return Err(FieldVaultError::Config("empty entity kind".into()));
            }
            let entry = kinds.entry(kind.clone()).or_default();
            for field in fields {
                if field.trim().is_empty() {
                    return Err(FieldVaultError::Config(format!(
                        "empty field name for entity kind `{kind}`"
                    )));
                }
                if !entry.contains(&field) {
                    entry.push(field);
                }
            }
        }
        Ok(FieldEncryptionPolicy { kinds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_and_drops_duplicates() {
        let policy = FieldEncryptionPolicy::builder()
            .entity("api_keys", ["secret", "token", "secret"])
            .entity("api_keys", ["label"])
            .build()
            .unwrap();
        assert_eq!(policy.fields_for("api_keys").unwrap(), ["secret", "token", "label"]);
        assert!(policy.is_encrypted("api_keys", "token"));
        assert!(!policy.is_encrypted("api_keys", "name"));
        assert!(policy.fields_for("users").is_none());
    }

    #[test]
    fn rejects_empty_names() {
        assert!(matches!(
            FieldEncryptionPolicy::builder().entity(" ", ["a"]).build(),
            Err(FieldVaultError::Config(_))
        ));
        assert!(matches!(
            FieldEncryptionPolicy::builder().entity("k", [""]).build(),
            Err(FieldVaultError::Config(_))
        ));
    }

    #[test]
    fn kind_with_no_fields_is_known() {
        let policy = FieldEncryptionPolicy::builder()
            .entity("audit_notes", Vec::<String>::new())
            .build()
            .unwrap();
        assert_eq!(policy.fields_for("audit_notes").unwrap().len(), 0);
        assert_eq!(policy.entity_kinds().collect::<Vec<_>>(), ["audit_notes"]);
    }
}
