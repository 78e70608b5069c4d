//! Bootstrap configuration.
//!
//! ```json
//! {
//!   "masterKeyId": "alias/app-fields",
//!   "fieldPolicy": {
//!     "financial_accounts": ["account_number_encrypted", "routing_number_encrypted"],
//!     "api_keys": ["secret"]
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FieldVaultError, Result};
use crate::policy::FieldEncryptionPolicy;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VaultConfig {
    /// KMS master key new data keys are generated under.
    pub master_key_id: String,

    /// Entity kind to the ordered list of fields that must be encrypted.
    #[serde(default)]
    pub field_policy: BTreeMap<String, Vec<String>>,
}

impl VaultConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| FieldVaultError::Config(e.to_string()))?;
        if config.master_key_id.trim().is_empty() {
            return Err(FieldVaultError::Config("`masterKeyId` must not be empty".into()));
        }
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            entity_kinds = config.field_policy.len(),
            "loaded vault configuration"
        );
        Ok(config)
    }

    /// Freeze the configured field policy.
    pub fn build_policy(&self) -> Result<FieldEncryptionPolicy> {
        self.field_policy
            .iter()
            .fold(FieldEncryptionPolicy::builder(), |builder, (kind, fields)| {
                builder.entity(kind.as_str(), fields.iter().map(String::as_str))
            })
            .build()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const SAMPLE: &str = r#"{
        "masterKeyId": "mk-prod",
        "fieldPolicy": {
            "financial_accounts": ["account_number_encrypted", "routing_number_encrypted"],
            "health_records": ["diagnosis_encrypted"]
        }
    }"#;

    #[test]
    fn parses_and_builds_policy() {
        let config = VaultConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.master_key_id, "mk-prod");

        let policy = config.build_policy().unwrap();
        assert_eq!(
            policy.fields_for("financial_accounts").unwrap(),
            ["account_number_encrypted", "routing_number_encrypted"]
        );
        assert!(policy.is_encrypted("health_records", "diagnosis_encrypted"));
    }

    #[test]
    fn rejects_empty_master_key_and_unknown_keys() {
        assert!(matches!(
            VaultConfig::from_json_str(r#"{"masterKeyId": " "}"#),
            Err(FieldVaultError::Config(_))
        ));
        assert!(matches!(
            VaultConfig::from_json_str(r#"{"masterKeyId": "mk", "policy": {}}"#),
            Err(FieldVaultError::Config(_))
        ));
    }

    #[test]
    fn empty_field_name_fails_policy_build() {
        let json = r#"{"masterKeyId": "mk", "fieldPolicy": {"k": [""]}}"#;
        let config = VaultConfig::from_json_str(json).unwrap();
        assert!(matches!(config.build_policy(), Err(FieldVaultError::Config(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = VaultConfig::from_file(file.path()).unwrap();
        assert_eq!(config.field_policy.len(), 2);

        assert!(matches!(
            VaultConfig::from_file(file.path().with_extension("missing")),
            Err(FieldVaultError::Io(_))
        ));
    }
}
