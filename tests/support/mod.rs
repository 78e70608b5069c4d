//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use fieldvault::audit::{AuditTrail, MemoryAuditSink};
use fieldvault::config::VaultConfig;
use fieldvault::kms::LocalKms;
use fieldvault::FieldVault;

pub const MASTER_KEY_ID: &str = "mk-test";

pub struct Fixture {
    pub vault: FieldVault,
    pub kms: Arc<LocalKms>,
    pub audit: Arc<MemoryAuditSink>,
}

pub fn config() -> VaultConfig {
    VaultConfig::from_json_str(
        r#"{
            "masterKeyId": "mk-test",
            "fieldPolicy": {
                "financial_accounts": [
                    "account_number_encrypted",
                    "routing_number_encrypted",
                    "access_token_encrypted"
                ],
                "health_records": ["diagnosis_encrypted"]
            }
        }"#,
    )
    .unwrap()
}

pub fn fixture() -> Fixture {
    let kms = LocalKms::with_master_key(MASTER_KEY_ID).unwrap();
    let audit = Arc::new(MemoryAuditSink::new());
    let mut trail = AuditTrail::new();
    trail.add_sink(audit.clone());
    let vault = FieldVault::from_config(&config(), kms.clone(), trail).unwrap();
    Fixture { vault, kms, audit }
}
