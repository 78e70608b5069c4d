//! Field-level encryption for a financial account record.
//!
//! Run with: `cargo run --example field_encryption_demo`
//!
//! - sensitive columns are encrypted with per-field data keys
//! - a tampered column decrypts to `null` without losing the others
//! - every attempt lands in a JSON-lines audit file

use std::sync::Arc;

use fieldvault::audit::{AuditTrail, FileAuditSink};
use fieldvault::config::VaultConfig;
use fieldvault::hash::ColumnHasher;
use fieldvault::kms::LocalKms;
use fieldvault::{EncryptedEnvelope, FieldVault};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 1. Setup
    let config = VaultConfig::from_json_str(
        r#"{
            "masterKeyId": "demo-master",
            "fieldPolicy": {
                "financial_accounts": ["account_number_encrypted", "routing_number_encrypted"]
            }
        }"#,
    )?;
    let kms = LocalKms::with_master_key(config.master_key_id.clone())?;

    let audit_path = std::env::temp_dir().join("fieldvault_audit.jsonl");
    let mut trail = AuditTrail::new();
    trail.add_sink(Arc::new(FileAuditSink::new(&audit_path)?));

    let vault = FieldVault::from_config(&config, kms, trail)?;

    // 2. Encrypt a record before it is stored
    let record = json!({
        "id": 1,
        "institution": "First Demo Bank",
        "account_number_encrypted": "000123456789",
        "routing_number_encrypted": "021000021"
    });
    let record = record.as_object().cloned().unwrap_or_default();
    let mut stored = vault.encrypt_fields(&record, "financial_accounts", "user-42")?;
    println!("Stored: {}", serde_json::to_string_pretty(&stored)?);

    // 3. Equality lookup without decrypting
    let index = ColumnHasher::generate()?;
    println!("Index entry: {}", index.index_value("000123456789")?);

    // 4. Corrupt one column and read the record back
    if let Some(serde_json::Value::String(wire)) = stored.get_mut("routing_number_encrypted") {
        let mut envelope = EncryptedEnvelope::from_wire(wire)?;
        envelope.tag[0] ^= 0x01;
        *wire = envelope.to_wire()?;
    }
    let read = vault.decrypt_fields(&stored, "financial_accounts", "user-42")?;
    println!("Read back: {}", serde_json::to_string_pretty(&read.record)?);
    for field in read.failed_fields() {
        println!("  could not decrypt {field}");
    }

    println!("Audit trail written to: {}", audit_path.display());
    Ok(())
}
