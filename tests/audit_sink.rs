//! Tests for pluggable audit sinks.

mod support;

use std::sync::{Arc, Mutex};

use fieldvault::audit::{AuditEvent, AuditSink, AuditTrail, FileAuditSink, Operation, Status};
use fieldvault::error::Result;
use fieldvault::kms::LocalKms;
use fieldvault::{EncryptionContext, FieldVault};

/// A test sink that collects events into a shared Vec.
struct SharedVecSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl AuditSink for SharedVecSink {
    fn append(&self, event: &AuditEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[test]
fn custom_sink_receives_events() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut trail = AuditTrail::new();
    trail.add_sink(Arc::new(SharedVecSink {
        events: Arc::clone(&events),
    }));
    let kms = LocalKms::with_master_key(support::MASTER_KEY_ID).unwrap();
    let vault = FieldVault::from_config(&support::config(), kms, trail).unwrap();

    let ctx = EncryptionContext::new("u9", "health_records", "diagnosis_encrypted");
    let wire = vault.encrypt_field("J45.909", &ctx).unwrap();
    vault.decrypt_field(&wire, &ctx).unwrap();

    let collected = events.lock().unwrap();
    assert_eq!(collected.len(), 2);
    assert_eq!(collected[0].user_id, "u9");
    assert_eq!(collected[0].table_name, "health_records");
    assert_eq!(collected[0].field_name, "diagnosis_encrypted");
    assert_eq!(collected[0].operation, Operation::Encrypt);
    assert_eq!(collected[1].operation, Operation::Decrypt);
    assert!(collected.iter().all(|e| e.status == Status::Success && e.error_message.is_none()));
}

#[test]
fn failures_are_recorded_with_error_class_only() {
    let fx = support::fixture();
    let ctx = EncryptionContext::new("u1", "health_records", "diagnosis_encrypted");
    let wire = fx.vault.encrypt_field("J45.909", &ctx).unwrap();

    let wrong = EncryptionContext::new("u2", "health_records", "diagnosis_encrypted");
    assert!(fx.vault.decrypt_field(&wire, &wrong).is_err());

    let failure = fx.audit.events().pop().unwrap();
    assert_eq!(failure.status, Status::Failure);
    assert_eq!(failure.operation, Operation::Decrypt);
    assert_eq!(failure.user_id, "u2");
    assert_eq!(failure.error_message.as_deref(), Some("AuthenticationError"));
}

#[test]
fn file_sink_writes_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    let mut trail = AuditTrail::new();
    trail.add_sink(Arc::new(FileAuditSink::new(&path).unwrap()));
    let kms = LocalKms::with_master_key(support::MASTER_KEY_ID).unwrap();
    let vault = FieldVault::from_config(&support::config(), kms, trail).unwrap();

    let ctx = EncryptionContext::new("u1", "financial_accounts", "access_token_encrypted");
    let wire = vault.encrypt_field("tok", &ctx).unwrap();
    vault.decrypt_field(&wire, &ctx).unwrap();
    let _ = vault.decrypt_field("garbage", &ctx);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["operation"], "encrypt");
    assert_eq!(lines[2]["status"], "failure");
    assert_eq!(lines[2]["errorMessage"], "MalformedEnvelopeError");
    assert!(!contents.contains("tok\""));
}

#[test]
fn events_carry_the_context_timestamp() {
    let fx = support::fixture();
    let mut ctx = EncryptionContext::new("u1", "health_records", "diagnosis_encrypted");
    ctx.timestamp -= chrono::Duration::days(1);

    let wire = fx.vault.encrypt_field("J45.909", &ctx).unwrap();

    let mut later = EncryptionContext::new("u1", "health_records", "diagnosis_encrypted");
    later.timestamp = ctx.timestamp + chrono::Duration::hours(3);
    fx.vault.decrypt_field(&wire, &later).unwrap();
    let _ = fx.vault.decrypt_field("garbage", &later);

    let events = fx.audit.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].timestamp, ctx.timestamp);
    assert_eq!(events[1].timestamp, later.timestamp);
    assert_eq!(events[2].status, Status::Failure);
    assert_eq!(events[2].timestamp, later.timestamp);
}
