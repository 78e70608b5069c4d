//! Audit trail for field encryption and decryption.
//!
//! Every `encrypt_field`/`decrypt_field` attempt produces one [`AuditEvent`].
//! Events are handed to pluggable sinks; the core never reads them back. A
//! sink that fails is logged locally and does not fail the operation.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::context::EncryptionContext;
use crate::error::{ErrorKind, FieldVaultError, Result};

/// A sink that receives audit events. Implement this to forward events to a
/// database, queue, or other compliance store.
pub trait AuditSink: Send + Sync {
    /// Append one event.
    fn append(&self, event: &AuditEvent) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Encrypt,
    Decrypt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

/// A record of one field-level operation. Never contains plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub user_id: String,
    /// Entity kind of the record the field belongs to.
    pub table_name: String,
    pub field_name: String,
    pub operation: Operation,
    pub status: Status,
    /// Error class on failure, e.g. `"AuthenticationError"`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
    /// Taken from the [`EncryptionContext`] the operation ran under.
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub(crate) fn success(ctx: &EncryptionContext, operation: Operation) -> Self {
        Self::from_context(ctx, operation, Status::Success, None)
    }

    pub(crate) fn failure(ctx: &EncryptionContext, operation: Operation, kind: ErrorKind) -> Self {
        Self::from_context(ctx, operation, Status::Failure, Some(kind.as_str().to_string()))
    }

    fn from_context(
        ctx: &EncryptionContext,
        operation: Operation,
        status: Status,
        error_message: Option<String>,
    ) -> Self {
        Self {
            user_id: ctx.user_id.clone(),
            table_name: ctx.entity_kind.clone(),
            field_name: ctx.field_name.clone(),
            operation,
            status,
            error_message,
            timestamp: ctx.timestamp,
        }
    }
}

/// Fan-out over the registered sinks.
#[derive(Clone, Default)]
pub struct AuditTrail {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink to receive every event.
    pub fn add_sink(&mut self, sink: Arc<dyn AuditSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver `event` to every sink. Failures are logged, never returned.
    pub fn record(&self, event: AuditEvent) {
        if self.sinks.is_empty() {
            tracing::debug!(
                table = %event.table_name,
                field = %event.field_name,
                "no audit sink registered"
            );
            return;
        }
        for sink in &self.sinks {
            if let Err(err) = sink.append(&event) {
                tracing::error!(
                    error = %err,
                    user_id = %event.user_id,
                    table = %event.table_name,
                    field = %event.field_name,
                    operation = ?event.operation,
                    status = ?event.status,
                    "audit sink rejected event"
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: file
// ---------------------------------------------------------------------------

/// Writes events as JSON lines (one per event) to a file.
/// Creates the file if it doesn't exist; appends if it does.
pub struct FileAuditSink {
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Open or create a file for append-only audit logging.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<()> {
        let line = serde_json::to_string(event)
            .map_err(|e| FieldVaultError::Io(std::io::Error::other(e)))?;
        let mut file = self.file.lock();
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in sink: memory
// ---------------------------------------------------------------------------

/// Keeps events in memory. Useful for tests and for hosts that drain events
/// into their own store.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Remove and return all events received so far.
    pub fn drain(&self) -> Vec<AuditEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, event: &AuditEvent) -> Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}
