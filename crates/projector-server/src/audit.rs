// crates/projector-server/src/audit.rs
// ============================================================================
// Module: Projector Audit Logging
// Description: Structured audit events for access decisions and lifecycle.
// Purpose: Emit JSON-line audit logs through an injected sink.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every access decision, live vote refresh failure, and service lifecycle
//! change is recorded through an [`AuditSink`] chosen at startup. Sinks write
//! one JSON object per line; there is no global logger.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use projector_config::LogDestination;
use projector_config::ProjectorConfig;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOutcome {
    /// The request reached the handler.
    Allowed,
    /// The request was rejected by the gateway.
    Denied,
}

/// Projector access audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectorAccessEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request path.
    pub path: String,
    /// Authenticated caller when known.
    pub caller_id: Option<u64>,
    /// Requested projector id segment.
    pub projector_id: Option<String>,
    /// Decision outcome.
    pub outcome: AccessOutcome,
    /// HTTP status returned for denials.
    pub status: Option<u16>,
    /// Denial reason.
    pub reason: Option<String>,
}

/// Inputs required to construct an access audit event.
pub struct ProjectorAccessParams {
    /// Request path.
    pub path: String,
    /// Authenticated caller when known.
    pub caller_id: Option<u64>,
    /// Requested projector id segment.
    pub projector_id: Option<String>,
    /// Decision outcome.
    pub outcome: AccessOutcome,
    /// HTTP status returned for denials.
    pub status: Option<u16>,
    /// Denial reason.
    pub reason: Option<String>,
}

impl ProjectorAccessEvent {
    /// Creates a new access event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ProjectorAccessParams) -> Self {
        Self {
            event: "projector_access",
            timestamp_ms: now_ms(),
            path: params.path,
            caller_id: params.caller_id,
            projector_id: params.projector_id,
            outcome: params.outcome,
            status: params.status,
            reason: params.reason,
        }
    }
}

/// Live vote refresh failure payload.
#[derive(Debug, Clone, Serialize)]
pub struct LiveVoteRefreshEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Failure description.
    pub error: String,
}

impl LiveVoteRefreshEvent {
    /// Creates a refresh failure event.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            event: "live_vote_refresh",
            timestamp_ms: now_ms(),
            error: error.into(),
        }
    }
}

/// Service lifecycle payload.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Lifecycle kind (`listening`, `shutdown`, ...).
    pub kind: String,
    /// Optional detail.
    pub message: Option<String>,
}

impl ServiceEvent {
    /// Creates a lifecycle event.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: Option<String>) -> Self {
        Self {
            event: "service",
            timestamp_ms: now_ms(),
            kind: kind.into(),
            message,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for projector events.
pub trait AuditSink: Send + Sync {
    /// Record an access decision.
    fn record_access(&self, event: &ProjectorAccessEvent);

    /// Record a live vote refresh failure.
    fn record_refresh(&self, _event: &LiveVoteRefreshEvent) {}

    /// Record a service lifecycle event.
    fn record_service(&self, _event: &ServiceEvent) {}
}

/// Audit sink that logs JSON lines to stdout.
pub struct StdoutAuditSink;

impl AuditSink for StdoutAuditSink {
    fn record_access(&self, event: &ProjectorAccessEvent) {
        write_line(&mut io::stdout(), event);
    }

    fn record_refresh(&self, event: &LiveVoteRefreshEvent) {
        write_line(&mut io::stdout(), event);
    }

    fn record_service(&self, event: &ServiceEvent) {
        write_line(&mut io::stdout(), event);
    }
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record_access(&self, event: &ProjectorAccessEvent) {
        write_line(&mut io::stderr(), event);
    }

    fn record_refresh(&self, event: &LiveVoteRefreshEvent) {
        write_line(&mut io::stderr(), event);
    }

    fn record_service(&self, event: &ServiceEvent) {
        write_line(&mut io::stderr(), event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(mut file) = self.file.lock() {
            write_line(&mut *file, event);
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_access(&self, event: &ProjectorAccessEvent) {
        self.append(event);
    }

    fn record_refresh(&self, event: &LiveVoteRefreshEvent) {
        self.append(event);
    }

    fn record_service(&self, event: &ServiceEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_access(&self, _event: &ProjectorAccessEvent) {}
}

/// Builds the sink selected by the logging configuration.
///
/// # Errors
///
/// Returns an error when the file destination cannot be opened.
pub fn sink_from_config(config: &ProjectorConfig) -> io::Result<Arc<dyn AuditSink>> {
    Ok(match config.audit_destination() {
        LogDestination::Stdout => Arc::new(StdoutAuditSink),
        LogDestination::Stderr => Arc::new(StderrAuditSink),
        LogDestination::File => {
            let path = config.logging.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "logging.path is required")
            })?;
            Arc::new(FileAuditSink::new(path)?)
        }
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes `event` as one JSON line; write failures are dropped.
fn write_line<W: Write, T: Serialize>(writer: &mut W, event: &T) {
    if let Ok(payload) = serde_json::to_string(event) {
        let _ = writeln!(writer, "{payload}");
    }
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
