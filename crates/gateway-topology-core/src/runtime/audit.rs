// crates/gateway-topology-core/src/runtime/audit.rs
// ============================================================================
// Module: Composition Audit Sinks
// Description: JSON-lines sinks for composition events.
// Purpose: Route composition events to stderr, a file, memory, or nowhere.
// Dependencies: crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Each event is written as one JSON object per line. Write failures are
//! dropped so auditing can never change a composition outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::interfaces::CompositionAuditSink;
use crate::interfaces::CompositionEvent;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl CompositionAuditSink for StderrAuditSink {
    fn record(&self, event: &CompositionEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that appends JSON lines to a file.
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
}

impl CompositionAuditSink for FileAuditSink {
    fn record(&self, event: &CompositionEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// Audit sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<CompositionEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<CompositionEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl CompositionAuditSink for MemoryAuditSink {
    fn record(&self, event: &CompositionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl CompositionAuditSink for NoopAuditSink {
    fn record(&self, _event: &CompositionEvent) {}
}
