//! Structured session events
//!
//! The interpreter reports what an attacker did through an [`EventSink`]:
//! each dispatched statement, each unresolved command, each file written
//! through a redirection, and the end of the session. Downstream collectors
//! (JSON log files, databases, SIEM forwarders) implement the trait.

use serde::Serialize;
use std::sync::Mutex;

/// One observable action inside a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "eventid")]
pub enum Event {
    /// A statement was dispatched.
    #[serde(rename = "honeyshell.command.input")]
    CommandInput { session: String, input: String },

    /// A statement was abandoned because a command did not resolve.
    #[serde(rename = "honeyshell.command.failed")]
    CommandFailed { session: String, input: String },

    /// Output was redirected into a virtual file.
    #[serde(rename = "honeyshell.session.file_redirect")]
    FileRedirect {
        session: String,
        input: String,
        /// Virtual path that received the data.
        #[serde(rename = "outputPath")]
        output_path: String,
        /// On-disk staging copy, empty when staging is disabled.
        #[serde(rename = "sourcePath")]
        source_path: String,
        shasum: String,
        size: u64,
    },

    /// The session ended.
    #[serde(rename = "honeyshell.session.closed")]
    SessionClosed { session: String },
}

impl Event {
    /// The `eventid` string of this event.
    pub fn event_id(&self) -> &'static str {
        match self {
            Event::CommandInput { .. } => "honeyshell.command.input",
            Event::CommandFailed { .. } => "honeyshell.command.failed",
            Event::FileRedirect { .. } => "honeyshell.session.file_redirect",
            Event::SessionClosed { .. } => "honeyshell.session.closed",
        }
    }
}

/// Receiver for session events.
pub trait EventSink: Send + Sync {
    /// Record one event. Must not block the session for long.
    fn emit(&self, event: Event);
}

/// Default sink: serializes every event to JSON and logs it through `tracing`.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: Event) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(target: "honeyshell::events", eventid = event.event_id(), "{}", json),
            Err(e) => tracing::warn!(target: "honeyshell::events", "failed to serialize event: {}", e),
        }
    }
}

/// Sink that keeps events in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<Event>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
