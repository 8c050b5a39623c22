//! System Event Log (SysLog)
//!
//! Records every scheduling request and response, the thread transitions in
//! between, and any diagnostics raised along the way.

use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

use crate::types::{DiagnosticLevel, LogId, OpCode, StateRecord};

/// A logged scheduler event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SysEvent {
    /// Unique event ID (monotonic)
    pub id: LogId,
    /// Timestamp (nanos since boot)
    pub timestamp: u64,
    /// What happened
    pub event_type: SysEventType,
}

/// Type of scheduler event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SysEventType {
    /// Operation requested
    Request {
        op: OpCode,
        /// Primary operand (thread, task or event id; 0 when none)
        target: u64,
    },
    /// Operation finished
    Response {
        /// ID of the request this responds to
        request_id: LogId,
        /// Result code (negative = failure or idle)
        result: i64,
    },
    /// A thread changed state (`from` is `None` for a fresh thread)
    Transition {
        thread: u64,
        from: Option<StateRecord>,
        to: StateRecord,
    },
    /// Warning or error reported through the diagnostic channel
    Diagnostic {
        level: DiagnosticLevel,
        message: String,
    },
}

/// Maximum number of events to keep in memory
pub const MAX_SYSLOG_EVENTS: usize = 10000;

/// Scheduler event log.
///
/// Events are append-only with monotonic IDs; the oldest entries are dropped
/// once the log exceeds [`MAX_SYSLOG_EVENTS`].
pub struct SysLog {
    events: Vec<SysEvent>,
    next_id: LogId,
}

impl SysLog {
    /// Create a new empty SysLog.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 0,
        }
    }

    fn push(&mut self, event_type: SysEventType, timestamp: u64) -> LogId {
        let id = self.next_id;
        self.next_id += 1;

        self.events.push(SysEvent {
            id,
            timestamp,
            event_type,
        });

        self.trim_if_needed();
        id
    }

    /// Log an operation request.
    ///
    /// Returns the event ID for correlating with the response.
    pub fn log_request(&mut self, op: OpCode, target: u64, timestamp: u64) -> LogId {
        self.push(SysEventType::Request { op, target }, timestamp)
    }

    /// Log an operation response.
    pub fn log_response(&mut self, request_id: LogId, result: i64, timestamp: u64) {
        self.push(SysEventType::Response { request_id, result }, timestamp);
    }

    /// Log a thread state transition.
    pub fn log_transition(
        &mut self,
        thread: u64,
        from: Option<StateRecord>,
        to: StateRecord,
        timestamp: u64,
    ) {
        self.push(SysEventType::Transition { thread, from, to }, timestamp);
    }

    /// Log a warning or error.
    pub fn log_diagnostic(&mut self, level: DiagnosticLevel, message: String, timestamp: u64) {
        self.push(SysEventType::Diagnostic { level, message }, timestamp);
    }

    /// Get all events.
    pub fn events(&self) -> &[SysEvent] {
        &self.events
    }

    /// Get the most recent N events, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<&SysEvent> {
        self.events.iter().rev().take(count).collect()
    }

    /// All transitions recorded for `thread`, oldest first.
    pub fn transitions_of(&self, thread: u64) -> Vec<(Option<StateRecord>, StateRecord)> {
        self.events
            .iter()
            .filter_map(|e| match e.event_type {
                SysEventType::Transition { thread: t, from, to } if t == thread => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    /// Count diagnostics of the given level.
    pub fn diagnostic_count(&self, level: DiagnosticLevel) -> usize {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    &e.event_type,
                    SysEventType::Diagnostic { level: l, .. } if *l == level
                )
            })
            .count()
    }

    /// Get the number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get the next event ID.
    pub fn next_id(&self) -> LogId {
        self.next_id
    }

    fn trim_if_needed(&mut self) {
        if self.events.len() > MAX_SYSLOG_EVENTS {
            let drain_count = self.events.len() - MAX_SYSLOG_EVENTS;
            self.events.drain(0..drain_count);
        }
    }
}

impl Default for SysLog {
    fn default() -> Self {
        Self::new()
    }
}
