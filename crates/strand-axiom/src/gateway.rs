//! Axiom Gateway
//!
//! Entry point for all scheduling operations. The gateway:
//! 1. Logs the operation request to SysLog
//! 2. Executes the scheduler operation
//! 3. Logs every thread transition the operation produced
//! 4. Logs the operation response
//!
//! Operations that originate inside the scheduler (timer-driven dispatch,
//! the dispatch that follows every lifecycle call) are folded into the
//! caller's request rather than logged separately.

use alloc::string::String;
use alloc::vec::Vec;

use crate::syslog::SysLog;
use crate::types::{DiagnosticLevel, OpCode, ResultCode, StateRecord};

/// A thread transition reported back by a scheduler operation.
pub type TransitionRecord = (u64, Option<StateRecord>, StateRecord);

/// Axiom gateway: audit wrapper around scheduler operations.
pub struct SchedGateway {
    syslog: SysLog,
    /// Operations routed through the gateway
    op_count: u64,
}

impl SchedGateway {
    /// Create a new gateway with an empty log.
    pub fn new() -> Self {
        Self {
            syslog: SysLog::new(),
            op_count: 0,
        }
    }

    /// Run a scheduler operation through the audit trail.
    ///
    /// # Arguments
    /// - `op`: Which operation is being performed
    /// - `target`: Its primary operand (thread, task or event id)
    /// - `timestamp`: Current timestamp (nanos since boot)
    /// - `kernel_fn`: Executes the operation and returns its result together
    ///   with the transitions it caused, in order
    pub fn call<R, F>(&mut self, op: OpCode, target: u64, timestamp: u64, kernel_fn: F) -> R
    where
        R: ResultCode,
        F: FnOnce() -> (R, Vec<TransitionRecord>),
    {
        self.op_count += 1;
        let request_id = self.syslog.log_request(op, target, timestamp);

        let (result, transitions) = kernel_fn();

        for (thread, from, to) in transitions {
            self.syslog.log_transition(thread, from, to, timestamp);
        }

        self.syslog
            .log_response(request_id, result.code(), timestamp);

        result
    }

    /// Record a diagnostic outside of any request/response pair.
    pub fn diagnostic(&mut self, level: DiagnosticLevel, message: String, timestamp: u64) {
        self.syslog.log_diagnostic(level, message, timestamp);
    }

    /// Get the SysLog (for inspection/auditing).
    pub fn syslog(&self) -> &SysLog {
        &self.syslog
    }

    /// Get current state for debugging.
    pub fn state_summary(&self) -> GatewayState {
        GatewayState {
            syslog_len: self.syslog.len(),
            syslog_next_id: self.syslog.next_id(),
            op_count: self.op_count,
        }
    }
}

impl Default for SchedGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of gateway state (for debugging/monitoring).
#[derive(Clone, Debug)]
pub struct GatewayState {
    /// Number of events in SysLog
    pub syslog_len: usize,
    /// Next event ID in SysLog
    pub syslog_next_id: u64,
    /// Operations routed through the gateway since creation
    pub op_count: u64,
}
