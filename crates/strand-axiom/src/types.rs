//! Shared audit types

use serde::{Deserialize, Serialize};

/// Monotonic id of a SysLog entry
pub type LogId = u64;

/// Scheduling operation being audited
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCode {
    CreateTask,
    CreateEvent,
    CreateThread,
    Kill,
    Suspend,
    Resume,
    SignalEvent,
    Dispatch,
    TimerInterrupt,
}

/// Thread state as recorded in the audit trail
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateRecord {
    Ready,
    Running,
    Waiting { depth: u32 },
    Killed,
}

/// Severity of a diagnostic entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    Warning,
    Error,
}

/// Numeric summary of an operation outcome, stored in response entries.
///
/// Non-negative values are successes (ids, counts); negative values are
/// failures or idle results.
pub trait ResultCode {
    fn code(&self) -> i64;
}

impl ResultCode for () {
    fn code(&self) -> i64 {
        0
    }
}

impl ResultCode for usize {
    fn code(&self) -> i64 {
        *self as i64
    }
}
