//! Strand Axiom - audit trail for scheduling operations
//!
//! Every lifecycle operation and dispatch flows through the [`SchedGateway`],
//! which records the request, the thread state transitions it caused, and the
//! response into an append-only [`SysLog`].

#![no_std]
extern crate alloc;

pub mod gateway;
pub mod syslog;
pub mod types;

pub use gateway::{GatewayState, SchedGateway, TransitionRecord};
pub use syslog::{SysEvent, SysEventType, SysLog, MAX_SYSLOG_EVENTS};
pub use types::{DiagnosticLevel, LogId, OpCode, ResultCode, StateRecord};
