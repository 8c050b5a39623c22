//! Strand Kernel Core - Pure Scheduling State Machine
//!
//! This crate contains the **pure, HAL-free** single-processor scheduler:
//! the thread state machine, the FIFO ready queue and the dispatcher.
//!
//! # Design Principles
//!
//! 1. **No HAL dependency**: PTBR writes, timer arms, I/O purges and resource
//!    reclamation are returned as `Effect`s, applied by `strand-kernel`
//! 2. **Deterministic**: Same state and operation always produce the same
//!    result and effects
//! 3. **Checkable**: every reachable state satisfies `check_all_invariants`
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    strand-kernel-core                       │
//! │                                                             │
//! │   ┌────────────────┐    ┌───────────────┐                   │
//! │   │ SchedulerState │    │    step()     │                   │
//! │   │ - threads      │───▶│  create/kill  │──▶ Vec<Effect>    │
//! │   │ - tasks        │    │  suspend/...  │                   │
//! │   │ - ready queue  │    │  dispatch     │                   │
//! │   │ - ptbr         │    └───────────────┘                   │
//! │   └────────────────┘                                        │
//! │                                                             │
//! │   ┌───────────────┐                                         │
//! │   │  Invariants   │                                         │
//! │   └───────────────┘                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              │ used by
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      strand-kernel                          │
//! │   - applies effects through the HAL                         │
//! │   - SysLog audit trail, diagnostic hooks                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - `types` - Ids, `ThreadStatus`, thread/task/event records
//! - `ready_queue` - FIFO `ReadyQueue`
//! - `config` - `SchedulerConfig`
//! - `state` - `SchedulerState` with all scheduler data
//! - `step` - Pure `step(state, op, config) -> StepResult` function
//! - `invariants` - Invariant checks

#![no_std]
extern crate alloc;

pub mod config;
pub mod invariants;
pub mod ready_queue;
pub mod state;
pub mod step;
pub mod types;

pub use config::{SchedulerConfig, DEFAULT_MAX_THREADS_PER_TASK, DEFAULT_QUANTUM};
pub use invariants::{assert_invariants, check_all_invariants, InvariantViolation};
pub use ready_queue::ReadyQueue;
pub use state::{SchedulerState, StateSummary};
pub use step::{
    step, Diagnostic, Effect, KernelError, OpResult, SchedOp, Severity, StepResult, Transition,
};
pub use types::{
    DispatchStatus, Event, EventId, PageTableId, ResumeOutcome, Task, TaskId, Thread, ThreadId,
    ThreadStatus,
};
