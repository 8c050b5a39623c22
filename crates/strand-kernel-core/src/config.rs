//! Scheduler configuration

use serde::{Deserialize, Serialize};

/// Timer value armed on every successful dispatch
pub const DEFAULT_QUANTUM: u64 = 50;

/// Per-task thread limit used when a task is created without one
pub const DEFAULT_MAX_THREADS_PER_TASK: usize = 16;

/// Tunables for the scheduler and its runtime wrapper
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Preemption quantum handed to the timer
    pub quantum: u64,
    /// Default per-task thread limit (`usize::MAX` = unlimited)
    pub max_threads_per_task: usize,
    /// Write a state dump to the debug channel from `at_error`/`at_warning`
    pub dump_on_diagnostic: bool,
    /// Check every invariant after each operation and panic on violation
    pub check_invariants: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            max_threads_per_task: DEFAULT_MAX_THREADS_PER_TASK,
            dump_on_diagnostic: false,
            check_invariants: cfg!(debug_assertions),
        }
    }
}
