//! Strand Kernel - scheduler runtime
//!
//! This crate wraps the pure scheduling state machine from
//! `strand-kernel-core` with everything that touches the outside world:
//! - Applying `Effect`s through the HAL (PTBR, timer, devices, resources)
//! - The SysLog audit trail via `SchedGateway`
//! - Diagnostic hooks (`at_error` / `at_warning`)
//! - The `ThreadLifecycle` and `TimerInterruptHandler` entry points
//!
//! All operations flow:
//! `caller → Kernel → Gateway (log) → step() → HAL → Gateway (log) → caller`

#![no_std]
extern crate alloc;

mod diagnostics;
mod lifecycle;
mod timer;

use alloc::format;
use alloc::vec::Vec;

use strand_axiom::{
    DiagnosticLevel, OpCode, ResultCode, SchedGateway, StateRecord, TransitionRecord,
};
use strand_hal::HAL;
use strand_kernel_core::{
    assert_invariants, step, Diagnostic, Effect, OpResult, SchedOp, Severity,
};

pub use lifecycle::ThreadLifecycle;
pub use timer::TimerInterruptHandler;

// Re-export HAL types
pub use strand_hal::{HalError, HAL as HalTrait};

// Re-export Axiom types
pub use strand_axiom::{SysEvent, SysEventType, SysLog};

// Re-export core types
pub use strand_kernel_core::{
    DispatchStatus, EventId, KernelError, PageTableId, ResumeOutcome, SchedulerConfig,
    SchedulerState, Task, TaskId, Thread, ThreadId, ThreadStatus,
};

/// The scheduler runtime.
///
/// Owns the scheduler state, the HAL it drives and the audit log. There is
/// no ambient global state: every entry point goes through a `Kernel`
/// value created by [`Kernel::init`].
pub struct Kernel<H: HAL> {
    hal: H,
    state: SchedulerState,
    config: SchedulerConfig,
    axiom: SchedGateway,
    /// Boot time (for log timestamps)
    boot_time: u64,
}

/// Step outcome as seen by the gateway
struct Executed {
    result: OpResult,
    diagnostics: Vec<Diagnostic>,
}

impl ResultCode for Executed {
    fn code(&self) -> i64 {
        match &self.result {
            OpResult::TaskCreated(id) => id.0 as i64,
            OpResult::EventCreated(id) => id.0 as i64,
            OpResult::ThreadCreated(Some(id)) => id.0 as i64,
            OpResult::ThreadCreated(None) => -1,
            OpResult::Done => 0,
            OpResult::Resumed(ResumeOutcome::Ready) => 0,
            OpResult::Resumed(ResumeOutcome::StillWaiting { depth }) => *depth as i64,
            OpResult::Resumed(ResumeOutcome::NotWaiting) => -1,
            OpResult::Signalled(count) => *count as i64,
            OpResult::Dispatched(DispatchStatus::Success) => 0,
            OpResult::Dispatched(DispatchStatus::Failure) => -1,
            OpResult::Err(KernelError::ThreadNotFound) => -2,
            OpResult::Err(KernelError::EventNotFound) => -3,
            OpResult::Err(KernelError::InvalidTransition) => -4,
        }
    }
}

fn record(status: ThreadStatus) -> StateRecord {
    match status {
        ThreadStatus::Ready => StateRecord::Ready,
        ThreadStatus::Running => StateRecord::Running,
        ThreadStatus::Waiting { depth } => StateRecord::Waiting { depth },
        ThreadStatus::Killed => StateRecord::Killed,
    }
}

/// Carry out one collaborator call.
fn apply_effect<H: HAL>(hal: &H, effect: Effect) {
    match effect {
        Effect::SetPageTable(table) => hal.set_page_table(table.map(|t| t.0)),
        Effect::ArmTimer(quantum) => hal.set_timer(quantum),
        Effect::CancelPendingIo(thread) => {
            for device in 0..hal.device_count() {
                match hal.cancel_pending_io(device, thread.0) {
                    Ok(0) => {}
                    Ok(purged) => hal.debug_write(&format!(
                        "[sched] Purged {} request(s) of thread {} from device {}",
                        purged, thread.0, device
                    )),
                    Err(e) => hal.debug_write(&format!(
                        "[sched] Device {} could not purge thread {}: {:?}",
                        device, thread.0, e
                    )),
                }
            }
        }
        Effect::GiveupResources(thread) => hal.giveup_resources(thread.0),
        Effect::TerminateTask(task) => {
            hal.debug_write(&format!(
                "[sched] Task {} has no threads left, terminating",
                task.0
            ));
            hal.task_terminated(task.0);
        }
    }
}

impl<H: HAL> Kernel<H> {
    /// Bring up the scheduler with an idle processor.
    pub fn init(hal: H, config: SchedulerConfig) -> Self {
        let boot_time = hal.now_nanos();
        hal.set_page_table(None);
        hal.debug_write(&format!(
            "[sched] Init: quantum {}, {} thread(s) per task",
            config.quantum, config.max_threads_per_task
        ));
        Self {
            hal,
            state: SchedulerState::new(),
            config,
            axiom: SchedGateway::new(),
            boot_time,
        }
    }

    /// Bring up the scheduler with the default configuration.
    pub fn new(hal: H) -> Self {
        Self::init(hal, SchedulerConfig::default())
    }

    /// Kill every live thread, oldest first, and leave the processor idle.
    ///
    /// Returns the number of threads killed. Tasks lose their last thread
    /// along the way and are terminated as usual.
    pub fn shutdown(&mut self) -> usize {
        let live: Vec<ThreadId> = self.state.live_threads().map(|t| t.id).collect();
        self.hal
            .debug_write(&format!("[sched] Shutdown: killing {} thread(s)", live.len()));
        for &thread in &live {
            if let Err(e) = ThreadLifecycle::kill(self, thread) {
                self.hal.debug_write(&format!(
                    "[sched] Shutdown could not kill thread {}: {:?}",
                    thread.0, e
                ));
            }
        }
        live.len()
    }

    // ========================================================================
    // Main entry point - every operation flows through here
    // ========================================================================

    fn execute(&mut self, op_code: OpCode, target: u64, op: SchedOp) -> OpResult {
        let timestamp = self.uptime_nanos();

        let state = &mut self.state;
        let config = &self.config;
        let hal = &self.hal;
        let executed = self.axiom.call(op_code, target, timestamp, || {
            let outcome = step(state, op, config);
            for effect in &outcome.effects {
                apply_effect(hal, *effect);
            }
            let transitions: Vec<TransitionRecord> = outcome
                .transitions
                .iter()
                .map(|t| (t.thread.0, t.from.map(record), record(t.to)))
                .collect();
            (
                Executed {
                    result: outcome.result,
                    diagnostics: outcome.diagnostics,
                },
                transitions,
            )
        });

        for diagnostic in executed.diagnostics {
            self.report(diagnostic, timestamp);
        }

        if self.config.check_invariants {
            assert_invariants(&self.state);
            let expected = self.state.ptbr.map(|t| t.0);
            if self.hal.page_table() != expected {
                panic!(
                    "PTBR out of sync: HAL holds {:?}, scheduler expects {:?}",
                    self.hal.page_table(),
                    expected
                );
            }
        }

        executed.result
    }

    fn report(&mut self, diagnostic: Diagnostic, timestamp: u64) {
        let level = match diagnostic.severity {
            Severity::Warning => DiagnosticLevel::Warning,
            Severity::Error => DiagnosticLevel::Error,
        };
        self.hal
            .debug_write(&format!("[sched] {:?}: {}", level, diagnostic.message));
        self.axiom.diagnostic(level, diagnostic.message, timestamp);
        match level {
            DiagnosticLevel::Warning => self.at_warning(),
            DiagnosticLevel::Error => self.at_error(),
        }
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Register a task; `max_threads: None` applies the configured default.
    pub fn create_task(&mut self, priority: i32, max_threads: Option<usize>) -> TaskId {
        match self.execute(
            OpCode::CreateTask,
            0,
            SchedOp::CreateTask {
                priority,
                max_threads,
            },
        ) {
            OpResult::TaskCreated(id) => id,
            other => panic!("create_task produced {:?}", other),
        }
    }

    /// Register an event wait set.
    pub fn create_event(&mut self) -> EventId {
        match self.execute(OpCode::CreateEvent, 0, SchedOp::CreateEvent) {
            OpResult::EventCreated(id) => id,
            other => panic!("create_event produced {:?}", other),
        }
    }

    /// Resume every thread registered on `event`, once per registration.
    ///
    /// Returns how many resumes were delivered.
    pub fn signal_event(&mut self, event: EventId) -> Result<usize, KernelError> {
        match self.execute(OpCode::SignalEvent, event.0, SchedOp::SignalEvent { event }) {
            OpResult::Signalled(count) => Ok(count),
            OpResult::Err(e) => Err(e),
            other => panic!("signal_event produced {:?}", other),
        }
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// Get the audit log.
    pub fn syslog(&self) -> &SysLog {
        self.axiom.syslog()
    }

    pub fn status(&self, thread: ThreadId) -> Option<ThreadStatus> {
        self.state.status(thread)
    }

    pub fn thread(&self, thread: ThreadId) -> Option<&Thread> {
        self.state.get_thread(thread)
    }

    pub fn task(&self, task: TaskId) -> Option<&Task> {
        self.state.get_task(task)
    }

    /// Thread currently bound to the processor
    pub fn running_thread(&self) -> Option<ThreadId> {
        self.state.bound_thread()
    }

    /// Ready queue contents, head first
    pub fn ready_threads(&self) -> Vec<ThreadId> {
        self.state.ready.to_vec()
    }

    /// Registrations on `event`, in registration order
    pub fn waiters(&self, event: EventId) -> Vec<ThreadId> {
        self.state
            .get_event(event)
            .map(|e| e.waiters.clone())
            .unwrap_or_default()
    }

    /// Get uptime in nanoseconds.
    pub fn uptime_nanos(&self) -> u64 {
        self.hal.now_nanos().saturating_sub(self.boot_time)
    }
}
