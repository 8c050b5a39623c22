//! Pure step function - the heart of the scheduler
//!
//! `step(state, op, config) -> StepResult` performs one lifecycle operation
//! or dispatch against the scheduler state. Nothing here touches hardware:
//! every collaborator call the operation needs is returned as an [`Effect`]
//! for the runtime to apply, in order.
//!
//! # Design
//!
//! Every lifecycle operation (create, kill, suspend, resume) ends with a
//! dispatch, so that after each step the processor is either bound to
//! exactly one `Running` thread or idle with an empty ready queue.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::config::SchedulerConfig;
use crate::state::SchedulerState;
use crate::types::{
    DispatchStatus, EventId, PageTableId, ResumeOutcome, TaskId, Thread, ThreadId, ThreadStatus,
};

// ============================================================================
// Operations
// ============================================================================

/// Scheduler operations
#[derive(Clone, Debug)]
pub enum SchedOp {
    /// Register a task (`max_threads: None` uses the configured default)
    CreateTask {
        priority: i32,
        max_threads: Option<usize>,
    },

    /// Register an event wait set
    CreateEvent,

    /// Create a thread in `task` (an absent task is allowed and fails)
    Create { task: Option<TaskId> },

    /// Kill a thread
    Kill { thread: ThreadId },

    /// Suspend a thread on an event
    Suspend { thread: ThreadId, event: EventId },

    /// Resolve one wait cause of a thread
    Resume { thread: ThreadId },

    /// Resume every thread registered on an event
    SignalEvent { event: EventId },

    /// Select the next thread to run
    Dispatch,

    /// Preemption timer fired
    TimerInterrupt,
}

/// Operation results
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpResult {
    TaskCreated(TaskId),
    EventCreated(EventId),
    /// `None` when the task was absent, dead or full
    ThreadCreated(Option<ThreadId>),
    /// Kill or suspend completed
    Done,
    Resumed(ResumeOutcome),
    /// Number of resumes delivered
    Signalled(usize),
    Dispatched(DispatchStatus),
    Err(KernelError),
}

/// Contract errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// No thread with that id
    ThreadNotFound,
    /// No event with that id
    EventNotFound,
    /// The thread's status does not allow the operation
    InvalidTransition,
}

// ============================================================================
// Step output
// ============================================================================

/// Collaborator calls requested by a step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Load the PTBR (`None` idles the processor)
    SetPageTable(Option<PageTableId>),
    /// Arm the preemption timer
    ArmTimer(u64),
    /// Purge the thread's requests from every device queue
    CancelPendingIo(ThreadId),
    /// Release every resource the thread holds
    GiveupResources(ThreadId),
    /// The task lost its last thread
    TerminateTask(TaskId),
}

/// A thread status change (`from` is `None` for a new thread)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub thread: ThreadId,
    pub from: Option<ThreadStatus>,
    pub to: ThreadStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Message for the diagnostic channel
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Result of a step
#[derive(Clone, Debug)]
pub struct StepResult {
    pub result: OpResult,
    /// Collaborator calls, in the order they must be applied
    pub effects: Vec<Effect>,
    pub transitions: Vec<Transition>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Default)]
struct Trace {
    effects: Vec<Effect>,
    transitions: Vec<Transition>,
    diagnostics: Vec<Diagnostic>,
}

impl Trace {
    fn warn(&mut self, message: String) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
        });
    }

    fn error(&mut self, message: String) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
        });
    }
}

// ============================================================================
// Step
// ============================================================================

/// Apply one operation to the scheduler state.
pub fn step(state: &mut SchedulerState, op: SchedOp, config: &SchedulerConfig) -> StepResult {
    let mut trace = Trace::default();

    let result = match op {
        SchedOp::CreateTask {
            priority,
            max_threads,
        } => {
            let cap = max_threads.unwrap_or(config.max_threads_per_task);
            OpResult::TaskCreated(state.register_task(priority, cap))
        }
        SchedOp::CreateEvent => OpResult::EventCreated(state.register_event()),
        SchedOp::Create { task } => {
            OpResult::ThreadCreated(step_create(state, config, &mut trace, task))
        }
        SchedOp::Kill { thread } => step_kill(state, config, &mut trace, thread),
        SchedOp::Suspend { thread, event } => {
            step_suspend(state, config, &mut trace, thread, event)
        }
        SchedOp::Resume { thread } => {
            if state.get_thread(thread).is_none() {
                OpResult::Err(KernelError::ThreadNotFound)
            } else {
                OpResult::Resumed(resume_from(state, config, &mut trace, thread, None))
            }
        }
        SchedOp::SignalEvent { event } => step_signal(state, config, &mut trace, event),
        SchedOp::Dispatch | SchedOp::TimerInterrupt => {
            OpResult::Dispatched(dispatch(state, config, &mut trace))
        }
    };

    match result {
        OpResult::Err(KernelError::ThreadNotFound) => {
            trace.error(String::from("Operation names an unknown thread"))
        }
        OpResult::Err(KernelError::EventNotFound) => {
            trace.error(String::from("Operation names an unknown event"))
        }
        _ => {}
    }

    StepResult {
        result,
        effects: trace.effects,
        transitions: trace.transitions,
        diagnostics: trace.diagnostics,
    }
}

fn set_status(state: &mut SchedulerState, trace: &mut Trace, id: ThreadId, to: ThreadStatus) {
    if let Some(thread) = state.threads.get_mut(&id) {
        let from = thread.status;
        thread.status = to;
        if to == ThreadStatus::Running {
            state.running = Some(id);
        } else if state.running == Some(id) {
            state.running = None;
        }
        trace.transitions.push(Transition {
            thread: id,
            from: Some(from),
            to,
        });
    }
}

/// Clear the PTBR and the task's current-thread slot.
fn unbind(state: &mut SchedulerState, trace: &mut Trace, task: TaskId) {
    if let Some(task) = state.tasks.get_mut(&task) {
        task.current_thread = None;
    }
    state.ptbr = None;
    trace.effects.push(Effect::SetPageTable(None));
}

/// Drop every wait-set registration held by `id`.
fn detach_from_events(state: &mut SchedulerState, id: ThreadId) {
    let causes = match state.threads.get_mut(&id) {
        Some(thread) => core::mem::take(&mut thread.wait_causes),
        None => return,
    };
    for cause in causes {
        if let Some(event) = state.events.get_mut(&cause) {
            event.remove_one(id);
        }
    }
}

/// Rotate the bound thread to the queue tail and bind the queue head.
///
/// The bound thread is always requeued, even when it is the only ready
/// thread, so it goes through a fresh binding rather than running on.
fn dispatch(
    state: &mut SchedulerState,
    config: &SchedulerConfig,
    trace: &mut Trace,
) -> DispatchStatus {
    if let Some(current) = state.bound_thread() {
        let task = state.threads[&current].task;
        unbind(state, trace, task);
        set_status(state, trace, current, ThreadStatus::Ready);
        state.ready.append(current);
    }

    let next = match state.ready.remove_head() {
        Some(next) => next,
        None => {
            state.ptbr = None;
            trace.effects.push(Effect::SetPageTable(None));
            return DispatchStatus::Failure;
        }
    };

    let task_id = match state.threads.get(&next) {
        Some(thread) => thread.task,
        None => panic!("ready queue holds unknown thread {}", next.0),
    };
    let task = match state.tasks.get_mut(&task_id) {
        Some(task) => task,
        None => panic!("thread {} belongs to missing task {}", next.0, task_id.0),
    };
    task.current_thread = Some(next);
    let table = task.page_table;

    state.ptbr = Some(table);
    trace.effects.push(Effect::SetPageTable(Some(table)));
    set_status(state, trace, next, ThreadStatus::Running);
    trace.effects.push(Effect::ArmTimer(config.quantum));
    state.dispatch_count += 1;

    DispatchStatus::Success
}

fn step_create(
    state: &mut SchedulerState,
    config: &SchedulerConfig,
    trace: &mut Trace,
    task: Option<TaskId>,
) -> Option<ThreadId> {
    let task_id = match task {
        Some(id) if state.task_alive(id) => id,
        _ => {
            dispatch(state, config, trace);
            return None;
        }
    };

    let (priority, full) = match state.get_task(task_id) {
        Some(task) => (task.priority, task.thread_count() >= task.max_threads),
        None => (0, true),
    };
    if full {
        dispatch(state, config, trace);
        return None;
    }

    let id = state.alloc_thread_id();
    let accepted = state
        .get_task_mut(task_id)
        .map(|task| task.add_thread(id))
        .unwrap_or(false);
    if !accepted {
        dispatch(state, config, trace);
        return None;
    }

    state.threads.insert(id, Thread::new(id, task_id, priority));
    trace.transitions.push(Transition {
        thread: id,
        from: None,
        to: ThreadStatus::Ready,
    });
    state.ready.append(id);

    dispatch(state, config, trace);
    Some(id)
}

fn step_kill(
    state: &mut SchedulerState,
    config: &SchedulerConfig,
    trace: &mut Trace,
    id: ThreadId,
) -> OpResult {
    let (status, task_id) = match state.get_thread(id) {
        Some(thread) => (thread.status, thread.task),
        None => return OpResult::Err(KernelError::ThreadNotFound),
    };

    match status {
        ThreadStatus::Killed => {
            trace.warn(format!("Attempt to kill thread {}, which is already dead", id.0));
            return OpResult::Done;
        }
        ThreadStatus::Ready => {
            state.ready.remove(id);
        }
        ThreadStatus::Running => {
            if state.bound_thread() == Some(id) {
                unbind(state, trace, task_id);
            }
        }
        ThreadStatus::Waiting { .. } => {}
    }
    detach_from_events(state, id);

    if let Some(task) = state.get_task_mut(task_id) {
        task.remove_thread(id);
    }
    set_status(state, trace, id, ThreadStatus::Killed);

    trace.effects.push(Effect::CancelPendingIo(id));
    trace.effects.push(Effect::GiveupResources(id));

    dispatch(state, config, trace);

    let emptied = state
        .get_task(task_id)
        .map(|task| task.alive && task.threads.is_empty())
        .unwrap_or(false);
    if emptied {
        state.terminate_task(task_id);
        trace.effects.push(Effect::TerminateTask(task_id));
    }

    OpResult::Done
}

fn step_suspend(
    state: &mut SchedulerState,
    config: &SchedulerConfig,
    trace: &mut Trace,
    id: ThreadId,
    event: EventId,
) -> OpResult {
    let (status, task_id) = match state.get_thread(id) {
        Some(thread) => (thread.status, thread.task),
        None => return OpResult::Err(KernelError::ThreadNotFound),
    };
    if !state.events.contains_key(&event) {
        return OpResult::Err(KernelError::EventNotFound);
    }

    let next = match status {
        ThreadStatus::Running => {
            if state.bound_thread() != Some(id) {
                panic!("thread {} is Running but not bound to the processor", id.0);
            }
            unbind(state, trace, task_id);
            ThreadStatus::Waiting { depth: 1 }
        }
        ThreadStatus::Waiting { depth } => ThreadStatus::Waiting { depth: depth + 1 },
        ThreadStatus::Ready | ThreadStatus::Killed => {
            trace.error(format!("Attempt to suspend thread {} while {:?}", id.0, status));
            return OpResult::Err(KernelError::InvalidTransition);
        }
    };

    set_status(state, trace, id, next);
    if let Some(thread) = state.threads.get_mut(&id) {
        thread.wait_causes.push(event);
    }
    if let Some(ev) = state.events.get_mut(&event) {
        ev.add_thread(id);
    }

    dispatch(state, config, trace);
    OpResult::Done
}

/// Resolve one wait cause of `id`.
///
/// With `cause: Some(event)` the event has already dropped the registration
/// and only the thread side is updated. With `None` the most recent cause is
/// resolved and its registration removed from the event.
fn resume_from(
    state: &mut SchedulerState,
    config: &SchedulerConfig,
    trace: &mut Trace,
    id: ThreadId,
    cause: Option<EventId>,
) -> ResumeOutcome {
    let depth = match state.status(id) {
        Some(ThreadStatus::Waiting { depth }) => depth,
        _ => {
            trace.warn(format!("Attempt to resume thread {}, which wasn't waiting", id.0));
            return ResumeOutcome::NotWaiting;
        }
    };

    if let Some(thread) = state.threads.get_mut(&id) {
        match cause {
            Some(event) => {
                if let Some(pos) = thread.wait_causes.iter().position(|&e| e == event) {
                    thread.wait_causes.remove(pos);
                }
            }
            None => {
                if let Some(event) = thread.wait_causes.pop() {
                    if let Some(ev) = state.events.get_mut(&event) {
                        ev.remove_one(id);
                    }
                }
            }
        }
    }

    let outcome = if depth == 1 {
        set_status(state, trace, id, ThreadStatus::Ready);
        state.ready.append(id);
        ResumeOutcome::Ready
    } else {
        let depth = depth - 1;
        set_status(state, trace, id, ThreadStatus::Waiting { depth });
        ResumeOutcome::StillWaiting { depth }
    };

    dispatch(state, config, trace);
    outcome
}

fn step_signal(
    state: &mut SchedulerState,
    config: &SchedulerConfig,
    trace: &mut Trace,
    event: EventId,
) -> OpResult {
    let waiters = match state.events.get_mut(&event) {
        Some(ev) => core::mem::take(&mut ev.waiters),
        None => return OpResult::Err(KernelError::EventNotFound),
    };

    let mut delivered = 0;
    for id in waiters {
        if state.status(id).map(|s| s.is_waiting()).unwrap_or(false) {
            resume_from(state, config, trace, id, Some(event));
            delivered += 1;
        }
    }

    OpResult::Signalled(delivered)
}
