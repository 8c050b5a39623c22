//! Runtime-checkable scheduler invariants
//!
//! Used as an oracle after every step in tests, by the runtime when
//! `check_invariants` is enabled, and by the Kani proofs.
//!
//! # Invariants
//!
//! 1. **Single Runner**: at most one thread is `Running`
//! 2. **Processor Binding**: the running thread, its task's current-thread
//!    slot and the PTBR agree; an idle processor has no current threads
//! 3. **Ready Membership**: `Ready` iff queued, and queued at most once
//! 4. **Wait Depth**: `Waiting { depth }` iff `depth` registrations across
//!    all wait sets, matching the thread's wait causes
//! 5. **Killed Detached**: killed threads are in no queue, wait set or task
//! 6. **Task Membership**: live threads are in their task; tasks respect
//!    their limit; a task that lost all its threads is terminated
//! 7. **ID Monotonicity**: next IDs are always greater than existing IDs
//!
//! Checks never panic: a stale PTBR shows up as a violation here, whereas
//! `SchedulerState::bound_thread` treats it as fatal.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::state::SchedulerState;
use crate::types::{ThreadId, ThreadStatus};

/// An invariant violation with details
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: &'static str,
    /// Description of what went wrong
    pub description: String,
}

fn violation(invariant: &'static str, description: String) -> InvariantViolation {
    InvariantViolation {
        invariant,
        description,
    }
}

/// Check all scheduler invariants.
///
/// Returns a list of violations (empty if all invariants hold).
pub fn check_all_invariants(state: &SchedulerState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    violations.extend(check_single_runner(state));
    violations.extend(check_processor_binding(state));
    violations.extend(check_ready_membership(state));
    violations.extend(check_wait_depth(state));
    violations.extend(check_killed_detached(state));
    violations.extend(check_task_membership(state));
    violations.extend(check_id_monotonicity(state));

    violations
}

fn check_single_runner(state: &SchedulerState) -> Vec<InvariantViolation> {
    let running: Vec<u64> = state
        .threads
        .values()
        .filter(|t| t.status == ThreadStatus::Running)
        .map(|t| t.id.0)
        .collect();

    let mut violations = Vec::new();
    if running.len() > 1 {
        violations.push(violation(
            "single_runner",
            alloc::format!("Threads {:?} are all Running", running),
        ));
    }
    let tracked = state.running.map(|t| t.0);
    if running.len() <= 1 && running.first().copied() != tracked {
        violations.push(violation(
            "single_runner",
            alloc::format!("Running thread is {:?} but state tracks {:?}", running, tracked),
        ));
    }
    violations
}

fn check_processor_binding(state: &SchedulerState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for task in state.tasks.values() {
        if let Some(current) = task.current_thread {
            let running = state
                .threads
                .get(&current)
                .map(|t| t.status == ThreadStatus::Running && t.task == task.id)
                .unwrap_or(false);
            if !running {
                violations.push(violation(
                    "processor_binding",
                    alloc::format!(
                        "Task {} names thread {} as current but it is not running there",
                        task.id.0,
                        current.0
                    ),
                ));
            }
            if state.ptbr != Some(task.page_table) {
                violations.push(violation(
                    "processor_binding",
                    alloc::format!(
                        "Task {} has a current thread but PTBR is {:?}",
                        task.id.0,
                        state.ptbr
                    ),
                ));
            }
        }
    }

    if let Some(running) = state.running_thread() {
        let bound = state
            .threads
            .get(&running)
            .and_then(|t| state.tasks.get(&t.task))
            .map(|task| task.current_thread == Some(running))
            .unwrap_or(false);
        if !bound {
            violations.push(violation(
                "processor_binding",
                alloc::format!("Thread {} is Running but not its task's current thread", running.0),
            ));
        }
    } else if let Some(table) = state.ptbr {
        violations.push(violation(
            "processor_binding",
            alloc::format!("PTBR holds page table {} with nothing running", table.0),
        ));
    }

    violations
}

fn check_ready_membership(state: &SchedulerState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for id in state.ready.iter() {
        let queued = state.ready.iter().filter(|&&q| q == *id).count();
        if queued > 1 {
            violations.push(violation(
                "ready_membership",
                alloc::format!("Thread {} queued {} times", id.0, queued),
            ));
        }
        if state.status(*id) != Some(ThreadStatus::Ready) {
            violations.push(violation(
                "ready_membership",
                alloc::format!("Thread {} queued while {:?}", id.0, state.status(*id)),
            ));
        }
    }

    for thread in state.threads.values() {
        if thread.status == ThreadStatus::Ready && !state.ready.contains(thread.id) {
            violations.push(violation(
                "ready_membership",
                alloc::format!("Thread {} is Ready but not queued", thread.id.0),
            ));
        }
    }

    violations
}

fn check_wait_depth(state: &SchedulerState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    let mut registrations: BTreeMap<ThreadId, usize> = BTreeMap::new();
    for event in state.events.values() {
        for &waiter in &event.waiters {
            *registrations.entry(waiter).or_insert(0) += 1;
        }
    }

    for thread in state.threads.values() {
        let registrations = registrations.get(&thread.id).copied().unwrap_or(0);
        let depth = thread.status.depth() as usize;

        if thread.status.is_waiting() && depth == 0 {
            violations.push(violation(
                "wait_depth",
                alloc::format!("Thread {} is waiting with depth 0", thread.id.0),
            ));
        }
        if registrations != depth || thread.wait_causes.len() != depth {
            violations.push(violation(
                "wait_depth",
                alloc::format!(
                    "Thread {} has depth {} but {} registrations and {} causes",
                    thread.id.0,
                    depth,
                    registrations,
                    thread.wait_causes.len()
                ),
            ));
        }
    }

    violations
}

fn check_killed_detached(state: &SchedulerState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for thread in state.threads.values() {
        if thread.status != ThreadStatus::Killed {
            continue;
        }
        let in_task = state
            .tasks
            .get(&thread.task)
            .map(|t| t.threads.contains(&thread.id))
            .unwrap_or(false);
        if in_task || state.ready.contains(thread.id) {
            violations.push(violation(
                "killed_detached",
                alloc::format!("Killed thread {} is still attached", thread.id.0),
            ));
        }
    }

    violations
}

fn check_task_membership(state: &SchedulerState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    for thread in state.live_threads() {
        let member = state
            .tasks
            .get(&thread.task)
            .map(|t| t.threads.contains(&thread.id))
            .unwrap_or(false);
        if !member {
            violations.push(violation(
                "task_membership",
                alloc::format!("Thread {} missing from task {}", thread.id.0, thread.task.0),
            ));
        }
    }

    for task in state.tasks.values() {
        if task.threads.len() > task.max_threads {
            violations.push(violation(
                "task_membership",
                alloc::format!(
                    "Task {} holds {} threads, limit {}",
                    task.id.0,
                    task.threads.len(),
                    task.max_threads
                ),
            ));
        }
        if task.alive && task.spawned > 0 && task.threads.is_empty() {
            violations.push(violation(
                "task_membership",
                alloc::format!("Task {} lost all threads but is alive", task.id.0),
            ));
        }
        if !task.alive && !task.threads.is_empty() {
            violations.push(violation(
                "task_membership",
                alloc::format!("Terminated task {} still has threads", task.id.0),
            ));
        }
    }

    violations
}

fn check_id_monotonicity(state: &SchedulerState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    if let Some(id) = state.threads.keys().next_back() {
        if id.0 >= state.next_thread_id {
            violations.push(violation(
                "id_monotonicity",
                alloc::format!(
                    "Thread {} exists but next_thread_id is {}",
                    id.0,
                    state.next_thread_id
                ),
            ));
        }
    }
    if let Some(id) = state.tasks.keys().next_back() {
        if id.0 >= state.next_task_id {
            violations.push(violation(
                "id_monotonicity",
                alloc::format!("Task {} exists but next_task_id is {}", id.0, state.next_task_id),
            ));
        }
    }
    if let Some(id) = state.events.keys().next_back() {
        if id.0 >= state.next_event_id {
            violations.push(violation(
                "id_monotonicity",
                alloc::format!(
                    "Event {} exists but next_event_id is {}",
                    id.0,
                    state.next_event_id
                ),
            ));
        }
    }

    violations
}

/// Assert all invariants hold (panic if not)
pub fn assert_invariants(state: &SchedulerState) {
    let violations = check_all_invariants(state);
    if let Some(v) = violations.first() {
        panic!("Invariant violated: {} ({})", v.invariant, v.description);
    }
}

// ============================================================================
// Kani proofs for invariants
// ============================================================================

#[cfg(kani)]
mod proofs {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::step::{step, SchedOp};

    /// Proof: any short create/dispatch/kill sequence keeps the invariants
    #[kani::proof]
    #[kani::unwind(6)]
    fn lifecycle_maintains_invariants() {
        let config = SchedulerConfig::default();
        let mut state = SchedulerState::new();
        let task = state.register_task(0, 2);

        for _ in 0..3 {
            let choice: u8 = kani::any();
            let op = match choice % 3 {
                0 => SchedOp::Create { task: Some(task) },
                1 => SchedOp::Dispatch,
                _ => match state.running_thread() {
                    Some(thread) => SchedOp::Kill { thread },
                    None => SchedOp::TimerInterrupt,
                },
            };
            step(&mut state, op, &config);
        }

        kani::assert(
            check_all_invariants(&state).is_empty(),
            "Lifecycle operations should maintain invariants",
        );
    }

    /// Proof: suspend followed by resume keeps the invariants
    #[kani::proof]
    #[kani::unwind(4)]
    fn suspend_resume_maintains_invariants() {
        let config = SchedulerConfig::default();
        let mut state = SchedulerState::new();
        let task = state.register_task(0, 2);
        let event = state.register_event();

        step(&mut state, SchedOp::Create { task: Some(task) }, &config);
        if let Some(thread) = state.running_thread() {
            step(&mut state, SchedOp::Suspend { thread, event }, &config);
            step(&mut state, SchedOp::Resume { thread }, &config);
        }

        kani::assert(
            check_all_invariants(&state).is_empty(),
            "Suspend/resume should maintain invariants",
        );
    }
}
