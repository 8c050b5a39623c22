//! Thread lifecycle entry points
//!
//! Hosts drive the scheduler through [`ThreadLifecycle`] rather than the
//! concrete [`Kernel`] type. Every operation ends in a dispatch, so after any
//! call the processor is either running a thread or has nothing to run.

use strand_axiom::OpCode;
use strand_hal::HAL;
use strand_kernel_core::{
    DispatchStatus, EventId, KernelError, OpResult, ResumeOutcome, SchedOp, TaskId, ThreadId,
};

use crate::Kernel;

/// Create/kill/suspend/resume and dispatch.
pub trait ThreadLifecycle {
    /// Create a thread in `task` and queue it.
    ///
    /// Returns `None` when the task is absent, terminated or at its thread
    /// limit. The processor is dispatched either way.
    fn create(&mut self, task: Option<TaskId>) -> Option<ThreadId>;

    /// Kill a thread: detach it from every queue, wait set and its task,
    /// purge its I/O, reclaim its resources, and terminate the task if this
    /// was its last thread.
    fn kill(&mut self, thread: ThreadId) -> Result<(), KernelError>;

    /// Suspend a running or already waiting thread on `event`.
    ///
    /// Fails with `InvalidTransition` for ready or killed threads.
    fn suspend(&mut self, thread: ThreadId, event: EventId) -> Result<(), KernelError>;

    /// Resolve one outstanding wait cause.
    fn resume(&mut self, thread: ThreadId) -> Result<ResumeOutcome, KernelError>;

    /// Rotate the running thread out and run the head of the ready queue.
    fn dispatch(&mut self) -> DispatchStatus;
}

impl<H: HAL> ThreadLifecycle for Kernel<H> {
    fn create(&mut self, task: Option<TaskId>) -> Option<ThreadId> {
        let target = task.map(|t| t.0).unwrap_or(0);
        match self.execute(OpCode::CreateThread, target, SchedOp::Create { task }) {
            OpResult::ThreadCreated(thread) => thread,
            other => panic!("create produced {:?}", other),
        }
    }

    fn kill(&mut self, thread: ThreadId) -> Result<(), KernelError> {
        match self.execute(OpCode::Kill, thread.0, SchedOp::Kill { thread }) {
            OpResult::Done => Ok(()),
            OpResult::Err(e) => Err(e),
            other => panic!("kill produced {:?}", other),
        }
    }

    fn suspend(&mut self, thread: ThreadId, event: EventId) -> Result<(), KernelError> {
        match self.execute(OpCode::Suspend, thread.0, SchedOp::Suspend { thread, event }) {
            OpResult::Done => Ok(()),
            OpResult::Err(e) => Err(e),
            other => panic!("suspend produced {:?}", other),
        }
    }

    fn resume(&mut self, thread: ThreadId) -> Result<ResumeOutcome, KernelError> {
        match self.execute(OpCode::Resume, thread.0, SchedOp::Resume { thread }) {
            OpResult::Resumed(outcome) => Ok(outcome),
            OpResult::Err(e) => Err(e),
            other => panic!("resume produced {:?}", other),
        }
    }

    fn dispatch(&mut self) -> DispatchStatus {
        match self.execute(OpCode::Dispatch, 0, SchedOp::Dispatch) {
            OpResult::Dispatched(status) => status,
            other => panic!("dispatch produced {:?}", other),
        }
    }
}
