//! Core scheduler types
//!
//! Pure data: identifiers, thread status, and the thread, task and event
//! records the scheduler state is built from.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// Thread identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub u64);

/// Task identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Event (wait set) identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Page table identifier, the value loaded into the PTBR
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageTableId(pub u64);

/// Thread status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadStatus {
    /// Eligible to run, sitting in the ready queue
    Ready,
    /// Bound to the processor
    Running,
    /// Blocked on `depth` unmatched suspend calls (always >= 1)
    Waiting { depth: u32 },
    /// Terminal
    Killed,
}

impl ThreadStatus {
    /// Wait depth, 0 unless waiting
    pub fn depth(&self) -> u32 {
        match self {
            ThreadStatus::Waiting { depth } => *depth,
            _ => 0,
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, ThreadStatus::Waiting { .. })
    }
}

/// Thread control block
#[derive(Clone, Debug)]
pub struct Thread {
    /// Thread ID
    pub id: ThreadId,
    /// Owning task
    pub task: TaskId,
    /// Copied from the task at creation; not used for ordering
    pub priority: i32,
    /// Current status
    pub status: ThreadStatus,
    /// One entry per unmatched suspend call, oldest first
    pub wait_causes: Vec<EventId>,
}

impl Thread {
    pub fn new(id: ThreadId, task: TaskId, priority: i32) -> Self {
        Self {
            id,
            task,
            priority,
            status: ThreadStatus::Ready,
            wait_causes: Vec::new(),
        }
    }
}

/// Task record, as far as the scheduler needs to see it
#[derive(Clone, Debug)]
pub struct Task {
    /// Task ID
    pub id: TaskId,
    /// Priority handed down to new threads
    pub priority: i32,
    /// Page table loaded while one of this task's threads runs
    pub page_table: PageTableId,
    /// Per-task thread limit
    pub max_threads: usize,
    /// Live threads, in creation order
    pub threads: Vec<ThreadId>,
    /// Thread bound to the processor on this task's behalf
    pub current_thread: Option<ThreadId>,
    /// Threads ever added to this task
    pub spawned: u64,
    /// False once the task lost its last thread
    pub alive: bool,
}

impl Task {
    pub fn new(id: TaskId, priority: i32, page_table: PageTableId, max_threads: usize) -> Self {
        Self {
            id,
            priority,
            page_table,
            max_threads,
            threads: Vec::new(),
            current_thread: None,
            spawned: 0,
            alive: true,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Register a thread with this task.
    ///
    /// This is the authoritative capacity check: returns false (and changes
    /// nothing) when the task is dead or already full.
    pub fn add_thread(&mut self, thread: ThreadId) -> bool {
        if !self.alive || self.threads.len() >= self.max_threads {
            return false;
        }
        self.threads.push(thread);
        self.spawned += 1;
        true
    }

    /// Detach a thread; returns false if it was not registered.
    pub fn remove_thread(&mut self, thread: ThreadId) -> bool {
        match self.threads.iter().position(|&t| t == thread) {
            Some(idx) => {
                self.threads.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// Event wait set
#[derive(Clone, Debug)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// One entry per registration, in registration order. A thread may
    /// appear more than once if it was suspended on this event repeatedly.
    pub waiters: Vec<ThreadId>,
}

impl Event {
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            waiters: Vec::new(),
        }
    }

    pub fn add_thread(&mut self, thread: ThreadId) {
        self.waiters.push(thread);
    }

    /// Drop one registration of `thread`; returns false if none existed.
    pub fn remove_one(&mut self, thread: ThreadId) -> bool {
        match self.waiters.iter().position(|&t| t == thread) {
            Some(idx) => {
                self.waiters.remove(idx);
                true
            }
            None => false,
        }
    }
}

/// Outcome of a dispatch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    /// A thread is now running
    Success,
    /// Ready queue was empty; processor is idle
    Failure,
}

/// Outcome of a resume
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResumeOutcome {
    /// Last cause resolved; thread is back on the ready queue
    Ready,
    /// Other causes are still outstanding
    StillWaiting { depth: u32 },
    /// Thread was not waiting; nothing changed
    NotWaiting,
}
