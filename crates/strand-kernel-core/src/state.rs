//! Scheduler state - pure data structure holding all scheduler state
//!
//! This module contains the SchedulerState struct which holds the thread,
//! task and event tables, the ready queue and the processor binding. It has
//! NO HAL dependency; the runtime wrapper (`strand-kernel`) mirrors the
//! binding into the real PTBR.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::ready_queue::ReadyQueue;
use crate::types::{Event, EventId, PageTableId, Task, TaskId, Thread, ThreadId, ThreadStatus};

/// The pure scheduler state - no HAL, no I/O, no side effects.
///
/// All state transformations are done via the `step` function.
pub struct SchedulerState {
    /// Thread table (killed threads stay here as tombstones)
    pub threads: BTreeMap<ThreadId, Thread>,
    /// Task table
    pub tasks: BTreeMap<TaskId, Task>,
    /// Event wait sets
    pub events: BTreeMap<EventId, Event>,
    /// Page table ownership (dropped when the owning task terminates)
    pub page_tables: BTreeMap<PageTableId, TaskId>,
    /// Threads eligible to run
    pub ready: ReadyQueue,
    /// Page table currently bound to the processor (None = idle)
    pub ptbr: Option<PageTableId>,
    /// Thread whose status is `Running`, kept in step with status changes
    pub running: Option<ThreadId>,
    /// Next thread ID to allocate
    pub next_thread_id: u64,
    /// Next task ID to allocate
    pub next_task_id: u64,
    /// Next event ID to allocate
    pub next_event_id: u64,
    /// Successful dispatches since boot
    pub dispatch_count: u64,
}

/// Point-in-time view used for diagnostic dumps
#[derive(Clone, Debug)]
pub struct StateSummary {
    pub running: Option<ThreadId>,
    pub ready: Vec<ThreadId>,
    pub waiting: Vec<(ThreadId, u32)>,
    pub ptbr: Option<PageTableId>,
    pub live_threads: usize,
    pub live_tasks: usize,
    pub dispatch_count: u64,
}

impl SchedulerState {
    /// Create a new empty scheduler state.
    pub fn new() -> Self {
        Self {
            threads: BTreeMap::new(),
            tasks: BTreeMap::new(),
            events: BTreeMap::new(),
            page_tables: BTreeMap::new(),
            ready: ReadyQueue::new(),
            ptbr: None,
            running: None,
            next_thread_id: 1,
            next_task_id: 1,
            next_event_id: 1,
            dispatch_count: 0,
        }
    }

    pub fn alloc_thread_id(&mut self) -> ThreadId {
        let id = ThreadId(self.next_thread_id);
        self.next_thread_id += 1;
        id
    }

    pub fn alloc_task_id(&mut self) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        id
    }

    pub fn alloc_event_id(&mut self) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        id
    }

    // ========================================================================
    // Read-only accessors
    // ========================================================================

    pub fn get_thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(&id)
    }

    pub fn get_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn get_task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    pub fn get_event(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    pub fn status(&self, id: ThreadId) -> Option<ThreadStatus> {
        self.threads.get(&id).map(|t| t.status)
    }

    /// The thread bound to the processor, found through
    /// PTBR -> owning task -> current thread.
    ///
    /// # Panics
    /// If the PTBR names a page table or current thread the tables do not
    /// know about. A stale binding is a scheduler defect, never an idle
    /// processor.
    pub fn bound_thread(&self) -> Option<ThreadId> {
        let table = self.ptbr?;
        let task_id = match self.page_tables.get(&table) {
            Some(&task_id) => task_id,
            None => panic!("PTBR holds unknown page table {}", table.0),
        };
        let task = match self.tasks.get(&task_id) {
            Some(task) => task,
            None => panic!("page table {} owned by missing task {}", table.0, task_id.0),
        };
        let current = task.current_thread?;
        if !self.threads.contains_key(&current) {
            panic!(
                "task {} claims missing thread {} as current",
                task_id.0, current.0
            );
        }
        Some(current)
    }

    /// The thread whose status is `Running`, if any
    pub fn running_thread(&self) -> Option<ThreadId> {
        self.running
    }

    /// Threads that have not been killed
    pub fn live_threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads
            .values()
            .filter(|t| t.status != ThreadStatus::Killed)
    }

    pub fn summary(&self) -> StateSummary {
        StateSummary {
            running: self.running_thread(),
            ready: self.ready.to_vec(),
            waiting: self
                .threads
                .values()
                .filter(|t| t.status.is_waiting())
                .map(|t| (t.id, t.status.depth()))
                .collect(),
            ptbr: self.ptbr,
            live_threads: self.live_threads().count(),
            live_tasks: self.tasks.values().filter(|t| t.alive).count(),
            dispatch_count: self.dispatch_count,
        }
    }

    // ========================================================================
    // State mutation helpers (pure - no side effects)
    // ========================================================================

    /// Register a task with its own page table.
    pub fn register_task(&mut self, priority: i32, max_threads: usize) -> TaskId {
        let id = self.alloc_task_id();
        let table = PageTableId(id.0);
        self.tasks
            .insert(id, Task::new(id, priority, table, max_threads));
        self.page_tables.insert(table, id);
        id
    }

    /// Register an empty wait set.
    pub fn register_event(&mut self) -> EventId {
        let id = self.alloc_event_id();
        self.events.insert(id, Event::new(id));
        id
    }

    /// Mark a task terminated and release its page table.
    ///
    /// The task record stays so that later creates in it fail cleanly.
    pub fn terminate_task(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.get_mut(&id) {
            task.alive = false;
            task.current_thread = None;
            self.page_tables.remove(&task.page_table);
        }
    }

    /// Check if a task exists and has not been terminated
    pub fn task_alive(&self, id: TaskId) -> bool {
        self.tasks.get(&id).map(|t| t.alive).unwrap_or(false)
    }
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}
