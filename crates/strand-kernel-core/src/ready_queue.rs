//! FIFO ready queue
//!
//! Threads are served strictly in arrival order. Priority is never
//! consulted.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::types::ThreadId;

/// Ordered queue of threads eligible for dispatch
#[derive(Clone, Debug, Default)]
pub struct ReadyQueue {
    queue: VecDeque<ThreadId>,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Append at the tail
    pub fn append(&mut self, thread: ThreadId) {
        self.queue.push_back(thread);
    }

    /// Take the earliest-enqueued thread
    pub fn remove_head(&mut self) -> Option<ThreadId> {
        self.queue.pop_front()
    }

    /// Remove `thread` wherever it sits; returns false if absent.
    pub fn remove(&mut self, thread: ThreadId) -> bool {
        match self.queue.iter().position(|&t| t == thread) {
            Some(idx) => self.queue.remove(idx).is_some(),
            None => false,
        }
    }

    pub fn contains(&self, thread: ThreadId) -> bool {
        self.queue.contains(&thread)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThreadId> {
        self.queue.iter()
    }

    /// Snapshot in queue order, head first
    pub fn to_vec(&self) -> Vec<ThreadId> {
        self.queue.iter().copied().collect()
    }
}
