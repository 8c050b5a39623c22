//! Hardware Abstraction Layer trait for the Strand scheduler
//!
//! This crate defines the collaborator interface the scheduler runtime calls
//! into. The scheduler never touches hardware or neighbouring subsystems
//! directly; everything outside thread lifecycle and dispatch sits behind
//! [`HAL`].
//!
//! # Collaborators
//!
//! - **MMU**: the page-table base register (PTBR), absent means idle
//! - **Timer**: the preemption interrupt, re-armed on every dispatch
//! - **Devices**: per-device request queues that can drop a thread's I/O
//! - **Resources**: the resource manager that reclaims a thread's holdings
//! - **Tasks**: notification that a task lost its last thread
//! - **Debug**: clock and console output

#![no_std]

extern crate alloc;

use core::sync::atomic::{AtomicU64, Ordering};

/// Raw page-table handle as seen by the MMU
pub type PageTableHandle = u64;

/// Raw thread handle as seen by devices and the resource manager
pub type ThreadHandle = u64;

/// Raw task handle as seen by the task collaborator
pub type TaskHandle = u64;

/// Index into the device table
pub type DeviceIndex = usize;

/// Hardware Abstraction Layer trait
///
/// Implementations provide the platform side of scheduling:
/// - Processor binding (PTBR)
/// - Preemption timer
/// - Device request queues
/// - Resource reclamation
/// - Time measurement and debug output
pub trait HAL: Send + Sync + 'static {
    // === Processor Binding ===

    /// Get the page table currently loaded into the PTBR
    ///
    /// # Returns
    /// * `Some(handle)` - A task's page table is bound
    /// * `None` - The processor is idle
    fn page_table(&self) -> Option<PageTableHandle>;

    /// Load a page table into the PTBR (`None` idles the processor)
    fn set_page_table(&self, table: Option<PageTableHandle>);

    // === Preemption Timer ===

    /// Arm the preemption timer to fire after `quantum` ticks
    ///
    /// Re-arming replaces any pending deadline.
    fn set_timer(&self, quantum: u64);

    // === Devices ===

    /// Number of entries in the device table
    fn device_count(&self) -> usize;

    /// Drop every pending I/O request that `thread` queued on `device`
    ///
    /// # Returns
    /// * `Ok(count)` - Number of requests purged (0 is fine)
    /// * `Err(HalError::DeviceNotFound)` - No device at that index
    fn cancel_pending_io(&self, device: DeviceIndex, thread: ThreadHandle)
        -> Result<usize, HalError>;

    // === Resources ===

    /// Release every resource exclusively held by `thread`
    fn giveup_resources(&self, thread: ThreadHandle);

    // === Tasks ===

    /// Notify the task collaborator that `task` has no threads left
    fn task_terminated(&self, task: TaskHandle);

    // === Time & Debug ===

    /// Get current time in nanoseconds (monotonic)
    fn now_nanos(&self) -> u64;

    /// Write a debug message to the platform's console/log
    fn debug_write(&self, msg: &str);
}

/// HAL errors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalError {
    /// Device index out of range
    DeviceNotFound,
    /// Device rejected the operation
    IoError,
}

/// A minimal test HAL for unit testing
///
/// Keeps only the PTBR and the clock; every other collaborator call is
/// accepted and dropped. Suitable for tests that only inspect scheduler
/// state.
pub struct TestHal {
    time: AtomicU64,
    ptbr: AtomicU64,
}

/// PTBR encoding for "no page table" inside [`TestHal`]
const NO_PAGE_TABLE: u64 = u64::MAX;

impl TestHal {
    pub fn new() -> Self {
        Self {
            time: AtomicU64::new(0),
            ptbr: AtomicU64::new(NO_PAGE_TABLE),
        }
    }
}

impl Default for TestHal {
    fn default() -> Self {
        Self::new()
    }
}

impl HAL for TestHal {
    fn page_table(&self) -> Option<PageTableHandle> {
        match self.ptbr.load(Ordering::SeqCst) {
            NO_PAGE_TABLE => None,
            table => Some(table),
        }
    }

    fn set_page_table(&self, table: Option<PageTableHandle>) {
        self.ptbr
            .store(table.unwrap_or(NO_PAGE_TABLE), Ordering::SeqCst);
    }

    fn set_timer(&self, _quantum: u64) {}

    fn device_count(&self) -> usize {
        0
    }

    fn cancel_pending_io(
        &self,
        _device: DeviceIndex,
        _thread: ThreadHandle,
    ) -> Result<usize, HalError> {
        Err(HalError::DeviceNotFound)
    }

    fn giveup_resources(&self, _thread: ThreadHandle) {}

    fn task_terminated(&self, _task: TaskHandle) {}

    fn now_nanos(&self) -> u64 {
        self.time.fetch_add(1, Ordering::SeqCst)
    }

    fn debug_write(&self, _msg: &str) {
        // No-op for tests
    }
}
