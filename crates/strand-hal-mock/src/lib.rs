//! Mock HAL implementation for testing the Strand scheduler
//!
//! This provides a mock implementation of the HAL trait that records every
//! collaborator call, so the scheduler can be tested without a real MMU,
//! timer, device table or resource manager.

#![no_std]
extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::sync::atomic::{AtomicU64, Ordering};
use strand_hal::{DeviceIndex, HalError, PageTableHandle, TaskHandle, ThreadHandle, HAL};

/// Mock HAL for unit testing
///
/// Provides a simulated PTBR, preemption timer, device queues and resource
/// manager, and keeps a history of every call for assertions.
pub struct MockHal {
    /// Simulated time in nanoseconds
    time: AtomicU64,
    /// Captured debug messages
    debug_log: RefCell<Vec<String>>,
    /// Current PTBR contents
    ptbr: RefCell<Option<PageTableHandle>>,
    /// Every value ever written to the PTBR, in order
    ptbr_history: RefCell<Vec<Option<PageTableHandle>>>,
    /// Every quantum the timer was armed with, in order
    timer_arms: RefCell<Vec<u64>>,
    /// Simulated device table
    devices: RefCell<Vec<MockDevice>>,
    /// Threads whose resources were given up, in order
    released: RefCell<Vec<ThreadHandle>>,
    /// Tasks reported as terminated, in order
    terminated_tasks: RefCell<Vec<TaskHandle>>,
}

/// Simulated device request queue
#[derive(Default)]
struct MockDevice {
    /// Pending requests, tagged with the thread that issued them
    pending: Vec<ThreadHandle>,
    /// Requests purged by `cancel_pending_io`
    cancelled: usize,
    /// Reject purges with `IoError`
    faulty: bool,
}

impl MockHal {
    /// Create a new mock HAL with an empty device table
    pub fn new() -> Self {
        Self::with_devices(0)
    }

    /// Create a mock HAL with `count` idle devices
    pub fn with_devices(count: usize) -> Self {
        let mut devices = Vec::with_capacity(count);
        devices.resize_with(count, MockDevice::default);
        Self {
            time: AtomicU64::new(0),
            debug_log: RefCell::new(Vec::new()),
            ptbr: RefCell::new(None),
            ptbr_history: RefCell::new(Vec::new()),
            timer_arms: RefCell::new(Vec::new()),
            devices: RefCell::new(devices),
            released: RefCell::new(Vec::new()),
            terminated_tasks: RefCell::new(Vec::new()),
        }
    }

    /// Advance the simulated time by the given duration
    pub fn advance_time(&self, nanos: u64) {
        self.time.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Get all captured debug messages
    pub fn get_debug_log(&self) -> Vec<String> {
        self.debug_log.borrow().clone()
    }

    /// Clear the debug log
    pub fn clear_debug_log(&self) {
        self.debug_log.borrow_mut().clear();
    }

    /// Check if a specific message was logged
    pub fn has_log_containing(&self, substr: &str) -> bool {
        self.debug_log
            .borrow()
            .iter()
            .any(|msg| msg.contains(substr))
    }

    /// Every PTBR write so far
    pub fn ptbr_history(&self) -> Vec<Option<PageTableHandle>> {
        self.ptbr_history.borrow().clone()
    }

    /// Every timer quantum armed so far
    pub fn timer_arms(&self) -> Vec<u64> {
        self.timer_arms.borrow().clone()
    }

    /// Queue an I/O request on behalf of `thread` (for testing)
    pub fn queue_io(&self, device: DeviceIndex, thread: ThreadHandle) {
        if let Some(dev) = self.devices.borrow_mut().get_mut(device) {
            dev.pending.push(thread);
        }
    }

    /// Pending request owners on `device`
    pub fn pending_io(&self, device: DeviceIndex) -> Vec<ThreadHandle> {
        self.devices
            .borrow()
            .get(device)
            .map(|d| d.pending.clone())
            .unwrap_or_default()
    }

    /// Make every later purge on `device` fail with `IoError` (for testing)
    pub fn fail_device(&self, device: DeviceIndex) {
        if let Some(dev) = self.devices.borrow_mut().get_mut(device) {
            dev.faulty = true;
        }
    }

    /// Total requests purged from `device`
    pub fn cancelled_io(&self, device: DeviceIndex) -> usize {
        self.devices
            .borrow()
            .get(device)
            .map(|d| d.cancelled)
            .unwrap_or(0)
    }

    /// Threads whose resources were reclaimed
    pub fn released_resources(&self) -> Vec<ThreadHandle> {
        self.released.borrow().clone()
    }

    /// Tasks reported as terminated
    pub fn terminated_tasks(&self) -> Vec<TaskHandle> {
        self.terminated_tasks.borrow().clone()
    }
}

impl Default for MockHal {
    fn default() -> Self {
        Self::new()
    }
}

// MockHal is Send + Sync because it uses atomic operations and RefCell
// is only accessed in single-threaded test contexts
unsafe impl Send for MockHal {}
unsafe impl Sync for MockHal {}

impl HAL for MockHal {
    fn page_table(&self) -> Option<PageTableHandle> {
        *self.ptbr.borrow()
    }

    fn set_page_table(&self, table: Option<PageTableHandle>) {
        *self.ptbr.borrow_mut() = table;
        self.ptbr_history.borrow_mut().push(table);
    }

    fn set_timer(&self, quantum: u64) {
        self.timer_arms.borrow_mut().push(quantum);
    }

    fn device_count(&self) -> usize {
        self.devices.borrow().len()
    }

    fn cancel_pending_io(
        &self,
        device: DeviceIndex,
        thread: ThreadHandle,
    ) -> Result<usize, HalError> {
        let mut devices = self.devices.borrow_mut();
        let dev = devices.get_mut(device).ok_or(HalError::DeviceNotFound)?;
        if dev.faulty {
            return Err(HalError::IoError);
        }
        let before = dev.pending.len();
        dev.pending.retain(|&owner| owner != thread);
        let purged = before - dev.pending.len();
        dev.cancelled += purged;
        Ok(purged)
    }

    fn giveup_resources(&self, thread: ThreadHandle) {
        self.released.borrow_mut().push(thread);
    }

    fn task_terminated(&self, task: TaskHandle) {
        self.terminated_tasks.borrow_mut().push(task);
        self.debug_log
            .borrow_mut()
            .push(alloc::format!("[mock-hal] Task {} terminated", task));
    }

    fn now_nanos(&self) -> u64 {
        self.time.load(Ordering::SeqCst)
    }

    fn debug_write(&self, msg: &str) {
        self.debug_log.borrow_mut().push(String::from(msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_mock_hal_time() {
        let hal = MockHal::new();
        assert_eq!(hal.now_nanos(), 0);

        hal.advance_time(1_000_000_000);
        assert_eq!(hal.now_nanos(), 1_000_000_000);
    }

    #[test]
    fn test_mock_hal_debug_log() {
        let hal = MockHal::new();

        hal.debug_write("Hello");
        hal.debug_write("World");

        let log = hal.get_debug_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], "Hello");
        assert!(hal.has_log_containing("World"));
        assert!(!hal.has_log_containing("Foo"));

        hal.clear_debug_log();
        assert!(hal.get_debug_log().is_empty());
    }

    #[test]
    fn test_mock_hal_ptbr_history() {
        let hal = MockHal::new();
        hal.set_page_table(Some(3));
        hal.set_page_table(None);

        assert_eq!(hal.page_table(), None);
        assert_eq!(hal.ptbr_history(), vec![Some(3), None]);
    }

    #[test]
    fn test_mock_hal_cancel_pending_io() {
        let hal = MockHal::with_devices(2);
        hal.queue_io(0, 1);
        hal.queue_io(0, 2);
        hal.queue_io(0, 1);
        hal.queue_io(1, 2);

        assert_eq!(hal.cancel_pending_io(0, 1), Ok(2));
        assert_eq!(hal.pending_io(0), vec![2]);
        assert_eq!(hal.cancelled_io(0), 2);
        assert_eq!(hal.cancel_pending_io(1, 1), Ok(0));
        assert_eq!(hal.pending_io(1), vec![2]);
    }

    #[test]
    fn test_mock_hal_faulty_device() {
        let hal = MockHal::with_devices(1);
        hal.queue_io(0, 1);
        hal.fail_device(0);

        assert_eq!(hal.cancel_pending_io(0, 1), Err(HalError::IoError));
        assert_eq!(hal.pending_io(0), vec![1]);
        assert_eq!(hal.cancelled_io(0), 0);
    }

    #[test]
    fn test_mock_hal_unknown_device() {
        let hal = MockHal::with_devices(1);
        assert_eq!(hal.cancel_pending_io(5, 1), Err(HalError::DeviceNotFound));
    }
}
