//! Kernel integration tests
//!
//! Drive the scheduler through its public entry points against `MockHal`
//! and check both the scheduler tables and what reached the hardware.

use strand_axiom::{DiagnosticLevel, StateRecord};
use strand_hal::HAL;
use strand_hal_mock::MockHal;
use strand_kernel::{
    DispatchStatus, Kernel, KernelError, ResumeOutcome, SchedulerConfig, TaskId, ThreadId,
    ThreadLifecycle, ThreadStatus, TimerInterruptHandler,
};

fn create_test_kernel() -> Kernel<MockHal> {
    Kernel::new(MockHal::new())
}

fn spawn(kernel: &mut Kernel<MockHal>, task: TaskId) -> ThreadId {
    kernel
        .create(Some(task))
        .expect("task should accept another thread")
}

// ============================================================================
// Creation
// ============================================================================

#[test]
fn test_thread_limit_per_task() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, Some(2));

    let t1 = spawn(&mut kernel, task);
    assert_eq!(kernel.running_thread(), Some(t1));

    let t2 = spawn(&mut kernel, task);
    assert_eq!(kernel.running_thread(), Some(t2));
    assert_eq!(kernel.ready_threads(), vec![t1]);

    // Third create is refused but still dispatches
    assert_eq!(kernel.create(Some(task)), None);
    assert_eq!(kernel.running_thread(), Some(t1));
    assert_eq!(kernel.ready_threads(), vec![t2]);
    assert_eq!(kernel.task(task).map(|t| t.thread_count()), Some(2));
}

#[test]
fn test_create_without_task() {
    let mut kernel = create_test_kernel();
    assert_eq!(kernel.create(None), None);
    assert_eq!(kernel.create(Some(TaskId(99))), None);
    assert_eq!(kernel.running_thread(), None);
    assert_eq!(kernel.hal().page_table(), None);
}

#[test]
fn test_first_dispatch_binds_page_table_and_arms_timer() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let t1 = spawn(&mut kernel, task);

    let table = kernel.task(task).map(|t| t.page_table.0);
    assert_eq!(kernel.hal().page_table(), table);
    assert_eq!(kernel.hal().ptbr_history(), vec![None, table]);
    assert_eq!(kernel.hal().timer_arms(), vec![50]);
    assert_eq!(kernel.task(task).and_then(|t| t.current_thread), Some(t1));
}

// ============================================================================
// Dispatch / timer
// ============================================================================

#[test]
fn test_timer_round_robin() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, Some(4));
    let t1 = spawn(&mut kernel, task);
    let t2 = spawn(&mut kernel, task);
    let t3 = spawn(&mut kernel, task);

    assert_eq!(kernel.running_thread(), Some(t1));
    assert_eq!(kernel.ready_threads(), vec![t3, t2]);

    let mut order = Vec::new();
    for _ in 0..4 {
        assert_eq!(kernel.handle_interrupt(), DispatchStatus::Success);
        order.push(kernel.running_thread().unwrap());
    }
    assert_eq!(order, vec![t3, t2, t1, t3]);
}

#[test]
fn test_lone_thread_is_rescheduled() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let t1 = spawn(&mut kernel, task);

    assert_eq!(kernel.handle_interrupt(), DispatchStatus::Success);
    assert_eq!(kernel.running_thread(), Some(t1));
    assert!(kernel.ready_threads().is_empty());
    assert_eq!(kernel.hal().timer_arms(), vec![50, 50]);
}

#[test]
fn test_dispatch_when_idle_fails() {
    let mut kernel = create_test_kernel();
    assert_eq!(kernel.dispatch(), DispatchStatus::Failure);
    assert_eq!(kernel.handle_interrupt(), DispatchStatus::Failure);
    assert_eq!(kernel.hal().page_table(), None);
    assert!(kernel.hal().timer_arms().is_empty());
}

// ============================================================================
// Kill
// ============================================================================

#[test]
fn test_kill_last_thread_terminates_task() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, Some(1));
    let t1 = spawn(&mut kernel, task);

    assert_eq!(kernel.kill(t1), Ok(()));
    assert_eq!(kernel.status(t1), Some(ThreadStatus::Killed));
    assert_eq!(kernel.running_thread(), None);
    assert_eq!(kernel.hal().page_table(), None);
    assert_eq!(kernel.hal().released_resources(), vec![t1.0]);
    assert_eq!(kernel.hal().terminated_tasks(), vec![task.0]);
    assert!(kernel.hal().has_log_containing("has no threads left"));

    // Terminated task refuses new threads
    assert_eq!(kernel.create(Some(task)), None);
    assert_eq!(kernel.task(task).map(|t| t.alive), Some(false));
}

#[test]
fn test_kill_purges_device_queues() {
    let mut kernel = Kernel::new(MockHal::with_devices(2));
    let task = kernel.create_task(1, Some(4));
    let t1 = spawn(&mut kernel, task);
    let t2 = spawn(&mut kernel, task);

    kernel.hal().queue_io(0, t1.0);
    kernel.hal().queue_io(1, t1.0);
    kernel.hal().queue_io(1, t2.0);

    assert_eq!(kernel.kill(t1), Ok(()));
    assert!(kernel.hal().pending_io(0).is_empty());
    assert_eq!(kernel.hal().pending_io(1), vec![t2.0]);
    assert_eq!(kernel.hal().cancelled_io(1), 1);
    assert!(kernel
        .hal()
        .has_log_containing("Purged 1 request(s) of thread 1 from device 0"));

    // Task still has a thread
    assert!(kernel.hal().terminated_tasks().is_empty());
    assert_eq!(kernel.running_thread(), Some(t2));
}

#[test]
fn test_kill_waiting_thread_leaves_wait_sets() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, Some(4));
    let event = kernel.create_event();
    let t1 = spawn(&mut kernel, task);
    let t2 = spawn(&mut kernel, task);

    assert_eq!(kernel.suspend(t2, event), Ok(()));
    assert_eq!(kernel.waiters(event), vec![t2]);

    assert_eq!(kernel.kill(t2), Ok(()));
    assert!(kernel.waiters(event).is_empty());
    assert_eq!(kernel.running_thread(), Some(t1));
    assert_eq!(kernel.signal_event(event), Ok(0));
}

#[test]
fn test_kill_twice_warns() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, Some(4));
    let t1 = spawn(&mut kernel, task);
    let _t2 = spawn(&mut kernel, task);

    assert_eq!(kernel.kill(t1), Ok(()));
    assert_eq!(kernel.kill(t1), Ok(()));
    assert!(kernel.hal().has_log_containing("already dead"));
    assert_eq!(kernel.syslog().diagnostic_count(DiagnosticLevel::Warning), 1);
    assert_eq!(kernel.hal().released_resources(), vec![t1.0]);
}

#[test]
fn test_kill_running_thread_hands_processor_to_queue_head() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, Some(4));
    let t1 = spawn(&mut kernel, task);
    let t2 = spawn(&mut kernel, task);
    let t3 = spawn(&mut kernel, task);
    assert_eq!(kernel.ready_threads(), vec![t3, t2]);

    assert_eq!(kernel.kill(t1), Ok(()));
    assert_eq!(kernel.running_thread(), Some(t3));
    assert_eq!(kernel.ready_threads(), vec![t2]);
    assert_eq!(kernel.hal().page_table(), kernel.task(task).map(|t| t.page_table.0));
    assert_eq!(kernel.hal().timer_arms().last(), Some(&50));
    assert!(kernel.hal().terminated_tasks().is_empty());
}

#[test]
fn test_kill_survives_faulty_device() {
    let mut kernel = Kernel::new(MockHal::with_devices(2));
    let task = kernel.create_task(1, Some(4));
    let t1 = spawn(&mut kernel, task);
    let _t2 = spawn(&mut kernel, task);

    kernel.hal().queue_io(0, t1.0);
    kernel.hal().queue_io(1, t1.0);
    kernel.hal().fail_device(0);

    assert_eq!(kernel.kill(t1), Ok(()));
    assert_eq!(kernel.hal().pending_io(0), vec![t1.0]);
    assert!(kernel.hal().pending_io(1).is_empty());
    assert!(kernel
        .hal()
        .has_log_containing("Device 0 could not purge thread 1: IoError"));
    assert_eq!(kernel.hal().released_resources(), vec![t1.0]);
}

#[test]
fn test_kill_unknown_thread() {
    let mut kernel = create_test_kernel();
    assert_eq!(kernel.kill(ThreadId(42)), Err(KernelError::ThreadNotFound));
    assert_eq!(kernel.syslog().diagnostic_count(DiagnosticLevel::Error), 1);
    assert!(kernel.hal().has_log_containing("[sched] Error: Operation names an unknown thread"));
}

// ============================================================================
// Suspend / resume
// ============================================================================

#[test]
fn test_suspend_resume_round_trip() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let event = kernel.create_event();
    let t1 = spawn(&mut kernel, task);

    assert_eq!(kernel.suspend(t1, event), Ok(()));
    assert_eq!(kernel.status(t1), Some(ThreadStatus::Waiting { depth: 1 }));
    assert_eq!(kernel.running_thread(), None);
    assert_eq!(kernel.hal().page_table(), None);

    assert_eq!(kernel.resume(t1), Ok(ResumeOutcome::Ready));
    assert_eq!(kernel.status(t1), Some(ThreadStatus::Running));
    assert_eq!(kernel.running_thread(), Some(t1));
    assert!(kernel.waiters(event).is_empty());
}

#[test]
fn test_nested_waits_resolve_latest_first() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let outer = kernel.create_event();
    let inner = kernel.create_event();
    let t1 = spawn(&mut kernel, task);

    assert_eq!(kernel.suspend(t1, outer), Ok(()));
    assert_eq!(kernel.suspend(t1, inner), Ok(()));
    assert_eq!(kernel.status(t1), Some(ThreadStatus::Waiting { depth: 2 }));

    assert_eq!(
        kernel.resume(t1),
        Ok(ResumeOutcome::StillWaiting { depth: 1 })
    );
    assert!(kernel.waiters(inner).is_empty());
    assert_eq!(kernel.waiters(outer), vec![t1]);
    assert_eq!(kernel.running_thread(), None);

    assert_eq!(kernel.resume(t1), Ok(ResumeOutcome::Ready));
    assert_eq!(kernel.running_thread(), Some(t1));
}

#[test]
fn test_resume_not_waiting_warns_without_dispatch() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let t1 = spawn(&mut kernel, task);
    let dispatches = kernel.state().dispatch_count;

    assert_eq!(kernel.resume(t1), Ok(ResumeOutcome::NotWaiting));
    assert_eq!(kernel.status(t1), Some(ThreadStatus::Running));
    assert_eq!(kernel.state().dispatch_count, dispatches);
    assert!(kernel.hal().has_log_containing("wasn't waiting"));
    assert_eq!(kernel.syslog().diagnostic_count(DiagnosticLevel::Warning), 1);
}

#[test]
fn test_suspend_ready_thread_is_rejected() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let event = kernel.create_event();
    let t1 = spawn(&mut kernel, task);
    let t2 = spawn(&mut kernel, task);
    assert_eq!(kernel.status(t1), Some(ThreadStatus::Ready));

    assert_eq!(
        kernel.suspend(t1, event),
        Err(KernelError::InvalidTransition)
    );
    assert_eq!(kernel.status(t1), Some(ThreadStatus::Ready));
    assert_eq!(kernel.running_thread(), Some(t2));
    assert!(kernel.waiters(event).is_empty());
    assert_eq!(kernel.syslog().diagnostic_count(DiagnosticLevel::Error), 1);
}

#[test]
fn test_suspend_killed_thread_is_rejected() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let event = kernel.create_event();
    let t1 = spawn(&mut kernel, task);
    let t2 = spawn(&mut kernel, task);
    kernel.kill(t1).unwrap();

    assert_eq!(
        kernel.suspend(t1, event),
        Err(KernelError::InvalidTransition)
    );
    assert_eq!(kernel.status(t1), Some(ThreadStatus::Killed));
    assert_eq!(kernel.running_thread(), Some(t2));
    assert!(kernel.waiters(event).is_empty());
    assert!(kernel.hal().has_log_containing("while Killed"));
}

#[test]
fn test_suspend_unknown_event() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let t1 = spawn(&mut kernel, task);

    assert_eq!(
        kernel.suspend(t1, strand_kernel::EventId(7)),
        Err(KernelError::EventNotFound)
    );
    assert_eq!(kernel.running_thread(), Some(t1));
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_signal_event_wakes_all_waiters() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let event = kernel.create_event();
    let t1 = spawn(&mut kernel, task);
    let t2 = spawn(&mut kernel, task);

    assert_eq!(kernel.suspend(t2, event), Ok(()));
    assert_eq!(kernel.running_thread(), Some(t1));
    assert_eq!(kernel.suspend(t1, event), Ok(()));
    assert_eq!(kernel.running_thread(), None);

    assert_eq!(kernel.signal_event(event), Ok(2));
    assert_eq!(kernel.running_thread(), Some(t1));
    assert_eq!(kernel.ready_threads(), vec![t2]);
    assert!(kernel.waiters(event).is_empty());
}

#[test]
fn test_signal_unknown_event() {
    let mut kernel = create_test_kernel();
    assert_eq!(
        kernel.signal_event(strand_kernel::EventId(3)),
        Err(KernelError::EventNotFound)
    );
    assert_eq!(kernel.syslog().diagnostic_count(DiagnosticLevel::Error), 1);
}

// ============================================================================
// Lifecycle / configuration
// ============================================================================

#[test]
fn test_shutdown_kills_everything() {
    let mut kernel = create_test_kernel();
    let a = kernel.create_task(1, None);
    let b = kernel.create_task(2, None);
    spawn(&mut kernel, a);
    spawn(&mut kernel, a);
    spawn(&mut kernel, b);

    assert_eq!(kernel.shutdown(), 3);
    assert_eq!(kernel.running_thread(), None);
    assert_eq!(kernel.state().live_threads().count(), 0);
    assert_eq!(kernel.hal().terminated_tasks(), vec![a.0, b.0]);
    assert_eq!(kernel.hal().page_table(), None);
}

#[test]
fn test_config_from_json() {
    let config: SchedulerConfig = serde_json::from_str(r#"{"quantum":10}"#).unwrap();
    assert_eq!(config.quantum, 10);
    assert_eq!(
        config.max_threads_per_task,
        SchedulerConfig::default().max_threads_per_task
    );

    let mut kernel = Kernel::init(MockHal::new(), config);
    let task = kernel.create_task(1, None);
    spawn(&mut kernel, task);
    assert_eq!(kernel.hal().timer_arms(), vec![10]);
    assert!(kernel.hal().has_log_containing("quantum 10"));
}

#[test]
fn test_dump_on_diagnostic() {
    let config = SchedulerConfig {
        dump_on_diagnostic: true,
        ..SchedulerConfig::default()
    };
    let mut kernel = Kernel::init(MockHal::new(), config);
    let task = kernel.create_task(1, None);
    let t1 = spawn(&mut kernel, task);
    assert!(!kernel.hal().has_log_containing("dump"));

    kernel.resume(t1).unwrap();
    assert!(kernel.hal().has_log_containing("[sched] dump (warning): running: Some(1)"));
}

#[test]
fn test_no_dump_by_default() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let t1 = spawn(&mut kernel, task);

    kernel.resume(t1).unwrap();
    assert!(!kernel.hal().has_log_containing("dump"));
}

// ============================================================================
// Audit trail
// ============================================================================

#[test]
fn test_syslog_records_transitions() {
    let mut kernel = create_test_kernel();
    let task = kernel.create_task(1, None);
    let t1 = spawn(&mut kernel, task);
    kernel.kill(t1).unwrap();

    assert_eq!(
        kernel.syslog().transitions_of(t1.0),
        vec![
            (None, StateRecord::Ready),
            (Some(StateRecord::Ready), StateRecord::Running),
            (Some(StateRecord::Running), StateRecord::Killed),
        ]
    );
}

#[test]
fn test_uptime_follows_hal_clock() {
    let kernel = create_test_kernel();
    kernel.hal().advance_time(1_000);
    assert_eq!(kernel.uptime_nanos(), 1_000);
}
