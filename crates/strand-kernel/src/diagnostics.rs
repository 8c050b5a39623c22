//! Diagnostic hooks
//!
//! The host calls `at_error` / `at_warning` right after it reports an error
//! or warning; the kernel does the same for the diagnostics it raises
//! itself. Both are no-ops unless `dump_on_diagnostic` is set.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use strand_hal::HAL;

use crate::Kernel;

impl<H: HAL> Kernel<H> {
    /// Called after an error has been reported.
    pub fn at_error(&self) {
        if self.config.dump_on_diagnostic {
            self.dump_state("error");
        }
    }

    /// Called after a warning has been reported.
    pub fn at_warning(&self) {
        if self.config.dump_on_diagnostic {
            self.dump_state("warning");
        }
    }

    /// Human-readable snapshot of the scheduler tables.
    pub fn state_dump(&self) -> String {
        let summary = self.state.summary();
        let mut out = String::new();

        let _ = writeln!(
            out,
            "running: {:?}, ptbr: {:?}, dispatches: {}",
            summary.running.map(|t| t.0),
            summary.ptbr.map(|t| t.0),
            summary.dispatch_count
        );
        let ready: Vec<u64> = summary.ready.iter().map(|t| t.0).collect();
        let _ = writeln!(out, "ready queue ({}): {:?}", ready.len(), ready);
        for (thread, depth) in &summary.waiting {
            let _ = writeln!(out, "waiting: thread {} depth {}", thread.0, depth);
        }
        let _ = writeln!(
            out,
            "live threads: {}, live tasks: {}",
            summary.live_threads, summary.live_tasks
        );
        let audit = self.axiom.state_summary();
        let _ = write!(
            out,
            "audit: {} op(s), {} syslog event(s), next id {}",
            audit.op_count, audit.syslog_len, audit.syslog_next_id
        );
        out
    }

    fn dump_state(&self, reason: &str) {
        for line in self.state_dump().lines() {
            self.hal.debug_write(&format!("[sched] dump ({}): {}", reason, line));
        }
    }
}
