//! Timer interrupt handler
//!
//! The handler keeps no quantum bookkeeping of its own: each successful
//! dispatch re-arms the timer, so an interrupt simply means "dispatch now".

use strand_axiom::OpCode;
use strand_hal::HAL;
use strand_kernel_core::{DispatchStatus, OpResult, SchedOp};

use crate::Kernel;

/// Entry point for the preemption timer
pub trait TimerInterruptHandler {
    fn handle_interrupt(&mut self) -> DispatchStatus;
}

impl<H: HAL> TimerInterruptHandler for Kernel<H> {
    fn handle_interrupt(&mut self) -> DispatchStatus {
        match self.execute(OpCode::TimerInterrupt, 0, SchedOp::TimerInterrupt) {
            OpResult::Dispatched(status) => status,
            other => panic!("timer interrupt produced {:?}", other),
        }
    }
}
