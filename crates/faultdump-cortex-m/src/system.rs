//! Terminal system operations for the post-fault action dispatcher.

use faultdump::SystemControl;

/// [`SystemControl`] backed by the System Control Block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScbSystemControl;

impl SystemControl for ScbSystemControl {
    /// Full system reset via AIRCR.SYSRESETREQ.
    fn reset(&self) -> ! {
        cortex_m::peripheral::SCB::sys_reset()
    }

    /// Park the core on `wfi`.
    ///
    /// At HardFault priority nothing can preempt, so the core sleeps until
    /// an external reset or a debugger takes over. This is the lowest-level
    /// halt ARMv7-M offers short of a debug-only BKPT, which would escalate
    /// to lockup with no debugger attached.
    fn halt(&self) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
