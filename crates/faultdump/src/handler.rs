//! Fault-path orchestration: walk, format, dispatch, terminal action.
//!
//! The architecture layer calls exactly three things here, in order:
//! [`claim_fault_path`] before touching the (possibly bad) exception frame,
//! [`handle`] with the captured context, and [`terminate`] with the action
//! `handle` returned. `handle` is deliberately non-diverging so the whole
//! pipeline short of the terminal action can run under a host test harness.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::context::FaultContext;
use crate::registry;
use crate::walk::{self, Backtrace, StackMemory};

/// Terminal behaviour after the dump has been dispatched.
///
/// Exactly one action is active at fault time and it executes exactly once.
/// None of the variants lead back into normal program execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostFaultAction {
    /// Spin forever — park the core so a debugger can attach and inspect.
    #[default]
    Loop,
    /// Request a full system reset.
    Reset,
    /// Stop the core with the lowest-level halt available.
    Halt,
    /// Invoke an application hook; if the hook returns, fall back to
    /// [`PostFaultAction::Loop`] rather than returning into undefined state.
    Custom(fn()),
}

/// Architecture-provided terminal operations.
///
/// Both are diverging by contract: a "reset" that returns would resume a
/// fault handler whose stack and machine state are unaccounted for.
pub trait SystemControl {
    /// Trigger a full system reset.
    fn reset(&self) -> !;
    /// Stop the core.
    fn halt(&self) -> !;
}

/// One-shot guard over the non-reentrant fault path.
static FAULT_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

/// Claim the fault path. Returns `false` if it was already claimed — i.e.
/// this is a nested fault, and the caller must escalate (reset) immediately
/// without touching the in-progress dump.
pub fn claim_fault_path() -> bool {
    !FAULT_IN_PROGRESS.swap(true, Ordering::SeqCst)
}

/// Release the fault path guard.
///
/// Host-test support only; on hardware the fault path never returns, so the
/// guard is never released.
#[doc(hidden)]
pub fn release_fault_path() {
    FAULT_IN_PROGRESS.store(false, Ordering::SeqCst);
}

/// Run the portable fault pipeline: walk the stack, render the dump into
/// the registered buffer, invoke the registered processor, and return the
/// configured terminal action.
///
/// Every step degrades instead of failing: no walk parameters means an
/// empty backtrace, no buffer means formatting and dispatch are skipped, no
/// processor means dispatch is a no-op. The terminal action is returned in
/// all cases; the caller must pass it to [`terminate`].
pub fn handle(ctx: &FaultContext, mem: &impl StackMemory) -> PostFaultAction {
    let cfg = registry::snapshot();

    let backtrace = match cfg.walk {
        Some(params) => walk::walk(ctx.sp, &params, mem),
        None => Backtrace::new(),
    };

    if let Some(region) = cfg.dump {
        // SAFETY: the region was built from a &'static mut [u8] at
        // registration and the fault path is its only accessor from then on
        // (single core, one fault path, guarded against re-entry).
        let buf = unsafe { core::slice::from_raw_parts_mut(region.ptr, region.cap) };
        let text = crate::dump::render(ctx, &backtrace, buf);
        if let Some(processor) = cfg.processor {
            processor(text);
        }
    }

    cfg.action
}

/// Execute the terminal action. Never returns.
pub fn terminate(action: PostFaultAction, sys: &impl SystemControl) -> ! {
    match action {
        PostFaultAction::Loop => spin(),
        PostFaultAction::Reset => sys.reset(),
        PostFaultAction::Halt => sys.halt(),
        PostFaultAction::Custom(hook) => {
            hook();
            // The hook came back: parking the core is the only state we can
            // still guarantee.
            spin()
        }
    }
}

fn spin() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_path_guard_is_one_shot() {
        // Single test for the whole guard lifecycle: the flag is process
        // global, so splitting this across parallel tests would race.
        assert!(claim_fault_path(), "first claim must succeed");
        assert!(!claim_fault_path(), "second claim is a nested fault");
        assert!(!claim_fault_path(), "guard stays held until released");
        release_fault_path();
        assert!(claim_fault_path(), "claim succeeds again after release");
        release_fault_path();
    }

    #[test]
    fn default_action_is_loop() {
        assert_eq!(PostFaultAction::default(), PostFaultAction::Loop);
    }
}
