//! HardFault trap entry and fault context capture.
//!
//! The entry stub is the one piece of this subsystem that cannot be
//! ordinary Rust: it runs with a possibly corrupted stack, so it must not
//! push, spill, or probe anything before the frame address is in hand. It
//! is a naked function wired directly into the vector table (a strong
//! `HardFault` symbol, no trampoline), and its entire job is to find the
//! hardware-pushed exception frame and branch — not call — into the
//! portable capture routine.
//!
//! # References
//!
//! - ARM DDI0403E §B1.5.6 — exception entry, stacked frame layout
//! - ARM DDI0403E §B1.5.8 — EXC_RETURN encoding (SPSEL in bit 2, FType in
//!   bit 4)

use faultdump::{claim_fault_path, handle, terminate, FaultContext, SystemControl};

use crate::mem::RawStackMemory;
use crate::system::ScbSystemControl;

/// Static home for the captured context. The fault path is single-shot and
/// guarded, so a plain `static mut` plus `addr_of_mut!` is sound here; the
/// snapshot must not live on the stack we are about to walk.
static mut CONTEXT: FaultContext = FaultContext::ZERO;

/// HardFault entry stub.
///
/// Selects the stack the frame was pushed to from EXC_RETURN bit 2 and
/// hands the frame address and EXC_RETURN to [`fault_capture`] with a plain
/// branch, leaving the machine otherwise untouched. If SP itself is bad
/// this cannot be made fully safe; the nested-fault guard in
/// `fault_capture` turns that case into an immediate reset.
///
/// Wired into the vector table by symbol name: `cortex-m-rt`'s link.x has
/// `PROVIDE(HardFault = HardFault_)`, so exporting a strong `HardFault`
/// takes the vector with no trampoline in between. The `#[exception]`
/// macro cannot be used here: it insists on an `extern "Rust"` signature,
/// and a naked function must be `extern "C"`.
#[unsafe(export_name = "HardFault")]
#[cfg_attr(target_os = "none", unsafe(link_section = ".HardFault.user"))]
#[unsafe(naked)]
unsafe extern "C" fn hard_fault_entry() -> ! {
    core::arch::naked_asm!(
        "tst lr, #4",
        "ite eq",
        "mrseq r0, msp",
        "mrsne r0, psp",
        "mov r1, lr",
        "b {capture}",
        capture = sym fault_capture,
    )
}

/// Portable side of capture: copy the exception frame and the fault status
/// registers into static storage, then run the dump pipeline and the
/// terminal action.
///
/// # Safety
///
/// Reached only from the trap stub, with `frame` pointing at the
/// hardware-pushed exception frame and `exc_return` holding the EXC_RETURN
/// value delivered in LR.
unsafe extern "C" fn fault_capture(frame: *const u32, exc_return: u32) -> ! {
    let sys = ScbSystemControl;

    // A fault inside the fault path must not touch the in-progress dump.
    // Claim the guard before the first frame read: if the frame pointer is
    // garbage, the faulting read below re-enters this function and lands
    // here with the guard already taken.
    if !claim_fault_path() {
        sys.reset();
    }

    // Stacked frame: r0 r1 r2 r3 r12 lr pc xpsr (ARM DDI0403E §B1.5.6).
    let read = |i: usize| -> u32 {
        // SAFETY: caller contract; reads stay within the 8-word frame.
        unsafe { core::ptr::read_volatile(frame.add(i)) }
    };
    let (r0, r1, r2, r3) = (read(0), read(1), read(2), read(3));
    let (r12, lr, pc, xpsr) = (read(4), read(5), read(6), read(7));

    // Pre-fault SP: frame base plus frame size. FType (EXC_RETURN bit 4)
    // clear means an FP-extended 26-word frame; xPSR bit 9 records the
    // aligner word the hardware may have inserted (CCR.STKALIGN).
    let frame_bytes: u32 = if exc_return & (1 << 4) == 0 { 0x68 } else { 0x20 };
    let mut sp = (frame as u32).wrapping_add(frame_bytes);
    if xpsr & (1 << 9) != 0 {
        sp = sp.wrapping_add(4);
    }

    // Fault status registers, read-only: CFSR is write-one-to-clear and the
    // bits are left set for a debugger to find.
    let scb = cortex_m::peripheral::SCB::PTR;
    // SAFETY: SCB is always-present ARMv7-M system space.
    let (cfsr, hfsr, mmfar, bfar) = unsafe {
        (
            (*scb).cfsr.read(),
            (*scb).hfsr.read(),
            (*scb).mmfar.read(),
            (*scb).bfar.read(),
        )
    };

    // SAFETY: single-shot fault path (guard claimed above); no other
    // reference to CONTEXT exists.
    let ctx = unsafe { &mut *core::ptr::addr_of_mut!(CONTEXT) };
    *ctx = FaultContext {
        r0,
        r1,
        r2,
        r3,
        r12,
        sp,
        lr,
        pc,
        xpsr,
        cfsr,
        hfsr,
        mmfar,
        bfar,
    };

    let mem = match faultdump::call_stack_parameters() {
        Some(params) => RawStackMemory::from_params(&params),
        None => RawStackMemory::empty(),
    };

    let action = handle(ctx, &mem);
    terminate(action, &sys)
}
