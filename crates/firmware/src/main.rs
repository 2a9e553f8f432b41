//! Fault dump demo firmware.
//!
//! The whole point of this binary is to crash: it registers a dump buffer,
//! an RTT console sink and the stack-walk bounds, then performs a read from
//! unmapped address space. The resulting BusFault escalates to HardFault,
//! lands in the `faultdump-cortex-m` trap entry, and the formatted dump
//! arrives on the defmt console before the core parks itself in the
//! configured `Loop` action — attach with probe-rs and read the wreckage.

#![no_std]
#![no_main]
#![allow(missing_docs)]

use cortex_m_rt::entry;
use defmt_rtt as _;
use faultdump::{CallStackParams, PostFaultAction, DUMP_CAPACITY};
use faultdump_cortex_m as _; // provides the HardFault vector
use panic_probe as _;
use static_cell::StaticCell;

/// Dump storage. Static, never on the stack: the stack is the thing under
/// suspicion when this buffer gets used.
static DUMP_BUFFER: StaticCell<[u8; DUMP_CAPACITY]> = StaticCell::new();

extern "C" {
    // cortex-m-rt linker symbols bounding program text and the main stack.
    static __stext: u8;
    static __etext: u8;
    static __sheap: u8;
    static _stack_start: u8;
}

/// Deliver the finished dump over RTT. Runs in fault context: defmt-rtt
/// writes lock-free into its ring buffer, which is exactly the kind of sink
/// the dispatch contract asks for.
fn console_dump_processor(dump: &str) {
    defmt::error!("{=str}", dump);
}

#[entry]
fn main() -> ! {
    defmt::info!("faultdump demo — arming fault capture");

    let buffer = DUMP_BUFFER.init([0; DUMP_CAPACITY]);
    defmt::unwrap!(faultdump::set_dump_processor(
        buffer,
        Some(console_dump_processor)
    ));

    // Walk bounds straight from the linker: [__stext, __etext) is program
    // text, [__sheap, _stack_start) covers everything the main stack can
    // legally occupy.
    //
    // SAFETY: linker-provided symbols; only their addresses are taken.
    let (text_low, text_high, stack_base, stack_top) = unsafe {
        (
            core::ptr::addr_of!(__stext) as u32,
            core::ptr::addr_of!(__etext) as u32,
            core::ptr::addr_of!(__sheap) as u32,
            core::ptr::addr_of!(_stack_start) as u32,
        )
    };
    defmt::unwrap!(faultdump::set_call_stack_parameters(CallStackParams::new(
        text_low, text_high, stack_base, stack_top,
    )));

    // Park after the dump so a debugger can attach and poke around.
    faultdump::set_post_fault_action(PostFaultAction::Loop);

    defmt::info!(
        "text {=u32:#x}..{=u32:#x}, stack {=u32:#x}..{=u32:#x}",
        text_low,
        text_high,
        stack_base,
        stack_top
    );
    defmt::info!("triggering a bus fault (read from unmapped address)");

    // Deliberate crash: nothing is mapped at 0x3FFF_FFF0 on an STM32H7, so
    // this volatile read raises a BusFault that escalates to HardFault.
    let doomed = 0x3FFF_FFF0 as *const u32;
    // SAFETY: intentionally unsound — this read IS the demo.
    let _ = unsafe { core::ptr::read_volatile(doomed) };

    // Unreachable: the fault path never returns. Satisfies `-> !` anyway.
    loop {
        cortex_m::asm::nop();
    }
}
