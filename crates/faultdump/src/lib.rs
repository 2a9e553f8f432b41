//! Fault capture and dump subsystem for bare-metal targets.
//!
//! When the CPU takes an unrecoverable exception (bad memory access, invalid
//! control transfer, stack corruption) the firmware gets one narrow window —
//! interrupts masked, stack possibly bad, allocator possibly the thing that
//! broke — to capture diagnostic state before the device resets or halts.
//! This crate is the portable part of that path.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (registers buffer, sink, walk bounds at startup)
//!         ↓
//! Architecture crate (faultdump-cortex-m: trap entry, frame capture)
//!         ↓
//! This crate (stack walk → dump format → dispatch → terminal action)
//! ```
//!
//! Everything here is `no_std`, allocation-free, and bounded in time and
//! space: the backtrace is a `heapless::Vec`, the dump is rendered into an
//! application-owned buffer through a truncating writer, and the walk has a
//! hard depth cap. The whole fault path is synchronous — there is no
//! scheduler left to resume anything.
//!
//! # Lifecycle
//!
//! Configuration is two-phase: the application calls the `set_*` functions
//! once during startup, before exceptions are enabled; the fault path reads
//! the registry exactly once. Nothing is ever unregistered. Mutating the
//! registry after startup is a documented precondition violation, not a
//! runtime-checked error.
//!
//! # Example
//!
//! ```no_run
//! use faultdump::{CallStackParams, PostFaultAction};
//!
//! static mut DUMP: [u8; faultdump::DUMP_CAPACITY] = [0; faultdump::DUMP_CAPACITY];
//!
//! fn console(dump: &str) {
//!     // hand the finished dump to a UART, RTT channel, flash log, ...
//!     let _ = dump;
//! }
//!
//! fn init() -> Result<(), faultdump::ConfigError> {
//!     // SAFETY: runs once at startup, before any fault can occur.
//!     let buffer = unsafe { &mut *core::ptr::addr_of_mut!(DUMP) };
//!     faultdump::set_dump_processor(buffer, Some(console))?;
//!     faultdump::set_call_stack_parameters(CallStackParams::new(
//!         0x0800_0000,
//!         0x0804_0000,
//!         0x2000_0000,
//!         0x2002_0000,
//!     ))?;
//!     faultdump::set_post_fault_action(PostFaultAction::Loop);
//!     Ok(())
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() on the fault path
#![deny(clippy::expect_used)] // no .expect() on the fault path
#![deny(clippy::panic)] // a panic inside the fault handler is a nested fault
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
// Pedantic lints suppressed for this crate:
#![allow(clippy::doc_markdown)] // register names and hex addresses in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // ConfigError variants are self-describing

pub mod context;
pub mod dump;
pub mod handler;
pub mod registry;
pub mod walk;

pub use context::{FaultContext, FaultKind};
pub use dump::{render, DumpWriter, DUMP_CAPACITY, MIN_DUMP_CAPACITY};
pub use handler::{claim_fault_path, handle, terminate, PostFaultAction, SystemControl};
pub use registry::{
    call_stack_parameters, set_call_stack_parameters, set_dump_processor, set_post_fault_action,
    ConfigError, DumpProcessor,
};
pub use walk::{
    walk, Backtrace, CallStackParams, SliceMemory, StackMemory, DEFAULT_GAP_LIMIT,
    MAX_BACKTRACE_DEPTH,
};
