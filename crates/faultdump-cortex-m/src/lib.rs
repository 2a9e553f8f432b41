//! ARMv7-M architecture layer for the `faultdump` subsystem.
//!
//! Everything non-portable lives here, confined to three small modules:
//!
//! - [`trap`] — the naked HardFault entry stub and the exception-frame /
//!   fault-status capture (hardware targets only);
//! - [`mem`] — bounds-checked volatile reads over the configured stack
//!   region, feeding the portable stack walker;
//! - [`system`] — the reset/halt terminal operations.
//!
//! Linking the handler into a firmware image takes one line in the binary
//! crate:
//!
//! ```ignore
//! use faultdump_cortex_m as _; // provides the HardFault vector
//! ```
//!
//! The vector table wiring itself is done by `cortex-m-rt`; this crate
//! claims the HardFault vector without a trampoline, so the CPU branches
//! straight into the naked stub with the machine exactly as the fault left
//! it.
//!
//! The trap module only compiles for `target_os = "none"` ARM targets; on
//! the host this crate still builds (and `mem`/`system` still type-check)
//! so `cargo check`/`cargo test` over the whole workspace stay usable.

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)] // a panic inside the fault handler is a nested fault
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::doc_markdown)] // register names (EXC_RETURN, CFSR) in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod mem;
pub mod system;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod trap;

pub use mem::RawStackMemory;
pub use system::ScbSystemControl;
