//! Process-wide fault handling configuration.
//!
//! The registry is the only mutable global in the subsystem. Its lifecycle
//! is strictly two-phase: the application writes it during startup, before
//! exceptions are enabled, and the fault path reads it exactly once. All
//! validation happens here, loudly, at registration time — bad walk bounds
//! discovered during a real fault would themselves be a fault-time hazard,
//! so nothing is deferred.
//!
//! Writers and the (single) fault-path reader are serialised with a
//! critical section; on the target that is a PRIMASK mask, which is safe to
//! take at HardFault priority.

use core::cell::RefCell;

use critical_section::Mutex;
use thiserror_no_std::Error;

use crate::dump::MIN_DUMP_CAPACITY;
use crate::handler::PostFaultAction;
use crate::walk::{CallStackParams, MAX_BACKTRACE_DEPTH};

/// Consumer of a finished dump. Called at most once per fault, from fault
/// context: no locks, no allocation, no way back into the subsystem.
pub type DumpProcessor = fn(&str);

/// Rejected configuration. Returned by the `set_*` functions during normal
/// execution — never produced on the fault path.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Dump buffer smaller than [`MIN_DUMP_CAPACITY`].
    #[error("dump buffer holds {got} bytes, minimum is {min}")]
    BufferTooSmall {
        /// Capacity of the rejected buffer.
        got: usize,
        /// Required minimum ([`MIN_DUMP_CAPACITY`]).
        min: usize,
    },
    /// Program text range is empty or inverted (`text_low >= text_high`).
    #[error("program text range is empty or inverted")]
    TextRangeEmpty,
    /// Stack range is empty or inverted (`stack_base >= stack_top`).
    #[error("stack range is empty or inverted")]
    StackRangeEmpty,
    /// Frame hint does not lie inside the stack range.
    #[error("frame hint {0:#010x} lies outside the stack range")]
    FrameHintOutOfRange(u32),
    /// `max_depth` is zero or exceeds [`MAX_BACKTRACE_DEPTH`].
    #[error("max depth {0} is zero or exceeds the backtrace capacity")]
    BadMaxDepth(usize),
    /// `gap_limit` is zero.
    #[error("gap limit must be at least 1")]
    BadGapLimit,
}

/// Registered dump buffer: raw pointer plus capacity.
///
/// Built from a `&'static mut [u8]`, so the storage outlives the process
/// and no one else holds a unique reference to it.
#[derive(Clone, Copy)]
pub(crate) struct DumpRegion {
    pub(crate) ptr: *mut u8,
    pub(crate) cap: usize,
}

// SAFETY: the region is created from a &'static mut [u8] surrendered at
// registration; after that the fault path is its only reader and writer
// (documented precondition, single core).
unsafe impl Send for DumpRegion {}

/// Aggregate configuration read once by the fault path.
pub(crate) struct Registry {
    pub(crate) dump: Option<DumpRegion>,
    pub(crate) processor: Option<DumpProcessor>,
    pub(crate) walk: Option<CallStackParams>,
    pub(crate) action: PostFaultAction,
}

impl Registry {
    const fn new() -> Self {
        Self {
            dump: None,
            processor: None,
            walk: None,
            action: PostFaultAction::Loop,
        }
    }
}

static REGISTRY: Mutex<RefCell<Registry>> = Mutex::new(RefCell::new(Registry::new()));

/// Copy of the registry taken at the start of the fault path.
#[derive(Clone, Copy)]
pub(crate) struct Snapshot {
    pub(crate) dump: Option<DumpRegion>,
    pub(crate) processor: Option<DumpProcessor>,
    pub(crate) walk: Option<CallStackParams>,
    pub(crate) action: PostFaultAction,
}

pub(crate) fn snapshot() -> Snapshot {
    critical_section::with(|cs| {
        let reg = REGISTRY.borrow_ref(cs);
        Snapshot {
            dump: reg.dump,
            processor: reg.processor,
            walk: reg.walk,
            action: reg.action,
        }
    })
}

/// Register the dump buffer and the consumer that will receive it.
///
/// The buffer is surrendered to the subsystem: the application must not
/// touch it again (the fault path writes it, and execution never returns to
/// normal code afterwards). `processor` may be `None`, which turns dump
/// dispatch into a no-op while keeping capture and formatting active.
///
/// # Errors
///
/// [`ConfigError::BufferTooSmall`] if the buffer cannot hold even one
/// register line.
pub fn set_dump_processor(
    buffer: &'static mut [u8],
    processor: Option<DumpProcessor>,
) -> Result<(), ConfigError> {
    if buffer.len() < MIN_DUMP_CAPACITY {
        return Err(ConfigError::BufferTooSmall {
            got: buffer.len(),
            min: MIN_DUMP_CAPACITY,
        });
    }
    let region = DumpRegion {
        ptr: buffer.as_mut_ptr(),
        cap: buffer.len(),
    };
    critical_section::with(|cs| {
        let mut reg = REGISTRY.borrow_ref_mut(cs);
        reg.dump = Some(region);
        reg.processor = processor;
    });
    Ok(())
}

/// Register the stack-walk bounds and tunables.
///
/// # Errors
///
/// Rejects empty/inverted text or stack ranges, a frame hint outside the
/// stack range, a depth of zero or beyond [`MAX_BACKTRACE_DEPTH`], and a
/// zero gap limit.
pub fn set_call_stack_parameters(params: CallStackParams) -> Result<(), ConfigError> {
    validate(&params)?;
    critical_section::with(|cs| {
        REGISTRY.borrow_ref_mut(cs).walk = Some(params);
    });
    Ok(())
}

/// Select the terminal behaviour executed after dump dispatch.
pub fn set_post_fault_action(action: PostFaultAction) {
    critical_section::with(|cs| {
        REGISTRY.borrow_ref_mut(cs).action = action;
    });
}

/// Currently registered walk parameters, if any.
///
/// The architecture layer uses this to size its raw stack memory window
/// before entering the portable handler.
pub fn call_stack_parameters() -> Option<CallStackParams> {
    critical_section::with(|cs| REGISTRY.borrow_ref(cs).walk)
}

fn validate(params: &CallStackParams) -> Result<(), ConfigError> {
    if params.text_low >= params.text_high {
        return Err(ConfigError::TextRangeEmpty);
    }
    if params.stack_base >= params.stack_top {
        return Err(ConfigError::StackRangeEmpty);
    }
    if let Some(hint) = params.frame_hint {
        if !params.in_stack(hint) {
            return Err(ConfigError::FrameHintOutOfRange(hint));
        }
    }
    if params.max_depth == 0 || params.max_depth > MAX_BACKTRACE_DEPTH {
        return Err(ConfigError::BadMaxDepth(params.max_depth));
    }
    if params.gap_limit == 0 {
        return Err(ConfigError::BadGapLimit);
    }
    Ok(())
}

/// Restore the registry to its power-on state.
///
/// Host-test support only; firmware never unregisters anything.
#[doc(hidden)]
pub fn reset_registry() {
    critical_section::with(|cs| {
        *REGISTRY.borrow_ref_mut(cs) = Registry::new();
    });
}
