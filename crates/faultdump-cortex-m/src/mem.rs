//! Raw stack memory access for the walker.

use faultdump::{CallStackParams, StackMemory};

/// [`StackMemory`] over the physical stack region.
///
/// Reads are volatile and strictly bounds-checked against the window given
/// at construction: the walker asking about an address outside the
/// configured stack range gets `None` back instead of a wild load. A wild
/// load here would be a nested fault inside the fault handler — the one
/// failure mode this subsystem exists to report, not to cause.
#[derive(Debug, Clone, Copy)]
pub struct RawStackMemory {
    base: u32,
    top: u32,
}

impl RawStackMemory {
    /// Window covering `[base, top)`.
    pub const fn new(base: u32, top: u32) -> Self {
        Self { base, top }
    }

    /// Window over the stack range of `params`.
    pub const fn from_params(params: &CallStackParams) -> Self {
        Self::new(params.stack_base, params.stack_top)
    }

    /// Zero-sized window; every read fails. Used when no walk parameters
    /// were ever registered.
    pub const fn empty() -> Self {
        Self { base: 0, top: 0 }
    }
}

impl StackMemory for RawStackMemory {
    fn read_word(&self, addr: u32) -> Option<u32> {
        if addr & 3 != 0 {
            return None;
        }
        let end = addr.checked_add(4)?;
        if addr < self.base || end > self.top {
            return None;
        }
        // SAFETY: `addr` is word-aligned and the full word lies inside the
        // application-registered stack region, which is plain RAM.
        Some(unsafe { core::ptr::read_volatile(addr as *const u32) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_misaligned_and_out_of_window_addresses() {
        let mem = RawStackMemory::new(0x2000_0000, 0x2000_1000);
        assert_eq!(mem.read_word(0x2000_0002), None);
        assert_eq!(mem.read_word(0x1FFF_FFFC), None);
        assert_eq!(mem.read_word(0x2000_1000), None);
        // Last word of the window would be readable on the target; the
        // address check itself must accept it. (No dereference on the host.)
        let empty = RawStackMemory::empty();
        assert_eq!(empty.read_word(0), None);
    }

    #[test]
    fn window_end_is_exclusive_for_whole_words() {
        let mem = RawStackMemory::new(0x2000_0000, 0x2000_0008);
        // 0x2000_0004..0x2000_0008 fits; 0x2000_0008 does not.
        assert_eq!(mem.read_word(0x2000_0008), None);
        assert_eq!(mem.read_word(u32::MAX & !3), None);
    }
}
