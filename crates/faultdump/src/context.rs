//! Immutable snapshot of the machine state at the moment of a fault.
//!
//! The architecture layer fills a [`FaultContext`] from the hardware-pushed
//! exception frame and the fault status registers, then hands it to
//! [`crate::handler::handle`]. The snapshot is created exactly once per
//! fault and never mutated afterwards.
//!
//! # References
//!
//! - ARM DDI0403E (ARMv7-M ARM) §B1.5.6 — exception entry stacking
//! - ARM DDI0403E §B3.2.15/16 — CFSR, HFSR bit assignments

/// Register snapshot taken on fault entry.
///
/// `r0`–`r3`, `r12`, `lr`, `pc` and `xpsr` are the eight words the hardware
/// pushes on exception entry. `sp` is the reconstructed pre-fault stack
/// pointer (frame base plus frame size and alignment padding), which is also
/// where the stack walk starts. The four status registers are read directly
/// from the System Control Block; capture never writes them, so the
/// write-one-to-clear CFSR bits stay set for a debugger to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultContext {
    /// General-purpose register r0 (stacked).
    pub r0: u32,
    /// General-purpose register r1 (stacked).
    pub r1: u32,
    /// General-purpose register r2 (stacked).
    pub r2: u32,
    /// General-purpose register r3 (stacked).
    pub r3: u32,
    /// Intra-procedure scratch register r12 (stacked).
    pub r12: u32,
    /// Pre-fault stack pointer, reconstructed from the frame address.
    pub sp: u32,
    /// Link register at the fault (stacked).
    pub lr: u32,
    /// Faulting instruction address (stacked return address).
    pub pc: u32,
    /// Program status register (stacked xPSR).
    pub xpsr: u32,
    /// Configurable Fault Status Register (MMFSR | BFSR | UFSR).
    pub cfsr: u32,
    /// HardFault Status Register.
    pub hfsr: u32,
    /// MemManage fault address register.
    pub mmfar: u32,
    /// BusFault address register.
    pub bfar: u32,
}

impl FaultContext {
    /// All-zero context, usable as the initial value of static storage.
    pub const ZERO: Self = Self {
        r0: 0,
        r1: 0,
        r2: 0,
        r3: 0,
        r12: 0,
        sp: 0,
        lr: 0,
        pc: 0,
        xpsr: 0,
        cfsr: 0,
        hfsr: 0,
        mmfar: 0,
        bfar: 0,
    };

    /// MemManage fault status byte (CFSR bits 7:0).
    pub const fn mmfsr(&self) -> u8 {
        (self.cfsr & 0xFF) as u8
    }

    /// BusFault status byte (CFSR bits 15:8).
    pub const fn bfsr(&self) -> u8 {
        ((self.cfsr >> 8) & 0xFF) as u8
    }

    /// UsageFault status halfword (CFSR bits 31:16).
    pub const fn ufsr(&self) -> u16 {
        (self.cfsr >> 16) as u16
    }

    /// Coarse classification of this fault.
    pub const fn kind(&self) -> FaultKind {
        FaultKind::classify(self.cfsr, self.hfsr)
    }
}

impl Default for FaultContext {
    fn default() -> Self {
        Self::ZERO
    }
}

/// HFSR.VECTTBL — BusFault on a vector table read during exception entry.
const HFSR_VECTTBL: u32 = 1 << 1;
/// HFSR.FORCED — a configurable fault escalated to HardFault.
const HFSR_FORCED: u32 = 1 << 30;

/// Coarse fault classification derived from CFSR/HFSR.
///
/// This is a reading aid for the first dump line only; the raw register
/// values are always dumped alongside it, so no information is lost if the
/// classification is too coarse for the case at hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// MPU violation or access to a privileged-only region (MMFSR set).
    MemManage,
    /// Bus error on an instruction or data access (BFSR set).
    Bus,
    /// Undefined instruction, invalid EPSR state, invalid EXC_RETURN,
    /// unaligned access or divide-by-zero (UFSR set).
    Usage,
    /// BusFault on a vector table read during exception entry.
    VectorTable,
    /// Escalated to HardFault with no configurable-fault status recorded.
    Forced,
    /// No status bit explains the fault (debug event, or status already
    /// cleared).
    Unknown,
}

impl FaultKind {
    /// Classify from the raw status registers.
    ///
    /// Order matters: a vector table read failure is reported first because
    /// it also leaves BFSR clear; then the three configurable fault classes
    /// in MemManage → Bus → Usage order (matching exception numbers 4–6).
    pub const fn classify(cfsr: u32, hfsr: u32) -> Self {
        if hfsr & HFSR_VECTTBL != 0 {
            Self::VectorTable
        } else if cfsr & 0xFF != 0 {
            Self::MemManage
        } else if (cfsr >> 8) & 0xFF != 0 {
            Self::Bus
        } else if cfsr >> 16 != 0 {
            Self::Usage
        } else if hfsr & HFSR_FORCED != 0 {
            Self::Forced
        } else {
            Self::Unknown
        }
    }

    /// Short lowercase name used in the dump header line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MemManage => "mem-manage",
            Self::Bus => "bus",
            Self::Usage => "usage",
            Self::VectorTable => "vector-table",
            Self::Forced => "forced",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_usage_fault() {
        // UFSR.INVSTATE (bit 17 of CFSR) with HFSR.FORCED — the classic
        // call-through-a-bad-function-pointer escalation.
        let kind = FaultKind::classify(0x0002_0000, HFSR_FORCED);
        assert_eq!(kind, FaultKind::Usage);
    }

    #[test]
    fn classify_bus_fault() {
        // BFSR.PRECISERR (bit 9 of CFSR)
        assert_eq!(FaultKind::classify(0x0000_0200, HFSR_FORCED), FaultKind::Bus);
    }

    #[test]
    fn classify_mem_manage_beats_bus() {
        // Both MMFSR and BFSR set: MemManage wins (lowest exception number).
        assert_eq!(FaultKind::classify(0x0000_0182, 0), FaultKind::MemManage);
    }

    #[test]
    fn classify_vector_table_read() {
        assert_eq!(FaultKind::classify(0, HFSR_VECTTBL), FaultKind::VectorTable);
    }

    #[test]
    fn classify_forced_without_status() {
        assert_eq!(FaultKind::classify(0, HFSR_FORCED), FaultKind::Forced);
    }

    #[test]
    fn classify_nothing_set() {
        assert_eq!(FaultKind::classify(0, 0), FaultKind::Unknown);
    }

    #[test]
    fn status_byte_accessors() {
        let ctx = FaultContext {
            cfsr: 0x0002_0182,
            ..FaultContext::ZERO
        };
        assert_eq!(ctx.mmfsr(), 0x82);
        assert_eq!(ctx.bfsr(), 0x01);
        assert_eq!(ctx.ufsr(), 0x0002);
    }
}
