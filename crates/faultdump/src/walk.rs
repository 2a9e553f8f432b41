//! Heuristic call-stack walker.
//!
//! Architectures without a reliable frame pointer chain (ARM with
//! `-fomit-frame-pointer`, which is every release build) leave only one
//! portable option: scan the stack upward from the faulting stack pointer
//! and keep every word that looks like a return address, i.e. falls inside
//! the program text range. The result is approximate by construction —
//! stale frames and spilled function pointers can produce extra entries —
//! but it is cheap, allocation-free, and works with a partially corrupted
//! stack.
//!
//! # Ordering
//!
//! Backtrace entries are **innermost call first**: index 0 is the deepest
//! candidate accepted by the scan, the entry nearest the stack pointer is
//! reported last. This ordering is part of the dump's stable external
//! format.
//!
//! # Termination
//!
//! The walk stops at the first of: `max_depth` accepted candidates, the
//! cursor reaching the stack-top bound, `gap_limit` consecutive
//! non-candidate words, or an unreadable word. An empty or partial result
//! is a valid outcome, never an error.

use heapless::Vec;

/// Hard upper bound on backtrace entries, and the capacity of [`Backtrace`].
pub const MAX_BACKTRACE_DEPTH: usize = 16;

/// Default number of consecutive non-candidate words after which the walk
/// gives up. Conservative: deep frames with large locals easily exceed a
/// handful of words, but a run of 32 without a single return address means
/// the interesting part of the stack is behind us.
pub const DEFAULT_GAP_LIMIT: usize = 32;

/// Bounded, ordered sequence of candidate return addresses.
pub type Backtrace = Vec<u32, MAX_BACKTRACE_DEPTH>;

/// Walk bounds and tunables, registered once via
/// [`crate::registry::set_call_stack_parameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CallStackParams {
    /// Optional start-of-walk override. `None` starts at the faulting stack
    /// pointer; a hint outside the stack range is ignored in favour of it.
    pub frame_hint: Option<u32>,
    /// Inclusive low bound of executable program text.
    pub text_low: u32,
    /// Exclusive high bound of executable program text.
    pub text_high: u32,
    /// Inclusive low bound of the stack region (stacks grow down towards it).
    pub stack_base: u32,
    /// Exclusive high bound of the stack region (the initial stack pointer).
    pub stack_top: u32,
    /// Maximum accepted candidates, capped at [`MAX_BACKTRACE_DEPTH`].
    pub max_depth: usize,
    /// Consecutive non-candidate words tolerated before giving up.
    pub gap_limit: usize,
}

impl CallStackParams {
    /// Parameters for the given text and stack ranges with default depth and
    /// gap tunables.
    pub const fn new(text_low: u32, text_high: u32, stack_base: u32, stack_top: u32) -> Self {
        Self {
            frame_hint: None,
            text_low,
            text_high,
            stack_base,
            stack_top,
            max_depth: MAX_BACKTRACE_DEPTH,
            gap_limit: DEFAULT_GAP_LIMIT,
        }
    }

    /// `true` if `word` lies inside the program text range.
    pub const fn is_text(&self, word: u32) -> bool {
        word >= self.text_low && word < self.text_high
    }

    /// `true` if `addr` lies inside the stack range.
    pub const fn in_stack(&self, addr: u32) -> bool {
        addr >= self.stack_base && addr < self.stack_top
    }
}

/// Read access to stack memory during the fault path.
///
/// The seam exists for two reasons: the real implementation must refuse to
/// read outside the configured stack range (a wild read inside the fault
/// handler is itself a nested fault), and host tests need to supply
/// synthetic stacks. `None` means "unreadable" and terminates the walk.
pub trait StackMemory {
    /// Read the 32-bit word at `addr`, or `None` if the address is
    /// unreadable (misaligned or out of bounds).
    fn read_word(&self, addr: u32) -> Option<u32>;
}

/// Slice-backed [`StackMemory`] for host-side simulation and tests.
///
/// Also records the highest address handed to [`StackMemory::read_word`],
/// so tests can assert the walker never reads past the stack-top bound.
pub struct SliceMemory<'a> {
    base: u32,
    words: &'a [u32],
    highest_read: core::cell::Cell<Option<u32>>,
}

impl<'a> SliceMemory<'a> {
    /// Present `words` as stack memory starting at address `base`.
    pub const fn new(base: u32, words: &'a [u32]) -> Self {
        Self {
            base,
            words,
            highest_read: core::cell::Cell::new(None),
        }
    }

    /// Highest address that has been read through this memory, if any.
    pub fn highest_read(&self) -> Option<u32> {
        self.highest_read.get()
    }
}

impl StackMemory for SliceMemory<'_> {
    fn read_word(&self, addr: u32) -> Option<u32> {
        if addr & 3 != 0 {
            return None;
        }
        let offset = addr.checked_sub(self.base)?;
        let max = self.highest_read.get().map_or(addr, |h| h.max(addr));
        self.highest_read.set(Some(max));
        self.words.get((offset / 4) as usize).copied()
    }
}

/// Word-align `addr` upward, failing on address-space wraparound.
const fn align_word_up(addr: u32) -> Option<u32> {
    match addr.checked_add(3) {
        Some(a) => Some(a & !3),
        None => None,
    }
}

/// Build a bounded backtrace starting from the faulting stack pointer `sp`.
///
/// See the module docs for the acceptance criterion, ordering, and
/// termination conditions. Returns an empty backtrace when the start
/// address lies outside the configured stack range (capture anomaly).
pub fn walk(sp: u32, params: &CallStackParams, mem: &impl StackMemory) -> Backtrace {
    let mut trace = Backtrace::new();
    let depth = params.max_depth.min(MAX_BACKTRACE_DEPTH);
    if depth == 0 {
        return trace;
    }

    let start = match params.frame_hint {
        Some(hint) if params.in_stack(hint) => hint,
        _ => sp,
    };
    let Some(mut cursor) = align_word_up(start) else {
        return trace;
    };
    if !params.in_stack(cursor) {
        return trace;
    }

    let mut gap = 0usize;
    while cursor < params.stack_top && trace.len() < depth {
        let Some(word) = mem.read_word(cursor) else {
            break;
        };
        if params.is_text(word) {
            // Capacity is MAX_BACKTRACE_DEPTH and depth never exceeds it.
            if trace.push(word).is_err() {
                break;
            }
            gap = 0;
        } else {
            gap = gap.saturating_add(1);
            if gap >= params.gap_limit {
                break;
            }
        }
        cursor = match cursor.checked_add(4) {
            Some(next) => next,
            None => break,
        };
    }

    // Scan order is outermost-last-pushed first; flip to innermost-first.
    trace.reverse();
    trace
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects, clippy::indexing_slicing, clippy::unwrap_used)]
mod tests {
    use super::*;

    const TEXT_LOW: u32 = 0x1000;
    const TEXT_HIGH: u32 = 0x2000;
    const STACK_BASE: u32 = 0x2000_0000;

    fn params(stack_words: usize) -> CallStackParams {
        CallStackParams::new(
            TEXT_LOW,
            TEXT_HIGH,
            STACK_BASE,
            STACK_BASE + (stack_words as u32) * 4,
        )
    }

    #[test]
    fn three_candidates_innermost_first() {
        let words = [0x1100, 0x1200, 0x1300, 0, 0, 0];
        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE, &params(words.len()), &mem);
        assert_eq!(trace.as_slice(), &[0x1300, 0x1200, 0x1100]);
    }

    #[test]
    fn out_of_range_words_are_skipped() {
        let words = [0x0042, 0x1100, 0xFFFF_FFFF, 0x1FFC, 0x2000, 0x0FFF];
        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE, &params(words.len()), &mem);
        // 0x2000 is one past text_high, 0x0FFF one below text_low.
        assert_eq!(trace.as_slice(), &[0x1FFC, 0x1100]);
    }

    #[test]
    fn sp_below_stack_range_yields_empty_trace() {
        let words = [0x1100; 4];
        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE - 0x100, &params(words.len()), &mem);
        assert!(trace.is_empty());
        assert_eq!(mem.highest_read(), None);
    }

    #[test]
    fn sp_at_stack_top_yields_empty_trace() {
        let words = [0x1100; 4];
        let p = params(words.len());
        let mem = SliceMemory::new(STACK_BASE, &words);
        assert!(walk(p.stack_top, &p, &mem).is_empty());
    }

    #[test]
    fn misaligned_sp_is_aligned_up() {
        let words = [0x1100, 0x1200, 0, 0];
        let mem = SliceMemory::new(STACK_BASE, &words);
        // Aligning 0x2000_0001 up lands on the second word.
        let trace = walk(STACK_BASE + 1, &params(words.len()), &mem);
        assert_eq!(trace.as_slice(), &[0x1200]);
    }

    #[test]
    fn max_depth_stops_walk_without_reading_past_stack_top() {
        let mut words = [0u32; MAX_BACKTRACE_DEPTH];
        for (i, w) in words.iter_mut().enumerate() {
            *w = TEXT_LOW + (i as u32) * 4;
        }
        let p = params(words.len());
        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE, &p, &mem);
        assert_eq!(trace.len(), MAX_BACKTRACE_DEPTH);
        // The final accepted word sits just below stack_top; nothing past it
        // may be touched.
        assert!(mem.highest_read().unwrap() < p.stack_top);
    }

    #[test]
    fn custom_max_depth_truncates() {
        let words = [0x1100, 0x1104, 0x1108, 0x110C];
        let mut p = params(words.len());
        p.max_depth = 2;
        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE, &p, &mem);
        // First two accepted in scan order, then reversed.
        assert_eq!(trace.as_slice(), &[0x1104, 0x1100]);
    }

    #[test]
    fn gap_limit_terminates_walk() {
        // One candidate, then a run of junk longer than the gap limit,
        // then another candidate that must NOT be reached.
        let mut words = [0u32; 40];
        words[0] = 0x1100;
        words[39] = 0x1200;
        let mut p = params(words.len());
        p.gap_limit = 8;
        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE, &p, &mem);
        assert_eq!(trace.as_slice(), &[0x1100]);
    }

    #[test]
    fn gap_counter_resets_on_acceptance() {
        // Gaps of 3 between candidates stay below a gap limit of 4.
        let words = [0x1100, 0, 0, 0, 0x1200, 0, 0, 0, 0x1300];
        let mut p = params(words.len());
        p.gap_limit = 4;
        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE, &p, &mem);
        assert_eq!(trace.as_slice(), &[0x1300, 0x1200, 0x1100]);
    }

    #[test]
    fn unreadable_word_ends_walk_with_partial_trace() {
        // Memory shorter than the configured stack range: reads past the
        // slice return None.
        let words = [0x1100, 0x1200];
        let mem = SliceMemory::new(STACK_BASE, &words);
        let mut p = params(words.len());
        p.stack_top = STACK_BASE + 0x100;
        let trace = walk(STACK_BASE, &p, &mem);
        assert_eq!(trace.as_slice(), &[0x1200, 0x1100]);
    }

    #[test]
    fn frame_hint_overrides_sp() {
        let words = [0x1100, 0x1200, 0x1300, 0];
        let mut p = params(words.len());
        p.frame_hint = Some(STACK_BASE + 8);
        let mem = SliceMemory::new(STACK_BASE, &words);
        // Hint skips the first two words.
        let trace = walk(STACK_BASE, &p, &mem);
        assert_eq!(trace.as_slice(), &[0x1300]);
    }

    #[test]
    fn out_of_range_frame_hint_falls_back_to_sp() {
        let words = [0x1100, 0, 0, 0];
        let mut p = params(words.len());
        p.frame_hint = Some(0x1234_5678);
        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE, &p, &mem);
        assert_eq!(trace.as_slice(), &[0x1100]);
    }
}
