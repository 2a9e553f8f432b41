//! Property-based tests for the formatter and the stack walker.
//! Verifies the safety invariants hold for ALL inputs, not just fixed
//! examples. These drive the walker and formatter directly (no registry),
//! so they are safe to run in parallel with everything else.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use faultdump::{render, walk, CallStackParams, FaultContext, SliceMemory, MAX_BACKTRACE_DEPTH};

fn arbitrary_context(regs: [u32; 13]) -> FaultContext {
    FaultContext {
        r0: regs[0],
        r1: regs[1],
        r2: regs[2],
        r3: regs[3],
        r12: regs[4],
        sp: regs[5],
        lr: regs[6],
        pc: regs[7],
        xpsr: regs[8],
        cfsr: regs[9],
        hfsr: regs[10],
        mmfar: regs[11],
        bfar: regs[12],
    }
}

proptest::proptest! {
    /// The dump never exceeds the buffer capacity and is always valid text,
    /// for any register state, any backtrace, any capacity.
    #[test]
    fn dump_is_always_bounded_text(
        regs in proptest::array::uniform13(0u32..=u32::MAX),
        bt in proptest::collection::vec(0u32..=u32::MAX, 0..=MAX_BACKTRACE_DEPTH),
        cap in 0usize..=1024,
    ) {
        let ctx = arbitrary_context(regs);
        let mut buf = vec![0u8; cap];
        // Owned copy so the buffer can be inspected alongside the result.
        let dump = render(&ctx, &bt, &mut buf).to_owned();
        assert!(dump.len() <= cap);
        // Valid text by construction; verify the bytes really round-trip.
        assert_eq!(dump.as_bytes(), &buf[..dump.len()]);
    }

    /// Parsing the register fields back out of an untruncated dump yields
    /// exactly the input values.
    #[test]
    fn register_section_round_trips(regs in proptest::array::uniform13(0u32..=u32::MAX)) {
        let ctx = arbitrary_context(regs);
        let mut buf = vec![0u8; faultdump::DUMP_CAPACITY];
        let dump = render(&ctx, &[], &mut buf);

        let mut fields = std::collections::HashMap::new();
        for line in dump.lines().filter(|l| !l.starts_with("!! ")) {
            let mut tokens = line.split_whitespace();
            while let (Some(name), Some(value)) = (tokens.next(), tokens.next()) {
                fields.insert(name.to_string(), u32::from_str_radix(value, 16).unwrap());
            }
        }
        assert_eq!(fields["r0"], ctx.r0);
        assert_eq!(fields["r3"], ctx.r3);
        assert_eq!(fields["r12"], ctx.r12);
        assert_eq!(fields["sp"], ctx.sp);
        assert_eq!(fields["lr"], ctx.lr);
        assert_eq!(fields["pc"], ctx.pc);
        assert_eq!(fields["xpsr"], ctx.xpsr);
        assert_eq!(fields["cfsr"], ctx.cfsr);
        assert_eq!(fields["hfsr"], ctx.hfsr);
        assert_eq!(fields["mmfar"], ctx.mmfar);
        assert_eq!(fields["bfar"], ctx.bfar);
    }

    /// Identical inputs into two equal-capacity buffers produce
    /// byte-identical dumps.
    #[test]
    fn rendering_is_deterministic(
        regs in proptest::array::uniform13(0u32..=u32::MAX),
        bt in proptest::collection::vec(0u32..=u32::MAX, 0..=MAX_BACKTRACE_DEPTH),
        cap in 64usize..=512,
    ) {
        let ctx = arbitrary_context(regs);
        let mut a = vec![0u8; cap];
        let mut b = vec![0u8; cap];
        assert_eq!(render(&ctx, &bt, &mut a), render(&ctx, &bt, &mut b));
    }

    /// A synthetic stack with exactly N in-range return addresses,
    /// interleaved with sub-gap-limit junk runs, walks to exactly
    /// min(N, max_depth) entries, innermost first.
    #[test]
    fn planted_candidates_are_all_found(
        n in 0usize..=24,
        gaps in proptest::collection::vec(0usize..8, 24),
        depth in 1usize..=MAX_BACKTRACE_DEPTH,
    ) {
        const TEXT_LOW: u32 = 0x1000;
        const STACK_BASE: u32 = 0x2000_0000;

        let mut words: Vec<u32> = Vec::new();
        let mut planted: Vec<u32> = Vec::new();
        for i in 0..n {
            for _ in 0..gaps[i] {
                words.push(0); // below text_low: never a candidate
            }
            let candidate = TEXT_LOW + (i as u32) * 4;
            planted.push(candidate);
            words.push(candidate);
        }
        words.push(0); // ensure a non-empty region even for n = 0

        let mut params = CallStackParams::new(
            TEXT_LOW,
            0x2000,
            STACK_BASE,
            STACK_BASE + (words.len() as u32) * 4,
        );
        params.max_depth = depth;
        params.gap_limit = 8;

        let mem = SliceMemory::new(STACK_BASE, &words);
        let trace = walk(STACK_BASE, &params, &mem);

        let expected: Vec<u32> = planted.iter().copied().take(depth).rev().collect();
        assert_eq!(trace.as_slice(), expected.as_slice());
    }
}
