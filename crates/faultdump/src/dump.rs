//! Deterministic text rendering of a fault into a fixed-capacity buffer.
//!
//! The formatter must never overflow the registered buffer: it runs during
//! the most fragile code path the firmware has, and the memory next to the
//! dump buffer is exactly the kind of static state a corrupted write would
//! destroy. All output goes through [`DumpWriter`], a `core::fmt::Write`
//! adapter that silently truncates at capacity instead of erroring.
//!
//! # Dump format (stable)
//!
//! External tooling may parse the dump, so the layout below is fixed. All
//! register fields are 8-digit lowercase hex; backtrace entries are
//! innermost call first.
//!
//! ```text
//! !! fault: usage
//! r0   00000000  r1   00000001  r2   20000f00  r3   00000000
//! r12  00000000  sp   20001f40  lr   080001a5  pc   08000432
//! xpsr 61000000
//! cfsr 00020000  hfsr 40000000  mmfar 00000000  bfar 00000000
//! bt 00 08000431
//! bt 01 080003f7
//! ```

use core::fmt::{self, Write};

use crate::context::FaultContext;

/// Smallest buffer the registry accepts: enough for one full register line
/// (59 bytes including the newline).
pub const MIN_DUMP_CAPACITY: usize = 64;

/// Recommended buffer capacity. A complete dump — header, four register
/// lines, and [`crate::MAX_BACKTRACE_DEPTH`] backtrace entries at 15 bytes
/// each — totals under 460 bytes; 512 leaves headroom.
pub const DUMP_CAPACITY: usize = 512;

/// Truncating text writer over a caller-owned byte buffer.
///
/// Writes beyond capacity are dropped, never reported as errors: a partial
/// dump delivered intact beats a complete dump that overflowed into
/// neighbouring statics.
pub struct DumpWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> DumpWriter<'a> {
    /// Wrap `buf`; writing starts at offset 0.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Consume the writer and return the written prefix as text.
    ///
    /// If truncation split a multi-byte character the longest valid prefix
    /// is returned; every character this crate emits is ASCII, so in
    /// practice the full written prefix comes back.
    pub fn into_str(self) -> &'a str {
        let written = self.buf.get(..self.len).unwrap_or(&[]);
        match core::str::from_utf8(written) {
            Ok(text) => text,
            Err(err) => {
                let valid = written.get(..err.valid_up_to()).unwrap_or(&[]);
                // SAFETY: valid_up_to() is a UTF-8 boundary within `written`.
                unsafe { core::str::from_utf8_unchecked(valid) }
            }
        }
    }
}

impl Write for DumpWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let avail = self.buf.len().saturating_sub(self.len);
        let n = s.len().min(avail);
        let end = self.len.saturating_add(n);
        if let (Some(dst), Some(src)) = (self.buf.get_mut(self.len..end), s.as_bytes().get(..n)) {
            dst.copy_from_slice(src);
            self.len = end;
        }
        // Truncation is silent by contract.
        Ok(())
    }
}

/// Render `ctx` and `backtrace` into `buf` and return the written text.
///
/// Deterministic: the same inputs produce byte-identical output for any two
/// buffers of equal capacity. Output past the buffer capacity is silently
/// truncated.
pub fn render<'a>(ctx: &FaultContext, backtrace: &[u32], buf: &'a mut [u8]) -> &'a str {
    let mut w = DumpWriter::new(buf);
    // fmt errors cannot occur (write_str is infallible); results discarded.
    let _ = writeln!(w, "!! fault: {}", ctx.kind().as_str());
    let _ = writeln!(
        w,
        "r0   {:08x}  r1   {:08x}  r2   {:08x}  r3   {:08x}",
        ctx.r0, ctx.r1, ctx.r2, ctx.r3
    );
    let _ = writeln!(
        w,
        "r12  {:08x}  sp   {:08x}  lr   {:08x}  pc   {:08x}",
        ctx.r12, ctx.sp, ctx.lr, ctx.pc
    );
    let _ = writeln!(w, "xpsr {:08x}", ctx.xpsr);
    let _ = writeln!(
        w,
        "cfsr {:08x}  hfsr {:08x}  mmfar {:08x}  bfar {:08x}",
        ctx.cfsr, ctx.hfsr, ctx.mmfar, ctx.bfar
    );
    for (i, addr) in backtrace.iter().enumerate() {
        let _ = writeln!(w, "bt {i:02} {addr:08x}");
    }
    w.into_str()
}
