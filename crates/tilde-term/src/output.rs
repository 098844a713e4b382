// SPDX-License-Identifier: MIT
//
// Output buffering — one frame, one write.
//
// Every escape sequence and every glyph of a frame is appended to an
// `OutputBuffer` first. A single flush at frame end writes it all at once.
// Terminals that see a redraw as hundreds of small writes repaint
// mid-frame, which shows up as flicker and tearing; a single write lets
// the emulator parse the whole frame before it repaints.
//
// The buffer is append-only. It is never partially flushed: `flush_to`
// either writes everything or returns the error, and the contents are
// dropped either way.
//
// `TtyOutput` is the other half: a writer straight onto a file descriptor.
// `io::Stdout` is line-buffered and splits a frame at its last newline,
// which would turn one frame into two writes.
#![allow(unsafe_code)]

use std::io::{self, Write};
use std::os::unix::io::RawFd;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates ANSI output for a single `write()` call.
///
/// Default capacity: 4 KB — a full 80×24 frame of tildes and escapes fits
/// without reallocation.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 4096;

impl OutputBuffer {
    /// Create an empty buffer with default capacity (4 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes (for testing and debugging).
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Copy `bytes` onto the end of the buffer.
    ///
    /// If the buffer cannot grow, the append is dropped and the frame
    /// renders without it. A short frame is preferable to aborting with
    /// the terminal still in raw mode.
    pub fn append(&mut self, bytes: &[u8]) {
        if self.buf.try_reserve(bytes.len()).is_err() {
            tracing::warn!(len = bytes.len(), "render buffer append dropped");
            return;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Write the whole frame to `w` in one `write_all`, then discard it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let result = w.write_all(&self.buf).and_then(|()| w.flush());
        self.buf.clear();
        result
    }

    /// Write the whole frame to stdout and discard it.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush_stdout(&mut self) -> io::Result<()> {
        self.flush_to(&mut TtyOutput::stdout())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Intentionally a no-op. Real flushing via flush_to() / flush_stdout().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── TtyOutput ───────────────────────────────────────────────────────────────

/// Unbuffered writer on a raw file descriptor.
///
/// Each `write` is exactly one `write(2)`; `write_all` only loops when the
/// kernel accepts part of the buffer.
#[derive(Debug, Clone, Copy)]
pub struct TtyOutput {
    fd: RawFd,
}

impl TtyOutput {
    /// Write to the process's standard output.
    #[must_use]
    pub const fn stdout() -> Self {
        Self {
            fd: libc::STDOUT_FILENO,
        }
    }

    /// Write to an arbitrary descriptor. The caller keeps ownership of it.
    #[must_use]
    pub const fn from_fd(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl Write for TtyOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = unsafe { libc::write(self.fd, buf.as_ptr().cast::<libc::c_void>(), buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
        Ok(n as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
