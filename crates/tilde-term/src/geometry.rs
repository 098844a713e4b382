// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Window geometry — how many rows and columns the viewport has.
//
// Two ways to find out, tried in order:
//
//   1. ioctl(TIOCGWINSZ) on stdout. Cheap and exact when it works.
//   2. Ask the terminal. Push the cursor as far right and down as it will
//      go (CUF/CUD clamp at the edge), request a cursor-position report,
//      and parse `ESC [ rows ; cols R` off stdin. Some pseudo-terminals
//      report a zero-sized window through the ioctl; every VT100 answers
//      DSR 6.
//
// The report is read one byte at a time and capped at
// `PROBE_RESPONSE_LIMIT` bytes, so a terminal that never answers costs at
// most one read timeout per byte rather than a hang.

use std::io::{self, Write};
use std::os::unix::io::RawFd;

use crate::ansi;
use crate::error::{Error, Result};
use crate::input::{ByteSource, ESC};

/// Maximum bytes read while waiting for the `R` that ends a cursor report.
pub const PROBE_RESPONSE_LIMIT: usize = 32;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

impl Size {
    /// Total number of cells (`cols × rows`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.cols as u32 * self.rows as u32
    }

    /// Whether both dimensions are non-zero.
    #[inline]
    #[must_use]
    pub const fn is_usable(self) -> bool {
        self.cols > 0 && self.rows > 0
    }
}

// ─── Primary path: ioctl ────────────────────────────────────────────────────

/// Query the window size of `fd` via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if the call fails or reports a zero dimension.
#[must_use]
pub fn query_window_size(fd: RawFd) -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &raw mut ws) };

    let size = Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    };
    (result == 0 && size.is_usable()).then_some(size)
}

// ─── Fallback path: cursor-position report ──────────────────────────────────

/// Parse a cursor-position report: `ESC [ rows ; cols R`.
///
/// The trailing `R` is optional (the reader stops before it). Both numbers
/// must be positive decimal integers that fit in a `u16`.
#[must_use]
pub fn parse_cursor_report(report: &[u8]) -> Option<Size> {
    let body = report.strip_prefix(&[ESC, b'['])?;
    let body = body.strip_suffix(b"R").unwrap_or(body);
    let sep = body.iter().position(|&b| b == b';')?;

    let rows = parse_u16(&body[..sep])?;
    let cols = parse_u16(&body[sep + 1..])?;
    let size = Size { cols, rows };
    size.is_usable().then_some(size)
}

fn parse_u16(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Read a cursor-position report from `input`, up to and excluding `R`.
///
/// Stops at `R`, at a read window with no input, or after
/// [`PROBE_RESPONSE_LIMIT`] bytes, whichever comes first.
///
/// # Errors
///
/// Propagates unrecoverable read errors.
pub fn read_cursor_report(input: &mut impl ByteSource) -> io::Result<Vec<u8>> {
    let mut report = Vec::with_capacity(PROBE_RESPONSE_LIMIT);
    while report.len() < PROBE_RESPONSE_LIMIT {
        match input.read_byte()? {
            Some(b'R') | None => break,
            Some(byte) => report.push(byte),
        }
    }
    Ok(report)
}

/// Ask the terminal for its size by moving the cursor to the bottom-right
/// corner and requesting a cursor-position report.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if no parseable report arrives, or
/// [`Error::Io`] if the request can't be written or the reply can't be read.
pub fn probe_window_size(out: &mut impl Write, input: &mut impl ByteSource) -> Result<Size> {
    out.write_all(ansi::PROBE_BOTTOM_RIGHT)?;
    ansi::request_cursor_position(out)?;
    out.flush()?;

    let report = read_cursor_report(input)?;
    parse_cursor_report(&report).ok_or_else(|| {
        tracing::warn!(report = ?String::from_utf8_lossy(&report), "malformed cursor report");
        Error::Geometry {
            reason: "no valid cursor position report",
        }
    })
}

// ─── Resolver ───────────────────────────────────────────────────────────────

/// Resolve the viewport size: ioctl on `fd` first, cursor probe second.
///
/// # Errors
///
/// Returns [`Error::Geometry`] if both paths fail.
pub fn resolve_window_size(
    fd: RawFd,
    out: &mut impl Write,
    input: &mut impl ByteSource,
) -> Result<Size> {
    if let Some(size) = query_window_size(fd) {
        tracing::debug!(cols = size.cols, rows = size.rows, "window size from ioctl");
        return Ok(size);
    }
    let size = probe_window_size(out, input)?;
    tracing::debug!(cols = size.cols, rows = size.rows, "window size from cursor probe");
    Ok(size)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
