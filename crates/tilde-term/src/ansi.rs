// SPDX-License-Identifier: MIT
//
// VT100 escape sequences used by the editor.
//
// Each encoder appends one control sequence to a writer and nothing else.
// The set is deliberately tiny: cursor placement and visibility, a cursor
// position query, full-screen clear, and erase-to-end-of-line. Callers
// decide ordering; nothing here tracks terminal state.
//
// Coordinates passed in are 0-based columns and rows. CUP on the wire is
// 1-based, so `cursor_to` adds one to each, widening to u32 so the last
// representable cell never wraps.

use std::io::{self, Write};

/// Cursor forward 999, then down 999.
///
/// CUF and CUD stop at the screen edge, so this lands on the last cell
/// whatever the real size is. Used before a cursor-position report.
pub const PROBE_BOTTOM_RIGHT: &[u8] = b"\x1b[999C\x1b[999B";

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Place the cursor at column `x`, row `y` (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// CUP with no parameters: top-left cell.
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

/// DECTCEM reset.
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// DECTCEM set.
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Ask the terminal where the cursor is (DSR 6).
///
/// The terminal answers on stdin with `ESC [ row ; col R`.
#[inline]
pub fn request_cursor_position(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// ED 2: erase the whole display. The cursor does not move.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// EL 0: erase from the cursor to the end of its line.
#[inline]
pub fn erase_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[K")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
