//! View — paints the editor state into a frame.
//!
//! There is no text buffer yet, so every row of the viewport is a "tilde
//! line": a `~` marker in column 0. One row, a third of the way down, carries
//! the welcome banner centered horizontally.
//!
//! A frame is a complete, self-contained redraw:
//!
//! ```text
//! ESC[?25l  ESC[H                  hide cursor, go home
//! ~ ESC[K \r\n                     one line per row, each erased to EOL,
//! ~        Tilde editor ... ESC[K  separators between rows only
//! ...
//! ~ ESC[K                          last row: no trailing \r\n
//! ESC[H  ESC[{cy+1};{cx+1}H        home, then the real cursor position
//! ESC[?25h                         show cursor
//! ```
//!
//! No trailing newline after the last row, so the terminal never scrolls.
//! Each row is erased to end-of-line as it's drawn rather than clearing the
//! whole screen first, which would flash.

use tilde_term::ansi;
use tilde_term::OutputBuffer;
use unicode_width::UnicodeWidthChar;

use crate::state::EditorState;

/// Text shown on the banner row.
pub const BANNER: &str = concat!("Tilde editor -- version ", env!("CARGO_PKG_VERSION"));

/// Render a complete frame for `state` into a fresh buffer.
#[must_use]
pub fn render(state: &EditorState) -> OutputBuffer {
    let mut out = OutputBuffer::new();
    render_frame(state, &mut out);
    out
}

/// Append a complete frame for `state` to `out`.
pub fn render_frame(state: &EditorState, out: &mut OutputBuffer) {
    // Writes to an OutputBuffer never fail; a dropped append is logged there.
    let _ = paint(state, out);
}

fn paint(state: &EditorState, out: &mut OutputBuffer) -> std::io::Result<()> {
    ansi::cursor_hide(out)?;
    ansi::cursor_home(out)?;

    let rows = state.rows();
    let banner_row = rows / 3;
    for y in 0..rows {
        if y == banner_row {
            draw_banner_row(out, state.cols());
        } else {
            out.append(b"~");
        }
        ansi::erase_line(out)?;
        if y + 1 < rows {
            out.append(b"\r\n");
        }
    }

    ansi::cursor_home(out)?;
    ansi::cursor_to(out, state.cursor_col(), state.cursor_row())?;
    ansi::cursor_show(out)
}

/// The banner, centered in `cols`, with the row's `~` when there's room.
fn draw_banner_row(out: &mut OutputBuffer, cols: u16) {
    let text = truncate_to_width(BANNER, usize::from(cols));
    let width = display_width(text);
    let mut padding = (usize::from(cols) - width) / 2;

    if padding > 0 {
        out.append(b"~");
        padding -= 1;
    }
    for _ in 0..padding {
        out.append(b" ");
    }
    out.append(text.as_bytes());
}

/// Longest prefix of `s` that fits in `max` display columns.
fn truncate_to_width(s: &str, max: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in s.char_indices() {
        let w = ch.width().unwrap_or(0);
        if used + w > max {
            return &s[..idx];
        }
        used += w;
    }
    s
}

fn display_width(s: &str) -> usize {
    s.chars().map(|ch| ch.width().unwrap_or(0)).sum()
}
