//! Editor state — the cursor and the viewport it lives in.
//!
//! `EditorState` holds a cursor position and the size of the viewport. The
//! cursor always stays inside the viewport:
//!
//! ```text
//! 0 <= cx < cols        0 <= cy < rows
//! ```
//!
//! Movement keys move it one cell at a time and stop at the edges. Page
//! keys repeat the vertical step once per viewport row, so they also stop
//! at the edge instead of overshooting.

use tilde_term::{KeyEvent, Size};

/// Cursor position plus viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorState {
    cx: u16,
    cy: u16,
    rows: u16,
    cols: u16,
}

impl EditorState {
    /// A cursor at the top-left of a `size` viewport.
    ///
    /// Zero dimensions are raised to 1 so the cursor always has a cell.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            cx: 0,
            cy: 0,
            rows: size.rows.max(1),
            cols: size.cols.max(1),
        }
    }

    // -- Accessors ----------------------------------------------------------

    /// Cursor column, 0-indexed.
    #[inline]
    #[must_use]
    pub const fn cursor_col(&self) -> u16 {
        self.cx
    }

    /// Cursor row, 0-indexed.
    #[inline]
    #[must_use]
    pub const fn cursor_row(&self) -> u16 {
        self.cy
    }

    /// Viewport height in rows.
    #[inline]
    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    /// Viewport width in columns.
    #[inline]
    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.cols
    }

    // -- Movement -----------------------------------------------------------

    /// Apply a movement key. Keys that don't move the cursor are ignored.
    pub fn apply_movement(&mut self, key: KeyEvent) {
        match key {
            KeyEvent::ArrowLeft => self.move_left(),
            KeyEvent::ArrowRight => self.move_right(),
            KeyEvent::ArrowUp => self.move_up(),
            KeyEvent::ArrowDown => self.move_down(),
            KeyEvent::PageUp => {
                for _ in 0..self.rows {
                    self.move_up();
                }
            }
            KeyEvent::PageDown => {
                for _ in 0..self.rows {
                    self.move_down();
                }
            }
            KeyEvent::Byte(_) | KeyEvent::Escape => {}
        }
    }

    fn move_left(&mut self) {
        self.cx = self.cx.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cx + 1 < self.cols {
            self.cx += 1;
        }
    }

    fn move_up(&mut self) {
        self.cy = self.cy.saturating_sub(1);
    }

    fn move_down(&mut self) {
        if self.cy + 1 < self.rows {
            self.cy += 1;
        }
    }

    // -- Resize -------------------------------------------------------------

    /// Adopt a new viewport size, pulling the cursor inside if it fell out.
    pub fn resize(&mut self, size: Size) {
        self.rows = size.rows.max(1);
        self.cols = size.cols.max(1);
        self.cx = self.cx.min(self.cols - 1);
        self.cy = self.cy.min(self.rows - 1);
    }
}
