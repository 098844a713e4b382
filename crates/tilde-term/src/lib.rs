// SPDX-License-Identifier: MIT
//
// tilde-term — Terminal front-end for the tilde editor.
//
// Puts a VT100-compatible terminal into raw mode, decodes the byte stream
// it sends back into key events, works out how big the window is, and
// writes each frame to the screen in a single write. Everything here talks
// to the terminal directly through termios and ANSI escape sequences; no
// terminfo, no TUI framework.
//
//   terminal   → raw mode, attribute snapshots, panic-safe restore
//   geometry   → window size via ioctl or cursor-position probe
//   input      → byte sources and the escape-sequence key decoder
//   ansi       → escape sequence encoders
//   output     → the per-frame output buffer and an unbuffered fd writer
//   event_loop → paint / wait / dispatch loop and the `App` trait

pub mod ansi;
pub mod error;
pub mod event_loop;
pub mod geometry;
pub mod input;
pub mod output;
pub mod terminal;

#[cfg(test)]
mod test_pty;

pub use error::{Error, Result};
pub use event_loop::{Action, App, EventLoop, LoopConfig};
pub use geometry::Size;
pub use input::{KeyDecoder, KeyEvent};
pub use output::OutputBuffer;
