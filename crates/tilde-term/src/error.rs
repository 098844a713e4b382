// SPDX-License-Identifier: MIT
//
// Error kinds for terminal control.
//
// Every variant here is fatal to the editor: the caller restores the
// terminal, prints the Display form as a single diagnostic line, and exits
// with status 1. Recoverable conditions (EINTR, read timeouts, malformed
// escape sequences) never become errors; they are absorbed where they occur.

use std::io;

use thiserror::Error;

/// Result alias for terminal operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal terminal-control error.
#[derive(Debug, Error)]
pub enum Error {
    /// Getting or setting line-discipline attributes failed.
    ///
    /// `op` names the failing primitive (`tcgetattr` / `tcsetattr`), so the
    /// message reads like `tcgetattr: Inappropriate ioctl for device`.
    #[error("{op}: {source}")]
    TerminalConfig {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// Neither the window-size ioctl nor the cursor-report probe produced a
    /// usable viewport size.
    #[error("unable to determine window size: {reason}")]
    Geometry { reason: &'static str },

    /// Unrecoverable read or write failure on the terminal.
    #[error("terminal I/O: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a [`TerminalConfig`](Self::TerminalConfig) from the current `errno`.
    #[must_use]
    pub fn last_os(op: &'static str) -> Self {
        Self::TerminalConfig {
            op,
            source: io::Error::last_os_error(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
