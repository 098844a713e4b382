// SPDX-License-Identifier: MIT
//
// Terminal mode control — raw mode and guaranteed restoration.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), isatty, and raw fd writes. These are the standard POSIX
// interfaces for terminal control — there is no safe alternative. Each
// unsafe block is minimal.
#![allow(unsafe_code)]
//
// Raw mode is entered through a `RawModeGuard`. The guard captures the
// terminal's attributes before touching them and puts them back when it
// is dropped or when `exit` is called, whichever comes first. Restoration
// is idempotent, so the explicit call on a fatal-error path and the drop
// at scope end never fight each other.
//
// The first attributes captured in the process are also parked in a
// write-once global. The panic hook reads that snapshot, because a
// panicking frame can't reach the guard that owns its own copy. Once set,
// the snapshot is never replaced: a second guard (tests open several
// pseudo-terminals) keeps its own copy and leaves the global alone.
//
// Read policy: VMIN = 0, VTIME = N deciseconds. `read()` returns after at
// most N × 100ms even with no input, which gives the event loop a tick
// without a timer thread and without spinning.

use std::fmt;
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::{Once, OnceLock};

use crate::error::{Error, Result};

// ─── TerminalAttributes ─────────────────────────────────────────────────────

/// Snapshot of a terminal's line-discipline configuration.
///
/// Opaque apart from the few predicates needed to observe raw mode.
#[derive(Clone, Copy)]
pub struct TerminalAttributes(libc::termios);

impl TerminalAttributes {
    /// Read the current attributes of `fd` with `tcgetattr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TerminalConfig`] if `fd` is not a terminal or the
    /// call fails for any other reason.
    pub fn query(fd: RawFd) -> Result<Self> {
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &raw mut termios) } != 0 {
            return Err(Error::last_os("tcgetattr"));
        }
        Ok(Self(termios))
    }

    /// Apply these attributes to `fd` with `tcsetattr(TCSAFLUSH)`.
    ///
    /// Pending unread input is discarded, so keys typed during the switch
    /// never leak into the new mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TerminalConfig`] if the call fails.
    pub fn apply(&self, fd: RawFd) -> Result<()> {
        if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw const self.0) } != 0 {
            return Err(Error::last_os("tcsetattr"));
        }
        Ok(())
    }

    /// Derive the raw-mode variant of these attributes.
    ///
    /// Input: no break-to-SIGINT, no CR→NL, no parity check, no 8th-bit
    /// strip, no XON/XOFF. Output: no post-processing. Control: 8-bit
    /// characters. Local: no echo, no canonical mode, no extended input
    /// (Ctrl-V), no signal keys (Ctrl-C, Ctrl-Z). Reads return after
    /// `timeout_ds` deciseconds with zero bytes.
    #[must_use]
    pub fn to_raw(self, timeout_ds: u8) -> Self {
        let mut raw = self.0;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = timeout_ds;
        Self(raw)
    }

    /// Line-buffered input (ICANON).
    #[must_use]
    pub const fn is_canonical(&self) -> bool {
        self.0.c_lflag & libc::ICANON != 0
    }

    /// Typed characters are echoed (ECHO).
    #[must_use]
    pub const fn echoes(&self) -> bool {
        self.0.c_lflag & libc::ECHO != 0
    }

    /// Ctrl-C / Ctrl-Z generate signals (ISIG).
    #[must_use]
    pub const fn signals_enabled(&self) -> bool {
        self.0.c_lflag & libc::ISIG != 0
    }

    /// Output post-processing, e.g. NL→CRNL (OPOST).
    #[must_use]
    pub const fn post_processes_output(&self) -> bool {
        self.0.c_oflag & libc::OPOST != 0
    }

    /// Minimum byte count for a non-canonical read (VMIN).
    #[must_use]
    pub const fn min_bytes(&self) -> u8 {
        self.0.c_cc[libc::VMIN]
    }

    /// Non-canonical read timeout in deciseconds (VTIME).
    #[must_use]
    pub const fn timeout_ds(&self) -> u8 {
        self.0.c_cc[libc::VTIME]
    }
}

impl fmt::Debug for TerminalAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalAttributes")
            .field("canonical", &self.is_canonical())
            .field("echo", &self.echoes())
            .field("signals", &self.signals_enabled())
            .field("opost", &self.post_processes_output())
            .field("vmin", &self.min_bytes())
            .field("vtime", &self.timeout_ds())
            .finish()
    }
}

// ─── Process-wide snapshot ──────────────────────────────────────────────────

/// The first attributes captured in this process, with the fd they belong to.
static ORIGINAL: OnceLock<(RawFd, TerminalAttributes)> = OnceLock::new();

/// Restore the process-wide snapshot. Best-effort, ignores errors.
fn restore_original() {
    if let Some((fd, original)) = ORIGINAL.get() {
        let _ = original.apply(*fd);
    }
}

/// Check whether `fd` is connected to a terminal.
#[must_use]
pub fn is_tty<F: AsRawFd>(fd: &F) -> bool {
    unsafe { libc::isatty(fd.as_raw_fd()) == 1 }
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Emergency restore sequence: clear screen, cursor home, show cursor.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's shell with no echo
/// and no line editing. The hook writes [`EMERGENCY_RESTORE`] directly to
/// fd 1 (bypassing Rust's stdout lock, which the panicking frame may hold),
/// restores the original attributes, then delegates to the previous hook so
/// the message prints to a working terminal.
pub fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            restore_original();
            original(info);
        }));
    });
}

fn emergency_restore() {
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }
}

// ─── RawModeGuard ───────────────────────────────────────────────────────────

/// Raw mode on one terminal descriptor, undone on drop.
///
/// # Example
///
/// ```no_run
/// use tilde_term::terminal::enable_raw_mode;
///
/// let guard = enable_raw_mode(1)?;
/// // ... read keys, draw frames ...
/// drop(guard); // cooked mode again
/// # Ok::<(), tilde_term::Error>(())
/// ```
#[derive(Debug)]
pub struct RawModeGuard {
    fd: RawFd,
    original: TerminalAttributes,
    active: bool,
}

impl RawModeGuard {
    /// Capture the attributes of `fd` and switch it to raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TerminalConfig`] if the attributes can't be read or
    /// written (for instance when `fd` is a pipe).
    pub fn enter<F: AsRawFd>(fd: &F, timeout_ds: u8) -> Result<Self> {
        let fd = fd.as_raw_fd();
        let original = TerminalAttributes::query(fd)?;
        let _ = ORIGINAL.set((fd, original));

        switch_or_roll_back(fd, original, original.to_raw(timeout_ds))?;
        tracing::debug!(fd, timeout_ds, "entered raw mode");

        Ok(Self {
            fd,
            original,
            active: true,
        })
    }

    /// Restore the captured attributes.
    ///
    /// Idempotent: after the first successful call this is a no-op, and
    /// the drop at scope end does nothing further.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TerminalConfig`] if `tcsetattr` fails. The guard
    /// stays active so the drop makes one more attempt.
    pub fn exit(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.original.apply(self.fd)?;
        self.active = false;
        tracing::debug!(fd = self.fd, "left raw mode");
        Ok(())
    }

    /// Whether raw mode is still in effect.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The attributes captured before raw mode was entered.
    #[inline]
    #[must_use]
    pub const fn original(&self) -> &TerminalAttributes {
        &self.original
    }

    /// The descriptor this guard controls.
    #[inline]
    #[must_use]
    pub const fn fd(&self) -> RawFd {
        self.fd
    }
}

/// Apply `raw` to `fd`. If that fails, put `original` back before
/// returning the error, since a failed `tcsetattr` may have applied part
/// of the change.
fn switch_or_roll_back(
    fd: RawFd,
    original: TerminalAttributes,
    raw: TerminalAttributes,
) -> Result<()> {
    raw.apply(fd).inspect_err(|_| {
        if let Err(e) = original.apply(fd) {
            tracing::warn!(fd, error = %e, "rollback after failed raw switch");
        }
    })
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}

/// Enter raw mode on stdin with a read timeout of `timeout_ds` deciseconds.
///
/// # Errors
///
/// Returns [`Error::TerminalConfig`] if stdin is not a terminal or the
/// attribute calls fail.
pub fn enable_raw_mode(timeout_ds: u8) -> Result<RawModeGuard> {
    RawModeGuard::enter(&io::stdin(), timeout_ds)
}

/// Clear the screen and home the cursor on `w`, then flush.
///
/// Used on every exit path so the shell prompt comes back on a clean screen.
///
/// # Errors
///
/// Returns an error if writing to `w` fails.
pub fn clear_and_home(w: &mut impl Write) -> io::Result<()> {
    crate::ansi::clear_screen(w)?;
    crate::ansi::cursor_home(w)?;
    w.flush()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
