// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Event loop — render, wait for a key, dispatch, repeat.
//
// One thread owns the terminal. Each iteration paints a complete frame
// into a fresh `OutputBuffer`, writes it in one go, then waits for the next
// key. The wait is a series of bounded reads (VTIME, 100ms by default), so
// the loop never spins and never blocks for longer than one read window
// without getting a chance to look around.
//
// # Resize
//
// SIGWINCH sets an `AtomicBool`. When a read window expires with no key,
// the loop checks the flag, re-queries the window size, tells the app, and
// repaints. The handler is installed with SA_RESTART, so a resize never
// surfaces as an interrupted read.
//
// # Shutdown
//
// When the app returns `Action::Quit`, or when anything fails, the screen
// is cleared, the cursor homed, and the original terminal mode restored,
// in that order, before `run` returns.

use std::io::{self, Write};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Result;
use crate::geometry::{self, Size};
use crate::input::{ByteSource, KeyDecoder, KeyEvent, TtyInput};
use crate::output::{OutputBuffer, TtyOutput};
use crate::terminal::{self, RawModeGuard};

// ─── SIGWINCH ────────────────────────────────────────────────────────────────

/// Global flag set by the SIGWINCH handler.
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install a signal handler for SIGWINCH (terminal resize).
///
/// The handler only stores to an atomic, which is async-signal-safe.
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the event loop to do after handling a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Continue running.
    Continue,
    /// Shut down and return from [`EventLoop::run`].
    Quit,
}

/// Application interface for the event loop.
///
/// Per iteration the loop calls [`paint`](App::paint), then waits, then
/// calls [`on_key`](App::on_key) or [`on_resize`](App::on_resize).
pub trait App {
    /// Handle a decoded key. Return [`Action::Quit`] to exit.
    fn on_key(&mut self, _key: KeyEvent) -> Action {
        Action::Continue
    }

    /// The terminal changed size. A repaint follows immediately.
    fn on_resize(&mut self, _size: Size) {}

    /// Append one complete frame to `out`.
    fn paint(&mut self, out: &mut OutputBuffer);
}

// ─── Loop Config ─────────────────────────────────────────────────────────────

/// Timing configuration for the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Read timeout in deciseconds (VTIME). Bounds how long the loop waits
    /// before it checks for a resize, and how long a lone ESC takes to
    /// resolve. Default: 1 (100ms).
    pub read_timeout_ds: u8,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { read_timeout_ds: 1 }
    }
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// Why the loop woke up.
enum Wake {
    Key(KeyEvent),
    Resize(Size),
}

/// The terminal event loop.
///
/// Owns raw mode (through a [`RawModeGuard`]), the key decoder, and the
/// output descriptor. Call [`run`](Self::run) to enter the loop.
///
/// # Example
///
/// ```no_run
/// use tilde_term::event_loop::{Action, App, EventLoop};
/// use tilde_term::input::KeyEvent;
/// use tilde_term::output::OutputBuffer;
///
/// struct MyApp;
///
/// impl App for MyApp {
///     fn on_key(&mut self, key: KeyEvent) -> Action {
///         if key.is_ctrl(b'q') { Action::Quit } else { Action::Continue }
///     }
///
///     fn paint(&mut self, out: &mut OutputBuffer) {
///         out.append(b"\x1b[Hhello");
///     }
/// }
///
/// let mut event_loop = EventLoop::new()?;
/// event_loop.run(&mut MyApp)?;
/// # Ok::<(), tilde_term::Error>(())
/// ```
pub struct EventLoop<I = TtyInput<io::Stdin>, W = TtyOutput> {
    /// `None` when driven headless (tests, scripted input).
    guard: Option<RawModeGuard>,
    decoder: KeyDecoder<I>,
    out: W,
    size: Size,
    /// Descriptor queried for the window size on resize.
    size_fd: RawFd,
}

impl EventLoop {
    /// Enter raw mode on stdin and resolve the window size of stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TerminalConfig`](crate::Error::TerminalConfig) if
    /// stdin is not a terminal, or [`Error::Geometry`](crate::Error::Geometry)
    /// if the size can't be determined. Either way the screen has been
    /// cleared and the terminal restored before the error is returned.
    pub fn new() -> Result<Self> {
        Self::with_config(LoopConfig::default())
    }

    /// [`new`](Self::new) with explicit timing configuration.
    ///
    /// # Errors
    ///
    /// As for [`new`](Self::new).
    pub fn with_config(config: LoopConfig) -> Result<Self> {
        terminal::install_panic_hook();
        Self::open(
            libc::STDIN_FILENO,
            libc::STDOUT_FILENO,
            TtyInput::stdin(),
            TtyOutput::stdout(),
            config,
        )
    }
}

impl<I: ByteSource, W: Write> EventLoop<I, W> {
    /// Enter raw mode on `fd` and resolve its window size, reading probe
    /// replies from `input` and writing to `out`.
    ///
    /// # Errors
    ///
    /// As for [`EventLoop::new`]: on failure `out` has received a clear
    /// and home, and `fd` is back in its original mode.
    pub fn on_tty(fd: RawFd, input: I, out: W, config: LoopConfig) -> Result<Self> {
        Self::open(fd, fd, input, out, config)
    }

    fn open(
        tty_fd: RawFd,
        size_fd: RawFd,
        mut input: I,
        mut out: W,
        config: LoopConfig,
    ) -> Result<Self> {
        let mut guard = match RawModeGuard::enter(&tty_fd, config.read_timeout_ds) {
            Ok(guard) => guard,
            Err(e) => {
                let _ = terminal::clear_and_home(&mut out);
                return Err(e);
            }
        };

        let size = match geometry::resolve_window_size(size_fd, &mut out, &mut input) {
            Ok(size) => size,
            Err(e) => {
                let _ = terminal::clear_and_home(&mut out);
                let _ = guard.exit();
                return Err(e);
            }
        };

        Ok(Self {
            guard: Some(guard),
            decoder: KeyDecoder::new(input),
            out,
            size,
            size_fd,
        })
    }

    /// Drive the loop over arbitrary input and output, without raw mode
    /// and without resize handling.
    pub const fn headless(input: I, out: W, size: Size) -> Self {
        Self {
            guard: None,
            decoder: KeyDecoder::new(input),
            out,
            size,
            size_fd: -1,
        }
    }

    /// The current viewport size.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// The output sink (for inspecting headless runs).
    pub const fn output(&self) -> &W {
        &self.out
    }

    /// Run until the application returns [`Action::Quit`].
    ///
    /// The terminal is cleared and restored on every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input, writing a frame, or restoring the
    /// terminal fails. A loop error takes precedence over a cleanup error.
    pub fn run(&mut self, app: &mut impl App) -> Result<()> {
        if self.guard.is_some() {
            install_sigwinch_handler();
        }

        let result = self.run_inner(app);

        // Always clean up, even if the loop errored.
        let cleared = terminal::clear_and_home(&mut self.out);
        let restored = self.guard.as_mut().map_or(Ok(()), RawModeGuard::exit);

        first_error(result, cleared, restored)
    }

    fn run_inner(&mut self, app: &mut impl App) -> Result<()> {
        loop {
            let mut frame = OutputBuffer::new();
            app.paint(&mut frame);
            frame.flush_to(&mut self.out)?;

            match self.wait()? {
                Wake::Key(key) => {
                    if app.on_key(key) == Action::Quit {
                        tracing::debug!("quit requested");
                        return Ok(());
                    }
                }
                Wake::Resize(size) => app.on_resize(size),
            }
        }
    }

    /// Block, one read window at a time, until a key arrives or the
    /// window is resized.
    fn wait(&mut self) -> Result<Wake> {
        loop {
            if let Some(key) = self.decoder.try_next_key()? {
                return Ok(Wake::Key(key));
            }
            if let Some(size) = self.check_resize() {
                return Ok(Wake::Resize(size));
            }
        }
    }

    fn check_resize(&mut self) -> Option<Size> {
        self.guard.as_ref()?;
        if !SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed) {
            return None;
        }
        let size = geometry::query_window_size(self.size_fd)?;
        if size == self.size {
            return None;
        }
        tracing::debug!(cols = size.cols, rows = size.rows, "terminal resized");
        self.size = size;
        Some(size)
    }
}

/// The loop's own error if it has one, otherwise the first cleanup error.
/// Cleanup failures hidden behind a loop error are logged.
fn first_error(
    result: Result<()>,
    cleared: io::Result<()>,
    restored: Result<()>,
) -> Result<()> {
    if result.is_err() {
        if let Err(e) = &cleared {
            tracing::warn!(error = %e, "clearing the screen failed during shutdown");
        }
        if let Err(e) = &restored {
            tracing::warn!(error = %e, "restoring terminal mode failed during shutdown");
        }
        return result;
    }
    restored?;
    cleared?;
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
