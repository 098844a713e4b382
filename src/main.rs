// SPDX-License-Identifier: MIT
//
// tilde — a minimal screen-oriented terminal editor.
//
// This is the main binary that wires the two crates together:
//
//   tilde-term   → raw mode, window size, key decoding, event loop
//   tilde-editor → cursor state and the viewport renderer
//
// The Editor struct implements tilde-term's App trait. Each keypress flows
// through:
//
//   stdin → KeyDecoder → on_key → Ctrl-Q quits / movement updates cursor
//   paint → view::render_frame → OutputBuffer → one write to stdout
//
// Exit status is 0 after Ctrl-Q and 1 after any fatal terminal error,
// including failing to enter raw mode or to size the window at startup.
// On every one of those paths the event loop clears the screen and puts the
// original terminal attributes back before main prints anything.

mod logging;

use std::process::ExitCode;

use tilde_editor::EditorState;
use tilde_editor::view;
use tilde_term::{Action, App, EventLoop, KeyEvent, OutputBuffer, Size};

// ─── Editor ─────────────────────────────────────────────────────────────────

/// The application: an editor state driven by the event loop.
struct Editor {
    state: EditorState,
}

impl Editor {
    fn new(size: Size) -> Self {
        Self {
            state: EditorState::new(size),
        }
    }
}

impl App for Editor {
    fn on_key(&mut self, key: KeyEvent) -> Action {
        if key.is_ctrl(b'q') {
            return Action::Quit;
        }
        self.state.apply_movement(key);
        Action::Continue
    }

    fn on_resize(&mut self, size: Size) {
        self.state.resize(size);
    }

    fn paint(&mut self, out: &mut OutputBuffer) {
        view::render_frame(&self.state, out);
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    logging::init();

    let mut event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => return fatal(&e),
    };
    let mut editor = Editor::new(event_loop.size());

    match event_loop.run(&mut editor) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fatal(&e),
    }
}

/// Report a fatal error. The terminal has already been restored.
fn fatal(e: &tilde_term::Error) -> ExitCode {
    tracing::error!(error = %e, "fatal");
    eprintln!("tilde: {e}");
    ExitCode::from(1)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tilde_term::input::ctrl;

    const SIZE: Size = Size { cols: 80, rows: 24 };

    /// Run a headless session over `input` and return the editor and
    /// everything written to the screen.
    fn session(input: &[u8]) -> (Editor, Vec<u8>) {
        let mut editor = Editor::new(SIZE);
        let mut event_loop = EventLoop::headless(input, Vec::new(), SIZE);
        event_loop.run(&mut editor).unwrap();
        let screen = event_loop.output().clone();
        (editor, screen)
    }

    fn cursor(editor: &Editor) -> (u16, u16) {
        (editor.state.cursor_col(), editor.state.cursor_row())
    }

    // ── Key handling ──────────────────────────────────────────────────

    #[test]
    fn ctrl_q_quits() {
        let mut editor = Editor::new(SIZE);
        assert_eq!(editor.on_key(KeyEvent::Byte(ctrl(b'q'))), Action::Quit);
        assert_eq!(editor.on_key(KeyEvent::Byte(0x11)), Action::Quit);
    }

    #[test]
    fn plain_q_does_not_quit() {
        let mut editor = Editor::new(SIZE);
        assert_eq!(editor.on_key(KeyEvent::Byte(b'q')), Action::Continue);
    }

    #[test]
    fn movement_keys_move_cursor() {
        let mut editor = Editor::new(SIZE);
        editor.on_key(KeyEvent::ArrowRight);
        editor.on_key(KeyEvent::ArrowRight);
        editor.on_key(KeyEvent::ArrowDown);
        assert_eq!(cursor(&editor), (2, 1));
    }

    #[test]
    fn escape_and_bytes_are_ignored() {
        let mut editor = Editor::new(SIZE);
        assert_eq!(editor.on_key(KeyEvent::Escape), Action::Continue);
        assert_eq!(editor.on_key(KeyEvent::Byte(b'x')), Action::Continue);
        assert_eq!(cursor(&editor), (0, 0));
    }

    #[test]
    fn resize_clamps_cursor() {
        let mut editor = Editor::new(SIZE);
        editor.on_key(KeyEvent::PageDown);
        editor.on_resize(Size { cols: 80, rows: 10 });
        assert_eq!(cursor(&editor), (0, 9));
    }

    // ── Sessions ──────────────────────────────────────────────────────

    #[test]
    fn quit_immediately() {
        let (editor, screen) = session(b"\x11");
        assert_eq!(cursor(&editor), (0, 0));
        assert!(screen.starts_with(b"\x1b[?25l\x1b[H"));
        assert!(screen.ends_with(b"\x1b[2J\x1b[H"));
    }

    #[test]
    fn arrows_then_quit() {
        let (editor, screen) = session(b"\x1b[C\x1b[C\x1b[B\x11");
        assert_eq!(cursor(&editor), (2, 1));
        // Last frame before quitting shows the cursor at row 2, column 3.
        let needle = b"\x1b[H\x1b[2;3H\x1b[?25h";
        assert!(screen.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn page_down_then_quit() {
        let (editor, _) = session(b"\x1b[6~\x11");
        assert_eq!(cursor(&editor), (0, 23));
    }

    #[test]
    fn arrow_up_at_top_stays() {
        let (editor, _) = session(b"\x1b[A\x11");
        assert_eq!(cursor(&editor), (0, 0));
    }

    #[test]
    fn one_frame_per_key() {
        let (_, screen) = session(b"\x1b[C\x1b[B\x11");
        let frames = screen.windows(6).filter(|w| *w == b"\x1b[?25l").count();
        // Initial frame plus one per non-quit key.
        assert_eq!(frames, 3);
    }

    #[test]
    fn unknown_sequence_is_ignored() {
        let (editor, _) = session(b"\x1b[3~\x1b[C\x11");
        assert_eq!(cursor(&editor), (1, 0));
    }

    #[test]
    fn fatal_exit_code_is_one() {
        let e = tilde_term::Error::Geometry { reason: "test" };
        assert_eq!(format!("{:?}", fatal(&e)), format!("{:?}", ExitCode::from(1)));
    }
}
