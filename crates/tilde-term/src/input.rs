// SPDX-License-Identifier: MIT
//
// Terminal input decoding.
//
// Turns raw stdin bytes into logical key events: literal bytes (printable
// and control characters) and the composite keys a VT100 terminal reports
// as escape sequences — arrows and page up/down.
//
// # Grammar
//
// The supported sequences form a prefix code, so a small automaton over a
// window of at most four bytes decodes them without backtracking:
//
//   b            (b ≠ ESC)   → Byte(b)
//   ESC [ A|B|C|D            → ArrowUp | ArrowDown | ArrowRight | ArrowLeft
//   ESC [ 5 ~                → PageUp
//   ESC [ 6 ~                → PageDown
//   ESC x y      (other)     → Escape
//
// After ESC the decoder reads two more bytes before deciding, and a third
// only when the second is a digit. Anything unrecognised collapses to a
// bare Escape, and so does a sequence cut short by the read timeout: a lone
// ESC keypress arrives with nothing behind it, the next read times out,
// and the user gets Escape after one read window instead of a hang.
// Other `ESC [ <digit> ~` keys (Home, Delete, End) are outside the
// supported set and also come out as Escape.

use std::io::{self, Read};

/// The escape byte that introduces every multi-byte sequence.
pub const ESC: u8 = 0x1b;

// ─── Key Events ─────────────────────────────────────────────────────────────

/// A decoded key.
///
/// Named keys have dedicated variants; everything else is the literal byte
/// the terminal sent, control characters included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    /// A single byte that isn't part of an escape sequence.
    Byte(u8),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    /// A bare ESC, or an escape sequence outside the supported set.
    Escape,
}

impl KeyEvent {
    /// Whether this is Ctrl plus `letter` (e.g. `is_ctrl(b'q')` for Ctrl-Q).
    #[must_use]
    pub const fn is_ctrl(self, letter: u8) -> bool {
        matches!(self, Self::Byte(b) if b == ctrl(letter))
    }
}

/// The byte a terminal sends for Ctrl plus `letter`.
///
/// Ctrl clears bits 5 and 6, so `ctrl(b'q') == 0x11` whatever the case.
#[inline]
#[must_use]
pub const fn ctrl(letter: u8) -> u8 {
    letter & 0x1f
}

// ─── Byte Sources ───────────────────────────────────────────────────────────

/// A source of input bytes with a bounded wait.
pub trait ByteSource {
    /// Read one byte.
    ///
    /// Returns `Ok(None)` when nothing arrived within the read window.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures the caller can't retry.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// In-memory source: yields the slice front to back, then `None`.
///
/// Exhaustion plays the part of a read window with no input.
impl ByteSource for &[u8] {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        match self.split_first() {
            Some((&byte, rest)) => {
                *self = rest;
                Ok(Some(byte))
            }
            None => Ok(None),
        }
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        (**self).read_byte()
    }
}

/// Byte source over a terminal in raw mode.
///
/// With VMIN = 0 and VTIME > 0 a `read` that times out returns zero bytes,
/// which this maps to `None`. Reads interrupted by a signal are retried.
pub struct TtyInput<R> {
    inner: R,
}

impl TtyInput<io::Stdin> {
    /// Read from the process's standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(io::stdin())
    }
}

impl<R: Read> TtyInput<R> {
    /// Wrap any reader, typically a terminal file.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> ByteSource for TtyInput<R> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }
}

// ─── Decoder State Machine ──────────────────────────────────────────────────

/// Position within an escape sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between keys.
    Ground,
    /// Saw ESC.
    Escape,
    /// Saw ESC and one more byte.
    Intro(u8),
    /// Saw `ESC [ <digit>`; waiting for `~`.
    Param(u8),
}

/// What the automaton does with one byte.
enum Step {
    Emit(KeyEvent),
    Next(State),
}

impl State {
    const fn advance(self, byte: u8) -> Step {
        match self {
            Self::Ground if byte == ESC => Step::Next(Self::Escape),
            Self::Ground => Step::Emit(KeyEvent::Byte(byte)),
            Self::Escape => Step::Next(Self::Intro(byte)),
            Self::Intro(b'[') => match byte {
                b'0'..=b'9' => Step::Next(Self::Param(byte)),
                b'A' => Step::Emit(KeyEvent::ArrowUp),
                b'B' => Step::Emit(KeyEvent::ArrowDown),
                b'C' => Step::Emit(KeyEvent::ArrowRight),
                b'D' => Step::Emit(KeyEvent::ArrowLeft),
                _ => Step::Emit(KeyEvent::Escape),
            },
            Self::Intro(_) => Step::Emit(KeyEvent::Escape),
            Self::Param(digit) => match (digit, byte) {
                (b'5', b'~') => Step::Emit(KeyEvent::PageUp),
                (b'6', b'~') => Step::Emit(KeyEvent::PageDown),
                _ => Step::Emit(KeyEvent::Escape),
            },
        }
    }

    /// The event for a read window that expired in this state.
    const fn timed_out(self) -> Option<KeyEvent> {
        match self {
            Self::Ground => None,
            Self::Escape | Self::Intro(_) | Self::Param(_) => Some(KeyEvent::Escape),
        }
    }
}

// ─── KeyDecoder ─────────────────────────────────────────────────────────────

/// Decodes a [`ByteSource`] into [`KeyEvent`]s, one key at a time.
///
/// Also an iterator: iteration ends at the first read window with no input.
///
/// ```
/// use tilde_term::input::{KeyDecoder, KeyEvent};
///
/// let keys: Vec<_> = KeyDecoder::new(&b"a\x1b[B"[..])
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(keys, [KeyEvent::Byte(b'a'), KeyEvent::ArrowDown]);
/// ```
pub struct KeyDecoder<S> {
    source: S,
}

impl<S: ByteSource> KeyDecoder<S> {
    /// Decode keys from `source`.
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Decode the next key if one starts within the current read window.
    ///
    /// Returns `Ok(None)` when no byte arrived at all. Once a lead byte
    /// has been read, a key is always returned.
    ///
    /// # Errors
    ///
    /// Propagates unrecoverable read errors from the source.
    pub fn try_next_key(&mut self) -> io::Result<Option<KeyEvent>> {
        let mut state = State::Ground;
        loop {
            let Some(byte) = self.source.read_byte()? else {
                return Ok(state.timed_out());
            };
            match state.advance(byte) {
                Step::Emit(key) => {
                    tracing::trace!(?key, "decoded key");
                    return Ok(Some(key));
                }
                Step::Next(next) => state = next,
            }
        }
    }

    /// Block until a key arrives, one read window at a time.
    ///
    /// # Errors
    ///
    /// Propagates unrecoverable read errors from the source.
    pub fn next_key(&mut self) -> io::Result<KeyEvent> {
        loop {
            if let Some(key) = self.try_next_key()? {
                return Ok(key);
            }
        }
    }

    /// The underlying source.
    pub const fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutable access to the underlying source.
    pub const fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Unwrap the decoder, returning the source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: ByteSource> Iterator for KeyDecoder<S> {
    type Item = io::Result<KeyEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next_key().transpose()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Decode one key and return it with the number of bytes consumed.
    fn decode_one(data: &[u8]) -> (Option<KeyEvent>, usize) {
        let mut decoder = KeyDecoder::new(data);
        let key = decoder.try_next_key().unwrap();
        (key, data.len() - decoder.get_ref().len())
    }

    fn decode_all(data: &[u8]) -> Vec<KeyEvent> {
        KeyDecoder::new(data).collect::<io::Result<_>>().unwrap()
    }

    // ── Literal bytes ───────────────────────────────────────────────

    #[test]
    fn printable_byte() {
        assert_eq!(decode_one(b"a"), (Some(KeyEvent::Byte(b'a')), 1));
    }

    #[test]
    fn control_byte() {
        assert_eq!(decode_one(b"\x11"), (Some(KeyEvent::Byte(0x11)), 1));
    }

    #[test]
    fn high_byte_passes_through() {
        assert_eq!(decode_one(&[0xc3]), (Some(KeyEvent::Byte(0xc3)), 1));
    }

    #[test]
    fn several_literals() {
        assert_eq!(
            decode_all(b"hi\r"),
            [KeyEvent::Byte(b'h'), KeyEvent::Byte(b'i'), KeyEvent::Byte(b'\r')]
        );
    }

    #[test]
    fn empty_window_yields_nothing() {
        assert_eq!(decode_one(b""), (None, 0));
    }

    // ── Arrows ──────────────────────────────────────────────────────

    #[test]
    fn arrow_up_consumes_three() {
        assert_eq!(decode_one(b"\x1b[A"), (Some(KeyEvent::ArrowUp), 3));
    }

    #[test]
    fn arrow_down_consumes_three() {
        assert_eq!(decode_one(b"\x1b[B"), (Some(KeyEvent::ArrowDown), 3));
    }

    #[test]
    fn arrow_right_consumes_three() {
        assert_eq!(decode_one(b"\x1b[C"), (Some(KeyEvent::ArrowRight), 3));
    }

    #[test]
    fn arrow_left_consumes_three() {
        assert_eq!(decode_one(b"\x1b[D"), (Some(KeyEvent::ArrowLeft), 3));
    }

    #[test]
    fn arrow_leaves_following_bytes() {
        let mut decoder = KeyDecoder::new(&b"\x1b[Dxy"[..]);
        assert_eq!(decoder.try_next_key().unwrap(), Some(KeyEvent::ArrowLeft));
        assert_eq!(*decoder.get_ref(), b"xy");
    }

    // ── Page keys ───────────────────────────────────────────────────

    #[test]
    fn page_up_consumes_four() {
        assert_eq!(decode_one(b"\x1b[5~"), (Some(KeyEvent::PageUp), 4));
    }

    #[test]
    fn page_down_consumes_four() {
        assert_eq!(decode_one(b"\x1b[6~"), (Some(KeyEvent::PageDown), 4));
    }

    #[test]
    fn unmapped_digit_is_escape() {
        assert_eq!(decode_one(b"\x1b[3~"), (Some(KeyEvent::Escape), 4));
        assert_eq!(decode_one(b"\x1b[1~"), (Some(KeyEvent::Escape), 4));
    }

    #[test]
    fn digit_without_tilde_is_escape() {
        assert_eq!(decode_one(b"\x1b[5A"), (Some(KeyEvent::Escape), 4));
    }

    // ── Escape degradation ──────────────────────────────────────────

    #[test]
    fn bare_escape_consumes_one() {
        assert_eq!(decode_one(b"\x1b"), (Some(KeyEvent::Escape), 1));
    }

    #[test]
    fn escape_bracket_then_timeout() {
        assert_eq!(decode_one(b"\x1b["), (Some(KeyEvent::Escape), 2));
    }

    #[test]
    fn escape_digit_then_timeout() {
        assert_eq!(decode_one(b"\x1b[5"), (Some(KeyEvent::Escape), 3));
    }

    #[test]
    fn unknown_letter_is_escape() {
        assert_eq!(decode_one(b"\x1b[Z"), (Some(KeyEvent::Escape), 3));
    }

    #[test]
    fn non_csi_intro_reads_two_then_escapes() {
        assert_eq!(decode_one(b"\x1bOHz"), (Some(KeyEvent::Escape), 3));
    }

    #[test]
    fn escape_then_single_byte_then_timeout() {
        assert_eq!(decode_one(b"\x1bx"), (Some(KeyEvent::Escape), 2));
    }

    // ── Streams ─────────────────────────────────────────────────────

    #[test]
    fn mixed_stream() {
        assert_eq!(
            decode_all(b"j\x1b[A\x1b[6~\x11"),
            [
                KeyEvent::Byte(b'j'),
                KeyEvent::ArrowUp,
                KeyEvent::PageDown,
                KeyEvent::Byte(0x11),
            ]
        );
    }

    #[test]
    fn next_key_returns_available_key() {
        let mut decoder = KeyDecoder::new(&b"\x1b[C"[..]);
        assert_eq!(decoder.next_key().unwrap(), KeyEvent::ArrowRight);
    }

    #[test]
    fn into_inner_returns_rest() {
        let mut decoder = KeyDecoder::new(&b"ab"[..]);
        decoder.try_next_key().unwrap();
        assert_eq!(decoder.into_inner(), b"b");
    }

    // ── Ctrl helpers ────────────────────────────────────────────────

    #[test]
    fn ctrl_q_is_0x11() {
        assert_eq!(ctrl(b'q'), 0x11);
        assert_eq!(ctrl(b'Q'), 0x11);
    }

    #[test]
    fn is_ctrl_matches_only_bytes() {
        assert!(KeyEvent::Byte(0x11).is_ctrl(b'q'));
        assert!(!KeyEvent::Byte(b'q').is_ctrl(b'q'));
        assert!(!KeyEvent::Escape.is_ctrl(b'['));
    }

    // ── TtyInput ────────────────────────────────────────────────────

    struct Interrupting {
        interrupts: usize,
        data: &'static [u8],
    }

    impl Read for Interrupting {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupts > 0 {
                self.interrupts -= 1;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn tty_input_retries_interrupted_reads() {
        let mut input = TtyInput::new(Interrupting {
            interrupts: 3,
            data: b"k",
        });
        assert_eq!(input.read_byte().unwrap(), Some(b'k'));
        assert_eq!(input.read_byte().unwrap(), None);
    }

    #[test]
    fn tty_input_maps_would_block_to_none() {
        struct Blocking;
        impl Read for Blocking {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
        }
        assert_eq!(TtyInput::new(Blocking).read_byte().unwrap(), None);
    }

    #[test]
    fn tty_input_propagates_hard_errors() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }
        }
        let mut decoder = KeyDecoder::new(TtyInput::new(Broken));
        assert!(decoder.try_next_key().is_err());
    }

    #[test]
    fn pty_lone_escape_times_out_to_escape() {
        use crate::terminal::RawModeGuard;
        use crate::test_pty::open_pty;
        use std::io::Write;

        let (mut master, slave) = open_pty().unwrap();
        let _guard = RawModeGuard::enter(&slave, 1).unwrap();
        master.write_all(b"\x1b").unwrap();

        let mut decoder = KeyDecoder::new(TtyInput::new(&slave));
        assert_eq!(decoder.try_next_key().unwrap(), Some(KeyEvent::Escape));
    }

    #[test]
    fn pty_arrow_sequence_decodes() {
        use crate::terminal::RawModeGuard;
        use crate::test_pty::open_pty;
        use std::io::Write;

        let (mut master, slave) = open_pty().unwrap();
        let _guard = RawModeGuard::enter(&slave, 1).unwrap();
        master.write_all(b"\x1b[B").unwrap();

        let mut decoder = KeyDecoder::new(TtyInput::new(&slave));
        assert_eq!(decoder.try_next_key().unwrap(), Some(KeyEvent::ArrowDown));
        assert_eq!(decoder.try_next_key().unwrap(), None);
    }

    // ── Properties ──────────────────────────────────────────────────

    proptest! {
        #[test]
        fn every_key_consumes_at_least_one_byte(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let keys = decode_all(&data);
            prop_assert!(keys.len() <= data.len());
        }

        #[test]
        fn escape_free_input_is_literal(data in proptest::collection::vec(any::<u8>().prop_filter("no ESC", |b| *b != ESC), 0..64)) {
            let keys = decode_all(&data);
            let expected: Vec<_> = data.iter().map(|&b| KeyEvent::Byte(b)).collect();
            prop_assert_eq!(keys, expected);
        }

        #[test]
        fn decoder_consumes_whole_input(data in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut decoder = KeyDecoder::new(&data[..]);
            while decoder.try_next_key().unwrap().is_some() {}
            prop_assert!(decoder.get_ref().is_empty());
        }
    }
}
