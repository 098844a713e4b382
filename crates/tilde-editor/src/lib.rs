//! # tilde-editor — Editor core for tilde
//!
//! - **[`state`]** — `EditorState`: the cursor and the viewport it's clamped to
//! - **[`view`]** — paints an `EditorState` into a single-write frame
//!
//! Terminal plumbing (raw mode, key decoding, the event loop) lives in
//! `tilde-term`; this crate only decides what the screen should look like.

pub mod state;
pub mod view;

pub use state::EditorState;
