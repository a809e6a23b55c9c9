//! Lyrics module - normalization and scroll sync
//!
//! - `normalize`: Turns the player's lyric state into timed lines
//! - `lrc`: Standard `[mm:ss.xx]` parsing and badge labels
//! - `sync`: Keeps the lyric panel on the active line

pub mod lrc;
pub mod normalize;
pub mod sync;
mod types;

pub use lrc::{format_timestamp, parse_lrc};
pub use normalize::{LyricSource, normalize};
pub use sync::{Interaction, SyncController, SyncState, TickOutcome};
pub use types::*;
