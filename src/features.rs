//! Feature modules
//!
//! Lyric synchronization and cover resolution. Neither touches the page
//! directly; both go through the traits in `host`.

pub mod cover;
pub mod lyrics;
