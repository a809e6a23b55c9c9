//! Lyric sync and high-resolution cover art for an embedded music player
//!
//! The host forwards player and page events to a [`MusicWidget`]; the
//! widget keeps the lyric panel scrolled to the active line and swaps the
//! player's proxied artwork for the full-size NetEase original.

pub mod api;
pub mod error;
pub mod features;
pub mod host;
pub mod logging;
pub mod settings;
pub mod widget;

pub use error::WidgetError;
pub use settings::WidgetSettings;
pub use widget::{Key, MusicWidget, WidgetEvent, WidgetSlot};
