//! Host-facing interfaces
//!
//! The widget never touches a page directly. Whatever embeds it (a web
//! bridge, a desktop shell, a test) implements these traits and forwards
//! events for the topics the widget subscribes to.

use serde_json::Value;

/// The embedded audio player
pub trait PlaybackSource {
    /// Current playback position in seconds, `None` when nothing is loaded
    fn current_time(&self) -> Option<f64>;
    /// Seek to a position in seconds
    fn seek(&self, seconds: f64);
    /// The player's internal lyric state, shape unknown
    fn lyric_state(&self) -> Option<Value>;
    /// Id of the track currently selected in the player's list
    fn current_song_id(&self) -> Option<String>;

    fn toggle(&self);
    fn skip_forward(&self);
    fn skip_back(&self);
    /// Volume in `0.0..=1.0`
    fn volume(&self) -> f32;
    fn set_volume(&self, volume: f32);
}

/// Layout of one rendered lyric line, in viewport content coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineGeometry {
    pub top: f32,
    pub height: f32,
}

impl LineGeometry {
    pub fn center(&self) -> f32 {
        self.top + self.height / 2.0
    }
}

/// The scrolling lyric panel
///
/// Getters return `None` when the underlying element is not mounted.
pub trait LyricView {
    /// Number of rendered lyric lines
    fn line_count(&self) -> usize;
    fn line_geometry(&self, index: usize) -> Option<LineGeometry>;
    fn viewport_height(&self) -> Option<f32>;
    fn content_height(&self) -> Option<f32>;
    fn set_scroll(&mut self, offset: f32);

    fn has_time_badge(&self, index: usize) -> bool;
    /// Decorate a line with its `mm:ss` label; `seconds` is what a click seeks to
    fn attach_time_badge(&mut self, index: usize, label: &str, seconds: f64);
}

/// The element displaying the track artwork
///
/// Shared with in-flight cover resolutions, hence `&self` setters.
pub trait CoverSurface {
    /// Raw CSS `background-image` value, e.g. `url("https://...")`
    fn background_image(&self) -> Option<String>;
    fn set_background_image(&self, url: &str);

    /// Source of a child `<img>`, if the surface has one
    fn image_src(&self) -> Option<String> {
        None
    }
    fn set_image_src(&self, _url: &str) {}

    /// `false` once the element is gone; late results are then dropped
    fn is_attached(&self) -> bool {
        true
    }
}

/// Things the widget can ask to be notified about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Lyric panel content was replaced
    LyricContent,
    /// The player's track list changed
    TrackList,
    /// Playback position advanced
    TimeUpdate,
    /// A new track finished loading
    LoadedData,
    /// The cover element's style was mutated
    CoverStyle,
    Keydown,
    /// Wheel, touch, pointer or scroll on the lyric panel
    Interaction,
}

/// Handle for an active subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Event source the widget registers with
pub trait Host {
    fn subscribe(&mut self, topic: Topic) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
}

impl<T: CoverSurface + ?Sized> CoverSurface for std::rc::Rc<T> {
    fn background_image(&self) -> Option<String> {
        (**self).background_image()
    }
    fn set_background_image(&self, url: &str) {
        (**self).set_background_image(url)
    }
    fn image_src(&self) -> Option<String> {
        (**self).image_src()
    }
    fn set_image_src(&self, url: &str) {
        (**self).set_image_src(url)
    }
    fn is_attached(&self) -> bool {
        (**self).is_attached()
    }
}
