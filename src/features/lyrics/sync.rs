//! Lyric scroll synchronization
//!
//! Keeps the lyric panel scrolled to the line being sung, backs off while
//! the user is scrolling or touching the panel, and turns time badges into
//! seek buttons.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use super::lrc::format_timestamp;
use super::normalize::normalize;
use super::types::{LyricLine, find_current_line};
use crate::host::{LyricView, PlaybackSource};
use crate::settings::SyncSettings;

/// Synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    NoTrack,
    /// Lyric content is present but not yet normalized and decorated
    TracksLoading,
    Tracking,
    /// Automatic scrolling suspended until the deadline
    UserOverriding { until: Instant },
}

/// User input that suspends automatic scrolling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    Wheel,
    TouchStart,
    PointerDown,
    Scroll,
    /// Click on a line's time badge
    TimeLabel,
}

impl Interaction {
    fn grace(self, settings: &SyncSettings) -> Duration {
        let ms = match self {
            Interaction::Wheel => settings.wheel_grace_ms,
            Interaction::TouchStart => settings.touch_grace_ms,
            Interaction::PointerDown => settings.pointer_grace_ms,
            Interaction::Scroll => settings.scroll_grace_ms,
            Interaction::TimeLabel => settings.seek_grace_ms,
        };
        Duration::from_millis(ms)
    }
}

/// What a playback tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No track, or an anchor was missing
    Idle,
    /// Lyrics not usable yet
    Loading,
    /// Active line unchanged, nothing touched
    Unchanged(usize),
    Scrolled { index: usize, offset: f32 },
    /// User is interacting; scroll left alone
    Suppressed,
}

#[derive(Debug, Default)]
pub struct SyncController {
    settings: SyncSettings,
    state: SyncState,
    lines: Vec<LyricLine>,
    current: Option<usize>,
    /// Force a scroll on the next tick even if the line didn't change
    recenter: bool,
}

impl SyncController {
    pub fn new(settings: SyncSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Forget the current track
    pub fn reset(&mut self) {
        if self.state != SyncState::NoTrack {
            debug!("Lyric sync reset");
        }
        self.state = SyncState::NoTrack;
        self.lines.clear();
        self.current = None;
        self.recenter = false;
    }

    /// Lyric content appeared or was replaced
    pub fn lyrics_changed(&mut self) {
        self.reset();
        self.state = SyncState::TracksLoading;
    }

    /// Try to finish loading from raw player lyric state.
    ///
    /// Succeeds once the data normalizes to at least one line and the view
    /// has rendered lines to decorate.
    pub fn load(&mut self, raw: &Value, view: &mut impl LyricView) -> bool {
        if self.state != SyncState::TracksLoading {
            return false;
        }
        let Some(lines) = normalize(raw) else {
            debug!("Lyric state not parseable yet");
            return false;
        };
        if view.line_count() == 0 {
            return false;
        }

        debug!("Loaded {} lyric lines", lines.len());
        self.lines = lines;
        self.current = None;
        self.recenter = false;
        self.attach_badges(view);
        self.state = SyncState::Tracking;
        true
    }

    /// Label every rendered line lacking a badge. Returns how many were added.
    pub fn attach_badges(&self, view: &mut impl LyricView) -> usize {
        let count = view.line_count().min(self.lines.len());
        let mut attached = 0;
        for (index, line) in self.lines.iter().enumerate().take(count) {
            if view.has_time_badge(index) {
                continue;
            }
            view.attach_time_badge(index, &format_timestamp(line.time), line.time);
            attached += 1;
        }
        attached
    }

    /// Record user interaction with the panel
    pub fn interact(&mut self, kind: Interaction, now: Instant) -> bool {
        let until = now + kind.grace(&self.settings);
        match self.state {
            SyncState::Tracking => {
                self.state = SyncState::UserOverriding { until };
                true
            }
            SyncState::UserOverriding { until: previous } => {
                self.state = SyncState::UserOverriding {
                    until: previous.max(until),
                };
                true
            }
            SyncState::NoTrack | SyncState::TracksLoading => false,
        }
    }

    /// Seek to the line whose badge was clicked. Returns the seek target.
    pub fn activate_badge(
        &mut self,
        index: usize,
        playback: &impl PlaybackSource,
        now: Instant,
    ) -> Option<f64> {
        let time = self.lines.get(index)?.time;
        if !self.interact(Interaction::TimeLabel, now) {
            return None;
        }
        debug!("Seeking to {:.2}s from line {}", time, index);
        playback.seek(time);
        Some(time)
    }

    /// Playback position advanced
    pub fn tick(
        &mut self,
        playback: &impl PlaybackSource,
        view: &mut impl LyricView,
        now: Instant,
    ) -> TickOutcome {
        match self.state {
            SyncState::NoTrack => return TickOutcome::Idle,
            SyncState::TracksLoading => {
                let Some(raw) = playback.lyric_state() else {
                    return TickOutcome::Loading;
                };
                if !self.load(&raw, view) {
                    return TickOutcome::Loading;
                }
            }
            SyncState::UserOverriding { until } => {
                if now < until {
                    return TickOutcome::Suppressed;
                }
                debug!("Manual scroll window elapsed, resuming lyric sync");
                self.state = SyncState::Tracking;
                self.recenter = true;
            }
            SyncState::Tracking => {}
        }

        // Lines can render after the lyrics were parsed
        self.attach_badges(view);

        let Some(position) = playback.current_time() else {
            return TickOutcome::Idle;
        };
        let Some(index) = find_current_line(&self.lines, position) else {
            return TickOutcome::Idle;
        };
        if self.current == Some(index) && !self.recenter {
            return TickOutcome::Unchanged(index);
        }

        let Some(offset) = self.centered_offset(view, index) else {
            return TickOutcome::Idle;
        };

        self.current = Some(index);
        self.recenter = false;
        view.set_scroll(offset);
        TickOutcome::Scrolled { index, offset }
    }

    /// Scroll offset that puts `index` at the anchor, clamped to the scrollable range
    fn centered_offset(&self, view: &impl LyricView, index: usize) -> Option<f32> {
        let line = view.line_geometry(index)?;
        let viewport = view.viewport_height()?;
        let content = view.content_height()?;

        let anchor = viewport * self.settings.anchor_ratio;
        let max = (content - viewport).max(0.0);
        Some((line.center() - anchor).clamp(0.0, max))
    }
}
