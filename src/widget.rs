//! Widget lifecycle and event dispatch
//!
//! A `MusicWidget` owns everything one page instance needs: the lyric sync
//! state machine, the cover resolver and its cache, and the host
//! subscriptions feeding them. `destroy` releases every subscription;
//! `WidgetSlot` makes sure the old instance is gone before a new one is
//! created on navigation.

use std::rc::Rc;
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use tracing::{debug, info};

use crate::error::WidgetError;
use crate::features::cover::{CoverFetcher, CoverResolver, Resolution};
use crate::features::lyrics::{Interaction, SyncController, SyncState, TickOutcome};
use crate::host::{CoverSurface, Host, LyricView, PlaybackSource, SubscriptionId, Topic};
use crate::settings::WidgetSettings;

const TOPICS: [Topic; 7] = [
    Topic::LyricContent,
    Topic::TrackList,
    Topic::TimeUpdate,
    Topic::LoadedData,
    Topic::CoverStyle,
    Topic::Keydown,
    Topic::Interaction,
];

const VOLUME_STEP: f32 = 0.1;

/// Cover resolution started by an event; the host drives it to completion
pub type CoverTask = LocalBoxFuture<'static, Resolution>;

/// Something the host observed on a subscribed topic
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidgetEvent {
    LyricContentChanged,
    TrackListChanged,
    TimeUpdate,
    LoadedData,
    CoverMutated,
    Interaction(Interaction),
    /// A line's time badge was clicked
    BadgeClicked(usize),
}

/// Keyboard shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

impl Key {
    /// Map a DOM `KeyboardEvent.code`
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Space" => Some(Key::Space),
            "ArrowLeft" => Some(Key::ArrowLeft),
            "ArrowRight" => Some(Key::ArrowRight),
            "ArrowUp" => Some(Key::ArrowUp),
            "ArrowDown" => Some(Key::ArrowDown),
            _ => None,
        }
    }
}

/// One live widget instance
pub struct MusicWidget<P, V, S, F> {
    playback: P,
    view: V,
    surface: Rc<S>,
    sync: SyncController,
    covers: CoverResolver<F>,
    subscriptions: Vec<SubscriptionId>,
}

impl<P, V, S, F> MusicWidget<P, V, S, F>
where
    P: PlaybackSource,
    V: LyricView,
    S: CoverSurface + 'static,
    F: CoverFetcher + Clone + 'static,
{
    /// Build a widget and subscribe to every topic it handles
    pub fn create<H: Host>(
        host: &mut H,
        playback: P,
        view: V,
        surface: Rc<S>,
        fetcher: F,
        settings: &WidgetSettings,
    ) -> Self {
        let subscriptions = TOPICS.iter().map(|&topic| host.subscribe(topic)).collect();
        info!("Music widget created (debug: {})", settings.debug);

        Self {
            playback,
            view,
            surface,
            sync: SyncController::new(settings.sync.clone()),
            covers: CoverResolver::new(fetcher, settings.cover.clone(), settings.debug),
            subscriptions,
        }
    }

    /// Release every host subscription
    pub fn destroy<H: Host>(self, host: &mut H) {
        for id in &self.subscriptions {
            host.unsubscribe(*id);
        }
        info!("Music widget destroyed");
    }

    pub fn playback(&self) -> &P {
        &self.playback
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    pub fn covers(&self) -> &CoverResolver<F> {
        &self.covers
    }

    pub fn subscriptions(&self) -> &[SubscriptionId] {
        &self.subscriptions
    }

    /// Dispatch an event.
    ///
    /// Cover events return a task resolving the full-size artwork; nothing
    /// else does. Failures are logged and dropped.
    pub fn handle(&mut self, event: WidgetEvent, now: Instant) -> Option<CoverTask> {
        match self.dispatch(event, now) {
            Ok(task) => task,
            Err(e) => {
                debug!("{:?} ignored: {}", event, e);
                None
            }
        }
    }

    fn dispatch(
        &mut self,
        event: WidgetEvent,
        now: Instant,
    ) -> Result<Option<CoverTask>, WidgetError> {
        match event {
            WidgetEvent::LyricContentChanged => {
                self.sync.lyrics_changed();
                if let Some(raw) = self.playback.lyric_state() {
                    self.sync.load(&raw, &mut self.view);
                }
                Ok(None)
            }
            WidgetEvent::TrackListChanged => {
                self.sync.reset();
                Ok(None)
            }
            WidgetEvent::TimeUpdate => {
                let outcome = self.sync.tick(&self.playback, &mut self.view, now);
                if outcome == TickOutcome::Idle
                    && self.sync.state() == SyncState::Tracking
                    && self.playback.current_time().is_some()
                {
                    return Err(WidgetError::MissingAnchor("lyric line geometry"));
                }
                Ok(None)
            }
            WidgetEvent::LoadedData | WidgetEvent::CoverMutated => self.cover_task().map(Some),
            WidgetEvent::Interaction(kind) => {
                self.sync.interact(kind, now);
                Ok(None)
            }
            WidgetEvent::BadgeClicked(index) => {
                self.sync
                    .activate_badge(index, &self.playback, now)
                    .ok_or(WidgetError::MissingAnchor("lyric line"))?;
                Ok(None)
            }
        }
    }

    fn cover_task(&self) -> Result<CoverTask, WidgetError> {
        let request = self
            .covers
            .prepare(&self.surface, self.playback.current_song_id())
            .ok_or(WidgetError::MissingAnchor("proxy cover"))?;

        let covers = self.covers.clone();
        let surface = Rc::clone(&self.surface);
        Ok(async move { covers.resolve(&request, &surface).await }.boxed_local())
    }

    /// Apply a keyboard shortcut. Returns whether the key was handled.
    pub fn handle_key(&self, key: Key) -> bool {
        match key {
            Key::Space => self.playback.toggle(),
            Key::ArrowRight => self.playback.skip_forward(),
            Key::ArrowLeft => self.playback.skip_back(),
            Key::ArrowUp => self.step_volume(VOLUME_STEP),
            Key::ArrowDown => self.step_volume(-VOLUME_STEP),
        }
        true
    }

    fn step_volume(&self, delta: f32) {
        let volume = (self.playback.volume() + delta).clamp(0.0, 1.0);
        self.playback.set_volume(volume);
    }
}

/// Holds at most one widget
pub struct WidgetSlot<P, V, S, F> {
    current: Option<MusicWidget<P, V, S, F>>,
}

impl<P, V, S, F> Default for WidgetSlot<P, V, S, F> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<P, V, S, F> WidgetSlot<P, V, S, F>
where
    P: PlaybackSource,
    V: LyricView,
    S: CoverSurface + 'static,
    F: CoverFetcher + Clone + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroy the current widget, then install the one `create` builds
    pub fn replace<H: Host>(
        &mut self,
        host: &mut H,
        create: impl FnOnce(&mut H) -> MusicWidget<P, V, S, F>,
    ) -> &mut MusicWidget<P, V, S, F> {
        self.clear(host);
        self.current.insert(create(host))
    }

    pub fn clear<H: Host>(&mut self, host: &mut H) {
        if let Some(old) = self.current.take() {
            old.destroy(host);
        }
    }

    pub fn get(&self) -> Option<&MusicWidget<P, V, S, F>> {
        self.current.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut MusicWidget<P, V, S, F>> {
        self.current.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::cover::url::css_url;
    use crate::host::LineGeometry;
    use anyhow::{Result, anyhow};
    use serde_json::{Value, json};
    use std::cell::{Cell, RefCell};
    use std::collections::HashSet;
    use std::time::Duration;

    const LINE_HEIGHT: f32 = 40.0;

    #[derive(Default)]
    struct CountingHost {
        next: u64,
        active: HashSet<SubscriptionId>,
    }

    impl Host for CountingHost {
        fn subscribe(&mut self, _topic: Topic) -> SubscriptionId {
            self.next += 1;
            let id = SubscriptionId(self.next);
            self.active.insert(id);
            id
        }

        fn unsubscribe(&mut self, id: SubscriptionId) {
            self.active.remove(&id);
        }
    }

    struct FakePlayer {
        time: Cell<Option<f64>>,
        lyrics: Option<Value>,
        song_id: Option<String>,
        volume: Cell<f32>,
        toggles: Cell<usize>,
        skips: Cell<i32>,
        seeks: RefCell<Vec<f64>>,
    }

    impl FakePlayer {
        fn new(lyrics: Option<Value>) -> Self {
            Self {
                time: Cell::new(None),
                lyrics,
                song_id: None,
                volume: Cell::new(0.5),
                toggles: Cell::new(0),
                skips: Cell::new(0),
                seeks: RefCell::new(Vec::new()),
            }
        }
    }

    impl PlaybackSource for FakePlayer {
        fn current_time(&self) -> Option<f64> {
            self.time.get()
        }
        fn seek(&self, seconds: f64) {
            self.seeks.borrow_mut().push(seconds);
        }
        fn lyric_state(&self) -> Option<Value> {
            self.lyrics.clone()
        }
        fn current_song_id(&self) -> Option<String> {
            self.song_id.clone()
        }
        fn toggle(&self) {
            self.toggles.set(self.toggles.get() + 1);
        }
        fn skip_forward(&self) {
            self.skips.set(self.skips.get() + 1);
        }
        fn skip_back(&self) {
            self.skips.set(self.skips.get() - 1);
        }
        fn volume(&self) -> f32 {
            self.volume.get()
        }
        fn set_volume(&self, volume: f32) {
            self.volume.set(volume);
        }
    }

    struct FakeView {
        lines: usize,
        scroll: Option<f32>,
        badges: HashSet<usize>,
    }

    impl FakeView {
        fn with_lines(lines: usize) -> Self {
            Self {
                lines,
                scroll: None,
                badges: HashSet::new(),
            }
        }
    }

    impl LyricView for FakeView {
        fn line_count(&self) -> usize {
            self.lines
        }
        fn line_geometry(&self, index: usize) -> Option<LineGeometry> {
            (index < self.lines).then(|| LineGeometry {
                top: index as f32 * LINE_HEIGHT,
                height: LINE_HEIGHT,
            })
        }
        fn viewport_height(&self) -> Option<f32> {
            Some(100.0)
        }
        fn content_height(&self) -> Option<f32> {
            Some(self.lines as f32 * LINE_HEIGHT)
        }
        fn set_scroll(&mut self, offset: f32) {
            self.scroll = Some(offset);
        }
        fn has_time_badge(&self, index: usize) -> bool {
            self.badges.contains(&index)
        }
        fn attach_time_badge(&mut self, index: usize, _label: &str, _seconds: f64) {
            self.badges.insert(index);
        }
    }

    #[derive(Default)]
    struct FakeSurface {
        background: RefCell<Option<String>>,
    }

    impl CoverSurface for FakeSurface {
        fn background_image(&self) -> Option<String> {
            self.background.borrow().clone()
        }
        fn set_background_image(&self, url: &str) {
            *self.background.borrow_mut() = Some(css_url(url));
        }
    }

    #[derive(Clone, Default)]
    struct NoNetwork;

    impl CoverFetcher for NoNetwork {
        async fn resolve_image(&self, _url: &str) -> Result<String> {
            Err(anyhow!("offline"))
        }
        async fn song_pic(&self, _url: &str) -> Result<Option<String>> {
            Err(anyhow!("offline"))
        }
    }

    type TestWidget = MusicWidget<FakePlayer, FakeView, FakeSurface, NoNetwork>;

    fn lyrics() -> Value {
        json!([[0, "first"], [5, "second"], [10, "third"]])
    }

    fn widget(host: &mut CountingHost, player: FakePlayer, surface: Rc<FakeSurface>) -> TestWidget {
        MusicWidget::create(
            host,
            player,
            FakeView::with_lines(3),
            surface,
            NoNetwork,
            &WidgetSettings::default(),
        )
    }

    #[test]
    fn test_create_and_destroy() {
        let mut host = CountingHost::default();
        let w = widget(&mut host, FakePlayer::new(None), Rc::default());
        assert_eq!(host.active.len(), TOPICS.len());
        assert_eq!(w.subscriptions().len(), TOPICS.len());

        w.destroy(&mut host);
        assert!(host.active.is_empty());
    }

    #[test]
    fn test_slot_replace_no_duplicate_subscriptions() {
        let mut host = CountingHost::default();
        let mut slot = WidgetSlot::new();

        for _ in 0..3 {
            slot.replace(&mut host, |host| {
                widget(host, FakePlayer::new(None), Rc::default())
            });
            assert_eq!(host.active.len(), TOPICS.len());
        }
        assert_eq!(host.next, 3 * TOPICS.len() as u64);

        slot.clear(&mut host);
        assert!(host.active.is_empty());
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_lyric_event_flow() {
        let mut host = CountingHost::default();
        let mut w = widget(&mut host, FakePlayer::new(Some(lyrics())), Rc::default());
        let start = Instant::now();

        assert_eq!(w.sync().state(), SyncState::NoTrack);
        assert!(w.handle(WidgetEvent::LyricContentChanged, start).is_none());
        assert_eq!(w.sync().state(), SyncState::Tracking);
        assert_eq!(w.view().badges.len(), 3);

        w.playback().time.set(Some(5.5));
        w.handle(WidgetEvent::TimeUpdate, start);
        assert_eq!(w.sync().current_index(), Some(1));
        assert_eq!(w.view().scroll, Some(10.0));

        w.handle(WidgetEvent::Interaction(Interaction::Wheel), start);
        w.playback().time.set(Some(11.0));
        w.handle(WidgetEvent::TimeUpdate, start + Duration::from_millis(100));
        assert_eq!(w.sync().current_index(), Some(1));
        assert_eq!(w.view().scroll, Some(10.0));

        w.handle(WidgetEvent::TimeUpdate, start + Duration::from_secs(2));
        assert_eq!(w.sync().current_index(), Some(2));
        assert_eq!(w.view().scroll, Some(20.0));

        w.handle(WidgetEvent::TrackListChanged, start);
        assert_eq!(w.sync().state(), SyncState::NoTrack);
        assert!(w.sync().lines().is_empty());
    }

    #[test]
    fn test_lyrics_load_on_later_tick() {
        let mut host = CountingHost::default();
        let mut w = widget(&mut host, FakePlayer::new(None), Rc::default());
        let now = Instant::now();

        w.handle(WidgetEvent::LyricContentChanged, now);
        assert_eq!(w.sync().state(), SyncState::TracksLoading);

        w.playback.lyrics = Some(lyrics());
        w.playback().time.set(Some(0.5));
        w.handle(WidgetEvent::TimeUpdate, now);
        assert_eq!(w.sync().state(), SyncState::Tracking);
        assert_eq!(w.sync().current_index(), Some(0));
    }

    #[test]
    fn test_badge_click_seeks() {
        let mut host = CountingHost::default();
        let mut w = widget(&mut host, FakePlayer::new(Some(lyrics())), Rc::default());
        let now = Instant::now();

        w.handle(WidgetEvent::LyricContentChanged, now);
        w.handle(WidgetEvent::BadgeClicked(2), now);
        w.handle(WidgetEvent::BadgeClicked(7), now);
        assert_eq!(*w.playback().seeks.borrow(), vec![10.0]);
        assert!(matches!(w.sync().state(), SyncState::UserOverriding { .. }));
    }

    #[test]
    fn test_keys() {
        let mut host = CountingHost::default();
        let w = widget(&mut host, FakePlayer::new(None), Rc::default());

        assert_eq!(Key::from_code("Space"), Some(Key::Space));
        assert_eq!(Key::from_code("KeyA"), None);

        assert!(w.handle_key(Key::Space));
        assert_eq!(w.playback().toggles.get(), 1);

        w.handle_key(Key::ArrowRight);
        w.handle_key(Key::ArrowRight);
        w.handle_key(Key::ArrowLeft);
        assert_eq!(w.playback().skips.get(), 1);

        w.handle_key(Key::ArrowUp);
        assert!((w.playback().volume() - 0.6).abs() < 1e-6);

        w.playback().volume.set(0.95);
        w.handle_key(Key::ArrowUp);
        assert_eq!(w.playback().volume(), 1.0);

        w.playback().volume.set(0.05);
        w.handle_key(Key::ArrowDown);
        assert_eq!(w.playback().volume(), 0.0);
    }

    #[tokio::test]
    async fn test_cover_event_resolves_direct() {
        let mut host = CountingHost::default();
        let surface = Rc::new(FakeSurface::default());
        *surface.background.borrow_mut() = Some(css_url(
            "https://meting.qjqq.cn/?server=netease&type=pic&id=109951163",
        ));
        let mut w = widget(&mut host, FakePlayer::new(None), surface.clone());

        let task = w
            .handle(WidgetEvent::CoverMutated, Instant::now())
            .expect("cover task");
        let expected =
            "https://p3.music.126.net/jcnBjKY5pLySU0gZPDsAJg==/109951163.jpg?param=2000y2000";
        assert_eq!(task.await, Resolution::Direct(expected.to_string()));
        assert_eq!(
            surface.background_image().as_deref(),
            Some(css_url(expected).as_str())
        );
        assert_eq!(w.covers().cached("109951163"), Some(Some(expected.to_string())));
    }

    #[test]
    fn test_cover_event_without_proxy() {
        let mut host = CountingHost::default();
        let surface = Rc::new(FakeSurface::default());
        *surface.background.borrow_mut() = Some(css_url("https://example.com/a.jpg"));
        let mut w = widget(&mut host, FakePlayer::new(None), surface);

        assert!(w.handle(WidgetEvent::LoadedData, Instant::now()).is_none());
        assert!(w.handle(WidgetEvent::CoverMutated, Instant::now()).is_none());
    }
}
