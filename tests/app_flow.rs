use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{NaiveDate, NaiveDateTime};

use wakeclock::clock::FixedClock;
use wakeclock::error::PlatformError;
use wakeclock::settings::{SETTINGS_KEY, Settings, ThemeMode, parse_settings_text};
use wakeclock::storage::MemoryStore;
use wakeclock::task::{LocalBoxFuture, TaskQueue};
use wakeclock::theme::{ColorSchemeProbe, SystemPreference, Theme, ThemeSurface};
use wakeclock::ticker::{ClockSurface, DATE_FADE, TICK_PERIOD};
use wakeclock::timer::TimerQueue;
use wakeclock::ui::{ControlsView, Fullscreen};
use wakeclock::wake_lock::{
    HEARTBEAT_PERIOD, HeartbeatStrategy, IdlePulse, Revoker, WakeGuard, WakeStrategy,
};
use wakeclock::{ClockApp, Platform, UiIntent, Visibility, WakeLockState};

#[derive(Default)]
struct Screen {
    times: RefCell<Vec<String>>,
    date_faded: Cell<bool>,
    date_collapsed: Cell<bool>,
    themes: RefCell<Vec<Theme>>,
    synced: RefCell<Option<Settings>>,
    panel_open: Cell<bool>,
    fullscreen_label: Cell<Option<bool>>,
}

impl Screen {
    fn last_time(&self) -> String {
        self.times.borrow().last().cloned().expect("time rendered")
    }
}

impl ClockSurface for Screen {
    fn show_time(&self, text: &str) {
        self.times.borrow_mut().push(text.to_string());
    }

    fn show_date(&self, _text: &str) {}

    fn set_date_faded(&self, faded: bool) {
        self.date_faded.set(faded);
    }

    fn set_date_collapsed(&self, collapsed: bool) {
        self.date_collapsed.set(collapsed);
    }
}

impl ThemeSurface for Screen {
    fn apply_theme(&self, theme: Theme) {
        self.themes.borrow_mut().push(theme);
    }
}

impl ControlsView for Screen {
    fn sync_settings(&self, settings: &Settings) {
        *self.synced.borrow_mut() = Some(settings.clone());
    }

    fn set_panel_open(&self, open: bool) {
        self.panel_open.set(open);
    }

    fn set_fullscreen_indicator(&self, active: bool) {
        self.fullscreen_label.set(Some(active));
    }
}

#[derive(Default)]
struct FakeFullscreen {
    active: Cell<bool>,
    supported: bool,
    requests: Cell<usize>,
}

impl Fullscreen for FakeFullscreen {
    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn enter(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        self.requests.set(self.requests.get() + 1);
        let supported = self.supported;
        Box::pin(async move {
            if supported {
                Ok(())
            } else {
                Err(PlatformError::rejected("fullscreen", "not allowed"))
            }
        })
    }

    fn exit(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        self.requests.set(self.requests.get() + 1);
        Box::pin(async { Ok(()) })
    }
}

struct DarkSystem;

impl ColorSchemeProbe for DarkSystem {
    fn current(&self) -> SystemPreference {
        SystemPreference {
            light: false,
            dark: true,
        }
    }
}

struct Unavailable(WakeLockState);

impl WakeStrategy for Unavailable {
    fn kind(&self) -> WakeLockState {
        self.0
    }

    fn engage(
        &self,
        _revoker: Revoker,
    ) -> LocalBoxFuture<'static, Result<Box<dyn WakeGuard>, PlatformError>> {
        Box::pin(async { Err(PlatformError::unsupported("test capability")) })
    }
}

#[derive(Default)]
struct Pulses(Cell<usize>);

impl IdlePulse for Pulses {
    fn pulse(&self) {
        self.0.set(self.0.get() + 1);
    }
}

struct Harness {
    app: Rc<ClockApp>,
    timers: TimerQueue,
    tasks: TaskQueue,
    storage: Rc<MemoryStore>,
    clock: Rc<FixedClock>,
    screen: Rc<Screen>,
    fullscreen: Rc<FakeFullscreen>,
    pulses: Rc<Pulses>,
}

fn evening() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .and_then(|date| date.and_hms_opt(21, 15, 42))
        .expect("valid timestamp")
}

fn harness_with(storage: MemoryStore, visibility: Visibility, fullscreen_ok: bool) -> Harness {
    let timers = TimerQueue::new();
    let tasks = TaskQueue::new();
    let storage = Rc::new(storage);
    let clock = Rc::new(FixedClock::new(evening()));
    let screen = Rc::new(Screen::default());
    let pulses = Rc::new(Pulses::default());
    let fullscreen = Rc::new(FakeFullscreen {
        supported: fullscreen_ok,
        ..FakeFullscreen::default()
    });

    let app = ClockApp::new(Platform {
        storage: Box::new(Rc::clone(&storage)),
        clock: Rc::clone(&clock) as Rc<dyn wakeclock::clock::ClockSource>,
        scheduler: Rc::new(timers.clone()),
        spawner: Rc::new(tasks.clone()),
        clock_surface: Rc::clone(&screen) as Rc<dyn ClockSurface>,
        theme_surface: Rc::clone(&screen) as Rc<dyn ThemeSurface>,
        color_scheme: Rc::new(DarkSystem),
        wake_strategies: vec![
            Rc::new(Unavailable(WakeLockState::NativeLock)) as Rc<dyn WakeStrategy>,
            Rc::new(Unavailable(WakeLockState::VideoFallback)) as Rc<dyn WakeStrategy>,
            Rc::new(HeartbeatStrategy::new(
                Rc::new(timers.clone()),
                Rc::clone(&pulses) as Rc<dyn IdlePulse>,
            )) as Rc<dyn WakeStrategy>,
        ],
        controls: Rc::clone(&screen) as Rc<dyn ControlsView>,
        fullscreen: Rc::clone(&fullscreen) as Rc<dyn Fullscreen>,
        initial_visibility: visibility,
    });
    app.start();
    tasks.run_until_stalled();

    Harness {
        app,
        timers,
        tasks,
        storage,
        clock,
        screen,
        fullscreen,
        pulses,
    }
}

fn harness() -> Harness {
    harness_with(MemoryStore::new(), Visibility::Visible, true)
}

#[test]
fn startup_renders_applies_theme_and_falls_back_to_heartbeat() {
    let h = harness();

    assert_eq!(h.screen.last_time(), "21:15:42");
    assert_eq!(h.app.theme(), Some(Theme::Dark));
    assert_eq!(h.screen.synced.borrow().clone(), Some(Settings::default()));
    assert_eq!(h.app.wake_lock_state(), WakeLockState::TimerFallback);
    assert!(h.app.is_ticking());
    assert_eq!(h.storage.write_count(), 0);

    h.timers.advance(HEARTBEAT_PERIOD);
    assert_eq!(h.pulses.0.get(), 1);
}

#[test]
fn toggling_seconds_writes_once_and_rerenders_immediately() {
    let h = harness();
    let rendered = h.screen.times.borrow().len();

    h.app.dispatch(UiIntent::SetShowSeconds(false));

    assert_eq!(h.storage.write_count(), 1);
    assert_eq!(h.screen.times.borrow().len(), rendered + 1);
    assert_eq!(h.screen.last_time(), "21:15");
    let saved = h.storage.raw(SETTINGS_KEY).expect("settings saved");
    assert!(!parse_settings_text(&saved).show_seconds);

    h.app.dispatch(UiIntent::SetShowSeconds(true));
    assert_eq!(h.storage.write_count(), 2);
    assert_eq!(h.screen.last_time(), "21:15:42");
}

#[test]
fn hiding_date_fades_then_collapses() {
    let h = harness();
    h.app.dispatch(UiIntent::SetShowDate(false));
    assert!(h.screen.date_faded.get());
    assert!(!h.screen.date_collapsed.get());

    h.timers.advance(DATE_FADE);
    assert!(h.screen.date_collapsed.get());
    assert!(!h.app.settings().show_date);
}

#[test]
fn visibility_round_trip_releases_and_reacquires_without_stopping_clock() {
    let h = harness();

    h.app.on_visibility_change(Visibility::Hidden);
    assert_eq!(h.app.wake_lock_state(), WakeLockState::None);
    assert!(h.app.is_ticking());

    h.timers.advance(HEARTBEAT_PERIOD);
    assert_eq!(h.pulses.0.get(), 0);

    h.clock.advance(chrono::Duration::seconds(90));
    h.app.on_visibility_change(Visibility::Visible);
    h.tasks.run_until_stalled();
    assert_eq!(h.app.wake_lock_state(), WakeLockState::TimerFallback);
    assert_eq!(h.screen.last_time(), "21:17:12");
    assert_eq!(h.timers.repeating(), 3);
}

#[test]
fn starting_hidden_waits_for_visibility() {
    let h = harness_with(MemoryStore::new(), Visibility::Hidden, true);
    assert!(h.app.is_ticking());
    assert_eq!(h.app.wake_lock_state(), WakeLockState::None);

    h.app.on_focus();
    h.tasks.run_until_stalled();
    assert_eq!(h.app.wake_lock_state(), WakeLockState::TimerFallback);
}

#[test]
fn explicit_theme_overrides_system_and_drops_hourly_recheck() {
    let h = harness();
    let before = h.timers.pending();

    h.app.dispatch(UiIntent::SetThemeMode(ThemeMode::Light));
    assert_eq!(h.app.theme(), Some(Theme::Light));
    assert_eq!(h.timers.pending(), before - 1);

    h.app.on_system_theme_change();
    assert_eq!(h.screen.themes.borrow().last(), Some(&Theme::Light));
}

#[test]
fn saved_settings_drive_startup() {
    let stored = MemoryStore::with_entry(
        SETTINGS_KEY,
        r#"{"showDate": false, "showSeconds": false, "themeMode": "light", "version": "1.1.0"}"#,
    );
    let h = harness_with(stored, Visibility::Visible, true);

    assert_eq!(h.screen.last_time(), "21:15");
    assert_eq!(h.app.theme(), Some(Theme::Light));
    assert!(h.screen.date_faded.get());
    assert_eq!(h.storage.write_count(), 0);
}

#[test]
fn settings_panel_opens_and_closes() {
    let h = harness();
    h.app.dispatch(UiIntent::OpenSettings);
    assert!(h.screen.panel_open.get());
    h.app.dispatch(UiIntent::CloseSettings);
    assert!(!h.screen.panel_open.get());
}

#[test]
fn fullscreen_toggle_and_change_notification() {
    let h = harness();
    h.app.dispatch(UiIntent::ToggleFullscreen);
    h.tasks.run_until_stalled();
    assert_eq!(h.fullscreen.requests.get(), 1);

    h.fullscreen.active.set(true);
    h.app.on_fullscreen_change();
    assert_eq!(h.screen.fullscreen_label.get(), Some(true));
}

#[test]
fn rejected_fullscreen_is_swallowed() {
    let h = harness_with(MemoryStore::new(), Visibility::Visible, false);
    h.app.dispatch(UiIntent::ToggleFullscreen);
    assert_eq!(h.tasks.run_until_stalled(), 1);
    assert!(!h.fullscreen.active.get());
}

#[test]
fn teardown_cancels_every_timer_and_ignores_later_events() {
    let h = harness();
    h.app.teardown();
    h.app.teardown();

    assert!(h.app.is_torn_down());
    assert_eq!(h.app.wake_lock_state(), WakeLockState::None);
    assert_eq!(h.timers.pending(), 0);

    let rendered = h.screen.times.borrow().len();
    h.app.on_visibility_change(Visibility::Hidden);
    h.app.on_visibility_change(Visibility::Visible);
    h.app.dispatch(UiIntent::SetShowSeconds(false));
    h.tasks.run_until_stalled();
    h.timers.advance(TICK_PERIOD * 5);

    assert_eq!(h.screen.times.borrow().len(), rendered);
    assert_eq!(h.storage.write_count(), 0);
    assert_eq!(h.app.wake_lock_state(), WakeLockState::None);
}
