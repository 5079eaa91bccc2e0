use std::rc::Rc;

use crate::clock::ClockSource;
use crate::lifecycle::{LifecycleCoordinator, Visibility};
use crate::settings::{Settings, SettingsStore};
use crate::storage::KeyValueStore;
use crate::task::Spawner;
use crate::theme::{ColorSchemeProbe, Theme, ThemeController, ThemeSurface};
use crate::ticker::{ClockFace, ClockSurface, ClockTicker};
use crate::timer::Scheduler;
use crate::ui::{ControlsView, Fullscreen, UiController, UiIntent};
use crate::wake_lock::{WakeLockManager, WakeLockState, WakeStrategy};

/// Everything the host supplies. The browser and desktop front-ends each
/// build one of these; tests build one from in-memory fakes.
pub struct Platform {
    pub storage: Box<dyn KeyValueStore>,
    pub clock: Rc<dyn ClockSource>,
    pub scheduler: Rc<dyn Scheduler>,
    pub spawner: Rc<dyn Spawner>,
    pub clock_surface: Rc<dyn ClockSurface>,
    pub theme_surface: Rc<dyn ThemeSurface>,
    pub color_scheme: Rc<dyn ColorSchemeProbe>,
    /// Tried in order; empty where no wake strategy exists.
    pub wake_strategies: Vec<Rc<dyn WakeStrategy>>,
    pub controls: Rc<dyn ControlsView>,
    pub fullscreen: Rc<dyn Fullscreen>,
    pub initial_visibility: Visibility,
}

pub struct ClockApp {
    settings: Rc<SettingsStore>,
    ticker: Rc<ClockTicker>,
    theme: Rc<ThemeController>,
    wake_lock: Rc<WakeLockManager>,
    lifecycle: LifecycleCoordinator,
    ui: UiController,
}

impl ClockApp {
    pub fn new(platform: Platform) -> Rc<Self> {
        let Platform {
            storage,
            clock,
            scheduler,
            spawner,
            clock_surface,
            theme_surface,
            color_scheme,
            wake_strategies,
            controls,
            fullscreen,
            initial_visibility,
        } = platform;

        let settings = Rc::new(SettingsStore::load(storage));
        let face = ClockFace::new(Rc::clone(&settings), Rc::clone(&clock), clock_surface);
        let ticker = Rc::new(ClockTicker::new(face, Rc::clone(&scheduler)));
        let theme = ThemeController::new(
            Rc::clone(&settings),
            color_scheme,
            clock,
            theme_surface,
            scheduler,
        );
        let wake_lock = Rc::new(WakeLockManager::new(wake_strategies));
        let lifecycle = LifecycleCoordinator::new(
            initial_visibility,
            Rc::clone(&wake_lock),
            Rc::clone(&ticker),
            Rc::clone(&spawner),
        );
        let ui = UiController::new(
            Rc::clone(&settings),
            Rc::clone(&ticker),
            Rc::clone(&theme),
            controls,
            fullscreen,
            spawner,
        );

        Rc::new(Self {
            settings,
            ticker,
            theme,
            wake_lock,
            lifecycle,
            ui,
        })
    }

    pub fn start(&self) {
        self.ui.sync_view();
        self.ticker.apply_date_visibility();
        self.theme.apply();
        self.lifecycle.start();
        log::info!("clock app started ({:?})", self.lifecycle.visibility());
    }

    pub fn dispatch(&self, intent: UiIntent) {
        if self.lifecycle.is_torn_down() {
            return;
        }
        self.ui.dispatch(intent);
    }

    pub fn on_visibility_change(&self, visibility: Visibility) {
        self.lifecycle.on_visibility_change(visibility);
    }

    pub fn on_focus(&self) {
        self.lifecycle.on_focus();
    }

    pub fn on_system_theme_change(&self) {
        if self.lifecycle.is_torn_down() {
            return;
        }
        self.theme.on_system_preference_change();
    }

    pub fn on_fullscreen_change(&self) {
        self.ui.on_fullscreen_change();
    }

    /// Stops every timer and releases the wake lock. Idempotent.
    pub fn teardown(&self) {
        self.lifecycle.teardown();
        self.theme.stop();
    }

    pub fn settings(&self) -> Settings {
        self.settings.current()
    }

    pub fn wake_lock_state(&self) -> WakeLockState {
        self.wake_lock.state()
    }

    pub fn visibility(&self) -> Visibility {
        self.lifecycle.visibility()
    }

    pub fn theme(&self) -> Option<Theme> {
        self.theme.applied()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifecycle.is_torn_down()
    }
}
