use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::clock::ClockSource;
use crate::settings::{SettingsStore, ThemeMode};
use crate::timer::{Scheduler, TimerHandle};

/// Auto mode re-evaluates at this period to catch the 06:00/18:00 boundary.
pub const THEME_RECHECK_PERIOD: Duration = Duration::from_secs(60 * 60);

const DAY_STARTS_AT: u32 = 6;
const NIGHT_STARTS_AT: u32 = 18;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Value for `<meta name="theme-color">`.
    pub fn meta_color(self) -> &'static str {
        match self {
            Theme::Light => "#ffffff",
            Theme::Dark => "#000000",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two `prefers-color-scheme` media signals.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct SystemPreference {
    pub light: bool,
    pub dark: bool,
}

pub trait ColorSchemeProbe {
    fn current(&self) -> SystemPreference;
}

/// Reports no preference at all, leaving auto mode to the hour of day.
pub struct NoColorScheme;

impl ColorSchemeProbe for NoColorScheme {
    fn current(&self) -> SystemPreference {
        SystemPreference::default()
    }
}

/// Root theme attribute plus the meta colour hint.
pub trait ThemeSurface {
    fn apply_theme(&self, theme: Theme);
}

/// Light wins when both system signals match.
pub fn resolve_theme(mode: ThemeMode, preference: SystemPreference, hour: u32) -> Theme {
    match mode {
        ThemeMode::Light => Theme::Light,
        ThemeMode::Dark => Theme::Dark,
        ThemeMode::Auto if preference.light => Theme::Light,
        ThemeMode::Auto if preference.dark => Theme::Dark,
        ThemeMode::Auto if (DAY_STARTS_AT..NIGHT_STARTS_AT).contains(&hour) => Theme::Light,
        ThemeMode::Auto => Theme::Dark,
    }
}

pub struct ThemeController {
    settings: Rc<SettingsStore>,
    probe: Rc<dyn ColorSchemeProbe>,
    clock: Rc<dyn ClockSource>,
    surface: Rc<dyn ThemeSurface>,
    scheduler: Rc<dyn Scheduler>,
    recheck: RefCell<Option<TimerHandle>>,
    applied: Cell<Option<Theme>>,
    this: Weak<ThemeController>,
}

impl ThemeController {
    pub fn new(
        settings: Rc<SettingsStore>,
        probe: Rc<dyn ColorSchemeProbe>,
        clock: Rc<dyn ClockSource>,
        surface: Rc<dyn ThemeSurface>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            settings,
            probe,
            clock,
            surface,
            scheduler,
            recheck: RefCell::new(None),
            applied: Cell::new(None),
            this: this.clone(),
        })
    }

    pub fn resolve(&self) -> Theme {
        resolve_theme(
            self.settings.theme_mode(),
            self.probe.current(),
            self.clock.hour(),
        )
    }

    pub fn applied(&self) -> Option<Theme> {
        self.applied.get()
    }

    pub fn has_recheck_timer(&self) -> bool {
        self.recheck.borrow().is_some()
    }

    /// Applies the resolved theme and keeps the hourly re-check registered
    /// exactly while the mode is auto.
    pub fn apply(&self) -> Theme {
        let theme = self.resolve();
        self.surface.apply_theme(theme);
        if self.applied.replace(Some(theme)) != Some(theme) {
            log::info!("theme applied: {theme} (mode {})", self.settings.theme_mode());
        }
        self.sync_recheck();
        theme
    }

    /// System `prefers-color-scheme` changed; only auto mode cares.
    pub fn on_system_preference_change(&self) {
        if self.settings.theme_mode() == ThemeMode::Auto {
            log::debug!("system color scheme changed; re-applying auto theme");
            self.apply();
        }
    }

    pub fn stop(&self) {
        self.recheck.borrow_mut().take();
    }

    fn sync_recheck(&self) {
        let auto = self.settings.theme_mode() == ThemeMode::Auto;
        let registered = self.has_recheck_timer();
        if auto && !registered {
            let this = self.this.clone();
            let handle = self.scheduler.every(
                THEME_RECHECK_PERIOD,
                Box::new(move || {
                    if let Some(controller) = this.upgrade() {
                        controller.apply();
                    }
                }),
            );
            *self.recheck.borrow_mut() = Some(handle);
        } else if !auto && registered {
            self.recheck.borrow_mut().take();
        }
    }
}
