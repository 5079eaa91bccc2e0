use std::cell::{Cell, RefCell};

use crate::error::PlatformError;
use crate::settings::Settings;
use crate::task::LocalBoxFuture;
use crate::theme::{ColorSchemeProbe, SystemPreference, Theme, ThemeSurface};
use crate::ticker::ClockSurface;
use crate::ui::{ControlsView, Fullscreen};

/// What the egui frame draws. The core writes it through the surface
/// traits; the window reads it once per frame.
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    pub time: String,
    pub date: String,
    pub date_faded: bool,
    pub date_collapsed: bool,
    pub theme: Option<Theme>,
    pub panel_open: bool,
    pub settings: Settings,
    pub fullscreen: bool,
}

#[derive(Default)]
pub struct DesktopSurface {
    model: RefCell<ViewModel>,
    // Fullscreen state reported by the window last frame.
    fullscreen_active: Cell<bool>,
    // Requested by the core, sent as a viewport command next frame.
    fullscreen_request: Cell<Option<bool>>,
}

impl DesktopSurface {
    pub fn snapshot(&self) -> ViewModel {
        self.model.borrow().clone()
    }

    pub fn take_fullscreen_request(&self) -> Option<bool> {
        self.fullscreen_request.take()
    }

    /// Records the window's fullscreen state; true when it changed.
    pub fn observe_fullscreen(&self, active: bool) -> bool {
        self.fullscreen_active.replace(active) != active
    }
}

impl ClockSurface for DesktopSurface {
    fn show_time(&self, text: &str) {
        self.model.borrow_mut().time = text.to_string();
    }

    fn show_date(&self, text: &str) {
        self.model.borrow_mut().date = text.to_string();
    }

    fn set_date_faded(&self, faded: bool) {
        self.model.borrow_mut().date_faded = faded;
    }

    fn set_date_collapsed(&self, collapsed: bool) {
        self.model.borrow_mut().date_collapsed = collapsed;
    }
}

impl ThemeSurface for DesktopSurface {
    fn apply_theme(&self, theme: Theme) {
        self.model.borrow_mut().theme = Some(theme);
    }
}

impl ControlsView for DesktopSurface {
    fn sync_settings(&self, settings: &Settings) {
        self.model.borrow_mut().settings = settings.clone();
    }

    fn set_panel_open(&self, open: bool) {
        self.model.borrow_mut().panel_open = open;
    }

    fn set_fullscreen_indicator(&self, active: bool) {
        self.model.borrow_mut().fullscreen = active;
    }
}

impl Fullscreen for DesktopSurface {
    fn is_active(&self) -> bool {
        self.fullscreen_active.get()
    }

    fn enter(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        self.fullscreen_request.set(Some(true));
        Box::pin(async { Ok(()) })
    }

    fn exit(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        self.fullscreen_request.set(Some(false));
        Box::pin(async { Ok(()) })
    }
}

/// Desktop colour-scheme signal from the OS via `dark-light`.
pub struct OsColorScheme;

impl ColorSchemeProbe for OsColorScheme {
    fn current(&self) -> SystemPreference {
        match dark_light::detect() {
            dark_light::Mode::Light => SystemPreference {
                light: true,
                dark: false,
            },
            dark_light::Mode::Dark => SystemPreference {
                light: false,
                dark: true,
            },
            dark_light::Mode::Default => SystemPreference::default(),
        }
    }
}
