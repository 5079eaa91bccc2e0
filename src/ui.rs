use std::rc::Rc;

use crate::error::PlatformError;
use crate::settings::{Settings, SettingsStore, ThemeMode};
use crate::task::{LocalBoxFuture, Spawner};
use crate::theme::ThemeController;
use crate::ticker::ClockTicker;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UiIntent {
    OpenSettings,
    CloseSettings,
    SetShowDate(bool),
    SetShowSeconds(bool),
    SetThemeMode(ThemeMode),
    ToggleFullscreen,
}

/// The settings panel and its controls, plus the fullscreen button.
pub trait ControlsView {
    fn sync_settings(&self, settings: &Settings);
    fn set_panel_open(&self, open: bool);
    fn set_fullscreen_indicator(&self, active: bool);
}

pub trait Fullscreen {
    fn is_active(&self) -> bool;
    fn enter(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>>;
    fn exit(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>>;
}

pub struct NoFullscreen;

impl Fullscreen for NoFullscreen {
    fn is_active(&self) -> bool {
        false
    }

    fn enter(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        Box::pin(async { Err(PlatformError::unsupported("fullscreen")) })
    }

    fn exit(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        Box::pin(async { Err(PlatformError::unsupported("fullscreen")) })
    }
}

/// Maps user intents onto the settings store and the components that
/// render from it.
pub struct UiController {
    settings: Rc<SettingsStore>,
    ticker: Rc<ClockTicker>,
    theme: Rc<ThemeController>,
    controls: Rc<dyn ControlsView>,
    fullscreen: Rc<dyn Fullscreen>,
    spawner: Rc<dyn Spawner>,
}

impl UiController {
    pub fn new(
        settings: Rc<SettingsStore>,
        ticker: Rc<ClockTicker>,
        theme: Rc<ThemeController>,
        controls: Rc<dyn ControlsView>,
        fullscreen: Rc<dyn Fullscreen>,
        spawner: Rc<dyn Spawner>,
    ) -> Self {
        Self {
            settings,
            ticker,
            theme,
            controls,
            fullscreen,
            spawner,
        }
    }

    pub fn sync_view(&self) {
        self.controls.sync_settings(&self.settings.current());
        self.controls
            .set_fullscreen_indicator(self.fullscreen.is_active());
    }

    pub fn dispatch(&self, intent: UiIntent) {
        match intent {
            UiIntent::OpenSettings => {
                self.controls.set_panel_open(true);
                log::debug!("settings panel opened");
            }
            UiIntent::CloseSettings => {
                self.controls.set_panel_open(false);
                log::debug!("settings panel closed");
            }
            UiIntent::SetShowDate(show) => {
                self.settings.update(|settings| settings.show_date = show);
                self.ticker.apply_date_visibility();
                log::info!("date display {}", if show { "on" } else { "off" });
            }
            UiIntent::SetShowSeconds(show) => {
                self.settings.update(|settings| settings.show_seconds = show);
                self.ticker.refresh();
                log::info!("seconds display {}", if show { "on" } else { "off" });
            }
            UiIntent::SetThemeMode(mode) => {
                self.settings.update(|settings| settings.theme_mode = mode);
                self.theme.apply();
                log::info!("theme mode set to {mode}");
            }
            UiIntent::ToggleFullscreen => self.toggle_fullscreen(),
        }
    }

    pub fn on_fullscreen_change(&self) {
        let active = self.fullscreen.is_active();
        self.controls.set_fullscreen_indicator(active);
        log::info!("fullscreen {}", if active { "entered" } else { "left" });
    }

    fn toggle_fullscreen(&self) {
        let entering = !self.fullscreen.is_active();
        let request = if entering {
            self.fullscreen.enter()
        } else {
            self.fullscreen.exit()
        };
        self.spawner.spawn(Box::pin(async move {
            if let Err(err) = request.await {
                log::error!(
                    "failed to {} fullscreen: {err}",
                    if entering { "enter" } else { "exit" }
                );
            }
        }));
    }
}
