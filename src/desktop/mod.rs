//! Native preview host: the same [`ClockApp`] inside an eframe window.
//!
//! No wake strategy exists on desktop, so the wake-lock manager runs with an
//! empty chain. Timers run on a [`TimerQueue`] advanced from a monotonic
//! clock every frame, and async work on a [`TaskQueue`] polled alongside.

mod storage;
mod surface;

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use anyhow::Result;
use eframe::egui::{self, Align2, Color32, RichText};
use serde::Serialize;

pub use storage::FileStore;
pub use surface::{DesktopSurface, OsColorScheme, ViewModel};

use crate::app::{ClockApp, Platform};
use crate::clock::{ClockSource, SystemClock};
use crate::lifecycle::Visibility;
use crate::settings::{Settings, SettingsStore, ThemeMode};
use crate::task::TaskQueue;
use crate::theme::{ColorSchemeProbe, Theme, ThemeSurface, resolve_theme};
use crate::ticker::{ClockSurface, DATE_FADE, TICK_PERIOD};
use crate::timer::TimerQueue;
use crate::ui::{ControlsView, Fullscreen, UiIntent};

#[derive(Debug, Clone)]
pub struct DesktopOptions {
    pub data_dir: PathBuf,
    pub fullscreen: bool,
}

pub fn run_gui(options: DesktopOptions) -> Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("WakeClock")
            .with_inner_size([960.0, 540.0])
            .with_min_inner_size([480.0, 270.0])
            .with_fullscreen(options.fullscreen),
        ..Default::default()
    };

    eframe::run_native(
        "WakeClock",
        native_options,
        Box::new(move |cc| Ok(Box::new(DesktopClock::new(&options, &cc.egui_ctx)))),
    )
    .map_err(|err| anyhow::anyhow!("failed to launch WakeClock window: {err}"))?;

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsReport {
    #[serde(flatten)]
    settings: Settings,
    resolved_theme: &'static str,
}

/// The merged settings plus the theme they resolve to right now, as JSON.
pub fn settings_report(data_dir: &Path) -> Result<String> {
    let settings = SettingsStore::load(Box::new(FileStore::new(data_dir))).current();
    let theme = resolve_theme(
        settings.theme_mode,
        OsColorScheme.current(),
        SystemClock.hour(),
    );
    let report = SettingsReport {
        settings,
        resolved_theme: theme.as_str(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

struct DesktopClock {
    app: Rc<ClockApp>,
    surface: Rc<DesktopSurface>,
    timers: TimerQueue,
    tasks: TaskQueue,
    started_at: Instant,
    focused: bool,
    system_theme: Option<egui::Theme>,
    visuals_for: Option<Theme>,
}

impl DesktopClock {
    fn new(options: &DesktopOptions, ctx: &egui::Context) -> Self {
        let surface = Rc::new(DesktopSurface::default());
        surface.observe_fullscreen(options.fullscreen);
        let timers = TimerQueue::new();
        let tasks = TaskQueue::new();

        let app = ClockApp::new(Platform {
            storage: Box::new(FileStore::new(options.data_dir.clone())),
            clock: Rc::new(SystemClock),
            scheduler: Rc::new(timers.clone()),
            spawner: Rc::new(tasks.clone()),
            clock_surface: Rc::clone(&surface) as Rc<dyn ClockSurface>,
            theme_surface: Rc::clone(&surface) as Rc<dyn ThemeSurface>,
            color_scheme: Rc::new(OsColorScheme),
            wake_strategies: Vec::new(),
            controls: Rc::clone(&surface) as Rc<dyn ControlsView>,
            fullscreen: Rc::clone(&surface) as Rc<dyn Fullscreen>,
            initial_visibility: Visibility::Visible,
        });
        app.start();
        tasks.run_until_stalled();

        Self {
            app,
            surface,
            timers,
            tasks,
            started_at: Instant::now(),
            focused: true,
            system_theme: ctx.input(|i| i.raw.system_theme),
            visuals_for: None,
        }
    }

    fn observe_window(&mut self, ctx: &egui::Context) {
        let (minimized, focused, fullscreen, system_theme) = ctx.input(|i| {
            let viewport = i.viewport();
            (
                viewport.minimized.unwrap_or(false),
                viewport.focused.unwrap_or(true),
                viewport.fullscreen.unwrap_or(false),
                i.raw.system_theme,
            )
        });

        self.app.on_visibility_change(if minimized {
            Visibility::Hidden
        } else {
            Visibility::Visible
        });
        if focused && !self.focused {
            self.app.on_focus();
        }
        self.focused = focused;

        if self.surface.observe_fullscreen(fullscreen) {
            self.app.on_fullscreen_change();
        }
        if system_theme != self.system_theme {
            self.system_theme = system_theme;
            self.app.on_system_theme_change();
        }
    }

    fn apply_visuals(&mut self, ctx: &egui::Context, theme: Option<Theme>) {
        let theme = theme.unwrap_or(Theme::Dark);
        if self.visuals_for == Some(theme) {
            return;
        }
        let mut visuals = match theme {
            Theme::Light => egui::Visuals::light(),
            Theme::Dark => egui::Visuals::dark(),
        };
        let (panel, text) = match theme {
            Theme::Light => (Color32::WHITE, Color32::from_rgb(20, 24, 32)),
            Theme::Dark => (Color32::BLACK, Color32::from_rgb(226, 234, 246)),
        };
        visuals.panel_fill = panel;
        visuals.override_text_color = Some(text);
        ctx.set_visuals(visuals);
        self.visuals_for = Some(theme);
    }

    fn show_clock(&self, ctx: &egui::Context, view: &ViewModel, intents: &mut Vec<UiIntent>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                if ui.button("Settings").clicked() {
                    intents.push(UiIntent::OpenSettings);
                }
                let label = if view.fullscreen {
                    "Exit fullscreen"
                } else {
                    "Fullscreen"
                };
                if ui.button(label).clicked() {
                    intents.push(UiIntent::ToggleFullscreen);
                }
            });

            let height = ui.available_height();
            ui.vertical_centered(|ui| {
                ui.add_space((height * 0.3).max(0.0));
                ui.label(RichText::new(&view.time).size(120.0).monospace().strong());

                if !view.date_collapsed {
                    let opacity = ctx.animate_bool_with_time(
                        egui::Id::new("date-opacity"),
                        !view.date_faded,
                        DATE_FADE.as_secs_f32(),
                    );
                    let color = ui.visuals().text_color().gamma_multiply(opacity);
                    ui.label(RichText::new(&view.date).size(36.0).color(color));
                }
            });
        });
    }

    fn show_settings(&self, ctx: &egui::Context, view: &ViewModel, intents: &mut Vec<UiIntent>) {
        if !view.panel_open {
            return;
        }
        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let mut show_date = view.settings.show_date;
                if ui.checkbox(&mut show_date, "Show date").changed() {
                    intents.push(UiIntent::SetShowDate(show_date));
                }
                let mut show_seconds = view.settings.show_seconds;
                if ui.checkbox(&mut show_seconds, "Show seconds").changed() {
                    intents.push(UiIntent::SetShowSeconds(show_seconds));
                }

                let mut mode = view.settings.theme_mode;
                egui::ComboBox::from_label("Theme")
                    .selected_text(mode_label(mode))
                    .show_ui(ui, |ui| {
                        for option in ThemeMode::ALL {
                            ui.selectable_value(&mut mode, option, mode_label(option));
                        }
                    });
                if mode != view.settings.theme_mode {
                    intents.push(UiIntent::SetThemeMode(mode));
                }

                ui.separator();
                if ui.button("Close").clicked() {
                    intents.push(UiIntent::CloseSettings);
                }
            });
    }

    fn keyboard_intents(&self, ctx: &egui::Context, view: &ViewModel, intents: &mut Vec<UiIntent>) {
        ctx.input(|i| {
            if i.key_pressed(egui::Key::F11) {
                intents.push(UiIntent::ToggleFullscreen);
            }
            if i.key_pressed(egui::Key::Escape) && view.panel_open {
                intents.push(UiIntent::CloseSettings);
            }
        });
    }
}

fn mode_label(mode: ThemeMode) -> &'static str {
    match mode {
        ThemeMode::Auto => "Follow system",
        ThemeMode::Light => "Light",
        ThemeMode::Dark => "Dark",
    }
}

impl eframe::App for DesktopClock {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.observe_window(ctx);
        self.timers.advance_to(self.started_at.elapsed());
        self.tasks.run_until_stalled();

        if let Some(fullscreen) = self.surface.take_fullscreen_request() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(fullscreen));
        }

        let view = self.surface.snapshot();
        self.apply_visuals(ctx, view.theme);

        let mut intents = Vec::new();
        self.keyboard_intents(ctx, &view, &mut intents);
        self.show_clock(ctx, &view, &mut intents);
        self.show_settings(ctx, &view, &mut intents);
        for intent in intents {
            self.app.dispatch(intent);
        }
        self.tasks.run_until_stalled();

        let elapsed = self.started_at.elapsed();
        let wait = self
            .timers
            .next_due()
            .map_or(TICK_PERIOD, |due| due.saturating_sub(elapsed))
            .min(TICK_PERIOD);
        ctx.request_repaint_after(wait);
    }
}

impl Drop for DesktopClock {
    fn drop(&mut self) {
        self.app.teardown();
    }
}
