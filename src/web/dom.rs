use std::cell::RefCell;

use gloo::timers::callback::Timeout;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlSelectElement};

use crate::error::PlatformError;
use crate::settings::Settings;
use crate::theme::{Theme, ThemeSurface};
use crate::ticker::ClockSurface;
use crate::ui::ControlsView;

pub const TIME_DISPLAY: &str = "timeDisplay";
pub const DATE_DISPLAY: &str = "dateDisplay";
pub const FULLSCREEN_BUTTON: &str = "fullscreenBtn";
pub const SETTINGS_BUTTON: &str = "settingsBtn";
pub const SETTINGS_PANEL: &str = "settingsPanel";
pub const SETTINGS_BACKDROP: &str = "settingsBackdrop";
pub const SHOW_DATE: &str = "showDate";
pub const SHOW_SECONDS: &str = "showSeconds";
pub const THEME_MODE: &str = "themeMode";
pub const CLOSE_SETTINGS: &str = "closeSettings";

const PANEL_FOCUS_DELAY_MS: u32 = 300;

/// Looks up `#id`, logging when it is absent so the feature can be skipped.
pub fn element(document: &Document, id: &'static str) -> Option<Element> {
    let found = document.get_element_by_id(id);
    if found.is_none() {
        log::warn!("{}", PlatformError::MissingElement(id));
    }
    found
}

fn element_as<T: JsCast>(document: &Document, id: &'static str) -> Option<T> {
    element(document, id)?.dyn_into::<T>().ok()
}

/// The page's elements, looked up once at startup.
pub struct DomView {
    root: Option<Element>,
    theme_meta: Option<Element>,
    time: Option<Element>,
    date: Option<HtmlElement>,
    fullscreen_button: Option<Element>,
    panel: Option<HtmlElement>,
    backdrop: Option<Element>,
    show_date: Option<HtmlInputElement>,
    show_seconds: Option<HtmlInputElement>,
    theme_mode: Option<HtmlSelectElement>,
    pending_focus: RefCell<Option<Timeout>>,
}

impl DomView {
    pub fn new(document: &Document) -> Self {
        Self {
            root: document.document_element(),
            theme_meta: document
                .query_selector("meta[name=\"theme-color\"]")
                .ok()
                .flatten(),
            time: element(document, TIME_DISPLAY),
            date: element_as(document, DATE_DISPLAY),
            fullscreen_button: element(document, FULLSCREEN_BUTTON),
            panel: element_as(document, SETTINGS_PANEL),
            backdrop: element(document, SETTINGS_BACKDROP),
            show_date: element_as(document, SHOW_DATE),
            show_seconds: element_as(document, SHOW_SECONDS),
            theme_mode: element_as(document, THEME_MODE),
            pending_focus: RefCell::new(None),
        }
    }

    fn first_focusable(&self) -> Option<HtmlElement> {
        self.panel
            .as_ref()?
            .query_selector("input, button")
            .ok()
            .flatten()?
            .dyn_into::<HtmlElement>()
            .ok()
    }
}

fn set_class(element: &Element, class: &str, on: bool) {
    let _ = element.class_list().toggle_with_force(class, on);
}

impl ClockSurface for DomView {
    fn show_time(&self, text: &str) {
        if let Some(time) = &self.time {
            time.set_text_content(Some(text));
        }
    }

    fn show_date(&self, text: &str) {
        if let Some(date) = &self.date {
            date.set_text_content(Some(text));
        }
    }

    fn set_date_faded(&self, faded: bool) {
        if let Some(date) = &self.date {
            set_class(date, "hidden", faded);
        }
    }

    fn set_date_collapsed(&self, collapsed: bool) {
        let Some(date) = &self.date else {
            return;
        };
        let style = date.style();
        let _ = if collapsed {
            style.set_property("display", "none")
        } else {
            style.set_property("display", "block")
        };
    }
}

impl ThemeSurface for DomView {
    fn apply_theme(&self, theme: Theme) {
        if let Some(root) = &self.root {
            let _ = root.set_attribute("data-theme", theme.as_str());
        }
        if let Some(meta) = &self.theme_meta {
            let _ = meta.set_attribute("content", theme.meta_color());
        }
    }
}

impl ControlsView for DomView {
    fn sync_settings(&self, settings: &Settings) {
        if let Some(input) = &self.show_date {
            input.set_checked(settings.show_date);
        }
        if let Some(input) = &self.show_seconds {
            input.set_checked(settings.show_seconds);
        }
        if let Some(select) = &self.theme_mode {
            select.set_value(settings.theme_mode.as_str());
        }
    }

    fn set_panel_open(&self, open: bool) {
        let (Some(panel), Some(backdrop)) = (&self.panel, &self.backdrop) else {
            return;
        };
        set_class(backdrop, "active", open);
        set_class(panel, "active", open);
        let _ = panel.set_attribute("aria-hidden", if open { "false" } else { "true" });

        let focus = if open {
            self.first_focusable().map(|target| {
                Timeout::new(PANEL_FOCUS_DELAY_MS, move || {
                    let _ = target.focus();
                })
            })
        } else {
            None
        };
        *self.pending_focus.borrow_mut() = focus;
    }

    fn set_fullscreen_indicator(&self, active: bool) {
        if let Some(button) = &self.fullscreen_button {
            let label = if active {
                "Exit fullscreen"
            } else {
                "Enter fullscreen"
            };
            let _ = button.set_attribute("aria-label", label);
        }
    }
}
