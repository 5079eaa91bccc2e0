//! Browser front-end: binds the core to the page's DOM and events.

mod dom;
mod platform;
mod wake;

use std::cell::RefCell;
use std::rc::Rc;

use gloo::events::{EventListener, EventListenerOptions};
use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Document, ErrorEvent, Event, HtmlInputElement, HtmlSelectElement, PromiseRejectionEvent,
    TouchEvent, VisibilityState, Window,
};

pub use dom::DomView;
pub use platform::{GlooScheduler, LocalStorage, MatchMediaProbe, WebFullscreen, WebSpawner};
pub use wake::{
    DomPulse, HEARTBEAT_PULSE_LINGER, NativeWakeLock, PULSE_MARKER_ATTR, SilentVideo,
    wake_strategies,
};

use crate::app::{ClockApp, Platform};
use crate::clock::SystemClock;
use crate::lifecycle::Visibility;
use crate::logging::init_logger;
use crate::settings::ThemeMode;
use crate::storage::{KeyValueStore, MemoryStore};
use crate::theme::ThemeSurface;
use crate::ticker::ClockSurface;
use crate::timer::Scheduler;
use crate::ui::{ControlsView, UiIntent};

/// Keeps the app and its listeners alive after [`start`] returns.
struct Runtime {
    app: Rc<ClockApp>,
    _listeners: Vec<EventListener>,
}

thread_local! {
    static RUNTIME: RefCell<Option<Runtime>> = const { RefCell::new(None) };
}

/// Best-effort text for a thrown JS value.
pub(crate) fn describe_js(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

/// Entry point: boots once the DOM is ready.
pub fn start() {
    init_logger();
    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        log::error!("no document available; clock not started");
        return;
    };
    if document.ready_state() == "loading" {
        EventListener::once(&document, "DOMContentLoaded", |_| boot()).forget();
    } else {
        boot();
    }
}

fn current_visibility(document: &Document) -> Visibility {
    match document.visibility_state() {
        VisibilityState::Hidden => Visibility::Hidden,
        _ => Visibility::Visible,
    }
}

fn boot() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    log::info!("starting clock");

    let storage: Box<dyn KeyValueStore> = match LocalStorage::open() {
        Some(storage) => Box::new(storage),
        None => {
            log::warn!("localStorage unavailable; settings last for this page only");
            Box::new(MemoryStore::new())
        }
    };
    let scheduler: Rc<dyn Scheduler> = Rc::new(GlooScheduler);
    let view = Rc::new(DomView::new(&document));

    let app = ClockApp::new(Platform {
        storage,
        clock: Rc::new(SystemClock),
        scheduler: Rc::clone(&scheduler),
        spawner: Rc::new(WebSpawner),
        clock_surface: Rc::clone(&view) as Rc<dyn ClockSurface>,
        theme_surface: Rc::clone(&view) as Rc<dyn ThemeSurface>,
        color_scheme: Rc::new(MatchMediaProbe),
        wake_strategies: wake_strategies(&document, scheduler),
        controls: Rc::clone(&view) as Rc<dyn ControlsView>,
        fullscreen: Rc::new(WebFullscreen::new(document.clone())),
        initial_visibility: current_visibility(&document),
    });

    let mut listeners = control_listeners(&document, &app);
    listeners.extend(page_listeners(&window, &document, &app));
    app.start();

    RUNTIME.with(|slot| {
        let previous = slot.borrow_mut().replace(Runtime {
            app,
            _listeners: listeners,
        });
        if let Some(previous) = previous {
            previous.app.teardown();
        }
    });
}

fn on_click(
    document: &Document,
    id: &'static str,
    app: &Rc<ClockApp>,
    intent: UiIntent,
) -> Option<EventListener> {
    let target = dom::element(document, id)?;
    let app = Rc::clone(app);
    Some(EventListener::new(&target, "click", move |_| app.dispatch(intent)))
}

fn on_checkbox(
    document: &Document,
    id: &'static str,
    app: &Rc<ClockApp>,
    intent: fn(bool) -> UiIntent,
) -> Option<EventListener> {
    let input = dom::element(document, id)?.dyn_into::<HtmlInputElement>().ok()?;
    let app = Rc::clone(app);
    let target = input.clone();
    Some(EventListener::new(&target, "change", move |_| {
        app.dispatch(intent(input.checked()))
    }))
}

fn control_listeners(document: &Document, app: &Rc<ClockApp>) -> Vec<EventListener> {
    let mut listeners: Vec<EventListener> = [
        on_click(document, dom::SETTINGS_BUTTON, app, UiIntent::OpenSettings),
        on_click(document, dom::CLOSE_SETTINGS, app, UiIntent::CloseSettings),
        on_click(document, dom::SETTINGS_BACKDROP, app, UiIntent::CloseSettings),
        on_click(document, dom::FULLSCREEN_BUTTON, app, UiIntent::ToggleFullscreen),
        on_checkbox(document, dom::SHOW_DATE, app, UiIntent::SetShowDate),
        on_checkbox(document, dom::SHOW_SECONDS, app, UiIntent::SetShowSeconds),
    ]
    .into_iter()
    .flatten()
    .collect();

    if let Some(select) = dom::element(document, dom::THEME_MODE)
        .and_then(|element| element.dyn_into::<HtmlSelectElement>().ok())
    {
        let app = Rc::clone(app);
        let target = select.clone();
        listeners.push(EventListener::new(&target, "change", move |_| {
            let value = select.value();
            match ThemeMode::from_token(&value) {
                Some(mode) => app.dispatch(UiIntent::SetThemeMode(mode)),
                None => log::warn!("unknown theme mode '{value}' ignored"),
            }
        }));
    }
    listeners
}

fn page_listeners(window: &Window, document: &Document, app: &Rc<ClockApp>) -> Vec<EventListener> {
    let mut listeners = Vec::new();

    {
        let app = Rc::clone(app);
        let source = document.clone();
        listeners.push(EventListener::new(document, "visibilitychange", move |_| {
            app.on_visibility_change(current_visibility(&source));
        }));
    }
    {
        let app = Rc::clone(app);
        listeners.push(EventListener::new(window, "focus", move |_| app.on_focus()));
    }
    for event in ["fullscreenchange", "webkitfullscreenchange"] {
        let app = Rc::clone(app);
        listeners.push(EventListener::new(document, event, move |_| {
            app.on_fullscreen_change()
        }));
    }
    for query in [platform::PREFERS_LIGHT, platform::PREFERS_DARK] {
        let Some(list) = window.match_media(query).ok().flatten() else {
            continue;
        };
        let app = Rc::clone(app);
        listeners.push(EventListener::new(&list, "change", move |_| {
            app.on_system_theme_change()
        }));
    }
    for event in ["beforeunload", "pagehide"] {
        let app = Rc::clone(app);
        listeners.push(EventListener::new(window, event, move |_| app.teardown()));
    }
    // A page restored from the back/forward cache was torn down on pagehide.
    listeners.push(EventListener::new(window, "pageshow", |event: &Event| {
        let restored = Reflect::get(event, &JsValue::from_str("persisted"))
            .ok()
            .and_then(|persisted| persisted.as_bool())
            .unwrap_or(false);
        if restored {
            wasm_bindgen_futures::spawn_local(async { boot() });
        }
    }));

    listeners.push(EventListener::new_with_options(
        document,
        "touchstart",
        EventListenerOptions::enable_prevent_default(),
        |event: &Event| {
            let multi_touch = event
                .dyn_ref::<TouchEvent>()
                .is_some_and(|touch| touch.touches().length() > 1);
            if multi_touch {
                event.prevent_default();
            }
        },
    ));
    listeners.push(EventListener::new_with_options(
        document,
        "contextmenu",
        EventListenerOptions::enable_prevent_default(),
        |event: &Event| event.prevent_default(),
    ));

    listeners.push(EventListener::new(window, "error", |event: &Event| {
        if let Some(error) = event.dyn_ref::<ErrorEvent>() {
            log::error!(
                "uncaught error: {} ({}:{})",
                error.message(),
                error.filename(),
                error.lineno()
            );
        }
    }));
    listeners.push(EventListener::new(window, "unhandledrejection", |event: &Event| {
        if let Some(rejection) = event.dyn_ref::<PromiseRejectionEvent>() {
            log::error!("unhandled promise rejection: {}", describe_js(&rejection.reason()));
        }
    }));

    listeners
}
