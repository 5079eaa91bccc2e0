use std::time::Duration;

use gloo::timers::callback::{Interval, Timeout};
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Storage};

use super::describe_js;
use crate::error::{PlatformError, StorageError};
use crate::storage::KeyValueStore;
use crate::task::{LocalBoxFuture, Spawner};
use crate::theme::{ColorSchemeProbe, SystemPreference};
use crate::timer::{Scheduler, TimerHandle};
use crate::ui::Fullscreen;

pub const PREFERS_LIGHT: &str = "(prefers-color-scheme: light)";
pub const PREFERS_DARK: &str = "(prefers-color-scheme: dark)";

pub struct LocalStorage {
    storage: Storage,
}

impl LocalStorage {
    /// `None` when storage is disabled (private mode, sandboxed frames).
    pub fn open() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;
        Some(Self { storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|err| StorageError::Unavailable(describe_js(&err)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|err| StorageError::Write {
                key: key.to_string(),
                reason: describe_js(&err),
            })
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

/// `setInterval`/`setTimeout` through gloo; dropping the gloo handle clears it.
pub struct GlooScheduler;

impl Scheduler for GlooScheduler {
    fn every(&self, period: Duration, mut task: Box<dyn FnMut()>) -> TimerHandle {
        let interval = Interval::new(millis(period), move || task());
        TimerHandle::new(move || drop(interval))
    }

    fn after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle {
        let timeout = Timeout::new(millis(delay), task);
        TimerHandle::new(move || drop(timeout))
    }
}

pub struct WebSpawner;

impl Spawner for WebSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

pub struct MatchMediaProbe;

impl MatchMediaProbe {
    fn matches(query: &str) -> bool {
        web_sys::window()
            .and_then(|window| window.match_media(query).ok().flatten())
            .is_some_and(|list| list.matches())
    }
}

impl ColorSchemeProbe for MatchMediaProbe {
    fn current(&self) -> SystemPreference {
        SystemPreference {
            light: Self::matches(PREFERS_LIGHT),
            dark: Self::matches(PREFERS_DARK),
        }
    }
}

/// Standard fullscreen API with the WebKit-prefixed methods as fallback.
pub struct WebFullscreen {
    document: Document,
}

impl WebFullscreen {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn run(
        &self,
        target: JsValue,
        methods: &[&str],
    ) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        let outcome = call_first(&target, methods);
        Box::pin(async move {
            let returned = outcome?;
            // The prefixed variants return nothing to wait on.
            if let Ok(promise) = returned.dyn_into::<Promise>() {
                JsFuture::from(promise)
                    .await
                    .map_err(|err| PlatformError::rejected("fullscreen", describe_js(&err)))?;
            }
            Ok(())
        })
    }
}

impl Fullscreen for WebFullscreen {
    fn is_active(&self) -> bool {
        ["fullscreenElement", "webkitFullscreenElement"]
            .iter()
            .any(|property| {
                Reflect::get(&self.document, &JsValue::from_str(property))
                    .is_ok_and(|element| !element.is_null() && !element.is_undefined())
            })
    }

    fn enter(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        let target = self
            .document
            .document_element()
            .map_or(JsValue::UNDEFINED, JsValue::from);
        self.run(target, &["requestFullscreen", "webkitRequestFullscreen"])
    }

    fn exit(&self) -> LocalBoxFuture<'static, Result<(), PlatformError>> {
        self.run(
            JsValue::from(self.document.clone()),
            &["exitFullscreen", "webkitExitFullscreen"],
        )
    }
}

/// Calls the first of `methods` that exists on `target`.
fn call_first(target: &JsValue, methods: &[&str]) -> Result<JsValue, PlatformError> {
    if target.is_undefined() {
        return Err(PlatformError::unsupported("fullscreen"));
    }
    for method in methods {
        let Ok(function) = Reflect::get(target, &JsValue::from_str(method)) else {
            continue;
        };
        let Ok(function) = function.dyn_into::<Function>() else {
            continue;
        };
        return function
            .call0(target)
            .map_err(|err| PlatformError::rejected("fullscreen", describe_js(&err)));
    }
    Err(PlatformError::unsupported("fullscreen"))
}
