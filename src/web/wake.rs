//! Browser wake strategies, most to least preferred: the Screen Wake Lock
//! API, a silent looping video, then the DOM heartbeat.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    CanvasRenderingContext2d, Document, Element, EventTarget, HtmlCanvasElement,
    HtmlVideoElement, MediaStream, MediaStreamTrack,
};

use super::describe_js;
use crate::error::PlatformError;
use crate::task::LocalBoxFuture;
use crate::timer::Scheduler;
use crate::wake_lock::{
    HeartbeatStrategy, IdlePulse, Revoker, WakeGuard, WakeLockState, WakeStrategy,
};

type Engaging = LocalBoxFuture<'static, Result<Box<dyn WakeGuard>, PlatformError>>;

/// How long each heartbeat marker stays in the document.
pub const HEARTBEAT_PULSE_LINGER: Duration = Duration::from_millis(10);

/// Attribute carried by heartbeat markers.
pub const PULSE_MARKER_ATTR: &str = "data-wake-pulse";

const OFFSCREEN_VIDEO_STYLE: &str =
    "position:fixed;top:-1px;left:-1px;width:1px;height:1px;opacity:0;pointer-events:none;";
const PULSE_MARKER_STYLE: &str =
    "position:absolute;left:-9999px;width:1px;height:1px;opacity:0;pointer-events:none;";

pub fn wake_strategies(
    document: &Document,
    scheduler: Rc<dyn Scheduler>,
) -> Vec<Rc<dyn WakeStrategy>> {
    vec![
        Rc::new(NativeWakeLock) as Rc<dyn WakeStrategy>,
        Rc::new(SilentVideo::new(document.clone())) as Rc<dyn WakeStrategy>,
        Rc::new(HeartbeatStrategy::new(
            scheduler,
            Rc::new(DomPulse::new(document.clone())),
        )) as Rc<dyn WakeStrategy>,
    ]
}

fn failed(err: PlatformError) -> Engaging {
    Box::pin(async move { Err(err) })
}

pub struct NativeWakeLock;

impl NativeWakeLock {
    fn request() -> Result<Promise, PlatformError> {
        let unsupported = || PlatformError::unsupported("screen wake lock");
        let navigator = web_sys::window().ok_or_else(unsupported)?.navigator();
        let wake_lock = Reflect::get(&navigator, &JsValue::from_str("wakeLock"))
            .ok()
            .filter(|value| value.is_object())
            .ok_or_else(unsupported)?;
        let request = Reflect::get(&wake_lock, &JsValue::from_str("request"))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
            .ok_or_else(unsupported)?;
        let promise = request
            .call1(&wake_lock, &JsValue::from_str("screen"))
            .map_err(|err| PlatformError::rejected("screen wake lock", describe_js(&err)))?;
        promise.dyn_into::<Promise>().map_err(|_| {
            PlatformError::rejected("screen wake lock", "request did not return a promise")
        })
    }
}

struct NativeGuard {
    sentinel: EventTarget,
    on_release: EventListener,
}

impl WakeGuard for NativeGuard {
    fn release(self: Box<Self>) {
        let NativeGuard {
            sentinel,
            on_release,
        } = *self;
        drop(on_release);
        let released = Reflect::get(&sentinel, &JsValue::from_str("release"))
            .ok()
            .and_then(|value| value.dyn_into::<Function>().ok())
            .map(|release| release.call0(&sentinel));
        let Some(Ok(promise)) = released else {
            return;
        };
        if let Ok(promise) = promise.dyn_into::<Promise>() {
            spawn_local(async move {
                if let Err(err) = JsFuture::from(promise).await {
                    log::debug!("wake lock sentinel release failed: {}", describe_js(&err));
                }
            });
        }
    }
}

impl WakeStrategy for NativeWakeLock {
    fn kind(&self) -> WakeLockState {
        WakeLockState::NativeLock
    }

    fn engage(&self, revoker: Revoker) -> Engaging {
        let promise = match Self::request() {
            Ok(promise) => promise,
            Err(err) => return failed(err),
        };
        Box::pin(async move {
            let sentinel = JsFuture::from(promise)
                .await
                .map_err(|err| PlatformError::rejected("screen wake lock", describe_js(&err)))?
                .dyn_into::<EventTarget>()
                .map_err(|_| PlatformError::rejected("screen wake lock", "no sentinel returned"))?;
            let on_release = EventListener::once(&sentinel, "release", move |_| {
                // Leave the listener's own callback before the guard drops it.
                spawn_local(async move { revoker.revoke() });
            });
            Ok(Box::new(NativeGuard {
                sentinel,
                on_release,
            }) as Box<dyn WakeGuard>)
        })
    }
}

/// A muted, inline, looping 1x1 video fed from a canvas capture stream.
pub struct SilentVideo {
    document: Document,
}

/// The attached video and the stream feeding it.
struct Playback {
    video: HtmlVideoElement,
    stream: MediaStream,
}

impl Playback {
    fn stop(self) {
        if let Err(err) = self.video.pause() {
            log::debug!("silent video pause failed: {}", describe_js(&err));
        }
        self.video.set_src_object(None);
        self.video.remove();
        for track in self.stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
    }
}

impl SilentVideo {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    fn build(&self) -> Result<Playback, JsValue> {
        let canvas = self
            .document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        canvas.set_width(1);
        canvas.set_height(1);
        if let Some(context) = canvas.get_context("2d")? {
            let context = context.dyn_into::<CanvasRenderingContext2d>()?;
            context.fill_rect(0.0, 0.0, 1.0, 1.0);
        }
        let stream = canvas.capture_stream()?;

        let video = self
            .document
            .create_element("video")?
            .dyn_into::<HtmlVideoElement>()?;
        video.set_muted(true);
        video.set_loop(true);
        video.set_attribute("muted", "")?;
        video.set_attribute("playsinline", "")?;
        video.set_attribute("aria-hidden", "true")?;
        video.set_attribute("style", OFFSCREEN_VIDEO_STYLE)?;
        video.set_src_object(Some(&stream));
        Ok(Playback { video, stream })
    }

    fn attach(&self) -> Result<(Playback, Promise), PlatformError> {
        let rejected = |err: JsValue| PlatformError::rejected("silent video", describe_js(&err));
        let playback = self.build().map_err(rejected)?;
        let Some(body) = self.document.body() else {
            playback.stop();
            return Err(PlatformError::unsupported("silent video"));
        };
        if let Err(err) = body.append_child(&playback.video) {
            playback.stop();
            return Err(rejected(err));
        }
        match playback.video.play() {
            Ok(playing) => Ok((playback, playing)),
            Err(err) => {
                playback.stop();
                Err(rejected(err))
            }
        }
    }
}

struct VideoGuard {
    playback: Playback,
}

impl WakeGuard for VideoGuard {
    fn release(self: Box<Self>) {
        self.playback.stop();
    }
}

impl WakeStrategy for SilentVideo {
    fn kind(&self) -> WakeLockState {
        WakeLockState::VideoFallback
    }

    fn engage(&self, _revoker: Revoker) -> Engaging {
        let (playback, playing) = match self.attach() {
            Ok(attached) => attached,
            Err(err) => return failed(err),
        };
        Box::pin(async move {
            if let Err(err) = JsFuture::from(playing).await {
                playback.stop();
                return Err(PlatformError::rejected("silent video", describe_js(&err)));
            }
            Ok(Box::new(VideoGuard { playback }) as Box<dyn WakeGuard>)
        })
    }
}

/// Inserts an invisible marker and removes it shortly after.
pub struct DomPulse {
    document: Document,
    pending: RefCell<Option<(Element, Timeout)>>,
}

impl DomPulse {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            pending: RefCell::new(None),
        }
    }
}

impl IdlePulse for DomPulse {
    fn pulse(&self) {
        if let Some((stale, timeout)) = self.pending.borrow_mut().take() {
            drop(timeout);
            stale.remove();
        }
        let Some(body) = self.document.body() else {
            return;
        };
        let Ok(marker) = self.document.create_element("div") else {
            return;
        };
        let _ = marker.set_attribute(PULSE_MARKER_ATTR, "");
        let _ = marker.set_attribute("aria-hidden", "true");
        let _ = marker.set_attribute("style", PULSE_MARKER_STYLE);
        if body.append_child(&marker).is_err() {
            return;
        }
        let linger = u32::try_from(HEARTBEAT_PULSE_LINGER.as_millis()).unwrap_or(10);
        let target = marker.clone();
        let timeout = Timeout::new(linger, move || target.remove());
        *self.pending.borrow_mut() = Some((marker, timeout));
    }
}

impl Drop for DomPulse {
    fn drop(&mut self) {
        if let Some((marker, _timeout)) = self.pending.get_mut().take() {
            marker.remove();
        }
    }
}
