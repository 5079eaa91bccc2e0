//! Full-screen wall clock that keeps the display awake.
//!
//! The core in this crate is platform-agnostic: components talk to storage,
//! timers, rendering and capabilities through small traits, and a front-end
//! binds those to a real platform. [`web`] drives a browser page; [`desktop`]
//! hosts the same core in a native window.

pub mod app;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod settings;
pub mod storage;
pub mod task;
pub mod theme;
pub mod ticker;
pub mod timer;
pub mod ui;
pub mod wake_lock;

#[cfg(not(target_arch = "wasm32"))]
pub mod desktop;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{ClockApp, Platform};
pub use lifecycle::Visibility;
pub use settings::{Settings, ThemeMode};
pub use ui::UiIntent;
pub use wake_lock::WakeLockState;
