use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::clock::{ClockSource, format_date, format_time};
use crate::settings::SettingsStore;
use crate::timer::{Scheduler, TimerHandle};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);
/// How long the date fades out before it is collapsed.
pub const DATE_FADE: Duration = Duration::from_millis(300);

/// Where the clock face is drawn: the time and date text elements.
pub trait ClockSurface {
    fn show_time(&self, text: &str);
    fn show_date(&self, text: &str);
    /// Starts the opacity transition of the date element.
    fn set_date_faded(&self, faded: bool);
    /// Removes the date element from layout entirely.
    fn set_date_collapsed(&self, collapsed: bool);
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Reading {
    pub time: String,
    pub date: String,
}

pub struct ClockFace {
    settings: Rc<SettingsStore>,
    clock: Rc<dyn ClockSource>,
    surface: Rc<dyn ClockSurface>,
}

impl ClockFace {
    pub fn new(
        settings: Rc<SettingsStore>,
        clock: Rc<dyn ClockSource>,
        surface: Rc<dyn ClockSurface>,
    ) -> Self {
        Self {
            settings,
            clock,
            surface,
        }
    }

    pub fn render(&self) -> Reading {
        let now = self.clock.now();
        let reading = Reading {
            time: format_time(&now, self.settings.show_seconds()),
            date: format_date(&now),
        };
        self.surface.show_time(&reading.time);
        self.surface.show_date(&reading.date);
        reading
    }
}

pub struct ClockTicker {
    face: Rc<ClockFace>,
    scheduler: Rc<dyn Scheduler>,
    interval: RefCell<Option<TimerHandle>>,
    date_fade: RefCell<Option<TimerHandle>>,
}

impl ClockTicker {
    pub fn new(face: ClockFace, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            face: Rc::new(face),
            scheduler,
            interval: RefCell::new(None),
            date_fade: RefCell::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.borrow().is_some()
    }

    /// Renders now and then once per [`TICK_PERIOD`]. No-op when running.
    pub fn start(&self) {
        if self.is_running() {
            return;
        }
        self.face.render();
        let face = Rc::clone(&self.face);
        let handle = self.scheduler.every(
            TICK_PERIOD,
            Box::new(move || {
                face.render();
            }),
        );
        *self.interval.borrow_mut() = Some(handle);
        log::info!("clock started");
    }

    pub fn stop(&self) {
        let handle = self.interval.borrow_mut().take();
        if let Some(handle) = handle {
            handle.cancel();
            log::info!("clock stopped");
        }
        self.date_fade.borrow_mut().take();
    }

    /// Re-renders immediately without waiting for the next tick.
    pub fn refresh(&self) -> Reading {
        self.face.render()
    }

    /// Shows the date at once, or fades it out and collapses it once the
    /// fade has finished if it is still meant to be hidden by then.
    pub fn apply_date_visibility(&self) {
        let show_date = self.face.settings.show_date();
        if show_date {
            self.date_fade.borrow_mut().take();
            self.face.surface.set_date_collapsed(false);
            self.face.surface.set_date_faded(false);
            return;
        }

        self.face.surface.set_date_faded(true);
        let face = Rc::clone(&self.face);
        let handle = self.scheduler.after(
            DATE_FADE,
            Box::new(move || {
                if !face.settings.show_date() {
                    face.surface.set_date_collapsed(true);
                }
            }),
        );
        *self.date_fade.borrow_mut() = Some(handle);
    }
}
