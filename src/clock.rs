use std::cell::Cell;

use chrono::{Local, NaiveDateTime, Timelike};

/// Source of local wall-clock time.
pub trait ClockSource {
    fn now(&self) -> NaiveDateTime;

    fn hour(&self) -> u32 {
        self.now().hour()
    }
}

/// Reads `chrono::Local`, which is backed by `Date` in the browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.now.set(self.now.get() + delta);
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

/// 24-hour clock, `HH:MM` or `HH:MM:SS`.
pub fn format_time(now: &NaiveDateTime, show_seconds: bool) -> String {
    if show_seconds {
        now.format("%H:%M:%S").to_string()
    } else {
        now.format("%H:%M").to_string()
    }
}

/// Numeric year, month, day: `YYYY/MM/DD`.
pub fn format_date(now: &NaiveDateTime) -> String {
    now.format("%Y/%m/%d").to_string()
}
