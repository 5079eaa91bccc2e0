use std::cell::Cell;
use std::rc::Rc;

use crate::task::{LocalBoxFuture, Spawner};
use crate::ticker::ClockTicker;
use crate::wake_lock::{WakeLockManager, WakeLockState};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Two-state machine over page visibility. Every visibility-driven side
/// effect goes through [`LifecycleCoordinator::transition`].
pub struct LifecycleCoordinator {
    visibility: Cell<Visibility>,
    torn_down: Cell<bool>,
    wake_lock: Rc<WakeLockManager>,
    ticker: Rc<ClockTicker>,
    spawner: Rc<dyn Spawner>,
}

impl LifecycleCoordinator {
    pub fn new(
        initial: Visibility,
        wake_lock: Rc<WakeLockManager>,
        ticker: Rc<ClockTicker>,
        spawner: Rc<dyn Spawner>,
    ) -> Self {
        Self {
            visibility: Cell::new(initial),
            torn_down: Cell::new(false),
            wake_lock,
            ticker,
            spawner,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility.get()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.get()
    }

    pub fn start(&self) {
        if self.torn_down.get() {
            return;
        }
        self.ticker.start();
        if self.visibility.get() == Visibility::Visible {
            self.request_wake_lock();
        }
    }

    pub fn on_visibility_change(&self, next: Visibility) {
        if self.torn_down.get() {
            return;
        }
        let previous = self.visibility.replace(next);
        if previous == next {
            return;
        }
        self.transition(next);
    }

    /// Focus can arrive without a visibility change, so it always asks for
    /// the lock. A held lock is kept; a request that never settled is
    /// abandoned and retried.
    pub fn on_focus(&self) {
        if self.torn_down.get() {
            return;
        }
        log::debug!("window focused; requesting wake lock");
        self.spawn_acquire(self.wake_lock.acquire_fresh());
    }

    /// Synchronous and unconditional; later events are ignored.
    pub fn teardown(&self) {
        if self.torn_down.replace(true) {
            return;
        }
        log::info!("tearing down clock");
        self.ticker.stop();
        self.wake_lock.release();
    }

    fn transition(&self, entered: Visibility) {
        match entered {
            Visibility::Hidden => {
                log::info!("page hidden");
                // The ticker keeps running so the time is correct on return.
                self.wake_lock.release();
            }
            Visibility::Visible => {
                log::info!("page visible");
                self.request_wake_lock();
                if self.ticker.is_running() {
                    self.ticker.refresh();
                } else {
                    self.ticker.start();
                }
            }
        }
    }

    fn request_wake_lock(&self) {
        self.spawn_acquire(self.wake_lock.acquire());
    }

    fn spawn_acquire(&self, acquire: LocalBoxFuture<'static, WakeLockState>) {
        self.spawner.spawn(Box::pin(async move {
            acquire.await;
        }));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::NaiveDate;

    use super::*;
    use crate::clock::{ClockSource, FixedClock};
    use crate::error::PlatformError;
    use crate::settings::SettingsStore;
    use crate::storage::MemoryStore;
    use crate::task::TaskQueue;
    use crate::ticker::tests::RecordingSurface;
    use crate::ticker::{ClockFace, ClockSurface, TICK_PERIOD};
    use crate::timer::TimerQueue;
    use crate::wake_lock::{Revoker, WakeGuard, WakeStrategy};

    #[derive(Default)]
    struct Counts {
        engaged: Cell<usize>,
        released: Cell<usize>,
        stall_first: Cell<bool>,
    }

    struct CountingStrategy(Rc<Counts>);

    struct CountingGuard(Rc<Counts>);

    impl WakeGuard for CountingGuard {
        fn release(self: Box<Self>) {
            self.0.released.set(self.0.released.get() + 1);
        }
    }

    impl WakeStrategy for CountingStrategy {
        fn kind(&self) -> WakeLockState {
            WakeLockState::NativeLock
        }

        fn engage(
            &self,
            _revoker: Revoker,
        ) -> LocalBoxFuture<'static, Result<Box<dyn WakeGuard>, PlatformError>> {
            self.0.engaged.set(self.0.engaged.get() + 1);
            if self.0.stall_first.get() && self.0.engaged.get() == 1 {
                return Box::pin(std::future::pending::<
                    Result<Box<dyn WakeGuard>, PlatformError>,
                >());
            }
            let counts = Rc::clone(&self.0);
            Box::pin(async move { Ok(Box::new(CountingGuard(counts)) as Box<dyn WakeGuard>) })
        }
    }

    struct Rig {
        timers: TimerQueue,
        tasks: TaskQueue,
        counts: Rc<Counts>,
        surface: Rc<RecordingSurface>,
        wake_lock: Rc<WakeLockManager>,
        ticker: Rc<ClockTicker>,
        lifecycle: LifecycleCoordinator,
    }

    fn rig(initial: Visibility) -> Rig {
        let timers = TimerQueue::new();
        let tasks = TaskQueue::new();
        let counts = Rc::new(Counts::default());
        let surface = Rc::new(RecordingSurface::default());
        let clock = Rc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2026, 10, 19)
                .and_then(|date| date.and_hms_opt(8, 0, 0))
                .expect("valid timestamp"),
        ));
        let settings = Rc::new(SettingsStore::load(Box::new(MemoryStore::new())));
        let face = ClockFace::new(
            settings,
            clock as Rc<dyn ClockSource>,
            Rc::clone(&surface) as Rc<dyn ClockSurface>,
        );
        let ticker = Rc::new(ClockTicker::new(face, Rc::new(timers.clone())));
        let wake_lock = Rc::new(WakeLockManager::new(vec![
            Rc::new(CountingStrategy(Rc::clone(&counts))) as Rc<dyn WakeStrategy>,
        ]));
        let lifecycle = LifecycleCoordinator::new(
            initial,
            Rc::clone(&wake_lock),
            Rc::clone(&ticker),
            Rc::new(tasks.clone()),
        );
        Rig {
            timers,
            tasks,
            counts,
            surface,
            wake_lock,
            ticker,
            lifecycle,
        }
    }

    #[test]
    fn start_visible_runs_ticker_and_holds_lock() {
        let rig = rig(Visibility::Visible);
        rig.lifecycle.start();
        rig.tasks.run_until_stalled();
        assert!(rig.ticker.is_running());
        assert_eq!(rig.wake_lock.state(), WakeLockState::NativeLock);
    }

    #[test]
    fn start_hidden_defers_lock_until_visible() {
        let rig = rig(Visibility::Hidden);
        rig.lifecycle.start();
        rig.tasks.run_until_stalled();
        assert!(rig.ticker.is_running());
        assert_eq!(rig.counts.engaged.get(), 0);

        rig.lifecycle.on_visibility_change(Visibility::Visible);
        rig.tasks.run_until_stalled();
        assert_eq!(rig.wake_lock.state(), WakeLockState::NativeLock);
    }

    #[test]
    fn hide_then_show_releases_once_and_reacquires_once() {
        let rig = rig(Visibility::Visible);
        rig.lifecycle.start();
        rig.tasks.run_until_stalled();

        rig.lifecycle.on_visibility_change(Visibility::Hidden);
        rig.lifecycle.on_visibility_change(Visibility::Hidden);
        assert_eq!(rig.counts.released.get(), 1);
        assert_eq!(rig.wake_lock.state(), WakeLockState::None);
        assert!(rig.ticker.is_running());

        let rendered = rig.surface.times.borrow().len();
        rig.lifecycle.on_visibility_change(Visibility::Visible);
        rig.tasks.run_until_stalled();
        assert_eq!(rig.counts.engaged.get(), 2);
        assert_eq!(rig.wake_lock.state(), WakeLockState::NativeLock);
        assert_eq!(rig.surface.times.borrow().len(), rendered + 1);
        assert_eq!(rig.timers.repeating(), 1);
    }

    #[test]
    fn focus_requests_lock_but_does_not_double_engage() {
        let rig = rig(Visibility::Visible);
        rig.lifecycle.start();
        rig.lifecycle.on_focus();
        rig.tasks.run_until_stalled();
        assert_eq!(rig.counts.engaged.get(), 1);

        rig.lifecycle.on_visibility_change(Visibility::Hidden);
        rig.lifecycle.on_focus();
        rig.tasks.run_until_stalled();
        assert_eq!(rig.counts.engaged.get(), 2);
    }

    #[test]
    fn focus_retries_a_request_that_never_settled() {
        let rig = rig(Visibility::Visible);
        rig.counts.stall_first.set(true);
        rig.lifecycle.start();
        rig.tasks.run_until_stalled();
        assert!(rig.wake_lock.is_acquiring());
        assert_eq!(rig.wake_lock.state(), WakeLockState::None);

        rig.lifecycle.on_focus();
        rig.tasks.run_until_stalled();
        assert_eq!(rig.counts.engaged.get(), 2);
        assert_eq!(rig.wake_lock.state(), WakeLockState::NativeLock);

        rig.lifecycle.on_focus();
        rig.tasks.run_until_stalled();
        assert_eq!(rig.counts.engaged.get(), 2);
        assert_eq!(rig.counts.released.get(), 0);
    }

    #[test]
    fn teardown_is_idempotent_and_final() {
        let rig = rig(Visibility::Visible);
        rig.lifecycle.start();
        rig.tasks.run_until_stalled();

        rig.lifecycle.teardown();
        rig.lifecycle.teardown();
        assert!(rig.lifecycle.is_torn_down());
        assert!(!rig.ticker.is_running());
        assert_eq!(rig.counts.released.get(), 1);
        assert_eq!(rig.timers.pending(), 0);

        rig.lifecycle.on_visibility_change(Visibility::Hidden);
        rig.lifecycle.on_visibility_change(Visibility::Visible);
        rig.lifecycle.on_focus();
        rig.tasks.run_until_stalled();
        rig.timers.advance(TICK_PERIOD * 2);
        assert_eq!(rig.counts.engaged.get(), 1);
        assert!(!rig.ticker.is_running());
    }
}
