use std::rc::Rc;
use std::time::Duration;

use super::{Revoker, WakeGuard, WakeLockState, WakeStrategy};
use crate::error::PlatformError;
use crate::task::LocalBoxFuture;
use crate::timer::{Scheduler, TimerHandle};

pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(30);

/// A trivial, invisible change that nudges the platform's idle heuristics.
pub trait IdlePulse {
    fn pulse(&self);
}

/// Last link of the chain: a repeating timer that pulses every
/// [`HEARTBEAT_PERIOD`]. Engaging never fails.
pub struct HeartbeatStrategy {
    scheduler: Rc<dyn Scheduler>,
    pulse: Rc<dyn IdlePulse>,
}

impl HeartbeatStrategy {
    pub fn new(scheduler: Rc<dyn Scheduler>, pulse: Rc<dyn IdlePulse>) -> Self {
        Self { scheduler, pulse }
    }
}

struct HeartbeatGuard {
    interval: TimerHandle,
}

impl WakeGuard for HeartbeatGuard {
    fn release(self: Box<Self>) {
        self.interval.cancel();
    }
}

impl WakeStrategy for HeartbeatStrategy {
    fn kind(&self) -> WakeLockState {
        WakeLockState::TimerFallback
    }

    fn engage(
        &self,
        _revoker: Revoker,
    ) -> LocalBoxFuture<'static, Result<Box<dyn WakeGuard>, PlatformError>> {
        let pulse = Rc::clone(&self.pulse);
        let interval = self.scheduler.every(
            HEARTBEAT_PERIOD,
            Box::new(move || {
                pulse.pulse();
                log::debug!("wake heartbeat");
            }),
        );
        Box::pin(async move { Ok(Box::new(HeartbeatGuard { interval }) as Box<dyn WakeGuard>) })
    }
}
