//! Screen wake lock with an escalating fallback chain.
//!
//! The manager owns an ordered list of [`WakeStrategy`] values (native lock,
//! silent video, DOM heartbeat in the browser) and walks it on every
//! [`WakeLockManager::acquire`] until one engages. Exactly one strategy is
//! active at a time; [`WakeLockManager::release`] undoes whichever it is.

mod heartbeat;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

pub use heartbeat::{HEARTBEAT_PERIOD, HeartbeatStrategy, IdlePulse};

use crate::error::PlatformError;
use crate::task::LocalBoxFuture;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum WakeLockState {
    None,
    NativeLock,
    VideoFallback,
    TimerFallback,
}

impl fmt::Display for WakeLockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WakeLockState::None => "none",
            WakeLockState::NativeLock => "native wake lock",
            WakeLockState::VideoFallback => "silent video fallback",
            WakeLockState::TimerFallback => "timer heartbeat fallback",
        })
    }
}

/// Holds one engaged strategy's platform resource until released.
pub trait WakeGuard {
    fn release(self: Box<Self>);
}

pub trait WakeStrategy {
    /// The state this strategy produces when it engages.
    fn kind(&self) -> WakeLockState;

    /// Attempts to engage. `revoker` lets the platform report an out-of-band
    /// release of the resource later on.
    fn engage(
        &self,
        revoker: Revoker,
    ) -> LocalBoxFuture<'static, Result<Box<dyn WakeGuard>, PlatformError>>;
}

struct ActiveLock {
    kind: WakeLockState,
    lease: u64,
    guard: Box<dyn WakeGuard>,
}

#[derive(Default)]
struct ManagerState {
    active: Option<ActiveLock>,
    in_flight: bool,
    // Bumped by every release; an acquisition started under an older epoch
    // is cancelled.
    epoch: u64,
    next_lease: u64,
    acquisitions: u64,
}

/// Clears the manager's state when the platform drops the lock on its own,
/// but only while the lock it was issued for is still the active one.
#[derive(Clone)]
pub struct Revoker {
    state: Weak<RefCell<ManagerState>>,
    lease: u64,
}

impl Revoker {
    pub fn revoke(&self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let revoked = {
            let mut current = state.borrow_mut();
            match &current.active {
                Some(active) if active.lease == self.lease => current.active.take(),
                _ => None,
            }
        };
        if let Some(active) = revoked {
            log::info!("{} released by the platform", active.kind);
            // Already released on the platform side; nothing to undo.
            drop(active.guard);
        }
    }
}

pub struct WakeLockManager {
    strategies: Rc<[Rc<dyn WakeStrategy>]>,
    state: Rc<RefCell<ManagerState>>,
}

impl WakeLockManager {
    pub fn new(strategies: Vec<Rc<dyn WakeStrategy>>) -> Self {
        Self {
            strategies: strategies.into(),
            state: Rc::new(RefCell::new(ManagerState::default())),
        }
    }

    pub fn state(&self) -> WakeLockState {
        self.state
            .borrow()
            .active
            .as_ref()
            .map_or(WakeLockState::None, |active| active.kind)
    }

    pub fn is_acquiring(&self) -> bool {
        self.state.borrow().in_flight
    }

    /// Completed acquisitions since construction.
    pub fn acquisitions(&self) -> u64 {
        self.state.borrow().acquisitions
    }

    /// Walks the strategy chain until one engages. A no-op while a lock is
    /// held or another acquisition is still in flight.
    pub fn acquire(&self) -> LocalBoxFuture<'static, WakeLockState> {
        let state = Rc::clone(&self.state);
        let strategies = Rc::clone(&self.strategies);
        Box::pin(async move {
            let epoch = {
                let mut current = state.borrow_mut();
                if let Some(active) = &current.active {
                    return active.kind;
                }
                if current.in_flight {
                    log::debug!("wake lock acquisition already in flight");
                    return WakeLockState::None;
                }
                current.in_flight = true;
                current.epoch
            };

            for strategy in strategies.iter() {
                let lease = {
                    let mut current = state.borrow_mut();
                    current.next_lease += 1;
                    current.next_lease
                };
                let revoker = Revoker {
                    state: Rc::downgrade(&state),
                    lease,
                };
                let outcome = strategy.engage(revoker).await;
                let cancelled = state.borrow().epoch != epoch;

                match outcome {
                    Ok(guard) if cancelled => {
                        log::debug!("{} engaged after release; undoing", strategy.kind());
                        guard.release();
                        return WakeLockState::None;
                    }
                    Ok(guard) => {
                        let kind = strategy.kind();
                        let mut current = state.borrow_mut();
                        current.in_flight = false;
                        current.acquisitions += 1;
                        current.active = Some(ActiveLock { kind, lease, guard });
                        log::info!("display kept awake via {kind}");
                        return kind;
                    }
                    Err(err) if cancelled => {
                        log::debug!(
                            "acquisition cancelled while trying {}: {err}",
                            strategy.kind()
                        );
                        return WakeLockState::None;
                    }
                    Err(err) => {
                        log::debug!("{} unavailable, trying next: {err}", strategy.kind());
                    }
                }
            }

            state.borrow_mut().in_flight = false;
            if !strategies.is_empty() {
                log::warn!("every wake lock strategy failed; display may sleep");
            } else {
                log::debug!("no wake lock strategies on this platform");
            }
            WakeLockState::None
        })
    }

    /// Like [`acquire`](Self::acquire), but an attempt still in flight is
    /// abandoned and the chain restarts from the top.
    pub fn acquire_fresh(&self) -> LocalBoxFuture<'static, WakeLockState> {
        {
            let mut current = self.state.borrow_mut();
            if current.active.is_none() && current.in_flight {
                log::debug!("abandoning unsettled wake lock acquisition");
                current.epoch += 1;
                current.in_flight = false;
            }
        }
        self.acquire()
    }

    /// Releases whatever is active and cancels any acquisition in flight.
    /// Safe to call at any time, any number of times.
    pub fn release(&self) {
        let released = {
            let mut current = self.state.borrow_mut();
            current.epoch += 1;
            current.in_flight = false;
            current.active.take()
        };
        if let Some(active) = released {
            log::info!("releasing {}", active.kind);
            active.guard.release();
        }
    }
}
