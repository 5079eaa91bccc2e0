use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

/// Cancels its timer when dropped or when [`TimerHandle::cancel`] is called.
#[must_use = "dropping a TimerHandle cancels the timer"]
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing behind it, for platforms without timers.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

/// Cooperative timer service. Callbacks run on the single UI thread.
pub trait Scheduler {
    fn every(&self, period: Duration, task: Box<dyn FnMut()>) -> TimerHandle;
    fn after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle;
}

enum Task {
    Repeating(Box<dyn FnMut()>),
    Once(Box<dyn FnOnce()>),
}

struct Entry {
    due: Duration,
    period: Option<Duration>,
    // None while the task is running.
    task: Option<Task>,
}

#[derive(Default)]
struct QueueState {
    now: Duration,
    next_id: u64,
    entries: BTreeMap<u64, Entry>,
}

/// Deterministic timer queue driven by an external clock. The desktop host
/// advances it from a monotonic `Instant` every frame; tests advance it by
/// hand.
#[derive(Clone, Default)]
pub struct TimerQueue {
    state: Rc<RefCell<QueueState>>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Number of scheduled timers, repeating or one-shot.
    pub fn pending(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn repeating(&self) -> usize {
        self.state
            .borrow()
            .entries
            .values()
            .filter(|entry| entry.period.is_some())
            .count()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.state
            .borrow()
            .entries
            .values()
            .map(|entry| entry.due)
            .min()
    }

    pub fn advance(&self, delta: Duration) -> usize {
        let target = self.now() + delta;
        self.advance_to(target)
    }

    /// Runs every timer due at or before `target`, in due order, and returns
    /// how many callbacks fired. Repeating timers that fall behind fire once
    /// per missed period.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let state = self.state.borrow();
                state
                    .entries
                    .iter()
                    .filter(|(_, entry)| entry.task.is_some() && entry.due <= target)
                    .min_by_key(|(id, entry)| (entry.due, **id))
                    .map(|(id, entry)| (*id, entry.due))
            };
            let Some((id, due)) = next else {
                break;
            };

            let task = {
                let mut state = self.state.borrow_mut();
                state.now = state.now.max(due);
                state.entries.get_mut(&id).and_then(|entry| entry.task.take())
            };
            let Some(task) = task else {
                continue;
            };

            match task {
                Task::Once(callback) => {
                    self.state.borrow_mut().entries.remove(&id);
                    callback();
                }
                Task::Repeating(mut callback) => {
                    callback();
                    let mut state = self.state.borrow_mut();
                    // Cancelled from inside its own callback.
                    if let Some(entry) = state.entries.get_mut(&id) {
                        let period = entry.period.unwrap_or(Duration::from_millis(1));
                        entry.due = due + period;
                        entry.task = Some(Task::Repeating(callback));
                    }
                }
            }
            fired += 1;
        }
        let mut state = self.state.borrow_mut();
        state.now = state.now.max(target);
        fired
    }

    fn schedule(&self, due_in: Duration, period: Option<Duration>, task: Task) -> TimerHandle {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            let due = state.now + due_in;
            state.entries.insert(
                id,
                Entry {
                    due,
                    period,
                    task: Some(task),
                },
            );
            id
        };
        let state = Rc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = state.upgrade() {
                // A task cancelling itself holds no borrow while it runs.
                let removed = state.borrow_mut().entries.remove(&id);
                drop(removed);
            }
        })
    }
}

impl Scheduler for TimerQueue {
    fn every(&self, period: Duration, task: Box<dyn FnMut()>) -> TimerHandle {
        let period = period.max(Duration::from_millis(1));
        self.schedule(period, Some(period), Task::Repeating(task))
    }

    fn after(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerHandle {
        self.schedule(delay, None, Task::Once(task))
    }
}
