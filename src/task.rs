use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Runs detached futures on the UI thread (`spawn_local` in the browser).
pub trait Spawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Poll-driven local executor. Tasks are polled with a no-op waker whenever
/// [`TaskQueue::run_until_stalled`] is called, so the owner must call it
/// again (every frame on desktop) to make progress on pending work.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<Vec<LocalBoxFuture<'static, ()>>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Polls until no task completes and nothing new was spawned. Returns the
    /// number of tasks that finished.
    pub fn run_until_stalled(&self) -> usize {
        let mut cx = Context::from_waker(Waker::noop());
        let mut completed = 0;
        loop {
            let batch = std::mem::take(&mut *self.tasks.borrow_mut());
            if batch.is_empty() {
                break;
            }
            let mut progressed = false;
            let mut still_pending = Vec::new();
            for mut task in batch {
                match task.as_mut().poll(&mut cx) {
                    Poll::Ready(()) => {
                        completed += 1;
                        progressed = true;
                    }
                    Poll::Pending => still_pending.push(task),
                }
            }
            let mut tasks = self.tasks.borrow_mut();
            let spawned_more = !tasks.is_empty();
            tasks.splice(0..0, still_pending);
            if !progressed && !spawned_more {
                break;
            }
        }
        completed
    }
}

impl Spawner for TaskQueue {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.tasks.borrow_mut().push(task);
    }
}
