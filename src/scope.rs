use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::{
    sync::{CancellationToken, WaitForCancellationFuture, WaitForCancellationFutureOwned},
    task::{task_tracker::TaskTrackerWaitFuture, TaskTracker},
};

/// An owning, cancellable scope for the continuations of one event loop.
///
/// This is a wrapper around a [`TaskTracker`] and a [`CancellationToken`].
/// Every task spawned onto the loop goes through the scope, so that
/// [`Scope::request_stop`] cancels all in-flight work and the worker can
/// drain outstanding tasks before joining its thread.
///
/// Tasks are spawned onto the current thread's `LocalSet`: dispatch is
/// single-threaded and cooperative, and futures need not be `Send`.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    tasks: TaskTracker,
    stop: CancellationToken,
}

impl Scope {
    /// Creates an empty scope with an untriggered stop token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of all work spawned through this scope.
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Reports whether a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// A future that resolves once a stop has been requested.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.stop.cancelled()
    }

    /// Spawns a task that is abandoned as soon as a stop is requested.
    ///
    /// The task resolves to `None` if it was cancelled before completing.
    /// Suitable for tasks whose partial work can simply be dropped, such as
    /// a pending read.
    pub fn spawn_cancellable<F>(&self, task: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let stop = self.stop.clone();
        self.tasks.spawn_local(async move {
            tokio::select! {
                _ = stop.cancelled() => None,
                output = task => Some(output),
            }
        })
    }

    /// Spawns a task that observes the stop request and winds down on its
    /// own terms.
    ///
    /// The closure receives an owned future that resolves when a stop is
    /// requested; the task is expected to select on it and exit promptly.
    pub fn spawn_graceful<F, Fut>(&self, task: F) -> JoinHandle<Fut::Output>
    where
        F: FnOnce(WaitForCancellationFutureOwned) -> Fut,
        Fut: Future + 'static,
        Fut::Output: 'static,
    {
        self.tasks.spawn_local(task(self.stop.clone().cancelled_owned()))
    }

    /// Closes the scope, allowing [`Scope::wait`] to resolve once all
    /// outstanding tasks finish. Tasks may still be spawned after closing.
    pub fn close(&self) {
        self.tasks.close();
    }

    /// Waits for the scope to be closed and drained.
    pub fn wait(&self) -> TaskTrackerWaitFuture<'_> {
        self.tasks.wait()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::rc::Rc;

    fn run_local<F: Future>(future: F) -> F::Output {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        tokio::task::LocalSet::new().block_on(&runtime, future)
    }

    #[test]
    fn cancellable_tasks_are_abandoned_on_stop() {
        run_local(async {
            let scope = Scope::new();
            let witness = Rc::new(());

            let held = witness.clone();
            let pending = scope.spawn_cancellable(async move {
                let _held = held;
                std::future::pending::<()>().await;
            });

            scope.request_stop();
            assert_eq!(pending.await.expect("join"), None);
            assert_eq!(Rc::strong_count(&witness), 1);
        });
    }

    #[test]
    fn wait_resolves_after_close_and_drain() {
        run_local(async {
            let scope = Scope::new();
            let done = scope.spawn_cancellable(async { 7u32 });
            scope.close();
            scope.wait().await;
            assert_eq!(done.await.expect("join"), Some(7));
        });
    }
}
