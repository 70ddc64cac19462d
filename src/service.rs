use std::{rc::Rc, sync::Arc};

use crate::{ctx::AsyncCtx, signal::Signal};

/// The capability set a hosted service provides to its [`Worker`].
///
/// A service is constructed on the worker thread and never leaves it; both
/// methods run on the event-loop thread and must not block. Loop-local state
/// (`Rc`, `RefCell`) is fine.
///
/// [`Worker`]: crate::Worker
pub trait Service: 'static {
    /// Dispatches a control signal.
    ///
    /// Runs on the loop thread between continuations, so it must be
    /// wake-safe: no blocking, no re-entry into the loop. By convention a
    /// service reacts to [`Signal::Terminate`] by initiating its shutdown;
    /// the worker stops the loop either way.
    fn on_signal(&self, signal: Signal);

    /// Begins serving on the context: bind listeners, spawn the initial
    /// continuations through `ctx.scope()`.
    ///
    /// Takes an owned handle so the service can park clones of itself inside
    /// the tasks it spawns.
    ///
    /// A service that cannot start should log the failure and call
    /// `ctx.scope().request_stop()`; the loop then drains and the worker
    /// exits cleanly.
    fn start(self: Rc<Self>, ctx: &Arc<AsyncCtx>);
}
