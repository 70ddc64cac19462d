use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    interrupt::Interrupt,
    scope::Scope,
    signal::{Signal, SignalSet},
};

/// The per-worker bundle of event-loop state.
///
/// An `AsyncCtx` is constructed inert: the interrupt is disarmed, no signals
/// are pending, and the stopped latch is clear. The owning [`Worker`] arms the
/// interrupt before its loop runs and latches `stopped` during teardown.
///
/// Exactly three surfaces may be touched from outside the worker thread: the
/// interrupt cell, the pending-signal set (through [`AsyncCtx::signal`]), and
/// the stopped latch. Everything else belongs to the loop.
///
/// [`Worker`]: crate::Worker
#[derive(Debug, Default)]
pub struct AsyncCtx {
    scope: Scope,
    stopped: AtomicBool,
    signals: SignalSet,
    interrupt: Interrupt,
}

impl AsyncCtx {
    /// Creates an inert context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The scope every loop continuation is spawned through.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The event-loop interrupt cell.
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Whether the event loop has finished tearing down.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Latches the stopped flag. Called by the worker as the final teardown
    /// step, after the interrupt has been disarmed.
    pub(crate) fn mark_stopped(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Delivers a control signal to the event loop.
    ///
    /// If the interrupt is armed, the signal's bit is raised in the pending
    /// set and the interrupt is fired; the raise happens-before the fire, so
    /// the dispatcher observes the bit it was woken for. If the interrupt is
    /// disarmed — the worker has not armed it yet, or has already torn it
    /// down — the call is a no-op.
    pub fn signal(&self, signal: Signal) {
        if self.interrupt.is_armed() {
            self.signals.raise(signal);
            self.interrupt.fire();
        }
    }

    /// Atomically takes the pending-signal set for dispatch.
    pub(crate) fn take_signals(&self) -> u64 {
        self.signals.drain()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn signal_fires_armed_interrupt_once() {
        let fired = Arc::new(AtomicUsize::new(0));
        let ctx = AsyncCtx::new();

        let counter = fired.clone();
        ctx.interrupt().arm(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        ctx.signal(Signal::Terminate);
        assert_eq!(fired.load(Ordering::Relaxed), 1);
        assert_eq!(ctx.take_signals(), Signal::Terminate.bit());
    }

    #[test]
    fn signal_is_noop_while_disarmed() {
        let ctx = AsyncCtx::new();
        ctx.signal(Signal::User1);
        assert_eq!(ctx.take_signals(), 0);
        assert!(!ctx.is_stopped());
    }

    #[test]
    fn raise_is_visible_to_the_hook() {
        let ctx = Arc::new(AsyncCtx::new());

        let inner = Arc::clone(&ctx);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_inner = seen.clone();
        ctx.interrupt().arm(move || {
            seen_inner.store(inner.take_signals().count_ones() as usize, Ordering::Relaxed);
        });

        ctx.signal(Signal::User1);
        assert_eq!(seen.load(Ordering::Relaxed), 1);
    }
}
