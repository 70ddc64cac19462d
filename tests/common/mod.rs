use std::{
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
};

use busbone::{AsyncCtx, Service, Signal};

/// A service that records lifecycle events for assertions on the parent
/// thread: `start` flips a shared flag, dispatched signals flow out through
/// a channel.
pub struct ProbeService {
    started: Arc<AtomicBool>,
    signals: mpsc::Sender<Signal>,
}

impl ProbeService {
    pub fn new(started: Arc<AtomicBool>, signals: mpsc::Sender<Signal>) -> Self {
        Self { started, signals }
    }
}

impl Service for ProbeService {
    fn on_signal(&self, signal: Signal) {
        let _ = self.signals.send(signal);
    }

    fn start(self: Rc<Self>, _ctx: &Arc<AsyncCtx>) {
        self.started.store(true, Ordering::Release);
    }
}
