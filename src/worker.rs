use std::{
    io::Write,
    os::unix::net::UnixStream,
    rc::Rc,
    sync::{Arc, Condvar, Mutex, MutexGuard},
    thread,
};

use tokio::{io::AsyncReadExt, task::LocalSet};
use tokio_util::sync::WaitForCancellationFutureOwned;
use tracing::{debug, error, trace};

use crate::{ctx::AsyncCtx, service::Service, signal::Signal};

/// Parent/worker rendezvous for event-loop startup and teardown.
///
/// The worker mutates the context's interrupt cell and stopped latch only
/// while holding this gate's lock, so a parent blocked in
/// [`Readiness::wait_ready`] cannot race the worker arming the interrupt.
#[derive(Debug, Default)]
pub struct Readiness {
    lock: Mutex<()>,
    cond: Condvar,
}

impl Readiness {
    /// Creates a gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the worker has armed the interrupt or latched `stopped`.
    ///
    /// Once this returns, [`AsyncCtx::signal`] is live — or the loop already
    /// failed to come up, observable via [`AsyncCtx::is_stopped`].
    pub fn wait_ready(&self, ctx: &AsyncCtx) {
        let mut guard = self.guard();
        while !(ctx.interrupt().is_armed() || ctx.is_stopped()) {
            guard = self.wait(guard);
        }
    }

    /// Blocks until the worker has latched `stopped`.
    pub fn wait_stopped(&self, ctx: &AsyncCtx) {
        let mut guard = self.guard();
        while !ctx.is_stopped() {
            guard = self.wait(guard);
        }
    }

    /// Runs `f` under the gate's lock.
    pub(crate) fn locked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.guard();
        f()
    }

    pub(crate) fn notify(&self) {
        self.cond.notify_all();
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().expect("readiness mutex poisoned")
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, ()>) -> MutexGuard<'a, ()> {
        self.cond.wait(guard).expect("readiness mutex poisoned")
    }
}

/// Hosts a [`Service`] on a dedicated event-loop thread.
///
/// [`Worker::start`] launches the thread and returns immediately; the parent
/// blocks on [`Readiness::wait_ready`] before issuing any signals. Dropping
/// the worker waits for the loop to come up, posts [`Signal::Terminate`], and
/// joins the thread.
///
/// The service itself is constructed on the loop thread and never leaves it;
/// the parent interacts with it exclusively through [`AsyncCtx::signal`].
#[derive(Debug, Default)]
pub struct Worker {
    ctx: Arc<AsyncCtx>,
    gate: Option<Arc<Readiness>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    /// Creates a worker with an inert context.
    pub fn new() -> Self {
        Self::default()
    }

    /// The worker's async context.
    pub fn ctx(&self) -> &Arc<AsyncCtx> {
        &self.ctx
    }

    /// Delivers a control signal to the event loop. A no-op until the loop
    /// is up, and again after it has torn down.
    pub fn signal(&self, signal: Signal) {
        self.ctx.signal(signal);
    }

    /// Launches the event-loop thread.
    ///
    /// `make_service` runs on the new thread and carries any forwarded
    /// constructor arguments. The parent should block on
    /// [`Readiness::wait_ready`] with the same `gate` before signaling.
    ///
    /// ## Panics
    ///
    /// Panics if the worker was already started.
    pub fn start<S, F>(&mut self, gate: Arc<Readiness>, make_service: F) -> std::io::Result<()>
    where
        S: Service,
        F: FnOnce() -> S + Send + 'static,
    {
        assert!(self.thread.is_none(), "worker already started");

        let ctx = Arc::clone(&self.ctx);
        let handle = thread::Builder::new()
            .name("busbone-worker".into())
            .spawn({
                let gate = Arc::clone(&gate);
                move || run_event_loop(ctx, gate, make_service)
            })?;
        self.gate = Some(gate);
        self.thread = Some(handle);
        Ok(())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            // A terminate posted before the interrupt is armed would be lost
            // and the join would never return; sync with the loop first.
            if let Some(gate) = self.gate.take() {
                gate.wait_ready(&self.ctx);
            }
            self.ctx.signal(Signal::Terminate);
            if thread.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }
}

/// Thread body: bring up the wake channel and the runtime, arm the context,
/// run the service, drain the scope, tear down.
fn run_event_loop<S, F>(ctx: Arc<AsyncCtx>, gate: Arc<Readiness>, make_service: F)
where
    S: Service,
    F: FnOnce() -> S + Send + 'static,
{
    let service = Rc::new(make_service());

    // The wake channel is a unix-domain socketpair: the write end is a plain
    // blocking socket owned by the interrupt hook, the read end feeds the ISR.
    let setup = UnixStream::pair().and_then(|(wake_rx, wake_tx)| {
        wake_rx.set_nonblocking(true)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()?;
        Ok((wake_rx, wake_tx, runtime))
    });

    let (wake_rx, wake_tx, runtime) = match setup {
        Ok(setup) => setup,
        Err(err) => {
            error!(%err, "event loop setup failed");
            gate.locked(|| ctx.mark_stopped());
            gate.notify();
            return;
        }
    };

    LocalSet::new().block_on(&runtime, async {
        let wake_rx = match tokio::net::UnixStream::from_std(wake_rx) {
            Ok(wake_rx) => wake_rx,
            Err(err) => {
                error!(%err, "failed to register wake socket");
                return;
            }
        };

        gate.locked(|| {
            ctx.interrupt().arm(move || {
                // One byte per fire; the token's value is irrelevant.
                let mut end = &wake_tx;
                let _ = end.write(&[1u8]);
            });
        });

        let isr_ctx = Arc::clone(&ctx);
        let isr_service = Rc::clone(&service);
        ctx.scope()
            .spawn_graceful(move |cancel| isr(isr_ctx, isr_service, wake_rx, cancel));
        gate.notify();

        Rc::clone(&service).start(&ctx);

        ctx.scope().close();
        ctx.scope().wait().await;
    });

    // Disarming happens-before the latch: an observer that sees `stopped`
    // will find the interrupt already gone and `signal` a no-op. Dropping the
    // hook closes the pair's write end.
    gate.locked(|| {
        ctx.interrupt().disarm();
        ctx.mark_stopped();
    });
    gate.notify();
}

/// The interrupt service routine: one tracked task that drains wake tokens
/// and dispatches pending signals until a stop or a terminate.
async fn isr<S: Service>(
    ctx: Arc<AsyncCtx>,
    service: Rc<S>,
    mut wake_rx: tokio::net::UnixStream,
    cancel: WaitForCancellationFutureOwned,
) {
    // Reused across wakes; only one ISR is ever in flight per context. The
    // bytes are pure wake tokens and one read may coalesce several fires.
    let mut scratch = [0u8; 256];

    tokio::pin!(cancel);
    loop {
        tokio::select! {
            biased;
            _ = &mut cancel => {
                debug!("isr cancelled");
                break;
            }
            read = wake_rx.read(&mut scratch) => match read {
                Ok(0) => {
                    debug!("wake socket closed");
                    break;
                }
                Ok(_) => {
                    if dispatch_signals(&ctx, &*service) {
                        ctx.scope().request_stop();
                        break;
                    }
                }
                Err(err) => {
                    error!(%err, "wake socket read failed");
                    break;
                }
            },
        }
    }
}

/// Drains the pending set and hands each raised signal to the service,
/// low-to-high. Returns whether a terminate was among them.
fn dispatch_signals<S: Service>(ctx: &AsyncCtx, service: &S) -> bool {
    let pending = ctx.take_signals();
    if pending == 0 {
        // Spurious wake; harmless.
        return false;
    }

    for index in 0..Signal::COUNT {
        if pending & (1u64 << index) != 0 {
            if let Some(signal) = Signal::from_index(index) {
                trace!(?signal, "dispatching signal");
                service.on_signal(signal);
            }
        }
    }
    pending & Signal::Terminate.bit() != 0
}
