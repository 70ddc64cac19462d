mod common;
use common::ProbeService;

use busbone::{Readiness, Signal, Worker};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    time::Duration,
};

struct Harness {
    worker: Worker,
    gate: Arc<Readiness>,
    started: Arc<AtomicBool>,
    signals: mpsc::Receiver<Signal>,
}

fn start_probe_worker() -> Harness {
    let mut worker = Worker::new();
    let gate = Arc::new(Readiness::new());
    let started = Arc::new(AtomicBool::new(false));
    let (tx, signals) = mpsc::channel();

    let started_flag = started.clone();
    worker
        .start(gate.clone(), move || {
            ProbeService::new(started_flag, tx)
        })
        .expect("spawn worker thread");

    Harness {
        worker,
        gate,
        started,
        signals,
    }
}

#[test]
fn terminate_latches_stopped() {
    let harness = start_probe_worker();

    harness.gate.wait_ready(harness.worker.ctx());
    assert!(harness.worker.ctx().interrupt().is_armed());
    assert!(!harness.worker.ctx().is_stopped());

    harness.worker.signal(Signal::Terminate);
    harness.gate.wait_stopped(harness.worker.ctx());

    assert!(harness.started.load(Ordering::Acquire));
    assert!(harness.worker.ctx().is_stopped());
    // Teardown disarms before latching, so late signals are no-ops.
    assert!(!harness.worker.ctx().interrupt().is_armed());
}

#[test]
fn user1_is_dispatched_without_stopping() {
    let harness = start_probe_worker();
    harness.gate.wait_ready(harness.worker.ctx());

    harness.worker.signal(Signal::User1);
    let signal = harness
        .signals
        .recv_timeout(Duration::from_secs(5))
        .expect("signal dispatched");
    assert_eq!(signal, Signal::User1);
    assert!(!harness.worker.ctx().is_stopped());

    // One raise, one dispatch.
    assert!(harness
        .signals
        .recv_timeout(Duration::from_millis(100))
        .is_err());

    harness.worker.signal(Signal::Terminate);
    harness.gate.wait_stopped(harness.worker.ctx());
    let signal = harness
        .signals
        .recv_timeout(Duration::from_secs(5))
        .expect("terminate dispatched");
    assert_eq!(signal, Signal::Terminate);
}

#[test]
fn rapid_signals_coalesce_but_arrive() {
    const RAISES: usize = 100;

    let harness = start_probe_worker();
    harness.gate.wait_ready(harness.worker.ctx());

    for _ in 0..RAISES {
        harness.worker.signal(Signal::User1);
    }
    harness.worker.signal(Signal::Terminate);
    harness.gate.wait_stopped(harness.worker.ctx());
    drop(harness.worker);

    let dispatched = harness
        .signals
        .try_iter()
        .filter(|signal| *signal == Signal::User1)
        .count();
    assert!(dispatched >= 1, "at least one User1 dispatch");
    assert!(dispatched <= RAISES, "never more dispatches than raises");
}

#[test]
fn drop_posts_terminate_and_joins() {
    let harness = start_probe_worker();
    harness.gate.wait_ready(harness.worker.ctx());

    let ctx = Arc::clone(harness.worker.ctx());
    drop(harness.worker);

    assert!(ctx.is_stopped());
    assert!(!ctx.interrupt().is_armed());
}

#[test]
fn drop_without_start_is_clean() {
    drop(Worker::new());
}

#[test]
fn signal_before_start_is_a_noop() {
    let worker = Worker::new();
    worker.signal(Signal::User1);
    assert!(!worker.ctx().is_stopped());
}
