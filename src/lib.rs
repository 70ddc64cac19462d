//! busbone: an asynchronous bus-service runtime hosting TCP stream handlers.
//!
//! This crate provides the core scaffold of a bus-style server: a dedicated
//! event-loop thread per service, cross-thread control signals threaded
//! through that loop, and orderly startup and shutdown of the hosting
//! thread.
//!
//! ## Basic usage
//!
//! A [`Worker`] hosts a [`Service`] on its own thread. The built-in TCP
//! scaffold turns any [`tcp::StreamHandler`] into a service:
//!
//! ```no_run
//! use busbone::{segment::SegmentHandler, tcp::TcpServer, Readiness, Signal, Worker};
//! use std::sync::Arc;
//!
//! let mut worker = Worker::new();
//! let gate = Arc::new(Readiness::new());
//!
//! worker
//!     .start(gate.clone(), || {
//!         TcpServer::new("127.0.0.1:3700".parse().unwrap(), SegmentHandler)
//!     })
//!     .unwrap();
//!
//! // Block until the loop is up (or failed to come up), then signal freely.
//! gate.wait_ready(worker.ctx());
//! worker.signal(Signal::User1);
//!
//! // Dropping the worker posts Terminate and joins the thread.
//! drop(worker);
//! ```
//!
//! ## Structure
//!
//! - [`AsyncCtx`] bundles the loop's state: a cancellable [`Scope`] for its
//!   tasks, the pending-signal set, the stopped latch, and the [`Interrupt`]
//!   used to wake the loop from other threads.
//! - [`Worker`] owns the context and the loop thread, and choreographs the
//!   startup handshake ([`Readiness`]) and the drain-then-join shutdown.
//! - [`tcp`] layers a listener, an accept loop, and handler-paced reads over
//!   a context; [`segment`] ships the relay handler built on it.
//!
//! Signals are control events, not diagnostics: [`Signal::Terminate`] stops
//! a service, [`Signal::User1`] means whatever the service wants it to mean,
//! and rapid-fire signals may coalesce into a single dispatch.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

mod ctx;
pub use ctx::AsyncCtx;

mod interrupt;
pub use interrupt::Interrupt;

mod scope;
pub use scope::Scope;

pub mod segment;

mod service;
pub use service::Service;

mod signal;
pub use signal::Signal;

pub mod tcp;

mod worker;
pub use worker::{Readiness, Worker};
