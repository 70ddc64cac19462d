//! TCP serving scaffold for stream handlers.
//!
//! This module layers an accept/read loop over an [`AsyncCtx`], parameterized
//! by a user [`StreamHandler`].
//!
//! ## Overview
//!
//! [`TcpServer`] is a [`Service`]: a [`Worker`] hosts it on its event loop.
//! On start it binds a listener (setting `SO_REUSEADDR`, giving the handler a
//! chance to configure the socket, and reading back the bound address for
//! ephemeral ports) and runs a single accept loop. Each accepted connection
//! gets a [`Conn`] — a fixed read buffer plus the connected stream — and one
//! armed read.
//!
//! ## Backpressure
//!
//! The handler owns the read cadence. When a read completes, the bytes are
//! handed to [`StreamHandler::on_read`] along with ownership of the [`Conn`];
//! nothing further is read from that connection until the handler calls
//! [`TcpServer::spawn_reader`] again. A handler that holds on to the `Conn`
//! pauses the stream; one that drops it closes the connection. The core does
//! not buffer writes — a handler that needs a write queue layers its own.
//!
//! ## Shutdown
//!
//! Listener setup failures are fatal to the service: the scaffold logs them
//! and requests a scope stop, and the worker's loop drains and exits. A
//! requested stop also unblocks the accept loop and any pending reads at
//! their next suspension point, so shutdown completes in bounded time.
//!
//! [`AsyncCtx`]: crate::AsyncCtx
//! [`Service`]: crate::Service
//! [`Worker`]: crate::Worker

mod conn;
mod handler;
mod server;

pub use conn::{Conn, READ_BUFFER_LEN};
pub use handler::StreamHandler;
pub use server::{ListenError, TcpServer};
