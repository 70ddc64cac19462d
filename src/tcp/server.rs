use std::{
    cell::{Cell, OnceCell},
    fmt, io,
    net::SocketAddr,
    rc::Rc,
    sync::Arc,
};

use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::WaitForCancellationFutureOwned;
use tracing::{debug, error, trace};

use crate::{
    ctx::AsyncCtx,
    service::Service,
    signal::Signal,
    tcp::{conn::Conn, handler::StreamHandler},
};

/// Failure while bringing up the listener. Fatal to the service: the
/// scaffold requests a scope stop and the worker's loop drains.
#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    /// Creating or inspecting the listening socket failed.
    #[error("failed to create listening socket: {0}")]
    Socket(#[source] io::Error),
    /// The handler's `initialize` hook refused the socket.
    #[error("handler refused the listening socket: {0}")]
    Initialize(#[source] io::Error),
    /// Binding the configured address failed.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: SocketAddr,
        /// The OS error.
        #[source]
        source: io::Error,
    },
    /// Putting the bound socket into listening mode failed.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        /// The bound address.
        addr: SocketAddr,
        /// The OS error.
        #[source]
        source: io::Error,
    },
}

/// A [`Service`] that streams a TCP listener's connections into a
/// [`StreamHandler`].
///
/// The server lives on its worker's event-loop thread; handlers interact
/// with it through the `Rc` they receive in their callbacks.
pub struct TcpServer<H> {
    handler: H,
    // Rebound with the ephemeral port once the listener is up.
    address: Cell<SocketAddr>,
    ctx: OnceCell<Arc<AsyncCtx>>,
}

impl<H: StreamHandler> TcpServer<H> {
    /// Creates a server that will bind `address` when started.
    pub fn new(address: SocketAddr, handler: H) -> Self {
        Self {
            handler,
            address: Cell::new(address),
            ctx: OnceCell::new(),
        }
    }

    /// The hosted handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The configured address; after start, the bound address with any
    /// ephemeral port filled in.
    pub fn local_addr(&self) -> SocketAddr {
        self.address.get()
    }

    /// The context the server was started on.
    ///
    /// ## Panics
    ///
    /// Panics if the server has not been started.
    pub fn ctx(&self) -> &Arc<AsyncCtx> {
        self.ctx.get().expect("tcp server not started")
    }

    /// Stops serving: cancels the scope, which unblocks the accept loop and
    /// every pending read at its next suspension point.
    pub fn shutdown(&self) {
        if let Some(ctx) = self.ctx.get() {
            ctx.scope().request_stop();
        }
    }

    /// Arms one read on `conn`. Does nothing if a stop has been requested.
    ///
    /// Called by the scaffold for each accepted connection, and by handlers
    /// to resume a stream they own the [`Conn`] of. Errors end the stream
    /// silently; a read of zero bytes is an orderly peer close and releases
    /// the context.
    ///
    /// ## Panics
    ///
    /// Panics if the server has not been started.
    pub fn spawn_reader(self: Rc<Self>, mut conn: Conn) {
        let scope = {
            let scope = self.ctx().scope();
            if scope.stop_requested() {
                return;
            }
            scope.clone()
        };

        let server = self;
        scope.spawn_cancellable(async move {
            match conn.recv().await {
                Ok(0) => trace!(peer = %conn.peer_addr(), "peer closed"),
                Ok(len) => server.handler.on_read(&server, conn, len),
                Err(err) => debug!(%err, "recv failed"),
            }
        });
    }

    fn setup(&self) -> Result<TcpListener, ListenError> {
        let address = self.address.get();

        let socket = match address {
            SocketAddr::V4(_) => TcpSocket::new_v4(),
            SocketAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(ListenError::Socket)?;
        socket.set_reuseaddr(true).map_err(ListenError::Socket)?;

        self.handler
            .initialize(&socket)
            .map_err(ListenError::Initialize)?;

        socket
            .bind(address)
            .map_err(|source| ListenError::Bind { addr: address, source })?;

        let listener = socket
            .listen(libc::SOMAXCONN as u32)
            .map_err(|source| ListenError::Listen { addr: address, source })?;

        self.address
            .set(listener.local_addr().map_err(ListenError::Socket)?);
        Ok(listener)
    }

    /// Accepts connections until a stop is requested or an accept fails.
    ///
    /// At most one accept is in flight per listener. Accept errors are
    /// swallowed and end the loop; in practice they indicate listener
    /// shutdown.
    async fn accept_loop(
        self: Rc<Self>,
        listener: TcpListener,
        cancel: WaitForCancellationFutureOwned,
    ) {
        tokio::pin!(cancel);
        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    debug!("accept loop cancelled");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        trace!(%peer, "accepted connection");
                        Rc::clone(&self).spawn_reader(Conn::new(stream, peer));
                    }
                    Err(err) => {
                        error!(%err, "failed to accept connection");
                        break;
                    }
                },
            }
        }
    }
}

impl<H: StreamHandler> Service for TcpServer<H> {
    fn on_signal(&self, signal: Signal) {
        if signal == Signal::Terminate {
            self.shutdown();
        } else {
            self.handler.on_signal(signal);
        }
    }

    fn start(self: Rc<Self>, ctx: &Arc<AsyncCtx>) {
        self.ctx
            .set(Arc::clone(ctx))
            .expect("tcp server started twice");

        match self.setup() {
            Ok(listener) => {
                debug!(addr = %self.local_addr(), "listening");
                ctx.scope()
                    .spawn_graceful(move |cancel| self.accept_loop(listener, cancel));
            }
            Err(err) => {
                error!(%err, "listener setup failed");
                ctx.scope().request_stop();
            }
        }
    }
}

impl<H> fmt::Debug for TcpServer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpServer")
            .field("address", &self.address.get())
            .field("started", &self.ctx.get().is_some())
            .finish_non_exhaustive()
    }
}
