use std::{io, rc::Rc};

use tokio::net::TcpSocket;

use crate::{
    signal::Signal,
    tcp::{conn::Conn, server::TcpServer},
};

/// The capability set a TCP stream handler provides to [`TcpServer`].
///
/// All methods run on the event-loop thread. `on_read` is the only required
/// one; see the [module docs](crate::tcp) for the backpressure contract.
pub trait StreamHandler: Sized + 'static {
    /// Configures the listening socket after `SO_REUSEADDR` is set and
    /// before it is bound. An error here is fatal to the service.
    fn initialize(&self, socket: &TcpSocket) -> io::Result<()> {
        let _ = socket;
        Ok(())
    }

    /// Dispatches a non-terminate control signal. [`Signal::Terminate`] is
    /// consumed by the scaffold itself.
    fn on_signal(&self, signal: Signal) {
        let _ = signal;
    }

    /// Consumes `len` bytes read into `conn` (see [`Conn::payload`]).
    ///
    /// The handler must call [`TcpServer::spawn_reader`] — directly, or from
    /// a task it spawns — to keep reading from the connection; returning
    /// without doing so leaves the stream paused until it does.
    fn on_read(&self, server: &Rc<TcpServer<Self>>, conn: Conn, len: usize);
}
