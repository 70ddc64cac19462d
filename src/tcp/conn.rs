use std::{fmt, io, net::SocketAddr};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};

/// Size of the per-connection read buffer.
pub const READ_BUFFER_LEN: usize = 1024;

/// Per-connection read context: the connected stream plus a fixed read
/// buffer, shared by the reader task and the stream handler.
///
/// Ownership of the `Conn` moves with the connection's lifecycle: the reader
/// task holds it while a read is pending, the handler receives it with each
/// payload, and whoever drops it last closes the stream.
pub struct Conn {
    stream: TcpStream,
    peer: SocketAddr,
    buf: Box<[u8; READ_BUFFER_LEN]>,
}

impl Conn {
    pub(crate) fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            buf: Box::new([0u8; READ_BUFFER_LEN]),
        }
    }

    /// The peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// The first `len` bytes of the read buffer — the payload of the read
    /// that just completed.
    ///
    /// ## Panics
    ///
    /// Panics if `len` exceeds [`READ_BUFFER_LEN`].
    pub fn payload(&self, len: usize) -> &[u8] {
        &self.buf[..len]
    }

    /// Writes `data` to the peer in full.
    pub async fn send_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await
    }

    /// Writes the first `len` bytes of the read buffer back to the peer.
    ///
    /// ## Panics
    ///
    /// Panics if `len` exceeds [`READ_BUFFER_LEN`].
    pub async fn send_payload(&mut self, len: usize) -> io::Result<()> {
        let Self { stream, buf, .. } = self;
        stream.write_all(&buf[..len]).await
    }

    /// One read into the buffer. `Ok(0)` denotes orderly peer close.
    pub(crate) async fn recv(&mut self) -> io::Result<usize> {
        let Self { stream, buf, .. } = self;
        stream.read(&mut buf[..]).await
    }
}

impl fmt::Debug for Conn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conn")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}
