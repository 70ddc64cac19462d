//! The segment relay: the simplest useful stream handler.
//!
//! A bus segment carries payloads between a peer and the bus unchanged. This
//! handler relays every payload straight back to the peer and resumes
//! reading once the write completes, which doubles as the reference for how
//! a handler re-arms its stream from a spawned task.

use std::rc::Rc;

use tracing::debug;

use crate::tcp::{Conn, StreamHandler, TcpServer};

/// Relays each payload back to the peer, one segment at a time.
///
/// Reading stays paused while the write is in flight, so a peer that stops
/// draining its side backpressures its own sends.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentHandler;

/// A TCP service relaying segments.
pub type SegmentService = TcpServer<SegmentHandler>;

impl StreamHandler for SegmentHandler {
    fn on_read(&self, server: &Rc<TcpServer<Self>>, mut conn: Conn, len: usize) {
        let server = Rc::clone(server);
        let scope = server.ctx().scope().clone();
        scope.spawn_cancellable(async move {
            match conn.send_payload(len).await {
                Ok(()) => server.spawn_reader(conn),
                Err(err) => debug!(%err, peer = %conn.peer_addr(), "relay write failed"),
            }
        });
    }
}
