//! A loopback segment relay: run it, connect with `nc`, and whatever you
//! send comes straight back.

use busbone::{segment::SegmentHandler, tcp::TcpServer, Readiness, Signal, Worker};
use std::{net::SocketAddr, sync::Arc};

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "busbone=debug".into()),
        )
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:3700".into())
        .parse()
        .expect("listen address");

    let mut worker = Worker::new();
    let gate = Arc::new(Readiness::new());
    worker.start(gate.clone(), move || TcpServer::new(addr, SegmentHandler))?;
    gate.wait_ready(worker.ctx());

    if worker.ctx().is_stopped() {
        eprintln!("relay failed to start, see logs");
        return Ok(());
    }

    println!("relaying on {addr}, press enter to stop");
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);

    worker.signal(Signal::Terminate);
    Ok(())
}
