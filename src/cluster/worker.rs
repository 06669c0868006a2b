//! The worker process: serves the public API on its assigned port, backed
//! by the primary over stdio.
//!
//! A worker holds no canonical state. Every request that needs data goes
//! through the channel client, so a restarted worker loses nothing.

use std::future::IntoFuture;
use std::io;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::cluster::channel::ChannelClient;
use crate::http;

/// Runs a worker until its channel to the primary breaks or the listener
/// fails.
///
/// Stdout carries the wire protocol; logs go to stderr in every role
/// (see `telemetry`).
pub async fn run(port: u16) -> io::Result<()> {
    let store = ChannelClient::connect(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let app = http::router(Arc::new(store.clone()), port);

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port, "worker listening");

    tokio::select! {
        result = axum::serve(listener, app).into_future() => result,
        // A broken channel means replies can no longer be trusted. Stop
        // serving entirely so the dispatcher sees this worker as down
        // instead of receiving answers backed by nothing.
        _ = store.closed() => {
            error!(port, "channel to primary closed, shutting down");
            Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "primary channel closed",
            ))
        }
    }
}
