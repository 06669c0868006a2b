use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use user_cluster::cli::{Cli, Command};
use user_cluster::store::StoreActor;
use user_cluster::{cluster, config, http, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Worker(args)) => cluster::worker::run(args.port).await?,
        None => {
            let port = config::base_port(cli.port);
            if cli.multi {
                let workers = config::worker_count(cli.workers);
                cluster::primary::run(port, workers).await?;
            } else {
                serve_single(port).await?;
            }
        }
    }

    Ok(())
}

/// Single-process mode: the same API, backed by an in-process store actor.
async fn serve_single(port: u16) -> std::io::Result<()> {
    let (actor, store) = StoreActor::new(64);
    tokio::spawn(actor.run());

    let app = http::router(Arc::new(store), port);
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "server listening");
    axum::serve(listener, app).await
}
