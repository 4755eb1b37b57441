use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relay_chat::{Hub, ServerArgs, server};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = ServerArgs::parse();

    let listener = server::bind(&args.addr())
        .await
        .context("server cannot start")?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("server stopped by user"),
                Err(err) => warn!(error = %err, "cannot listen for ctrl-c, stopping"),
            }
            shutdown.cancel();
        }
    });

    let hub = Hub::new(args.hub_config());
    server::run(listener, hub, shutdown, args.drain_timeout()).await;

    Ok(())
}
