use std::io::BufRead;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_chat::{ClientArgs, client};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = ClientArgs::parse();
    let addr = args.addr();

    let stream = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("failed to connect to server at {}", addr))?;
    info!("connected to server at {}", addr);

    // Terminal reads block; keep them off the runtime so shutdown never
    // waits on a pending stdin read.
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    client::run(stream, rx, tokio::io::stdout()).await;
    info!("disconnected from server");

    Ok(())
}
