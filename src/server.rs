use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, error, info, info_span, warn};

use crate::broadcast::Hub;
use crate::error::ChatError;
use crate::session;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn bind(addr: &str) -> Result<TcpListener, ChatError> {
    TcpListener::bind(addr).await.map_err(|source| ChatError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Accepts until `shutdown` fires, then waits up to `drain` for sessions to
/// finish and force-closes whatever is left.
pub async fn run(listener: TcpListener, hub: Hub, shutdown: CancellationToken, drain: Duration) {
    match listener.local_addr() {
        Ok(addr) => info!("listening on {}", addr),
        Err(_) => info!("listening"),
    }

    let tracker = TaskTracker::new();

    loop {
        let accepted = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        let (socket, peer) = match accepted {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let (reader, writer) = socket.into_split();
        let hub = hub.clone();
        let shutdown = shutdown.clone();

        tracker.spawn(
            async move {
                if let Err(err) = session::handle(hub, reader, writer, shutdown).await {
                    error!(error = %err, "connection rejected");
                }
            }
            .instrument(info_span!("conn", %peer)),
        );
    }

    drop(listener);
    tracker.close();
    info!(sessions = tracker.len(), "shutting down");

    if tokio::time::timeout(drain, tracker.wait()).await.is_err() {
        let closed = hub.close_all().await;
        warn!(closed, "drain timed out, force-closed remaining connections");
        tracker.wait().await;
    }

    info!("server stopped");
}
