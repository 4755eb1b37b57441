use std::collections::VecDeque;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::connection::{ConnId, Connection};
use crate::error::ChatError;
use crate::protocol;
use crate::registry::Registry;

/// Fan-out engine over the shared registry.
#[derive(Clone, Default)]
pub struct Hub {
    registry: Registry,
    config: HubConfig,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: Registry::default(),
            config,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> HubConfig {
        self.config
    }

    /// Assigns an identity to a freshly accepted writer and registers it.
    /// The connection is closed together with `shutdown`.
    pub fn connect<W>(&self, writer: W, shutdown: &CancellationToken) -> Result<Connection, ChatError>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let conn = Connection::new(self.registry.next_id(), writer, shutdown.child_token());
        self.registry.add(conn.clone())?;
        debug!(label = %conn.label(), members = self.registry.len(), "registered");
        Ok(conn)
    }

    /// Delivers `message` to every member except `exclude`. Peers that fail
    /// are evicted and their departure is announced in the same call.
    /// Never fails.
    pub async fn broadcast(&self, message: &str, exclude: Option<ConnId>) {
        let mut pending = VecDeque::from([(message.to_owned(), exclude)]);

        while let Some((message, exclude)) = pending.pop_front() {
            for peer in self.registry.snapshot_except(exclude) {
                let Err(err) = peer.send(message.as_bytes(), self.config.write_timeout).await else {
                    continue;
                };

                warn!(peer = %peer.label(), error = %err, "broadcast write failed, dropping peer");
                if self.evict(&peer).await {
                    pending.push_back((protocol::left(peer.label()), None));
                }
            }
        }
    }

    /// Removes and closes `conn`, announcing the departure if this call was
    /// the one that removed it. Safe to call any number of times.
    pub async fn disconnect(&self, conn: &Connection) -> bool {
        if !self.evict(conn).await {
            return false;
        }
        info!(label = %conn.label(), members = self.registry.len(), "client left");
        self.broadcast(&protocol::left(conn.label()), None).await;
        true
    }

    /// Force-closes every remaining member without announcements.
    pub async fn close_all(&self) -> usize {
        let mut closed = 0;
        for conn in self.registry.snapshot_except(None) {
            if self.evict(&conn).await {
                closed += 1;
            }
        }
        closed
    }

    // Only the caller whose remove succeeds sees `true`; closing is
    // idempotent either way.
    async fn evict(&self, conn: &Connection) -> bool {
        let removed = self.registry.remove(conn.id()).is_some();
        conn.close().await;
        removed
    }
}
