use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::ChatError;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Identity handed out at accept time. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn label(&self) -> String {
        format!("Client-{}", self.0)
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to one accepted client.
///
/// Clones share the same write half, so a snapshot of the registry can be
/// iterated without holding the registry lock. Writes go through a
/// per-connection mutex: two broadcasts never interleave on one socket.
/// The read half stays with the session task, which watches [`closed`]
/// to learn that some other path tore the connection down.
///
/// [`closed`]: Connection::closed
#[derive(Clone)]
pub struct Connection {
    id: ConnId,
    label: Arc<str>,
    writer: Arc<Mutex<Option<BoxedWriter>>>,
    closed: CancellationToken,
}

impl Connection {
    pub fn new<W>(id: ConnId, writer: W, closed: CancellationToken) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            label: id.label().into(),
            writer: Arc::new(Mutex::new(Some(Box::new(writer)))),
            closed,
        }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Writes the whole message and flushes, or fails. The deadline covers
    /// waiting for the write lock as well as the write itself, and the lock
    /// is held for the full sequence.
    pub async fn send(&self, bytes: &[u8], deadline: Duration) -> Result<(), ChatError> {
        let write = async {
            let mut guard = self.writer.lock().await;
            if self.closed.is_cancelled() {
                return Err(ChatError::Closed);
            }
            let writer = guard.as_mut().ok_or(ChatError::Closed)?;

            writer.write_all(bytes).await.map_err(ChatError::Write)?;
            writer.flush().await.map_err(ChatError::Write)
        };

        match tokio::time::timeout(deadline, write).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::WriteTimeout(deadline)),
        }
    }

    /// Shuts the write half and signals the owning session. Returns `false`
    /// if the connection was already closed.
    pub async fn close(&self) -> bool {
        self.closed.cancel();

        let taken = self.writer.lock().await.take();
        match taken {
            Some(mut writer) => {
                // The peer may already be gone; a failed shutdown is fine.
                let _ = tokio::time::timeout(SHUTDOWN_GRACE, writer.shutdown()).await;
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}
