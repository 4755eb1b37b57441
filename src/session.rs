use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broadcast::Hub;
use crate::error::ChatError;
use crate::protocol;

/// Runs one client from registration to teardown.
///
/// Per-client failures (bad reads, an over-long line, a welcome that cannot
/// be written) end only this session. The only error returned is a failed registration.
pub async fn handle<R, W>(
    hub: Hub,
    reader: R,
    writer: W,
    shutdown: CancellationToken,
) -> Result<(), ChatError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let conn = hub.connect(writer, &shutdown)?;
    let label = conn.label().to_string();
    info!(%label, "client joined");

    let welcome = protocol::welcome(&label);
    if let Err(err) = conn.send(welcome.as_bytes(), hub.config().write_timeout).await {
        warn!(%label, error = %err, "could not deliver welcome");
        hub.disconnect(&conn).await;
        return Ok(());
    }

    hub.broadcast(&protocol::joined(&label), Some(conn.id())).await;

    let max_line = hub.config().max_line_length;
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_line));

    loop {
        let line = tokio::select! {
            biased;

            _ = conn.closed() => {
                debug!(%label, "connection closed elsewhere");
                break;
            }
            line = lines.next() => line,
        };

        match line {
            Some(Ok(line)) => {
                let Some(text) = protocol::normalize(&line) else {
                    continue;
                };
                hub.broadcast(&protocol::chat(&label, text), Some(conn.id()))
                    .await;
            }

            // EOF
            None => break,

            Some(Err(e)) => {
                warn!(%label, error = %read_error(e, max_line), "dropping client");
                break;
            }
        }
    }

    hub.disconnect(&conn).await;
    debug!(%label, "session closed");

    Ok(())
}

fn read_error(err: LinesCodecError, max_line: usize) -> ChatError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => ChatError::LineTooLong(max_line),
        LinesCodecError::Io(e) => ChatError::Read(e),
    }
}
