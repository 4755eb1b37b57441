//! Client session: a receive task (socket to output) and a send task
//! (input lines to socket). Whichever ends first cancels the other.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::protocol;

const CHUNK: usize = 1024;

pub async fn run<S, O>(stream: S, input: mpsc::Receiver<String>, output: O)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    O: AsyncWrite + Send + Unpin + 'static,
{
    let cancel = CancellationToken::new();
    let (reader, writer) = tokio::io::split(stream);

    let receiving = tokio::spawn(receive(reader, output, cancel.clone()));
    let sending = tokio::spawn(send(input, writer, cancel));

    let (received, sent) = tokio::join!(receiving, sending);
    for result in [received, sent] {
        if let Err(err) = result {
            warn!(error = %err, "client task failed");
        }
    }
}

async fn receive<R, O>(mut reader: R, mut output: O, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let _done = cancel.clone().drop_guard();
    let mut buf = [0u8; CHUNK];

    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => break,
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                debug!("server closed the connection");
                break;
            }
            Ok(n) => {
                let shown = async {
                    output.write_all(&buf[..n]).await?;
                    output.flush().await
                };
                if let Err(err) = shown.await {
                    warn!(error = %err, "could not write output");
                    break;
                }
            }
            Err(err) => {
                warn!(error = %err, "error receiving messages");
                break;
            }
        }
    }
}

async fn send<W>(mut input: mpsc::Receiver<String>, mut writer: W, cancel: CancellationToken)
where
    W: AsyncWrite + Unpin,
{
    let _done = cancel.clone().drop_guard();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = input.recv() => line,
        };

        let Some(line) = line else {
            debug!("input closed");
            break;
        };
        if protocol::is_quit(&line) {
            debug!("quit requested");
            break;
        }

        let mut frame = line.into_bytes();
        frame.push(b'\n');
        let sent = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        };
        if let Err(err) = sent.await {
            warn!(error = %err, "error sending message");
            break;
        }
    }

    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};

    const LIMIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn quit_ends_session_without_sending_it() {
        let (client_side, server_side) = tokio::io::duplex(1024);
        let (output, _screen) = tokio::io::duplex(1024);
        let (tx, rx) = mpsc::channel(8);

        let session = tokio::spawn(run(client_side, rx, output));
        tx.send("hello".to_string()).await.unwrap();
        tx.send("QUIT".to_string()).await.unwrap();

        tokio::time::timeout(LIMIT, session).await.unwrap().unwrap();

        let mut lines = BufReader::new(server_side).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("hello"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn server_close_ends_session_and_shows_bytes() {
        let (client_side, mut server_side) = tokio::io::duplex(1024);
        let (output, mut screen) = tokio::io::duplex(1024);
        let (_tx, rx) = mpsc::channel::<String>(8);

        let session = tokio::spawn(run(client_side, rx, output));
        server_side.write_all(b"Welcome Client-1!\n").await.unwrap();
        drop(server_side);

        tokio::time::timeout(LIMIT, session).await.unwrap().unwrap();

        let mut shown = String::new();
        screen.read_to_string(&mut shown).await.unwrap();
        assert_eq!(shown, "Welcome Client-1!\n");
    }

    #[tokio::test]
    async fn closed_input_ends_session() {
        let (client_side, _server_side) = tokio::io::duplex(1024);
        let (output, _screen) = tokio::io::duplex(1024);
        let (tx, rx) = mpsc::channel::<String>(8);
        drop(tx);

        tokio::time::timeout(LIMIT, run(client_side, rx, output))
            .await
            .unwrap();
    }
}
