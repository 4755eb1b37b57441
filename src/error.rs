use std::io;
use std::time::Duration;

use crate::connection::ConnId;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnId),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("connection is closed")]
    Closed,
}
