//! Bidirectional byte copying between two duplex streams.
//!
//! Each direction runs in its own task. Whichever direction ends first shuts
//! down its destination and stops the other one.

use std::{fmt, io};

use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::oneshot,
    task::JoinError,
};
use tracing::debug;

/// Size of the chunk each copy direction reads before writing it on.
pub const BUFFER_SIZE: usize = 8192;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftToRight => f.write_str("left-to-right"),
            Self::RightToLeft => f.write_str("right-to-left"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{direction} copy failed: {source}")]
    Direction {
        direction: Direction,
        #[source]
        source: io::Error,
    },
    #[error("both copiers failed; left-to-right: {left_to_right}; right-to-left: {right_to_left}")]
    Both {
        left_to_right: io::Error,
        right_to_left: io::Error,
    },
}

/// What a finished relay moved, and how it ended.
#[derive(Debug)]
pub struct RelayOutcome {
    pub left_to_right: u64,
    pub right_to_left: u64,
    pub error: Option<RelayError>,
}

impl RelayOutcome {
    /// Returns the byte counts, or the combined error if any direction failed.
    pub fn into_result(self) -> Result<(u64, u64), RelayError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok((self.left_to_right, self.right_to_left)),
        }
    }
}

struct Copied {
    bytes: u64,
    error: Option<io::Error>,
}

/// Copies `left` to `right` and `right` to `left` until both directions end.
///
/// As soon as either direction ends, by end-of-stream or by failure, it shuts
/// down its destination and the opposite direction is stopped as well, so the
/// pair never outlives either of its streams. Both streams are owned by the
/// relay and are closed by the time it returns. Byte counts cover every
/// completed write, including those of a direction that failed or was stopped.
pub async fn relay<L, R>(left: L, right: R) -> RelayOutcome
where
    L: AsyncRead + AsyncWrite + Send + 'static,
    R: AsyncRead + AsyncWrite + Send + 'static,
{
    let (left_reader, left_writer) = tokio::io::split(left);
    let (right_reader, right_writer) = tokio::io::split(right);

    let (left_done_tx, left_done_rx) = oneshot::channel();
    let (right_done_tx, right_done_rx) = oneshot::channel();

    let left_to_right = tokio::spawn(copy_one_way(
        left_reader,
        right_writer,
        Direction::LeftToRight,
        left_done_tx,
        right_done_rx,
    ));
    let right_to_left = tokio::spawn(copy_one_way(
        right_reader,
        left_writer,
        Direction::RightToLeft,
        right_done_tx,
        left_done_rx,
    ));

    let (left_to_right, right_to_left) = tokio::join!(left_to_right, right_to_left);
    let left_to_right = joined(left_to_right);
    let right_to_left = joined(right_to_left);

    RelayOutcome {
        left_to_right: left_to_right.bytes,
        right_to_left: right_to_left.bytes,
        error: combine(left_to_right.error, right_to_left.error),
    }
}

async fn copy_one_way<R, W>(
    mut reader: R,
    mut writer: W,
    direction: Direction,
    done: oneshot::Sender<()>,
    peer_done: oneshot::Receiver<()>,
) -> Copied
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut bytes = 0;

    // The peer's sender is dropped on every exit, panics included.
    let result = tokio::select! {
        biased;
        result = pump(&mut reader, &mut writer, &mut bytes) => result,
        _ = peer_done => {
            debug!(%direction, "Stopping after the opposite direction ended");
            Ok(())
        }
    };

    if let Err(e) = writer.shutdown().await {
        debug!(%direction, error = %e, "Failed to shut down destination");
    }
    drop(done);

    Copied {
        bytes,
        error: result.err(),
    }
}

async fn pump<R, W>(reader: &mut R, writer: &mut W, bytes: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }

        // Counted per write so a stop in the middle of a chunk loses nothing.
        let mut chunk = &buffer[..n];
        while !chunk.is_empty() {
            let written = writer.write(chunk).await?;
            if written == 0 {
                return Err(io::ErrorKind::WriteZero.into());
            }
            *bytes += written as u64;
            chunk = &chunk[written..];
        }
    }
}

fn joined(result: Result<Copied, JoinError>) -> Copied {
    result.unwrap_or_else(|e| Copied {
        bytes: 0,
        error: Some(io::Error::other(e)),
    })
}

fn combine(left_to_right: Option<io::Error>, right_to_left: Option<io::Error>) -> Option<RelayError> {
    match (left_to_right, right_to_left) {
        (Some(left_to_right), Some(right_to_left)) => Some(RelayError::Both {
            left_to_right,
            right_to_left,
        }),
        (Some(source), None) => Some(RelayError::Direction {
            direction: Direction::LeftToRight,
            source,
        }),
        (None, Some(source)) => Some(RelayError::Direction {
            direction: Direction::RightToLeft,
            source,
        }),
        (None, None) => None,
    }
}
