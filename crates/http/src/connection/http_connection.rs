use std::io::SeekFrom;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{Connection, PendingOp, Progress, QueuedStream};
use crate::config::ServerConfig;
use crate::handler::Pipeline;
use crate::protocol::{HttpError, ParseError, SendError};

/// Drives one [`Connection`] over a split async stream.
///
/// `HttpConnection` plays the event loop for a single connection: it performs
/// the writes the connection queued, reports their completion, and feeds it
/// whatever the peer sends. Everything happens on the task that awaits
/// [`process`](Self::process), so completions arrive in scheduling order.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    reader: R,
    writer: W,
    read_buf: BytesMut,
    connection: Connection<QueuedStream>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, pipeline: Arc<Pipeline<QueuedStream>>, config: Arc<ServerConfig>) -> Self {
        Self {
            reader,
            writer,
            read_buf: BytesMut::with_capacity(config.read_buffer_size()),
            connection: Connection::new(QueuedStream::new(), pipeline, config),
        }
    }

    /// Serves requests until either side closes.
    ///
    /// # Errors
    ///
    /// I/O failures on the underlying stream; protocol errors are answered on
    /// the wire and end the loop normally.
    pub async fn process(mut self) -> Result<(), HttpError> {
        loop {
            if self.connection.is_closed() {
                debug!("connection closed, shutting down writer");
                // the peer may already be gone
                let _ = self.writer.shutdown().await;
                return Ok(());
            }

            if self.connection.has_writes_in_flight() {
                let ops = self.connection.stream_mut().take_ops();
                for op in ops {
                    if let Err(e) = self.perform(op).await {
                        self.connection.close();
                        return Err(e.into());
                    }
                }
                self.writer.flush().await.map_err(SendError::io)?;
                self.connection.on_write_finished();
                continue;
            }

            if !self.connection.wants_input() {
                warn!("connection has nothing to write and expects no input, closing");
                self.connection.close();
                continue;
            }

            if !self.read_buf.is_empty() && self.connection.feed(&mut self.read_buf) == Progress::Advanced {
                continue;
            }

            match self.reader.read_buf(&mut self.read_buf).await {
                Ok(0) => {
                    info!("cant read more request, break this connection down");
                    self.connection.close();
                }
                Ok(n) => debug!(bytes = n, "read from peer"),
                Err(e) => {
                    self.connection.close();
                    return Err(ParseError::io(e).into());
                }
            }
        }
    }

    async fn perform(&mut self, op: PendingOp) -> Result<(), SendError> {
        match op {
            PendingOp::Write(data) => self.writer.write_all(&data).await.map_err(SendError::io),
            PendingOp::SendFile { file, offset, len } => {
                let mut file = File::from_std(file);
                file.seek(SeekFrom::Start(offset)).await.map_err(SendError::io)?;
                let copied = tokio::io::copy(&mut file.take(len), &mut self.writer).await.map_err(SendError::io)?;
                if copied < len {
                    warn!(expected = len, copied, "file ended before the requested range");
                }
                Ok(())
            }
        }
    }
}
