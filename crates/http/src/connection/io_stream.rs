use std::collections::VecDeque;
use std::fs::File;
use std::io;

use bytes::Bytes;

/// The non-blocking output side of a connection.
///
/// Every call only schedules work and returns at once. Completion is reported
/// to the owning [`Connection`](super::Connection) later through
/// `on_write_finished`, by whatever drives the stream.
#[cfg_attr(test, mockall::automock)]
pub trait IoStream {
    fn schedule_write(&mut self, data: Bytes) -> io::Result<()>;

    /// Schedules `len` bytes of `file` starting at `offset`.
    fn schedule_send_file(&mut self, file: File, offset: u64, len: u64) -> io::Result<()>;

    fn close(&mut self);
}

/// An operation waiting for the driver to perform it.
#[derive(Debug)]
pub enum PendingOp {
    Write(Bytes),
    SendFile { file: File, offset: u64, len: u64 },
}

/// [`IoStream`] that queues operations for [`HttpConnection`](super::HttpConnection)
/// to perform in order.
#[derive(Debug, Default)]
pub struct QueuedStream {
    ops: VecDeque<PendingOp>,
    closed: bool,
}

impl QueuedStream {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.ops.is_empty()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drains every queued operation, oldest first.
    pub fn take_ops(&mut self) -> VecDeque<PendingOp> {
        std::mem::take(&mut self.ops)
    }

    fn ensure_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "stream is closed"));
        }
        Ok(())
    }
}

impl IoStream for QueuedStream {
    fn schedule_write(&mut self, data: Bytes) -> io::Result<()> {
        self.ensure_open()?;
        self.ops.push_back(PendingOp::Write(data));
        Ok(())
    }

    fn schedule_send_file(&mut self, file: File, offset: u64, len: u64) -> io::Result<()> {
        self.ensure_open()?;
        self.ops.push_back(PendingOp::SendFile { file, offset, len });
        Ok(())
    }

    /// Drops whatever is still queued.
    fn close(&mut self) {
        self.closed = true;
        self.ops.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_in_order() {
        let mut stream = QueuedStream::new();
        stream.schedule_write(Bytes::from_static(b"head")).unwrap();
        stream.schedule_write(Bytes::from_static(b"body")).unwrap();
        assert!(stream.has_pending());

        let ops: Vec<Bytes> = stream
            .take_ops()
            .into_iter()
            .map(|op| match op {
                PendingOp::Write(data) => data,
                PendingOp::SendFile { .. } => panic!("unexpected send file"),
            })
            .collect();

        assert_eq!(ops, vec![Bytes::from_static(b"head"), Bytes::from_static(b"body")]);
        assert!(!stream.has_pending());
    }

    #[test]
    fn closed_stream_refuses_work() {
        let mut stream = QueuedStream::new();
        stream.schedule_write(Bytes::from_static(b"lost")).unwrap();
        stream.close();

        assert!(stream.is_closed());
        assert!(!stream.has_pending());
        let err = stream.schedule_write(Bytes::from_static(b"late")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
