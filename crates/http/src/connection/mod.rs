//! Connection lifecycle and the tokio driver around it.
//!
//! # Components
//!
//! - [`Connection`]: owns the request, response, handler context and output
//!   stream of one client, and decides after every flushed write whether to
//!   wait, close, or reset for the next keep-alive request ([`next_step`])
//! - [`IoStream`]: the non-blocking output interface a connection schedules
//!   writes and file sends on
//! - [`HttpConnection`]: runs a connection over an `AsyncRead`/`AsyncWrite`
//!   pair, performing queued writes and feeding input
//!
//! # Features
//!
//! - Keep-alive with in-place reset, no per-request allocation
//! - Pipelined requests served in order from one read buffer
//! - `Content-Length` request bodies and `Expect: 100-continue`
//! - Multi-step handlers resumed after each flushed write

mod http_connection;
mod io_stream;
mod lifecycle;

pub use http_connection::HttpConnection;
#[cfg(test)]
pub(crate) use io_stream::MockIoStream;
pub use io_stream::IoStream;
pub use io_stream::PendingOp;
pub use io_stream::QueuedStream;
pub use lifecycle::Connection;
pub use lifecycle::NextStep;
pub use lifecycle::Progress;
pub use lifecycle::ResponseOutcome;
pub use lifecycle::next_step;
