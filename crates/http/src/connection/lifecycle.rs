//! Per-connection request/response cycle.
//!
//! A [`Connection`] owns one [`Request`], one [`Response`], one [`Context`] and
//! the [`IoStream`] they are answered on. Nothing in here blocks: input is
//! pushed in with [`Connection::feed`], writes are only scheduled, and the
//! driver reports each flushed batch back through
//! [`Connection::on_write_finished`]. When a response has been fully written the
//! connection either closes or resets all of its parts in place and waits for
//! the next request on the same stream.

use std::fs::File;
use std::io;
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Encoder;
use tracing::{debug, error, trace, warn};

use super::IoStream;
use crate::codec::{HeadEncoder, ParseStatus};
use crate::config::ServerConfig;
use crate::ensure;
use crate::handler::{Context, Continuation, Flow, HandlerFn, Pipeline};
use crate::protocol::{ConnectionMode, ParseError, Request, ResetError, Response, SendError, Status, status_page};

const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// Whether the current response still has work outstanding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResponseOutcome {
    InFlight,
    Finished,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NextStep {
    Wait,
    Close,
    ResetAndContinue,
}

/// The keep-alive decision taken after every flushed write.
pub fn next_step(outcome: ResponseOutcome, mode: ConnectionMode) -> NextStep {
    match (outcome, mode) {
        (ResponseOutcome::InFlight, _) => NextStep::Wait,
        (ResponseOutcome::Finished, ConnectionMode::Close) => NextStep::Close,
        (ResponseOutcome::Finished, ConnectionMode::KeepAlive) => NextStep::ResetAndContinue,
    }
}

/// Result of [`Connection::feed`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Progress {
    /// The buffered input is not enough to move on, read more.
    NeedMore,
    /// The connection changed state; it may now have writes to flush.
    Advanced,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    AwaitingRequest,
    ReadingBody { len: usize },
    Handling,
    Closed,
}

pub struct Connection<S> {
    request: Request,
    response: Response,
    context: Context,
    stream: S,
    pipeline: Arc<Pipeline<S>>,
    config: Arc<ServerConfig>,
    head_buf: BytesMut,
    next: Option<Continuation<S>>,
    in_flight: usize,
    done: bool,
    phase: Phase,
}

impl<S: IoStream> Connection<S> {
    pub fn new(stream: S, pipeline: Arc<Pipeline<S>>, config: Arc<ServerConfig>) -> Self {
        let mut context = Context::with_capacity(config.state_stack_depth());
        context.attach(Arc::clone(&config));
        Self {
            request: Request::new(&config),
            response: Response::new(&config),
            context,
            stream,
            pipeline,
            head_buf: BytesMut::with_capacity(config.response_buffer_size()),
            config,
            next: None,
            in_flight: 0,
            done: false,
            phase: Phase::AwaitingRequest,
        }
    }

    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[inline]
    pub fn response(&self) -> &Response {
        &self.response
    }

    #[inline]
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    #[inline]
    pub fn context(&self) -> &Context {
        &self.context
    }

    #[inline]
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    #[inline]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[inline]
    pub fn stream(&self) -> &S {
        &self.stream
    }

    #[inline]
    pub(crate) fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    /// Whether scheduled writes are waiting for `on_write_finished`.
    #[inline]
    pub fn has_writes_in_flight(&self) -> bool {
        self.in_flight > 0
    }

    /// Whether the connection is waiting for request bytes.
    pub fn wants_input(&self) -> bool {
        matches!(self.phase, Phase::AwaitingRequest | Phase::ReadingBody { .. }) && self.in_flight == 0
    }

    /// Hands buffered input to the connection.
    ///
    /// Consumed bytes are removed from `buf`; whatever follows the current
    /// message (a pipelined request) stays in it for the next call.
    pub fn feed(&mut self, buf: &mut BytesMut) -> Progress {
        match self.phase {
            Phase::AwaitingRequest => self.feed_head(buf),
            Phase::ReadingBody { len } => self.feed_body(buf, len),
            Phase::Handling | Phase::Closed => Progress::NeedMore,
        }
    }

    /// Completion of every write scheduled so far.
    ///
    /// Runs the registered continuation, then closes, resets or keeps waiting
    /// according to [`next_step`].
    pub fn on_write_finished(&mut self) {
        self.in_flight = 0;
        if self.phase != Phase::Handling {
            return;
        }

        if let Some(next) = self.next.take() {
            trace!(stage = next.name(), "resuming handler");
            self.run_handler(next.resume());
        }
        self.advance();
    }

    /// Encodes the response head and schedules it.
    ///
    /// Default headers are added first, so `Content-Length` must already be
    /// set for the connection to stay open.
    ///
    /// # Errors
    ///
    /// [`SendError::Schedule`] closes the connection before returning.
    pub fn send_headers(&mut self, next: Option<Continuation<S>>) -> Result<(), SendError> {
        ensure!(!self.response.headers_sent(), SendError::HeadersAlreadySent);

        let date = self.pipeline.date().current_http_date();
        self.response.apply_defaults(self.config.server_name(), &date)?;

        self.head_buf.clear();
        HeadEncoder.encode(&self.response, &mut self.head_buf)?;
        let head = self.head_buf.split().freeze();

        self.next = next;
        self.schedule(|stream| stream.schedule_write(head))?;
        self.response.mark_headers_sent();
        Ok(())
    }

    /// Schedules a chunk of body.
    ///
    /// # Errors
    ///
    /// [`SendError::HeadersNotSent`] before [`send_headers`](Self::send_headers);
    /// [`SendError::Schedule`] closes the connection before returning.
    pub fn write(&mut self, data: impl Into<Bytes>, next: Option<Continuation<S>>) -> Result<(), SendError> {
        ensure!(self.response.headers_sent(), SendError::HeadersNotSent);
        let data = data.into();
        self.next = next;
        self.schedule(|stream| stream.schedule_write(data))
    }

    /// Schedules `len` bytes of `file` from `offset` as body.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn send_file(&mut self, file: File, offset: u64, len: u64, next: Option<Continuation<S>>) -> Result<(), SendError> {
        ensure!(self.response.headers_sent(), SendError::HeadersNotSent);
        self.next = next;
        self.schedule(|stream| stream.schedule_send_file(file, offset, len))
    }

    /// Answers with `status` and a small html page naming it.
    ///
    /// A failure closes the connection, so the result is always
    /// [`Flow::Done`].
    pub fn send_status(&mut self, status: Status) -> Flow {
        if let Err(e) = self.try_send_status(status) {
            error!(cause = %e, "failed to send status page, closing connection");
            self.close();
        }
        Flow::Done
    }

    /// Tears the connection down, dropping anything not yet written.
    pub fn close(&mut self) {
        if self.phase == Phase::Closed {
            return;
        }
        self.phase = Phase::Closed;
        self.next = None;
        self.stream.close();
    }

    fn try_send_status(&mut self, status: Status) -> Result<(), SendError> {
        let body = status_page(&status, self.config.server_name());
        self.response.set_status(status);
        self.response.set_header("Content-Type", mime::TEXT_HTML.essence_str())?;
        self.response.set_content_length(body.len() as u64);
        self.send_headers(None)?;
        self.write(body, None)
    }

    fn feed_head(&mut self, buf: &mut BytesMut) -> Progress {
        match self.request.parse(&buf[..]) {
            Ok(ParseStatus::Partial) => Progress::NeedMore,
            Ok(ParseStatus::Complete(consumed)) => {
                buf.advance(consumed);
                debug!(method = self.request.method(), path = self.request.path(), "received request");

                self.response.set_version(self.request.version());
                self.response.set_connection(self.request.connection());
                match self.request.content_length() {
                    Some(len) if len > 0 => self.start_body(buf, len),
                    _ => {
                        self.dispatch();
                        Progress::Advanced
                    }
                }
            }
            Err(e) => {
                warn!(cause = %e, "failed to parse request, discarding input");
                buf.clear();
                self.reject(Status::BAD_REQUEST);
                Progress::Advanced
            }
        }
    }

    fn start_body(&mut self, buf: &mut BytesMut, len: u64) -> Progress {
        let max_size = self.config.max_body_size();
        let len = match usize::try_from(len) {
            Ok(n) if len <= max_size => n,
            _ => {
                let e = ParseError::too_large_body(len, max_size);
                warn!(cause = %e, "rejecting request body");
                buf.clear();
                self.reject(Status::PAYLOAD_TOO_LARGE);
                return Progress::Advanced;
            }
        };

        if buf.len() < len && self.request.expects_continue() {
            trace!("sending 100 continue");
            if self.schedule(|stream| stream.schedule_write(Bytes::from_static(CONTINUE_RESPONSE))).is_err() {
                return Progress::Advanced;
            }
        }
        self.phase = Phase::ReadingBody { len };
        Progress::Advanced
    }

    fn feed_body(&mut self, buf: &mut BytesMut, len: usize) -> Progress {
        if buf.len() < len {
            return Progress::NeedMore;
        }
        let body = buf.split_to(len).freeze();
        self.request.set_body(body);
        self.dispatch();
        Progress::Advanced
    }

    fn dispatch(&mut self) {
        self.phase = Phase::Handling;
        self.done = false;
        let entry = self.pipeline.entry();
        self.run_handler(entry);
        self.advance();
    }

    /// Answers a request that never reaches the handler pipeline.
    fn reject(&mut self, status: Status) {
        self.phase = Phase::Handling;
        self.response.set_connection(ConnectionMode::Close);
        self.send_status(status);
        self.done = true;
    }

    fn run_handler(&mut self, handler: HandlerFn<S>) {
        if handler(self) == Flow::Done {
            self.done = true;
        }

        let unanswered = self.done && self.in_flight == 0 && !self.response.headers_sent();
        if unanswered && self.phase == Phase::Handling {
            error!("handler finished without sending a response");
            self.response.set_connection(ConnectionMode::Close);
            self.send_status(Status::INTERNAL_SERVER_ERROR);
        }
    }

    fn advance(&mut self) {
        if self.phase != Phase::Handling {
            return;
        }
        if !self.done && self.in_flight == 0 {
            error!("handler is pending but scheduled nothing, closing connection");
            self.close();
            return;
        }

        match next_step(self.outcome(), self.response.connection()) {
            NextStep::Wait => {}
            NextStep::Close => {
                debug!("response finished, closing connection");
                self.close();
            }
            NextStep::ResetAndContinue => match self.reset() {
                Ok(()) => debug!("response finished, connection reset for the next request"),
                Err(e) => {
                    error!(cause = %e, "failed to reset connection, closing");
                    self.close();
                }
            },
        }
    }

    fn outcome(&self) -> ResponseOutcome {
        if self.done && self.in_flight == 0 { ResponseOutcome::Finished } else { ResponseOutcome::InFlight }
    }

    fn reset(&mut self) -> Result<(), ResetError> {
        ensure!(self.in_flight == 0, ResetError::WritesInFlight { pending: self.in_flight });
        self.request.reset();
        self.response.reset();
        self.context.reset();
        self.context.attach(Arc::clone(&self.config));
        self.next = None;
        self.done = false;
        self.phase = Phase::AwaitingRequest;
        Ok(())
    }

    fn schedule(&mut self, op: impl FnOnce(&mut S) -> io::Result<()>) -> Result<(), SendError> {
        match op(&mut self.stream) {
            Ok(()) => {
                self.in_flight += 1;
                Ok(())
            }
            Err(e) => {
                error!(cause = %e, "failed to schedule write, closing connection");
                self.close();
                Err(SendError::schedule(e))
            }
        }
    }
}
