//! The inbound request, filled in by the request parser.
//!
//! Every token of the request head is interned in the request's own
//! [`BufferArena`]; the accessors resolve [`Span`]s against it. A `Request` is
//! created once per connection and [`reset`](Request::reset) between messages,
//! it is never rebuilt.

use bytes::Bytes;
use http::Version;

use crate::arena::{BufferArena, Span};
use crate::codec::{ParseStatus, parse_request};
use crate::config::ServerConfig;
use crate::protocol::header::HeaderStore;
use crate::protocol::{ConnectionMode, ParseError};

#[derive(Debug)]
pub struct Request {
    pub(crate) method: Option<Span>,
    pub(crate) path: Option<Span>,
    pub(crate) query: Option<Span>,
    pub(crate) version: Version,
    pub(crate) connection: ConnectionMode,
    pub(crate) content_length: Option<u64>,
    pub(crate) host: Option<Span>,
    pub(crate) headers: HeaderStore,
    pub(crate) arena: BufferArena,
    body: Bytes,
}

impl Request {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_capacity(config.request_buffer_size(), config.max_headers())
    }

    pub fn with_capacity(buffer_size: usize, max_headers: usize) -> Self {
        Self {
            method: None,
            path: None,
            query: None,
            version: Version::HTTP_11,
            connection: ConnectionMode::KeepAlive,
            content_length: None,
            host: None,
            headers: HeaderStore::with_capacity(max_headers),
            arena: BufferArena::with_capacity(buffer_size),
            body: Bytes::new(),
        }
    }

    /// Parses a complete request head from the start of `data`.
    ///
    /// The request is reset first, so `data` must hold the message from its
    /// first byte. `Ok(ParseStatus::Partial)` means the bytes ran out before
    /// the blank line; keep them and call again once more have arrived.
    ///
    /// # Errors
    ///
    /// Any [`ParseError`] means the head is malformed or does not fit the
    /// configured capacities, and should be answered with `400 Bad Request`.
    pub fn parse(&mut self, data: &[u8]) -> Result<ParseStatus, ParseError> {
        parse_request(self, data)
    }

    pub fn method(&self) -> &str {
        self.resolve(self.method).unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.resolve(self.path).unwrap_or_default()
    }

    /// The text after `?`, without the `?`.
    pub fn query(&self) -> Option<&str> {
        self.resolve(self.query)
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub fn connection(&self) -> ConnectionMode {
        self.connection
    }

    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn host(&self) -> Option<&str> {
        self.resolve(self.host)
    }

    /// Case-insensitive header lookup, `None` as well when the value is not
    /// valid utf-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|slot| self.arena.get_str(slot.value))
    }

    /// The raw value of a header, which may contain obs-text bytes.
    pub fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.headers.get(name).and_then(|slot| self.arena.get(slot.value))
    }

    /// Headers as received, `(name, value)` in arrival order. A value that is
    /// not valid utf-8 shows up empty, see [`header_bytes`](Self::header_bytes).
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(_, slot)| {
            (self.arena.get_str(slot.name).unwrap_or_default(), self.arena.get_str(slot.value).unwrap_or_default())
        })
    }

    #[inline]
    pub fn header_count(&self) -> usize {
        self.headers.len()
    }

    #[inline]
    pub fn arena(&self) -> &BufferArena {
        &self.arena
    }

    /// The request body, empty until the connection has buffered
    /// `Content-Length` bytes.
    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    /// Whether the client waits for `100 Continue` before sending its body.
    pub fn expects_continue(&self) -> bool {
        self.header("expect").is_some_and(|value| value.eq_ignore_ascii_case("100-continue"))
    }

    /// Returns the request to its freshly created state.
    pub fn reset(&mut self) {
        self.method = None;
        self.path = None;
        self.query = None;
        self.version = Version::HTTP_11;
        self.connection = ConnectionMode::KeepAlive;
        self.content_length = None;
        self.host = None;
        self.headers.clear();
        self.arena.reset();
        self.body = Bytes::new();
    }

    fn resolve(&self, span: Option<Span>) -> Option<&str> {
        span.and_then(|span| self.arena.get_str(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_leaves_no_residue() {
        let mut request = Request::with_capacity(256, 8);
        let status = request.parse(b"POST /a?b=1 HTTP/1.0\r\nHost: x\r\nConnection: close\r\nContent-Length: 3\r\n\r\n").unwrap();
        assert!(matches!(status, ParseStatus::Complete(_)));
        request.set_body(Bytes::from_static(b"abc"));

        request.reset();

        assert_eq!(request.header_count(), 0);
        assert_eq!(request.arena().cursor(), 0);
        assert_eq!(request.method(), "");
        assert_eq!(request.query(), None);
        assert_eq!(request.host(), None);
        assert_eq!(request.content_length(), None);
        assert_eq!(request.connection(), ConnectionMode::KeepAlive);
        assert_eq!(request.version(), Version::HTTP_11);
        assert!(request.body().is_empty());

        let status = request.parse(b"GET /next HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(status, ParseStatus::Complete(22));
        assert_eq!(request.path(), "/next");
        assert_eq!(request.header("host"), None);
    }

    #[test]
    fn expect_continue() {
        let mut request = Request::with_capacity(256, 8);
        request.parse(b"PUT /f HTTP/1.1\r\nExpect: 100-Continue\r\nContent-Length: 10\r\n\r\n").unwrap();
        assert!(request.expects_continue());

        request.parse(b"PUT /f HTTP/1.1\r\nContent-Length: 10\r\n\r\n").unwrap();
        assert!(!request.expects_continue());
    }
}
