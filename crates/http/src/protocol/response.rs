//! The outbound response a handler pipeline fills in.
//!
//! Header names and values are copied into the response's own
//! [`BufferArena`], so the caller's strings need not outlive the call. The head
//! is frozen once it has been handed to the I/O stream: every mutation after
//! that fails with [`SendError::HeadersAlreadySent`].

use std::fmt;

use http::{HeaderName, Version};

use crate::arena::{BufferArena, Span};
use crate::config::ServerConfig;
use crate::ensure;
use crate::protocol::header::{HeaderRegistry, HeaderSlot, HeaderStore};
use crate::protocol::{ConnectionMode, SendError, Status};

#[derive(Debug)]
pub struct Response {
    status: Status,
    version: Version,
    connection: ConnectionMode,
    content_length: Option<u64>,
    headers: HeaderStore,
    arena: BufferArena,
    headers_sent: bool,
}

impl Response {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_capacity(config.response_buffer_size(), config.max_headers())
    }

    pub fn with_capacity(buffer_size: usize, max_headers: usize) -> Self {
        Self {
            status: Status::OK,
            version: Version::HTTP_11,
            connection: ConnectionMode::KeepAlive,
            content_length: None,
            headers: HeaderStore::with_capacity(max_headers),
            arena: BufferArena::with_capacity(buffer_size),
            headers_sent: false,
        }
    }

    #[inline]
    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    #[inline]
    pub fn connection(&self) -> ConnectionMode {
        self.connection
    }

    pub fn set_connection(&mut self, connection: ConnectionMode) {
        self.connection = connection;
    }

    /// `None` until a length is set; a response without one closes the
    /// connection after its body.
    #[inline]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn set_content_length(&mut self, length: u64) {
        self.content_length = Some(length);
    }

    #[inline]
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Case-insensitive lookup of a header set so far.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|slot| self.arena.get_str(slot.value))
    }

    /// Headers in the order they were first set.
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

    /// Sets a header, replacing the value of an existing one in place.
    ///
    /// The name keeps the casing it was first set with; a later call with a
    /// different casing only replaces the value.
    ///
    /// # Errors
    ///
    /// - [`SendError::HeadersAlreadySent`] once the head is on its way
    /// - [`SendError::InvalidHeader`] for a name that is not a token or a value
    ///   containing control characters
    /// - [`SendError::Capacity`] when the arena or the header table is full,
    ///   in which case nothing is consumed from the arena
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), SendError> {
        ensure!(!self.headers_sent, SendError::HeadersAlreadySent);
        let mark = self.arena.cursor();
        let value = self.arena.copy_from(value.as_bytes())?;
        self.insert_or_rollback(name, value, mark)
    }

    /// Like [`set_header`](Self::set_header), formatting the value straight
    /// into the arena.
    ///
    /// ```
    /// # use gale_http::protocol::Response;
    /// let mut response = Response::with_capacity(256, 8);
    /// response.set_header_fmt("X-Elapsed", format_args!("{}ms", 12)).unwrap();
    /// assert_eq!(response.header("x-elapsed"), Some("12ms"));
    /// ```
    ///
    /// # Errors
    ///
    /// Same as [`set_header`](Self::set_header).
    pub fn set_header_fmt(&mut self, name: &str, args: fmt::Arguments<'_>) -> Result<(), SendError> {
        ensure!(!self.headers_sent, SendError::HeadersAlreadySent);
        let mark = self.arena.cursor();
        let value = self.arena.write_fmt(args)?;
        self.insert_or_rollback(name, value, mark)
    }

    /// Adds the headers every response carries: `Content-Length` (or forced
    /// close when no length is known), `Connection`, `Server` and `Date`.
    pub(crate) fn apply_defaults(&mut self, server_name: &str, date: &str) -> Result<(), SendError> {
        match self.content_length {
            Some(length) => self.set_header_fmt("Content-Length", format_args!("{length}"))?,
            None => self.connection = ConnectionMode::Close,
        }
        let connection = self.connection.as_header_value();
        self.set_header("Connection", connection)?;
        self.set_header("Server", server_name)?;
        self.set_header("Date", date)?;
        Ok(())
    }

    pub(crate) fn mark_headers_sent(&mut self) {
        self.headers_sent = true;
    }

    /// Returns the response to its freshly created state: `200 OK`, HTTP/1.1,
    /// keep-alive, no content length, no headers.
    pub fn reset(&mut self) {
        self.status = Status::OK;
        self.version = Version::HTTP_11;
        self.connection = ConnectionMode::KeepAlive;
        self.content_length = None;
        self.headers.clear();
        self.arena.reset();
        self.headers_sent = false;
    }

    fn insert_or_rollback(&mut self, name: &str, value: Span, mark: usize) -> Result<(), SendError> {
        let result = self.insert(name, value);
        if result.is_err() {
            self.arena.rollback(mark);
        }
        result
    }

    fn insert(&mut self, name: &str, value: Span) -> Result<(), SendError> {
        let valid = self.arena.get(value).is_some_and(|bytes| bytes.iter().all(|&b| is_value_byte(b)));
        ensure!(valid, SendError::invalid_header(format!("value of {name} contains control characters")));

        let key = header_key(name)?;
        let name = match self.headers.get(key.as_str()) {
            Some(existing) => existing.name,
            None => self.arena.copy_from(name.as_bytes())?,
        };
        self.headers.set(key, HeaderSlot { name, value })?;
        Ok(())
    }
}

/// Well-known names reuse the registry's canonical key.
fn header_key(name: &str) -> Result<HeaderName, SendError> {
    match HeaderRegistry::global().lookup(name.as_bytes()) {
        Some(known) => Ok(known.name.clone()),
        None => HeaderName::from_bytes(name.as_bytes()).map_err(SendError::invalid_header),
    }
}

#[inline]
fn is_value_byte(byte: u8) -> bool {
    byte == b'\t' || (byte >= 0x20 && byte != 0x7f)
}

/// The html page sent by [`Connection::send_status`](crate::connection::Connection::send_status).
pub fn status_page(status: &Status, product: &str) -> String {
    let code = status.code();
    let message = status.message();
    format!(
        "<html>\
         <head><title>{code} {message}</title></head>\
         <body>\
         <center><h2>{code} {message}</h2></center>\
         <center>Please contact website administrator to report the problem.</center>\
         <hr/>\
         <center>Powered by {product}</center>\
         </body>\
         </html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CapacityError;

    fn response() -> Response {
        Response::with_capacity(512, 16)
    }

    fn count(response: &Response, name: &str) -> usize {
        response.headers().filter(|(n, _)| n.eq_ignore_ascii_case(name)).count()
    }

    #[test]
    fn defaults_with_content_length() {
        let mut response = response();
        response.set_content_length(13);
        response.apply_defaults("gale/test", "Thu, 01 Jan 1970 00:00:00 GMT").unwrap();

        assert_eq!(count(&response, "content-length"), 1);
        assert_eq!(response.header("Content-Length"), Some("13"));
        assert_eq!(count(&response, "connection"), 1);
        assert_eq!(response.header("Connection"), Some("keep-alive"));
        assert_eq!(response.header("server"), Some("gale/test"));
        assert_eq!(response.header("date"), Some("Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[test]
    fn defaults_without_content_length_close() {
        let mut response = response();
        response.apply_defaults("gale/test", "Thu, 01 Jan 1970 00:00:00 GMT").unwrap();

        assert_eq!(response.connection(), ConnectionMode::Close);
        assert_eq!(response.header("Connection"), Some("close"));
        assert_eq!(response.header("Content-Length"), None);
    }

    #[test]
    fn set_header_is_case_insensitive_upsert() {
        let mut response = response();
        response.set_header("Content-Type", "text/plain").unwrap();
        response.set_header("X-Trace", "1").unwrap();
        response.set_header("content-type", "text/html").unwrap();
        response.set_header("x-trace", "2").unwrap();

        let headers: Vec<(&str, &str)> = response.headers().collect();
        assert_eq!(headers, vec![("Content-Type", "text/html"), ("X-Trace", "2")]);
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn rejects_invalid_headers() {
        let mut response = response();

        let err = response.set_header("Bad Name", "x").unwrap_err();
        assert!(matches!(err, SendError::InvalidHeader { .. }));

        let err = response.set_header("X-Injected", "a\r\nSet-Cookie: b").unwrap_err();
        assert!(matches!(err, SendError::InvalidHeader { .. }));

        assert_eq!(response.header_count(), 0);
        assert_eq!(response.arena().cursor(), 0);
    }

    #[test]
    fn set_header_fmt_failure_keeps_cursor() {
        let mut response = Response::with_capacity(16, 4);
        response.set_header("X-A", "1").unwrap();
        let cursor = response.arena().cursor();

        let err = response.set_header_fmt("X-Long", format_args!("{}", "a value that does not fit")).unwrap_err();
        assert!(matches!(err, SendError::Capacity { source: CapacityError::ArenaExhausted { .. } }));
        assert_eq!(response.arena().cursor(), cursor);

        // the value fits but the name does not
        let err = response.set_header_fmt("X-Much-Too-Long-Name", format_args!("{}", 7)).unwrap_err();
        assert!(matches!(err, SendError::Capacity { .. }));
        assert_eq!(response.arena().cursor(), cursor);
    }

    #[test]
    fn frozen_after_headers_sent() {
        let mut response = response();
        response.mark_headers_sent();

        assert!(matches!(response.set_header("X-A", "1"), Err(SendError::HeadersAlreadySent)));
        assert!(matches!(response.set_header_fmt("X-A", format_args!("{}", 1)), Err(SendError::HeadersAlreadySent)));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut response = response();
        response.set_status(Status::NOT_FOUND);
        response.set_version(Version::HTTP_10);
        response.set_content_length(3);
        response.set_header("X-A", "1").unwrap();
        response.mark_headers_sent();

        response.reset();

        assert_eq!(response.status(), &Status::OK);
        assert_eq!(response.version(), Version::HTTP_11);
        assert_eq!(response.connection(), ConnectionMode::KeepAlive);
        assert_eq!(response.content_length(), None);
        assert_eq!(response.header_count(), 0);
        assert_eq!(response.arena().cursor(), 0);
        assert!(!response.headers_sent());
    }

    #[test]
    fn status_page_mentions_code_twice() {
        let page = status_page(&Status::NOT_FOUND, "gale/test");
        assert_eq!(page.matches("404").count(), 2);
        assert_eq!(page.matches("Not Found").count(), 2);
        assert!(page.contains("Powered by gale/test"));
    }
}
