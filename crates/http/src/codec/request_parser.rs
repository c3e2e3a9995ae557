//! Byte-at-a-time request head parser.
//!
//! The parser walks the request line and header block exactly once, copying
//! every token into the request's arena as it goes. It never looks ahead, so a
//! head split across several reads is simply parsed again from the start once
//! more bytes are buffered; the arena is reset on every attempt.
//!
//! # Grammar accepted
//!
//! ```text
//! request-line = METHOD SP path [ "?" query ] SP "HTTP/" version CRLF
//! header-line  = name ":" SP value CRLF
//! head         = request-line *header-line CRLF
//! ```
//!
//! - `METHOD` is one or more upper-case ASCII letters
//! - `version` is one of `1.1`, `1.0` or `0.9`
//! - exactly one space follows the header colon, it is not part of the value
//! - bare `LF` line endings are rejected

use http::HeaderName;
use tracing::trace;

use crate::arena::{BufferArena, Span};
use crate::ensure;
use crate::protocol::header::{HeaderAction, HeaderRegistry, HeaderSlot};
use crate::protocol::message::resolve_version;
use crate::protocol::{ConnectionMode, ParseError, Request};

const PROTOCOL_NAME: &[u8] = b"HTTP";

/// Longest version text the parser buffers, e.g. `1.1`.
const MAX_VERSION_LEN: usize = 3;

/// Outcome of a successful [`Request::parse`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseStatus {
    /// The head is complete, the value is the number of bytes it occupied.
    Complete(usize),
    /// The input ended before the blank line.
    Partial,
}

impl ParseStatus {
    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

#[derive(Debug, Copy, Clone)]
enum State {
    Method,
    Path,
    QueryString,
    Protocol { matched: usize },
    Version,
    /// `\r` ending a line seen, expecting `\n`.
    LineCr,
    /// At the start of a line, either a header name or the final `\r`.
    LineStart,
    HeaderName,
    HeaderColon { name: Span },
    HeaderValue { name: Span },
    /// The `\r` of the blank line seen.
    HeadCr,
}

pub(crate) fn parse_request(request: &mut Request, data: &[u8]) -> Result<ParseStatus, ParseError> {
    request.reset();
    let registry = HeaderRegistry::global();

    let mut state = State::Method;
    let mut version = [0u8; MAX_VERSION_LEN];
    let mut version_len = 0;

    for (index, &byte) in data.iter().enumerate() {
        state = match state {
            State::Method => match byte {
                b'A'..=b'Z' => {
                    request.arena.push(byte)?;
                    State::Method
                }
                b' ' => {
                    ensure!(request.arena.token_len() > 0, ParseError::InvalidMethod);
                    request.method = Some(finish_token(&mut request.arena)?);
                    State::Path
                }
                _ => return Err(ParseError::InvalidMethod),
            },

            State::Path => match byte {
                b' ' | b'?' => {
                    ensure!(request.arena.token_len() > 0, ParseError::InvalidUri);
                    request.path = Some(finish_token(&mut request.arena)?);
                    if byte == b'?' { State::QueryString } else { State::Protocol { matched: 0 } }
                }
                byte if is_uri_byte(byte) => {
                    request.arena.push(byte)?;
                    State::Path
                }
                _ => return Err(ParseError::InvalidUri),
            },

            State::QueryString => match byte {
                b' ' => {
                    request.query = Some(finish_token(&mut request.arena)?);
                    State::Protocol { matched: 0 }
                }
                byte if is_uri_byte(byte) => {
                    request.arena.push(byte)?;
                    State::QueryString
                }
                _ => return Err(ParseError::InvalidUri),
            },

            State::Protocol { matched } => match byte {
                b'/' if matched == PROTOCOL_NAME.len() => State::Version,
                byte if PROTOCOL_NAME.get(matched) == Some(&byte) => State::Protocol { matched: matched + 1 },
                _ => return Err(ParseError::InvalidProtocol),
            },

            State::Version => match byte {
                b'0'..=b'9' | b'.' => {
                    ensure!(version_len < MAX_VERSION_LEN, ParseError::UnknownVersion);
                    version[version_len] = byte;
                    version_len += 1;
                    State::Version
                }
                b'\r' => {
                    request.version = resolve_version(&version[..version_len]).ok_or(ParseError::UnknownVersion)?;
                    State::LineCr
                }
                b'\n' => return Err(ParseError::InvalidLineEnding),
                _ => return Err(ParseError::UnknownVersion),
            },

            State::LineCr => {
                ensure!(byte == b'\n', ParseError::InvalidLineEnding);
                State::LineStart
            }

            State::LineStart => match byte {
                b'\r' => State::HeadCr,
                b'\n' => return Err(ParseError::InvalidLineEnding),
                byte if is_token_byte(byte) => {
                    request.arena.push(byte)?;
                    State::HeaderName
                }
                _ => return Err(ParseError::invalid_header("invalid character in header name")),
            },

            State::HeaderName => match byte {
                b':' => State::HeaderColon { name: finish_token(&mut request.arena)? },
                byte if is_token_byte(byte) => {
                    request.arena.push(byte)?;
                    State::HeaderName
                }
                _ => return Err(ParseError::invalid_header("invalid character in header name")),
            },

            State::HeaderColon { name } => {
                ensure!(byte == b' ', ParseError::invalid_header("expect a single space after the colon"));
                State::HeaderValue { name }
            }

            State::HeaderValue { name } => match byte {
                b'\r' => {
                    // values may carry obs-text, they stay raw bytes
                    let value = request.arena.finish_token();
                    record_header(request, registry, name, value)?;
                    State::LineCr
                }
                b'\t' | 0x20..=0x7e | 0x80..=0xff => {
                    request.arena.push(byte)?;
                    State::HeaderValue { name }
                }
                _ => return Err(ParseError::invalid_header("invalid character in header value")),
            },

            State::HeadCr => {
                ensure!(byte == b'\n', ParseError::InvalidLineEnding);
                let consumed = index + 1;
                trace!(consumed, headers = request.header_count(), "parsed request head");
                return Ok(ParseStatus::Complete(consumed));
            }
        };
    }

    Ok(ParseStatus::Partial)
}

fn finish_token(arena: &mut BufferArena) -> Result<Span, ParseError> {
    let span = arena.finish_token();
    ensure!(arena.get_str(span).is_some(), ParseError::InvalidEncoding);
    Ok(span)
}

/// Stores a finished header and applies the side effect of well-known names.
fn record_header(request: &mut Request, registry: &HeaderRegistry, name: Span, value: Span) -> Result<(), ParseError> {
    let name_bytes = request.arena.get(name).unwrap_or_default();
    let known = registry.lookup(name_bytes);
    let key = match known {
        Some(known) => known.name.clone(),
        None => HeaderName::from_bytes(name_bytes).map_err(ParseError::invalid_header)?,
    };

    if let Some(known) = known {
        apply_action(request, known.action, value)?;
    }

    request.headers.set(key, HeaderSlot { name, value })?;
    Ok(())
}

fn apply_action(request: &mut Request, action: HeaderAction, value: Span) -> Result<(), ParseError> {
    match action {
        HeaderAction::Record => {}
        HeaderAction::SetContentLength => {
            request.content_length = Some(parse_content_length(request.arena.get(value).unwrap_or_default())?);
        }
        HeaderAction::SetHost => request.host = Some(value),
        HeaderAction::SetConnectionMode => {
            request.connection = ConnectionMode::from_header_value(request.arena.get(value).unwrap_or_default());
        }
    }
    Ok(())
}

/// `Content-Length = 1*DIGIT`, no sign and no surrounding whitespace.
fn parse_content_length(value: &[u8]) -> Result<u64, ParseError> {
    ensure!(
        !value.is_empty() && value.iter().all(u8::is_ascii_digit),
        ParseError::invalid_content_length(format!("value {} is not a decimal length", value.escape_ascii()))
    );
    value.iter().try_fold(0u64, |length, &digit| {
        length
            .checked_mul(10)
            .and_then(|length| length.checked_add(u64::from(digit - b'0')))
            .ok_or_else(|| ParseError::invalid_content_length("value overflows u64"))
    })
}

/// Path and query bytes: anything visible, plus non-ASCII which is checked as
/// utf-8 when the token closes.
#[inline]
fn is_uri_byte(byte: u8) -> bool {
    byte > 0x20 && byte != 0x7f
}

/// `tchar` from RFC 9110.
#[inline]
fn is_token_byte(byte: u8) -> bool {
    matches!(byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

#[cfg(test)]
mod tests {
    use http::Version;
    use indoc::indoc;

    use super::*;
    use crate::protocol::CapacityError;

    fn request() -> Request {
        Request::with_capacity(4096, 64)
    }

    fn crlf(text: &str) -> String {
        text.replace('\n', "\r\n")
    }

    #[test]
    fn minimal_request() {
        let mut request = request();
        let status = request.parse(b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();

        assert_eq!(status, ParseStatus::Complete(28));
        assert_eq!(request.method(), "GET");
        assert_eq!(request.path(), "/a");
        assert_eq!(request.query(), None);
        assert_eq!(request.version(), Version::HTTP_11);
        assert_eq!(request.host(), Some("x"));
        assert_eq!(request.connection(), ConnectionMode::KeepAlive);
        assert_eq!(request.header_count(), 1);
    }

    #[test]
    fn agrees_with_httparse() {
        let text = crlf(indoc! {r##"
        GET /index.html?lang=en&page=2 HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*
        X-Request-Id: 7f3c
        Connection: keep-alive

        "##});

        let mut headers = [httparse::EMPTY_HEADER; 16];
        let mut oracle = httparse::Request::new(&mut headers);
        let httparse::Status::Complete(expected) = oracle.parse(text.as_bytes()).unwrap() else {
            panic!("fixture must be a complete head");
        };

        let mut request = request();
        let status = request.parse(text.as_bytes()).unwrap();

        assert_eq!(status, ParseStatus::Complete(expected));
        assert_eq!(Some(request.method()), oracle.method);
        assert_eq!(request.path(), "/index.html");
        assert_eq!(request.query(), Some("lang=en&page=2"));
        assert_eq!(request.header_count(), oracle.headers.len());
        for header in oracle.headers.iter() {
            assert_eq!(request.header(header.name).map(str::as_bytes), Some(header.value));
        }

        let names: Vec<&str> = request.headers().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Host", "User-Agent", "Accept", "X-Request-Id", "Connection"]);
    }

    #[test]
    fn partial_then_complete() {
        let full = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\n";
        let mut request = request();

        for end in 0..full.len() {
            assert_eq!(request.parse(&full[..end]).unwrap(), ParseStatus::Partial, "prefix of {end} bytes");
        }
        assert_eq!(request.parse(full).unwrap(), ParseStatus::Complete(full.len()));
    }

    #[test]
    fn pipelined_requests_stop_at_first_head() {
        let first = "GET /one HTTP/1.1\r\nHost: x\r\n\r\n";
        let data = format!("{first}GET /two HTTP/1.1\r\n\r\n");

        let mut request = request();
        assert_eq!(request.parse(data.as_bytes()).unwrap(), ParseStatus::Complete(first.len()));
        assert_eq!(request.path(), "/one");
    }

    #[test]
    fn versions() {
        let mut request = request();

        request.parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(request.version(), Version::HTTP_10);

        request.parse(b"GET / HTTP/0.9\r\n\r\n").unwrap();
        assert_eq!(request.version(), Version::HTTP_09);

        let err = request.parse(b"GET / HTTP/2.0\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownVersion));

        let err = request.parse(b"GET / HTTP/1.10\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::UnknownVersion));
    }

    #[test]
    fn lowercase_method() {
        let err = request().parse(b"get / HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidMethod));

        let err = request().parse(b" / HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidMethod));
    }

    #[test]
    fn invalid_request_line() {
        let err = request().parse(b"GET  HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidUri));

        let err = request().parse(b"GET /a\x01b HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidUri));

        let err = request().parse(b"GET / HTTX/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidProtocol));

        let err = request().parse(b"GET / HTTP1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidProtocol));
    }

    #[test]
    fn bare_line_feed() {
        let err = request().parse(b"GET / HTTP/1.1\nHost: x\n\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidLineEnding));

        let err = request().parse(b"GET / HTTP/1.1\r\nHost: x\r\n\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidLineEnding));

        let err = request().parse(b"GET / HTTP/1.1\r\nHost: x\r\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidLineEnding));
    }

    #[test]
    fn invalid_headers() {
        let err = request().parse(b"GET / HTTP/1.1\r\nHost:x\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));

        let err = request().parse(b"GET / HTTP/1.1\r\nBad Name: x\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));

        let err = request().parse(b"GET / HTTP/1.1\r\nX-A: a\x00b\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));

        let err = request().parse(b"GET / HTTP/1.1\r\nX-A: a\nb\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));
    }

    #[test]
    fn header_value_keeps_tabs_and_empty_values() {
        let mut request = request();
        request.parse(b"GET / HTTP/1.1\r\nX-Tab: a\tb\r\nX-Empty: \r\n\r\n").unwrap();

        assert_eq!(request.header("x-tab"), Some("a\tb"));
        assert_eq!(request.header("x-empty"), Some(""));
    }

    #[test]
    fn content_length_and_connection() {
        let mut request = request();
        request.parse(b"POST /form HTTP/1.1\r\nContent-Length: 13\r\nConnection: keep-alive\r\n\r\n").unwrap();
        assert_eq!(request.content_length(), Some(13));
        assert_eq!(request.connection(), ConnectionMode::KeepAlive);

        request.parse(b"GET / HTTP/1.1\r\nconnection: Close\r\n\r\n").unwrap();
        assert_eq!(request.content_length(), None);
        assert_eq!(request.connection(), ConnectionMode::Close);

        let err = request.parse(b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidContentLength { .. }));
    }

    #[test]
    fn content_length_is_digits_only() {
        let mut request = request();
        request.parse(b"POST / HTTP/1.1\r\nContent-Length: 0042\r\n\r\n").unwrap();
        assert_eq!(request.content_length(), Some(42));

        for value in ["+5", "-1", "5 ", " 5", "", "1_000", "99999999999999999999"] {
            let head = format!("POST / HTTP/1.1\r\nContent-Length: {value}\r\n\r\n");
            let err = request.parse(head.as_bytes()).unwrap_err();
            assert!(matches!(err, ParseError::InvalidContentLength { .. }), "value {value:?}");
        }
    }

    #[test]
    fn header_value_with_obs_text() {
        let mut request = request();
        let status = request.parse(b"GET / HTTP/1.1\r\nX-Name: caf\xe9\r\nHost: x\r\n\r\n").unwrap();

        assert!(status.is_complete());
        assert_eq!(request.header_bytes("x-name"), Some(&b"caf\xe9"[..]));
        assert_eq!(request.header("x-name"), None);
        assert_eq!(request.header("host"), Some("x"));
        assert_eq!(request.header_count(), 2);
    }

    #[test]
    fn duplicate_header_overwrites() {
        let mut request = request();
        request.parse(b"GET / HTTP/1.1\r\nX-Trace: a\r\nHost: h\r\nx-trace: b\r\n\r\n").unwrap();

        assert_eq!(request.header_count(), 2);
        assert_eq!(request.header("X-Trace"), Some("b"));
    }

    #[test]
    fn arena_overflow() {
        let mut request = Request::with_capacity(16, 8);
        let err = request.parse(b"GET /a/very/long/path/indeed HTTP/1.1\r\n\r\n").unwrap_err();

        assert!(err.is_capacity());
        assert!(matches!(err, ParseError::Capacity { source: CapacityError::ArenaExhausted { .. } }));
    }

    #[test]
    fn too_many_headers() {
        let mut request = Request::with_capacity(4096, 2);
        let err = request.parse(b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n").unwrap_err();

        assert!(matches!(err, ParseError::Capacity { source: CapacityError::TooManyHeaders { max_num: 2 } }));
    }

    #[test]
    fn non_utf8_path() {
        let err = request().parse(b"GET /\xff\xfe HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidEncoding));
    }
}
