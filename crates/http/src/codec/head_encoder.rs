//! Serializes a [`Response`] head: status line, headers, blank line.
//!
//! Defaults are not injected here; the connection calls
//! `Response::apply_defaults` right before encoding so the encoder stays a pure
//! function of the response.

use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::ensure;
use crate::protocol::message::version_str;
use crate::protocol::{Response, SendError};

/// Bytes reserved up front, enough for a typical head.
const INIT_HEAD_SIZE: usize = 512;

/// Encoder for response heads implementing the [`Encoder`] trait.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadEncoder;

impl Encoder<&Response> for HeadEncoder {
    type Error = SendError;

    /// Writes `HTTP/<version> <code> <message>\r\n`, every header as
    /// `<Name>: <Value>\r\n` in insertion order, then `\r\n`.
    ///
    /// A status that cannot form a status line is rejected before anything is
    /// written to `dst`.
    fn encode(&mut self, response: &Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let status = response.status();
        ensure!(
            status.is_valid(),
            SendError::InvalidStatus { code: status.code(), message: status.message().to_string() }
        );

        dst.reserve(INIT_HEAD_SIZE);
        write!(FastWrite(dst), "HTTP/{} {} {}\r\n", version_str(response.version()), status.code(), status.message())?;

        for (name, value) in response.headers() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` over `BytesMut` that never fails, the buffer grows as needed.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use http::Version;
    use indoc::indoc;

    use super::*;
    use crate::protocol::Status;

    const DATE: &str = "Sun, 06 Nov 1994 08:49:37 GMT";

    fn encode(response: &Response) -> String {
        let mut dst = BytesMut::new();
        HeadEncoder.encode(response, &mut dst).unwrap();
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn keep_alive_head() {
        let mut response = Response::with_capacity(1024, 16);
        response.set_header("Content-Type", "text/plain").unwrap();
        response.set_content_length(13);
        response.apply_defaults("gale/test", DATE).unwrap();

        let expected = indoc! {"
            HTTP/1.1 200 OK
            Content-Type: text/plain
            Content-Length: 13
            Connection: keep-alive
            Server: gale/test
            Date: Sun, 06 Nov 1994 08:49:37 GMT

        "}
        .replace('\n', "\r\n");

        let head = encode(&response);
        assert_eq!(head, expected);
        assert_eq!(head.matches("Content-Length: 13\r\n").count(), 1);
        assert_eq!(head.matches("Connection: keep-alive\r\n").count(), 1);
    }

    #[test]
    fn unknown_length_closes() {
        let mut response = Response::with_capacity(1024, 16);
        response.set_status(Status::NOT_FOUND);
        response.set_version(Version::HTTP_10);
        response.apply_defaults("gale/test", DATE).unwrap();

        let head = encode(&response);
        assert!(head.starts_with("HTTP/1.0 404 Not Found\r\n"));
        assert!(head.contains("Connection: close\r\n"));
        assert!(!head.contains("Content-Length"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn overwritten_header_keeps_position() {
        let mut response = Response::with_capacity(1024, 16);
        response.set_header("X-First", "a").unwrap();
        response.set_header("X-Second", "b").unwrap();
        response.set_header("x-first", "c").unwrap();

        let head = encode(&response);
        assert_eq!(head, "HTTP/1.1 200 OK\r\nX-First: c\r\nX-Second: b\r\n\r\n");
    }

    #[test]
    fn custom_status_line() {
        let mut response = Response::with_capacity(256, 4);
        response.set_status(Status::custom(299, "Fine Enough"));

        assert_eq!(encode(&response), "HTTP/1.1 299 Fine Enough\r\n\r\n");
    }

    #[test]
    fn status_line_injection_is_rejected() {
        let mut response = Response::with_capacity(256, 4);
        response.set_status(Status::custom(200, "OK\r\nSet-Cookie: session=stolen"));

        let mut dst = BytesMut::new();
        let err = HeadEncoder.encode(&response, &mut dst).unwrap_err();

        assert!(matches!(err, SendError::InvalidStatus { code: 200, .. }));
        assert!(dst.is_empty());
    }
}
