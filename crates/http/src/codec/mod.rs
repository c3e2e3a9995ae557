//! Wire-format conversion for HTTP/1.x heads.
//!
//! - Request side: [`Request::parse`](crate::protocol::Request::parse) runs a
//!   byte-driven state machine over the buffered input and reports a
//!   [`ParseStatus`]
//! - Response side: [`HeadEncoder`] writes the status line and headers of a
//!   [`Response`](crate::protocol::Response) into a `BytesMut`
//!
//! Bodies never pass through the codec. Request bodies are framed by
//! `Content-Length` alone and copied out of the read buffer by the
//! connection; response bodies are scheduled on the I/O stream directly.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use gale_http::codec::{HeadEncoder, ParseStatus};
//! use gale_http::protocol::{Request, Response};
//! use tokio_util::codec::Encoder;
//!
//! let mut request = Request::with_capacity(1024, 16);
//! let status = request.parse(b"GET /hello HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
//! assert_eq!(status, ParseStatus::Complete(40));
//!
//! let mut response = Response::with_capacity(1024, 16);
//! response.set_header("Content-Type", "text/plain").unwrap();
//! let mut head = BytesMut::new();
//! HeadEncoder.encode(&response, &mut head).unwrap();
//! assert!(head.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

mod head_encoder;
mod request_parser;

pub use head_encoder::HeadEncoder;
pub use request_parser::ParseStatus;
pub(crate) use request_parser::parse_request;
