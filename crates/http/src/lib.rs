//! A single-threaded, keep-alive HTTP/1.x protocol engine
//!
//! This crate turns raw inbound bytes into a structured request, lets a handler
//! pipeline fill in a structured response, and serializes that response back
//! to the wire. Each connection owns one request, one response and one handler
//! context, and resets them in place between keep-alive requests instead of
//! rebuilding them.
//!
//! # Features
//!
//! - Byte-driven request head parser with explicit capacity checks
//! - Fixed-size buffer arenas for every token, reset in bulk
//! - Case-insensitive header store with well-known header side effects
//! - Default `Content-Length`, `Connection`, `Server` and `Date` headers
//! - Multi-step handlers that resume after each flushed write
//! - Pipelined requests, `Content-Length` bodies and `Expect: 100-continue`
//!
//! # Example
//!
//! ```no_run
//! use gale_http::connection::{Connection, QueuedStream};
//! use gale_http::handler::{Continuation, Flow};
//! use gale_http::server::Server;
//! use tracing::Level;
//!
//! const BODY: &str = "Hello World!\r\n";
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder()
//!         .bind("127.0.0.1:8080")?
//!         .handler(hello_world)
//!         .with_tracing(Level::INFO)
//!         .build()?;
//!     server.start().await?;
//!     Ok(())
//! }
//!
//! fn hello_world(conn: &mut Connection<QueuedStream>) -> Flow {
//!     let response = conn.response_mut();
//!     response.set_content_length(BODY.len() as u64);
//!     if response.set_header("Content-Type", "text/plain").is_err() {
//!         return Flow::Done;
//!     }
//!     match conn.send_headers(Some(Continuation::new("body", write_body))) {
//!         Ok(()) => Flow::Pending,
//!         Err(_) => Flow::Done,
//!     }
//! }
//!
//! fn write_body(conn: &mut Connection<QueuedStream>) -> Flow {
//!     let _ = conn.write(BODY, None);
//!     Flow::Done
//! }
//! ```
//!
//! # Architecture
//!
//! - [`arena`]: the bump-allocated token buffer behind requests and responses
//! - [`protocol`]: request, response, status, header store and error types
//! - [`codec`]: the request head parser and the response head encoder
//! - [`handler`]: the handler pipeline contract and execution context
//! - [`connection`]: the keep-alive lifecycle and its tokio driver
//! - [`server`]: listener setup, one task per connection
//! - [`config`] and [`date`]: the collaborators shared by all connections
//!
//! # Limitations
//!
//! - HTTP/0.9 to 1.1 only, no HTTP/2
//! - No TLS support (use a reverse proxy for HTTPS)
//! - No chunked transfer encoding; a response without a length closes the
//!   connection

pub mod arena;
pub mod codec;
pub mod config;
pub mod connection;
pub mod date;
pub mod handler;
pub mod protocol;
pub mod server;

mod utils;
pub(crate) use utils::ensure;
