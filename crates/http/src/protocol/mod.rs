//! Core HTTP message types.
//!
//! - [`Request`]: the parsed request head plus its buffered body
//! - [`Response`]: the response a handler builds, serialized by
//!   [`HeadEncoder`](crate::codec::HeadEncoder)
//! - [`Status`]: `(code, message)` pairs with a built-in catalog
//! - [`ConnectionMode`]: keep-alive or close
//! - [`header`]: the bounded header store and the well-known header registry
//! - error types: [`HttpError`] at the top, [`ParseError`], [`SendError`],
//!   [`CapacityError`], [`ContextError`] and [`ResetError`] below it
//!
//! Requests and responses each own a [`BufferArena`](crate::arena::BufferArena)
//! sized from the [`ServerConfig`](crate::config::ServerConfig). They are
//! created once per connection and reset between messages, so a keep-alive
//! connection does no per-request allocation on the happy path.

pub mod header;

mod error;
pub(crate) mod message;
mod request;
mod response;
mod status;

pub use error::CapacityError;
pub use error::ContextError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::ResetError;
pub use error::SendError;
pub use message::ConnectionMode;
pub use request::Request;
pub use response::Response;
pub use response::status_page;
pub use status::Status;
