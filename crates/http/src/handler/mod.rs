//! The handler pipeline contract.
//!
//! A handler is a plain function over the [`Connection`]: it reads the request,
//! fills in the response and schedules writes. It never blocks and never
//! awaits; when it needs to continue after a write has been flushed it
//! registers a [`Continuation`] with the write and returns [`Flow::Pending`].
//! State that has to survive the suspension goes on the connection's
//! [`Context`] stack.
//!
//! ```
//! use bytes::Bytes;
//! use gale_http::connection::{Connection, IoStream};
//! use gale_http::handler::{Continuation, Flow};
//!
//! fn hello<S: IoStream>(conn: &mut Connection<S>) -> Flow {
//!     conn.response_mut().set_content_length(5);
//!     match conn.send_headers(Some(Continuation::new("hello body", body))) {
//!         Ok(()) => Flow::Pending,
//!         Err(_) => Flow::Done,
//!     }
//! }
//!
//! fn body<S: IoStream>(conn: &mut Connection<S>) -> Flow {
//!     let _ = conn.write(Bytes::from_static(b"hello"), None);
//!     Flow::Done
//! }
//! ```

mod context;

use std::fmt;
use std::sync::Arc;

pub use context::Context;
pub use context::CtxState;

use crate::connection::Connection;
use crate::date::{DateSource, SystemDate};

/// What a handler tells the connection when it returns.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    /// The response is complete once the scheduled writes are flushed.
    Done,
    /// More work follows in a registered continuation.
    Pending,
}

pub type HandlerFn<S> = fn(&mut Connection<S>) -> Flow;

/// The next pipeline stage, run once the write it was registered with has
/// been flushed.
pub struct Continuation<S> {
    name: &'static str,
    resume: HandlerFn<S>,
}

impl<S> Continuation<S> {
    pub const fn new(name: &'static str, resume: HandlerFn<S>) -> Self {
        Self { name, resume }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub(crate) fn resume(&self) -> HandlerFn<S> {
        self.resume
    }
}

// derives would require `S: Clone`
impl<S> Clone for Continuation<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Continuation<S> {}

impl<S> fmt::Debug for Continuation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation").field("name", &self.name).finish()
    }
}

/// Entry point of the handler pipeline plus the collaborators it runs with.
pub struct Pipeline<S> {
    entry: HandlerFn<S>,
    date: Arc<dyn DateSource>,
}

impl<S> Pipeline<S> {
    pub fn new(entry: HandlerFn<S>) -> Self {
        Self { entry, date: Arc::new(SystemDate) }
    }

    pub fn with_date_source(mut self, date: Arc<dyn DateSource>) -> Self {
        self.date = date;
        self
    }

    #[inline]
    pub(crate) fn entry(&self) -> HandlerFn<S> {
        self.entry
    }

    #[inline]
    pub(crate) fn date(&self) -> &dyn DateSource {
        self.date.as_ref()
    }
}

impl<S> fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("date", &self.date).finish_non_exhaustive()
    }
}
