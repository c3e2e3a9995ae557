use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: SendError,
    },

    #[error("reset error: {source}")]
    ResetError {
        #[from]
        source: ResetError,
    },
}

/// A bounded table or buffer ran out of room.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityError {
    #[error("arena exhausted, requested {requested} bytes but only {remaining} remain")]
    ArenaExhausted { requested: usize, remaining: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },
}

impl CapacityError {
    pub fn arena_exhausted(requested: usize, remaining: usize) -> Self {
        Self::ArenaExhausted { requested, remaining }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }
}

/// Every variant maps to a `400 Bad Request` outcome.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid protocol name, expect HTTP")]
    InvalidProtocol,

    #[error("unknown http version")]
    UnknownVersion,

    #[error("invalid line ending, expect CRLF")]
    InvalidLineEnding,

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("request token is not valid utf-8")]
    InvalidEncoding,

    #[error("body size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeBody { current_size: u64, max_size: u64 },

    #[error("capacity exceeded: {source}")]
    Capacity {
        #[from]
        source: CapacityError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_body(current_size: u64, max_size: u64) -> Self {
        Self::TooLargeBody { current_size, max_size }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    /// Whether the failure came from a bounded buffer rather than from malformed input.
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity { .. })
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("response headers already sent")]
    HeadersAlreadySent,

    #[error("response headers not sent yet")]
    HeadersNotSent,

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid status line: {code} {message:?}")]
    InvalidStatus { code: u16, message: String },

    #[error("capacity exceeded: {source}")]
    Capacity {
        #[from]
        source: CapacityError,
    },

    #[error("can't schedule write: {source}")]
    Schedule { source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn schedule<E: Into<io::Error>>(e: E) -> Self {
        Self::Schedule { source: e.into() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("state stack is full, capacity {capacity}")]
    Overflow { capacity: usize },

    #[error("state stack is empty")]
    Empty,
}

/// Post-response reset found the connection in a state it can't be reused from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResetError {
    #[error("{pending} write operations still in flight")]
    WritesInFlight { pending: usize },
}
