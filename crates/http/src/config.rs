//! Capacities and identity shared by every connection of a server.
//!
//! A [`ServerConfig`] is built once, wrapped in an `Arc` and handed to each
//! connection. It is also the ambient configuration a handler reads through
//! [`Context::conf`](crate::handler::Context::conf).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ensure;
use crate::protocol::header::MAX_HEADERS_LIMIT;

pub const DEFAULT_SERVER_NAME: &str = concat!("gale/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Header table capacity of each request and response.
    max_headers: usize,

    /// Arena size for request tokens.
    request_buffer_size: usize,

    /// Arena size for response header names and values.
    response_buffer_size: usize,

    /// Handler execution context depth.
    state_stack_depth: usize,

    /// Initial capacity of the connection read buffer.
    read_buffer_size: usize,

    /// Largest request body the connection buffers.
    max_body_size: u64,

    /// Value of the `Server` response header.
    server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_headers: 64,
            request_buffer_size: 4 * 1024,
            response_buffer_size: 2 * 1024,
            state_stack_depth: 16,
            read_buffer_size: 8 * 1024,
            max_body_size: 1024 * 1024,
            server_name: DEFAULT_SERVER_NAME.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroSize { field: &'static str },

    #[error("max_headers {max_headers} exceed the limit {limit}")]
    TooManyHeaders { max_headers: usize, limit: usize },

    #[error("server name must be a valid header value")]
    InvalidServerName,

    #[error("invalid config json: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder { config: ServerConfig::default() }
    }

    /// Reads a config from json, missing fields keep their defaults.
    ///
    /// ```
    /// # use gale_http::config::ServerConfig;
    /// let config = ServerConfig::from_json(r#"{ "max_headers": 32 }"#).unwrap();
    /// assert_eq!(config.max_headers(), 32);
    /// assert_eq!(config.request_buffer_size(), 4096);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[inline]
    pub fn max_headers(&self) -> usize {
        self.max_headers
    }

    #[inline]
    pub fn request_buffer_size(&self) -> usize {
        self.request_buffer_size
    }

    #[inline]
    pub fn response_buffer_size(&self) -> usize {
        self.response_buffer_size
    }

    #[inline]
    pub fn state_stack_depth(&self) -> usize {
        self.state_stack_depth
    }

    #[inline]
    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }

    #[inline]
    pub fn max_body_size(&self) -> u64 {
        self.max_body_size
    }

    #[inline]
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let sizes = [
            ("max_headers", self.max_headers),
            ("request_buffer_size", self.request_buffer_size),
            ("response_buffer_size", self.response_buffer_size),
            ("state_stack_depth", self.state_stack_depth),
            ("read_buffer_size", self.read_buffer_size),
        ];
        for (field, size) in sizes {
            ensure!(size > 0, ConfigError::ZeroSize { field });
        }
        ensure!(
            self.max_headers <= MAX_HEADERS_LIMIT,
            ConfigError::TooManyHeaders { max_headers: self.max_headers, limit: MAX_HEADERS_LIMIT }
        );

        let printable = self.server_name.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f));
        ensure!(printable, ConfigError::InvalidServerName);
        Ok(())
    }
}

pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn max_headers(mut self, max_headers: usize) -> Self {
        self.config.max_headers = max_headers;
        self
    }

    pub fn request_buffer_size(mut self, size: usize) -> Self {
        self.config.request_buffer_size = size;
        self
    }

    pub fn response_buffer_size(mut self, size: usize) -> Self {
        self.config.response_buffer_size = size;
        self
    }

    pub fn state_stack_depth(mut self, depth: usize) -> Self {
        self.config.state_stack_depth = depth;
        self
    }

    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    pub fn max_body_size(mut self, size: u64) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.config.server_name = name.into();
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
