//! TCP front end: accepts sockets and runs one [`HttpConnection`] per client.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::ServerConfig;
use crate::connection::{HttpConnection, QueuedStream};
use crate::date::DateSource;
use crate::handler::{HandlerFn, Pipeline};
use crate::protocol::header::HeaderRegistry;

pub struct ServerBuilder {
    address: Option<Vec<SocketAddr>>,
    config: ServerConfig,
    entry: Option<HandlerFn<QueuedStream>>,
    date: Option<Arc<dyn DateSource>>,
    tracing: Option<Level>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { address: None, config: ServerConfig::default(), entry: None, date: None, tracing: None }
    }

    /// # Errors
    ///
    /// Returns [`ServerBuildError::InvalidAddress`] when `address` does not
    /// resolve.
    pub fn bind<A: ToSocketAddrs>(mut self, address: A) -> Result<Self, ServerBuildError> {
        let resolved = address.to_socket_addrs().map_err(|source| ServerBuildError::InvalidAddress { source })?;
        self.address = Some(resolved.collect());
        Ok(self)
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// The first stage of the handler pipeline, run for every request.
    pub fn handler(mut self, entry: HandlerFn<QueuedStream>) -> Self {
        self.entry = Some(entry);
        self
    }

    pub fn date_source(mut self, date: Arc<dyn DateSource>) -> Self {
        self.date = Some(date);
        self
    }

    /// Installs a `tracing` fmt subscriber at `level` when the server starts.
    pub fn with_tracing(mut self, level: Level) -> Self {
        self.tracing = Some(level);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let address = self.address.filter(|address| !address.is_empty()).ok_or(ServerBuildError::MissingAddress)?;
        let entry = self.entry.ok_or(ServerBuildError::MissingHandler)?;

        let mut pipeline = Pipeline::new(entry);
        if let Some(date) = self.date {
            pipeline = pipeline.with_date_source(date);
        }

        Ok(Server { address, config: Arc::new(self.config), pipeline: Arc::new(pipeline), tracing: self.tracing })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("address must be set")]
    MissingAddress,

    #[error("handler must be set")]
    MissingHandler,

    #[error("invalid address: {source}")]
    InvalidAddress { source: io::Error },
}

pub struct Server {
    address: Vec<SocketAddr>,
    config: Arc<ServerConfig>,
    pipeline: Arc<Pipeline<QueuedStream>>,
    tracing: Option<Level>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the listener and serves connections until the task is dropped.
    ///
    /// # Errors
    ///
    /// Only binding can fail; accept and per-connection errors are logged.
    pub async fn start(self) -> io::Result<()> {
        if let Some(level) = self.tracing {
            let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
            if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
                warn!(cause = %e, "a global tracing subscriber is already installed");
            }
        }

        HeaderRegistry::init();

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return Err(e);
            }
        };

        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let pipeline = Arc::clone(&self.pipeline);
            let config = Arc::clone(&self.config);

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer, pipeline, config);
                match connection.process().await {
                    Ok(_) => {
                        info!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(%remote_addr, "service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::handler::Flow;
    use crate::protocol::Status;

    fn teapot(conn: &mut Connection<QueuedStream>) -> Flow {
        conn.send_status(Status::custom(418, "I'm a teapot"))
    }

    #[test]
    fn build_requires_address_and_handler() {
        let err = Server::builder().handler(teapot).build().err().unwrap();
        assert!(matches!(err, ServerBuildError::MissingAddress));

        let err = Server::builder().bind("127.0.0.1:0").unwrap().build().err().unwrap();
        assert!(matches!(err, ServerBuildError::MissingHandler));

        let server = Server::builder().bind("127.0.0.1:0").unwrap().handler(teapot).build().unwrap();
        assert_eq!(server.config.max_headers(), 64);
    }

    #[test]
    fn unresolvable_address() {
        let err = Server::builder().bind("not an address").err().unwrap();
        assert!(matches!(err, ServerBuildError::InvalidAddress { .. }));
    }
}
