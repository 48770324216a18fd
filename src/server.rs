//! TCP server: accept loop and per-connection message loop.
//!
//! The [`Server`] manages the lifecycle:
//! 1. Refuse to start if the service has registration errors
//! 2. Bind the listener
//! 3. Accept connections, up to `max_connections` at a time
//! 4. Per connection, read messages one after another and answer each
//!
//! Handlers run on tokio's blocking pool, so a slow handler never stalls
//! other connections.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hoist::handler::HandlerError;
//! use hoist::{ServeConfig, Server, Service};
//!
//! #[derive(Default)]
//! struct Ctx;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = Service::new("echo");
//!     service.register_as("echo", |_: Ctx, msg: String| -> Result<String, HandlerError> {
//!         Ok(msg)
//!     });
//!
//!     let server = Server::start(Arc::new(service), ServeConfig::from_env()?).await?;
//!     println!("listening on {}", server.local_addr());
//!     server.wait().await?;
//!     Ok(())
//! }
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::{ConfigError, ServeConfig};
use crate::error::{Kind, RegistrationError};
use crate::responder::respond;
use crate::service::Service;
use crate::transport::{Connection, Listener};
use crate::wire::AsyncDecoder;

/// Pause after a failed accept. Errors such as EMFILE persist until some
/// connection closes.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Failure to start or run a server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The service has failed registrations; nothing was bound.
    #[error("{}", registration_summary(.service, .errors))]
    Registration {
        service: String,
        errors: Vec<RegistrationError>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unable to listen on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Kind for ServeError {
    fn kind(&self) -> &'static str {
        "init"
    }
}

fn registration_summary(service: &str, errors: &[RegistrationError]) -> String {
    let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!(
        "service '{}' failed to initialize with {} registration error(s): {}",
        service,
        errors.len(),
        reasons.join("; ")
    )
}

/// A running server.
///
/// Dropping it stops accepting new connections.
pub struct Server {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Server {
    /// Validate the service, bind, and start accepting connections.
    ///
    /// # Errors
    ///
    /// [`ServeError::Registration`] listing every failed registration, or
    /// [`ServeError::Bind`] if the address cannot be bound.
    pub async fn start(service: Arc<Service>, config: ServeConfig) -> Result<Self, ServeError> {
        let errors = service.errors();
        if !errors.is_empty() {
            return Err(ServeError::Registration {
                service: service.name().to_string(),
                errors,
            });
        }

        let addr = config.addr();
        let listener = Listener::bind(&addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Service '{}' listening on {}", service.name(), local_addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(Self::accept_loop(
            listener,
            service,
            Arc::new(config),
            shutdown_rx,
        ));

        Ok(Server {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting new connections.
    ///
    /// Connections already open are served until their peers close them or
    /// they go idle.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait until the accept loop has stopped.
    pub async fn wait(self) -> Result<(), ServeError> {
        let Server {
            shutdown_tx, task, ..
        } = self;

        let result = task.await;
        drop(shutdown_tx);
        result.map_err(|e| ServeError::Io(io::Error::other(e)))
    }

    async fn accept_loop(
        listener: Listener,
        service: Arc<Service>,
        config: Arc<ServeConfig>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) {
        let semaphore = Arc::new(Semaphore::new(config.max_connections));

        loop {
            let connection = tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::info!("Service '{}' stopped accepting connections", service.name());
                    return;
                }
                accepted = listener.accept() => match accepted {
                    Ok(connection) => connection,
                    Err(e) => {
                        back_off_after_accept_error(&e).await;
                        continue;
                    }
                },
            };

            let peer = connection.peer();
            let permit = match semaphore.clone().try_acquire_owned() {
                Ok(p) => p,
                Err(_) => {
                    tracing::warn!("Connection limit reached, dropping connection from {}", peer);
                    continue;
                }
            };

            tracing::debug!("Accepted connection from {}", peer);

            let service = service.clone();
            let config = config.clone();
            tokio::spawn(async move {
                // Permit is held until the connection closes
                let _permit = permit;

                if let Err(e) = Self::serve_connection(connection, service, config).await {
                    tracing::error!("Connection error for {}: {}", peer, e);
                }
                tracing::debug!("Closed connection from {}", peer);
            });
        }
    }

    async fn serve_connection(
        connection: Connection,
        service: Arc<Service>,
        config: Arc<ServeConfig>,
    ) -> io::Result<()> {
        let peer = connection.peer();
        let (reader, mut writer) = connection.into_split();
        let mut decoder = AsyncDecoder::with_limits(reader, config.limits);

        loop {
            match timeout(config.idle_timeout, decoder.is_exhausted()).await {
                Ok(Ok(false)) => {}
                Ok(Ok(true)) => return Ok(()),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    tracing::debug!("Connection from {} idle, closing", peer);
                    return Ok(());
                }
            }

            let decoded = match timeout(config.read_timeout, decoder.decode()).await {
                Ok(decoded) => decoded,
                Err(_) => {
                    tracing::warn!("Timed out reading request from {}", peer);
                    return Ok(());
                }
            };

            // Framing is lost after a decode error; answer, then hang up
            let keep_open = decoded.is_ok();

            let service = service.clone();
            let response = tokio::task::spawn_blocking(move || respond(&service, decoded))
                .await
                .map_err(io::Error::other)?;

            write_response(&mut writer, &response, &config).await?;

            if !keep_open {
                return Ok(());
            }
        }
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &[u8],
    config: &ServeConfig,
) -> io::Result<()> {
    match timeout(config.write_timeout, writer.write_all(response)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            "timed out writing response",
        )),
    }
}

impl Service {
    /// Serve this service until the server stops.
    ///
    /// Convenience for [`Server::start`] followed by [`Server::wait`].
    ///
    /// # Errors
    ///
    /// See [`Server::start`].
    pub async fn serve(self, config: ServeConfig) -> Result<(), ServeError> {
        Server::start(Arc::new(self), config).await?.wait().await
    }
}

async fn back_off_after_accept_error(err: &io::Error) {
    tracing::warn!("Accept error: {}, retrying in {:?}", err, ACCEPT_BACKOFF);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}
