//! Serving configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use hoist::ServeConfig;
//!
//! let config = ServeConfig::new(8080)
//!     .read_timeout(Duration::from_secs(5))
//!     .max_connections(16);
//!
//! assert_eq!(config.addr(), "127.0.0.1:8080");
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::error::Kind;
use crate::wire::DecodeLimits;

/// Environment variable holding the port to listen on.
pub const PORT_ENV: &str = "PORT";

/// Default host to bind.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default time allowed to read one full message once it has started.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time allowed to write one response.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time a connection may sit idle between messages.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default maximum concurrent connections.
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;

/// Failure to build a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable 'PORT' is not set")]
    PortMissing,

    #[error("'{value}' is not a valid port")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

impl Kind for ConfigError {
    fn kind(&self) -> &'static str {
        "init"
    }
}

/// How a [`Server`](crate::Server) listens and paces connections.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    /// Port to bind; `0` picks a free one.
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    /// Connections beyond this are closed right after accept.
    pub max_connections: usize,
    pub limits: DecodeLimits,
}

impl ServeConfig {
    /// Configuration for `port` with all other settings at their defaults.
    pub fn new(port: u16) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            limits: DecodeLimits::default(),
        }
    }

    /// Configuration with the port taken from the `PORT` environment variable.
    ///
    /// # Errors
    ///
    /// [`ConfigError::PortMissing`] if unset, [`ConfigError::InvalidPort`] if
    /// it is not a port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let value = std::env::var(PORT_ENV).map_err(|_| ConfigError::PortMissing)?;
        Self::from_port_str(&value)
    }

    fn from_port_str(value: &str) -> Result<Self, ConfigError> {
        let port = value
            .trim()
            .parse::<u16>()
            .map_err(|source| ConfigError::InvalidPort {
                value: value.to_string(),
                source,
            })?;
        Ok(Self::new(port))
    }

    /// Set the host to bind.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the read timeout.
    ///
    /// Default: 30 seconds
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout.
    ///
    /// Default: 30 seconds
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the idle timeout.
    ///
    /// Default: 60 seconds
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the maximum number of concurrent connections.
    ///
    /// Default: 256
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.max_connections = limit;
        self
    }

    /// Set the decoder limits.
    pub fn limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// `host:port` string to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
