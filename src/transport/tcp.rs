//! TCP listener and connections.
//!
//! # Example
//!
//! ```no_run
//! use hoist::transport::Listener;
//!
//! # async fn run() -> std::io::Result<()> {
//! let listener = Listener::bind("127.0.0.1:0").await?;
//! println!("listening on {}", listener.local_addr()?);
//! let connection = listener.accept().await?;
//! let (reader, writer) = connection.into_split();
//! # Ok(())
//! # }
//! ```

use std::io;
use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

/// TCP listener.
pub struct Listener {
    listener: TcpListener,
}

/// Accepted TCP connection.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Listener {
    /// Bind to `addr` (`host:port`; port `0` picks a free one).
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Accept a single connection.
    pub async fn accept(&self) -> io::Result<Connection> {
        let (stream, peer) = self.listener.accept().await?;
        // Responses are written whole; don't hold them back
        stream.set_nodelay(true)?;
        Ok(Connection { stream, peer })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Connection {
    /// Remote address.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Split into owned read and write halves.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.stream.into_split()
    }
}
