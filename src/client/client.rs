//! Dialing a server.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::channel::{ChannelConfig, SecureChannel};
use crate::core::{HandshakeError, DEFAULT_PORT};
use crate::crypto::Role;

/// Errors from [`connect`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The TCP connection could not be established.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// Address dialed.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The TCP connection was not established within `connect_timeout`.
    #[error("connecting to {0} timed out")]
    Timeout(SocketAddr),

    /// The key exchange failed; the channel has been closed.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address to connect to.
    pub server_addr: SocketAddr,

    /// Limit on establishing the TCP connection.
    pub connect_timeout: Duration,

    /// Settings for the resulting channel.
    pub channel: ChannelConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            connect_timeout: Duration::from_secs(10),
            channel: ChannelConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    /// Set the server address.
    pub fn server_addr(mut self, addr: SocketAddr) -> Self {
        self.config.server_addr = addr;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the channel settings.
    pub fn channel(mut self, channel: ChannelConfig) -> Self {
        self.config.channel = channel;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Dial the server and run the key exchange as the client.
///
/// The returned channel is already encrypted. On handshake failure the
/// channel is closed before the error is returned.
pub async fn connect(config: &ClientConfig) -> Result<SecureChannel, ClientError> {
    let addr = config.server_addr;
    debug!(%addr, "connecting");

    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ClientError::Timeout(addr))?
        .map_err(|source| ClientError::Connect { addr, source })?;

    let channel = SecureChannel::from_tcp(stream, Role::Client, config.channel.clone())
        .map_err(|source| ClientError::Connect { addr, source })?;
    channel.handshake().await?;

    info!(%addr, "secure channel established");
    Ok(channel)
}
