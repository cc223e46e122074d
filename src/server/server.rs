//! Accepting client connections.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::channel::{ChannelConfig, SecureChannel};
use crate::core::DEFAULT_PORT;
use crate::crypto::Role;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address requested.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// I/O error while accepting.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,

    /// Settings for every accepted channel.
    pub channel: ChannelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            channel: ChannelConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Create a new server builder.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Set the bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    /// Set the channel settings.
    pub fn channel(mut self, channel: ChannelConfig) -> Self {
        self.config.channel = channel;
        self
    }

    /// Build the server configuration.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A TCP listener handing out server-role channels.
///
/// Accepted channels are still unencrypted: the connection handler is
/// expected to call [`SecureChannel::handshake`] itself, typically on its
/// own task so a slow client cannot stall the accept loop.
#[derive(Debug)]
pub struct SecureListener {
    listener: TcpListener,
    channel: ChannelConfig,
}

impl SecureListener {
    /// Bind the listening socket.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        info!(addr = %listener.local_addr()?, "listening");

        Ok(Self {
            listener,
            channel: config.channel.clone(),
        })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> Result<(SecureChannel, SocketAddr), ServerError> {
        let (stream, peer) = self.listener.accept().await?;
        debug!(%peer, "accepted connection");
        let channel = SecureChannel::from_tcp(stream, Role::Server, self.channel.clone())?;
        Ok((channel, peer))
    }
}

#[cfg(all(test, feature = "client"))]
mod tests {
    use super::*;
    use crate::client::{connect, ClientConfig};
    use crate::transport::ChannelPhase;

    async fn loopback_listener() -> SecureListener {
        let config = ServerConfig::builder()
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .build();
        SecureListener::bind(&config).await.unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert!(config.bind_addr.ip().is_unspecified());
    }

    #[tokio::test]
    async fn test_bind_in_use() {
        let listener = loopback_listener().await;
        let taken = listener.local_addr().unwrap();

        let config = ServerConfig::builder().bind_addr(taken).build();
        assert!(matches!(
            SecureListener::bind(&config).await,
            Err(ServerError::Bind { .. })
        ));
    }

    #[tokio::test]
    async fn test_accept_and_echo() {
        let listener = loopback_listener().await;
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (channel, peer) = listener.accept().await.unwrap();
            assert_eq!(channel.role(), Role::Server);
            assert_eq!(channel.peer_addr(), Some(peer));
            channel.handshake().await.unwrap();
            while let Some(msg) = channel.receive().await {
                channel.send(msg).unwrap();
            }
        });

        let config = ClientConfig::builder().server_addr(addr).build();
        let client = connect(&config).await.unwrap();
        assert_eq!(client.phase(), ChannelPhase::Encrypted);

        for msg in [&b"ping"[..], b"", b"a longer message with some bytes in it"] {
            client.send(msg).unwrap();
            assert_eq!(client.receive().await.unwrap(), msg);
        }

        client.close().await;
        server.await.unwrap();
    }
}
