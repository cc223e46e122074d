//! Echo server: every message received on a channel is sent straight back.

use std::net::SocketAddr;
use std::path::PathBuf;

use pcloud_channel::core::{DEFAULT_KEY_PATH, DEFAULT_PORT};
use pcloud_channel::identity::IdentityKeypair;
use pcloud_channel::server::{SecureListener, ServerConfig};
use pcloud_channel::SecureChannel;
use tracing::{debug, info, warn};

use crate::EchoError;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct EchoServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Identity key file, created on first start.
    pub key_path: PathBuf,
}

impl Default for EchoServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
        }
    }
}

/// A bound echo server.
pub struct EchoServer {
    listener: SecureListener,
}

impl EchoServer {
    /// Load the identity key and bind the listener.
    pub async fn bind(config: EchoServerConfig) -> Result<Self, EchoError> {
        let identity = IdentityKeypair::load_or_generate(&config.key_path)?;
        info!(
            public_key = %identity.public_key_hex(),
            fingerprint = %identity.fingerprint(),
            "server identity"
        );

        let server_config = ServerConfig::builder().bind_addr(config.bind_addr).build();
        let listener = SecureListener::bind(&server_config).await?;
        Ok(Self { listener })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, EchoError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one task per connection.
    pub async fn run(self) -> Result<(), EchoError> {
        info!(addr = %self.local_addr()?, "echo server running");
        loop {
            let (channel, peer) = self.listener.accept().await?;
            tokio::spawn(handle_connection(channel, peer));
        }
    }
}

async fn handle_connection(channel: SecureChannel, peer: SocketAddr) {
    if let Err(e) = channel.handshake().await {
        warn!(%peer, error = %e, "handshake failed");
        return;
    }
    info!(%peer, "client connected");

    let mut echoed = 0u64;
    while let Some(msg) = channel.receive().await {
        debug!(%peer, len = msg.len(), "echoing");
        if channel.send(msg).is_err() {
            break;
        }
        echoed += 1;
    }

    match channel.take_error() {
        Some(e) => info!(%peer, echoed, reason = %e, "client disconnected"),
        None => info!(%peer, echoed, "client disconnected"),
    }
    channel.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcloud_channel::client::{connect, ClientConfig};

    fn temp_key_path() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("pcloud-echo-{}-{nanos}.key", std::process::id()))
    }

    #[test]
    fn test_server_config_default() {
        let config = EchoServerConfig::default();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.key_path, PathBuf::from("key"));
    }

    #[tokio::test]
    async fn test_echo_roundtrip() {
        let key_path = temp_key_path();
        let server = EchoServer::bind(EchoServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            key_path: key_path.clone(),
        })
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        assert!(key_path.exists());
        tokio::spawn(server.run());

        let client = connect(&ClientConfig::builder().server_addr(addr).build())
            .await
            .unwrap();
        for msg in ["hello", "", "world"] {
            client.send(msg).unwrap();
            assert_eq!(client.receive().await.unwrap(), msg.as_bytes());
        }
        client.close().await;

        std::fs::remove_file(&key_path).unwrap();
    }
}
