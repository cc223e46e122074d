//! Interactive echo client: each stdin line is sent and the echo printed.

use std::net::SocketAddr;

use pcloud_channel::client::{connect, ClientConfig};
use pcloud_channel::core::DEFAULT_PORT;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::EchoError;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct EchoClientConfig {
    /// Server address.
    pub server_addr: SocketAddr,
}

impl Default for EchoClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
        }
    }
}

/// Connect, then echo stdin lines until EOF or the server goes away.
pub async fn run(config: EchoClientConfig) -> Result<(), EchoError> {
    let channel = connect(&ClientConfig::builder().server_addr(config.server_addr).build()).await?;
    info!(server = %config.server_addr, "connected, type messages to echo (Ctrl+D to exit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if channel.send(line.into_bytes()).is_err() {
            break;
        }
        let Some(echo) = channel.receive().await else {
            break;
        };
        stdout.write_all(&echo).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    if let Some(e) = channel.take_error() {
        warn!(error = %e, "channel ended");
    }
    channel.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = EchoClientConfig::default();
        assert_eq!(config.server_addr.to_string(), "127.0.0.1:1337");
    }
}
