//! pcloud echo demo
//!
//! Runs either an echo server or an interactive client over a secure channel.
//!
//! Environment variables:
//! - PCLOUD_MODE: "server" (default) or "client"
//! - PCLOUD_BIND_ADDR: Bind address (server only, default 0.0.0.0:1337)
//! - PCLOUD_SERVER_ADDR: Server address (client only, default 127.0.0.1:1337)
//! - PCLOUD_KEY_PATH: Identity key file (server only, default ./key)
//! - PCLOUD_LOG_LEVEL: trace|debug|info|warn|error, or a full filter directive

mod client;
mod server;

use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;

use thiserror::Error;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::client::EchoClientConfig;
use crate::server::EchoServerConfig;

/// Errors that end the demo.
#[derive(Debug, Error)]
pub enum EchoError {
    /// Unknown `PCLOUD_MODE`.
    #[error("unknown mode {0:?}, expected \"server\" or \"client\"")]
    UnknownMode(String),

    /// An address variable did not parse.
    #[error("invalid address in {var}: {value:?}")]
    InvalidAddr {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// Identity key file problem.
    #[error(transparent)]
    Identity(#[from] pcloud_channel::identity::IdentityError),

    /// Server failure.
    #[error(transparent)]
    Server(#[from] pcloud_channel::server::ServerError),

    /// Client failure.
    #[error(transparent)]
    Client(#[from] pcloud_channel::client::ClientError),

    /// Local I/O failure (stdin/stdout).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_logging() {
    let filter = env::var("PCLOUD_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn addr_from_env(var: &'static str, default: SocketAddr) -> Result<SocketAddr, EchoError> {
    match env::var(var) {
        Ok(value) => value
            .parse()
            .map_err(|_| EchoError::InvalidAddr { var, value }),
        Err(_) => Ok(default),
    }
}

async fn run() -> Result<(), EchoError> {
    let mode = env::var("PCLOUD_MODE").unwrap_or_else(|_| "server".to_string());

    match mode.as_str() {
        "server" => {
            let defaults = EchoServerConfig::default();
            let config = EchoServerConfig {
                bind_addr: addr_from_env("PCLOUD_BIND_ADDR", defaults.bind_addr)?,
                key_path: env::var("PCLOUD_KEY_PATH")
                    .map(Into::into)
                    .unwrap_or(defaults.key_path),
            };
            server::EchoServer::bind(config).await?.run().await
        }
        "client" => {
            let defaults = EchoClientConfig::default();
            let config = EchoClientConfig {
                server_addr: addr_from_env("PCLOUD_SERVER_ADDR", defaults.server_addr)?,
            };
            client::run(config).await
        }
        other => Err(EchoError::UnknownMode(other.to_string())),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "echo demo failed");
            ExitCode::FAILURE
        }
    }
}
