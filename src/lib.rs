//! # pcloud-channel
//!
//! An encrypted, length-prefixed message channel over plain TCP.
//!
//! Each connection runs an anonymous P-256 Diffie-Hellman exchange, hashes
//! the shared secret with SHA-256 and splits the digest into two AES-128-CTR
//! keystreams, one per direction. Messages travel as
//! `length (u32 LE) || payload` frames, encrypted once the handshake is done.
//!
//! The exchange is unauthenticated: it defeats passive eavesdropping only.
//!
//! ## Feature Flags
//!
//! - `crypto` (default): key exchange, key derivation, keystreams
//! - `transport` (default): framing, read/write loops, [`channel::SecureChannel`]
//! - `identity` (default): Ed25519 identity key file
//! - `client` / `server` (default): TCP dial and accept helpers
//!
//! ## Modules
//!
//! - [`core`]: Constants, error types and the message pipe trait (always included)
//! - [`crypto`]: Security layer (requires `crypto` feature)
//! - [`transport`]: Framing and I/O loops (requires `transport` feature)
//! - [`channel`]: The secure channel (requires `transport` feature)
//! - [`identity`]: Identity key storage (requires `identity` feature)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pcloud_channel::prelude::*;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::builder()
//!     .server_addr("127.0.0.1:1337".parse()?)
//!     .build();
//! let channel = connect(&config).await?;
//!
//! channel.send("ping")?;
//! if let Some(reply) = channel.receive().await {
//!     println!("{}", String::from_utf8_lossy(&reply));
//! }
//! channel.close().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Secure channel (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod channel;

// Identity key file (feature-gated)
#[cfg(feature = "identity")]
#[cfg_attr(docsrs, doc(cfg(feature = "identity")))]
pub mod identity;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

// Server API (feature-gated)
#[cfg(feature = "server")]
#[cfg_attr(docsrs, doc(cfg(feature = "server")))]
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    #[cfg(feature = "crypto")]
    pub use crate::crypto::Role;

    #[cfg(feature = "transport")]
    pub use crate::channel::{ChannelConfig, SecureChannel};
    #[cfg(feature = "transport")]
    pub use crate::transport::ChannelPhase;

    #[cfg(feature = "identity")]
    pub use crate::identity::{IdentityError, IdentityKeypair};

    #[cfg(feature = "client")]
    pub use crate::client::{connect, ClientConfig, ClientError};

    #[cfg(feature = "server")]
    pub use crate::server::{SecureListener, ServerConfig, ServerError};
}

// Re-export commonly used items at crate root
pub use core::{ChannelError, FramingError, HandshakeError};

#[cfg(feature = "transport")]
pub use channel::{ChannelConfig, SecureChannel};

#[cfg(feature = "crypto")]
pub use crypto::Role;
