//! Secure channel
//!
//! [`SecureChannel`] wires the key exchange, key derivation and the framing
//! loops together over a single connection.

#[allow(clippy::module_inception)]
mod channel;
mod config;

pub use channel::*;
pub use config::*;
