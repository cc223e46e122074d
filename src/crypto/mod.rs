//! Security layer
//!
//! Implements the cryptographic pieces of the channel:
//! - Ephemeral P-256 key pairs and coordinate encoding
//! - Anonymous ECDH over the channel's own message queues
//! - SHA-256 based derivation of two directional keystreams
//! - AES-128-CTR keystreams
//!
//! The suite is fixed; there is no algorithm negotiation.

mod exchange;
mod kdf;
mod keys;
mod keystream;

pub use exchange::*;
pub use kdf::*;
pub use keys::*;
pub use keystream::*;
