//! Session key derivation.
//!
//! ```text
//! digest = SHA-256(shared_secret)
//! key_a  = digest[0..16]
//! key_b  = digest[16..32]
//! iv     = key_a[0..16]
//!
//! server: outbound = CTR(key_a, iv), inbound = CTR(key_b, iv)
//! client: outbound = CTR(key_b, iv), inbound = CTR(key_a, iv)
//! ```
//!
//! Both peers compute the same two ciphers; the role swap alone makes each
//! side's outbound stream the other side's inbound stream, with no further
//! negotiation.
//!
//! # Known weakness
//!
//! The IV is taken from the same bytes as `key_a` instead of being agreed
//! separately. Both directions also share that IV. This is reproduced exactly
//! because peers derive keys independently and must match bit for bit.

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::core::{CryptoError, AES_BLOCK_SIZE, AES_KEY_SIZE, HASH_SIZE};

use super::keys::SharedSecret;
use super::keystream::{Direction, Keystream};

/// Local role on the connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Accepted the connection.
    Server,
    /// Dialed the connection.
    Client,
}

/// Keystreams for one session, already assigned to directions.
#[derive(Debug)]
pub struct SessionKeys {
    /// Encrypts what we send.
    pub outbound: Keystream,
    /// Decrypts what we receive.
    pub inbound: Keystream,
    /// IV shared by both keystreams.
    pub iv: [u8; AES_BLOCK_SIZE],
}

/// Derive both directional keystreams from a shared secret hash.
///
/// Pure in its inputs: the same `digest` and `role` always produce the same
/// keystreams.
pub fn derive_from_digest(
    digest: &[u8; HASH_SIZE],
    role: Role,
) -> Result<SessionKeys, CryptoError> {
    let (first, second) = digest.split_at(AES_KEY_SIZE);

    let mut iv = [0u8; AES_BLOCK_SIZE];
    iv.copy_from_slice(&first[..AES_BLOCK_SIZE]);

    let (outbound_key, inbound_key) = match role {
        Role::Server => (first, second),
        Role::Client => (second, first),
    };

    Ok(SessionKeys {
        outbound: Keystream::new(outbound_key, &iv, Direction::Outbound)?,
        inbound: Keystream::new(inbound_key, &iv, Direction::Inbound)?,
        iv,
    })
}

/// Hash the shared secret and derive the session keystreams for `role`.
pub fn derive(secret: &SharedSecret, role: Role) -> Result<SessionKeys, CryptoError> {
    let mut digest: [u8; HASH_SIZE] = Sha256::digest(secret.as_bytes()).into();
    let keys = derive_from_digest(&digest, role);
    digest.zeroize();
    keys
}
