//! AES-128-CTR directional keystreams.
//!
//! The counter is the whole 128-bit IV block, incremented big-endian, so the
//! stream matches the common `NewCTR`-style construction byte for byte.

use std::fmt;

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};

use crate::core::{CryptoError, AES_BLOCK_SIZE, AES_KEY_SIZE};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Traffic direction a keystream is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Local → remote (encrypts what we send).
    Outbound,
    /// Remote → local (decrypts what we receive).
    Inbound,
}

/// A stateful keystream for one direction of one session.
///
/// Every byte passed through [`Keystream::apply`] advances the stream; a
/// position is never reused, which is why each instance is owned by exactly
/// one I/O loop for the rest of the session.
pub struct Keystream {
    cipher: Aes128Ctr,
    direction: Direction,
    position: u64,
}

impl Keystream {
    /// Create a keystream from a 16-byte key and a 16-byte IV.
    pub fn new(key: &[u8], iv: &[u8], direction: Direction) -> Result<Self, CryptoError> {
        if key.len() != AES_KEY_SIZE || iv.len() != AES_BLOCK_SIZE {
            return Err(CryptoError::InvalidKeyLength);
        }
        let cipher =
            Aes128Ctr::new_from_slices(key, iv).map_err(|_| CryptoError::InvalidKeyLength)?;
        Ok(Self {
            cipher,
            direction,
            position: 0,
        })
    }

    /// XOR the next `buf.len()` keystream bytes into `buf` in place.
    ///
    /// Encryption and decryption are the same operation.
    pub fn apply(&mut self, buf: &mut [u8]) {
        self.cipher.apply_keystream(buf);
        self.position = self.position.wrapping_add(buf.len() as u64);
    }

    /// Direction this keystream is bound to.
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl fmt::Debug for Keystream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keystream")
            .field("cipher", &"[redacted]")
            .field("direction", &self.direction)
            .field("position", &self.position)
            .finish()
    }
}
