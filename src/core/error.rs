//! Error types for the secure channel.

use std::io;

use thiserror::Error;

/// A frame that cannot be read as declared. The byte stream position is lost
/// afterwards, so these are always fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// The connection ended before the declared number of bytes arrived.
    #[error("truncated frame: expected {expected} bytes, received {received}")]
    Truncated {
        /// Bytes the prefix (or the prefix itself) called for.
        expected: usize,
        /// Bytes actually read before end of stream.
        received: usize,
    },

    /// The length prefix exceeds the configured maximum.
    #[error("frame too large: {len} > {max}")]
    TooLarge {
        /// Declared payload length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },
}

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key or IV had the wrong length for the cipher.
    #[error("invalid key or iv length")]
    InvalidKeyLength,

    /// The freshly generated public point could not be encoded.
    #[error("local key pair has no affine coordinates")]
    KeyGeneration,
}

/// Steady-state channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// I/O failure on the underlying connection.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// Short or oversized frame.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// The peer closed the connection.
    #[error("peer disconnected")]
    PeerDisconnected,

    /// The channel has been closed locally or after a fatal error.
    #[error("channel closed")]
    Closed,
}

impl Clone for ChannelError {
    fn clone(&self) -> Self {
        match self {
            // io::Error is not Clone; keep its kind and message.
            ChannelError::Transport(e) => {
                ChannelError::Transport(io::Error::new(e.kind(), e.to_string()))
            }
            ChannelError::Framing(e) => ChannelError::Framing(e.clone()),
            ChannelError::PeerDisconnected => ChannelError::PeerDisconnected,
            ChannelError::Closed => ChannelError::Closed,
        }
    }
}

/// Errors reported synchronously by `handshake()`.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The peer's public point is malformed or not on the curve.
    #[error("invalid peer key: {0}")]
    InvalidPeerKey(&'static str),

    /// The channel closed before the exchange finished.
    #[error("peer disconnected during handshake")]
    PeerDisconnected,

    /// The connection failed during the exchange.
    #[error("transport error during handshake: {0}")]
    Transport(#[source] ChannelError),

    /// The handshake is one-shot per connection.
    #[error("handshake already started on this channel")]
    AlreadyStarted,

    /// Keystream construction failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(#[from] CryptoError),
}

impl From<ChannelError> for HandshakeError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::PeerDisconnected | ChannelError::Closed => HandshakeError::PeerDisconnected,
            other => HandshakeError::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_maps_to_handshake_error() {
        assert!(matches!(
            HandshakeError::from(ChannelError::Closed),
            HandshakeError::PeerDisconnected
        ));
        assert!(matches!(
            HandshakeError::from(ChannelError::PeerDisconnected),
            HandshakeError::PeerDisconnected
        ));

        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        match HandshakeError::from(ChannelError::from(io_err)) {
            HandshakeError::Transport(ChannelError::Transport(e)) => {
                assert_eq!(e.kind(), io::ErrorKind::ConnectionReset)
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_channel_error_clone_keeps_io_kind() {
        let err = ChannelError::Transport(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        match err.clone() {
            ChannelError::Transport(e) => {
                assert_eq!(e.kind(), io::ErrorKind::BrokenPipe);
                assert_eq!(e.to_string(), "pipe");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_framing_error_display() {
        let err = FramingError::Truncated {
            expected: 10,
            received: 3,
        };
        assert_eq!(
            err.to_string(),
            "truncated frame: expected 10 bytes, received 3"
        );
    }
}
