//! Protocol constants.
//!
//! Both endpoints run the same fixed configuration, so these values are part
//! of the wire protocol and MUST NOT be changed independently.

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Size of one P-256 affine coordinate when fully padded.
pub const COORDINATE_SIZE: usize = 32;

/// SHA-256 output size.
pub const HASH_SIZE: usize = 32;

/// AES-128 key size (one half of the SHA-256 digest).
pub const AES_KEY_SIZE: usize = HASH_SIZE / 2;

/// AES block size, which is also the CTR IV size.
pub const AES_BLOCK_SIZE: usize = 16;

// =============================================================================
// FRAMING
// =============================================================================

/// Length prefix size (little-endian u32).
pub const FRAME_HEADER_SIZE: usize = 4;

/// Largest payload a reader accepts unless configured otherwise.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Number of inbound frames that make up the handshake (X then Y).
pub const HANDSHAKE_FRAMES: usize = 2;

// =============================================================================
// DEPLOYMENT DEFAULTS
// =============================================================================

/// Port the echo server listens on.
pub const DEFAULT_PORT: u16 = 1337;

/// Location of the identity key file.
pub const DEFAULT_KEY_PATH: &str = "key";
