//! P-256 session key management.
//!
//! Coordinates travel as minimal unsigned big-endian integers (leading zero
//! bytes stripped), so a coordinate may be shorter than 32 bytes on the wire.

use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{EncodedPoint, FieldBytes, PublicKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::core::{CryptoError, HandshakeError, COORDINATE_SIZE};

/// Strip leading zero bytes from a big-endian integer.
pub fn encode_coordinate(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

/// Left-pad a big-endian integer to a full coordinate.
///
/// Leading zeros are ignored; more than 32 significant bytes cannot be a
/// P-256 coordinate.
pub fn decode_coordinate(bytes: &[u8]) -> Result<[u8; COORDINATE_SIZE], HandshakeError> {
    let significant = &bytes[bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len())..];
    if significant.len() > COORDINATE_SIZE {
        return Err(HandshakeError::InvalidPeerKey("coordinate longer than 32 bytes"));
    }
    let mut out = [0u8; COORDINATE_SIZE];
    out[COORDINATE_SIZE - significant.len()..].copy_from_slice(significant);
    Ok(out)
}

/// Rebuild a peer's public point from its two coordinates.
///
/// Fails unless the point lies on the curve with both coordinates reduced
/// modulo p. The identity is rejected as well.
pub fn peer_public_key(x: &[u8], y: &[u8]) -> Result<PublicKey, HandshakeError> {
    let x = decode_coordinate(x)?;
    let y = decode_coordinate(y)?;
    let encoded =
        EncodedPoint::from_affine_coordinates(FieldBytes::from_slice(&x), FieldBytes::from_slice(&y), false);
    Option::<PublicKey>::from(PublicKey::from_encoded_point(&encoded))
        .ok_or(HandshakeError::InvalidPeerKey("point is not on the curve"))
}

/// Raw ECDH output: the x-coordinate of `peer_point * local_scalar`.
///
/// Held in its minimal big-endian form and zeroized on drop.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    /// Wrap raw secret bytes (leading zeros are stripped).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Zeroizing::new(encode_coordinate(bytes)))
    }

    /// The secret's byte representation fed to the hash.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A fresh P-256 key pair for one handshake.
///
/// The private scalar never leaves this struct and is consumed by
/// [`EphemeralKeypair::diffie_hellman`].
pub struct EphemeralKeypair {
    secret: EphemeralSecret,
    x: [u8; COORDINATE_SIZE],
    y: [u8; COORDINATE_SIZE],
}

impl EphemeralKeypair {
    /// Generate a new random key pair.
    pub fn generate() -> Result<Self, CryptoError> {
        let secret = EphemeralSecret::random(&mut OsRng);
        let point = secret.public_key().to_encoded_point(false);
        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            return Err(CryptoError::KeyGeneration);
        };

        let mut xb = [0u8; COORDINATE_SIZE];
        let mut yb = [0u8; COORDINATE_SIZE];
        xb.copy_from_slice(x);
        yb.copy_from_slice(y);
        Ok(Self { secret, x: xb, y: yb })
    }

    /// X coordinate in wire form.
    pub fn x_message(&self) -> Vec<u8> {
        encode_coordinate(&self.x)
    }

    /// Y coordinate in wire form.
    pub fn y_message(&self) -> Vec<u8> {
        encode_coordinate(&self.y)
    }

    /// Compute the shared secret with a validated peer key.
    pub fn diffie_hellman(self, peer: &PublicKey) -> SharedSecret {
        let shared = self.secret.diffie_hellman(peer);
        SharedSecret::from_bytes(shared.raw_secret_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // P-256 generator point.
    const GX: &str = "6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296";
    const GY: &str = "4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5";
    // P-256 field prime.
    const P: &str = "ffffffff00000001000000000000000000000000ffffffffffffffffffffffff";

    #[test]
    fn test_encode_coordinate_strips_leading_zeros() {
        assert_eq!(encode_coordinate(&[0, 0, 1, 2]), vec![1, 2]);
        assert_eq!(encode_coordinate(&[0, 0]), Vec::<u8>::new());
        assert_eq!(encode_coordinate(&[5]), vec![5]);
    }

    #[test]
    fn test_decode_coordinate_pads() {
        let decoded = decode_coordinate(&[1, 2]).unwrap();
        assert_eq!(&decoded[30..], &[1, 2]);
        assert!(decoded[..30].iter().all(|&b| b == 0));

        // Redundant leading zeros are tolerated.
        let mut long = vec![0u8; 8];
        long.extend_from_slice(&[0xff; 32]);
        assert_eq!(decode_coordinate(&long).unwrap(), [0xff; 32]);

        assert!(matches!(
            decode_coordinate(&[1u8; 33]),
            Err(HandshakeError::InvalidPeerKey(_))
        ));
    }

    #[test]
    fn test_peer_public_key_accepts_generator() {
        let x = hex::decode(GX).unwrap();
        let y = hex::decode(GY).unwrap();
        assert!(peer_public_key(&x, &y).is_ok());
    }

    #[test]
    fn test_peer_public_key_rejects_off_curve() {
        let x = hex::decode(GX).unwrap();
        let mut y = hex::decode(GY).unwrap();
        y[31] ^= 1;
        assert!(matches!(
            peer_public_key(&x, &y),
            Err(HandshakeError::InvalidPeerKey(_))
        ));

        assert!(matches!(
            peer_public_key(&[1], &[1]),
            Err(HandshakeError::InvalidPeerKey(_))
        ));
        assert!(matches!(
            peer_public_key(&[], &[]),
            Err(HandshakeError::InvalidPeerKey(_))
        ));
    }

    #[test]
    fn test_peer_public_key_rejects_unreduced_coordinates() {
        // The field prime p and 2^256 - 1: full width, but not below p.
        let p = hex::decode(P).unwrap();
        let max = vec![0xffu8; COORDINATE_SIZE];
        let gx = hex::decode(GX).unwrap();
        let gy = hex::decode(GY).unwrap();

        for (x, y) in [(&p, &gy), (&gx, &p), (&max, &gy), (&gx, &max)] {
            assert!(matches!(
                peer_public_key(x, y),
                Err(HandshakeError::InvalidPeerKey(_))
            ));
        }
    }

    #[test]
    fn test_keypair_messages_roundtrip_to_point() {
        let kp = EphemeralKeypair::generate().unwrap();
        let x = kp.x_message();
        let y = kp.y_message();
        assert!(x.len() <= COORDINATE_SIZE);
        assert!(peer_public_key(&x, &y).is_ok());
    }

    #[test]
    fn test_diffie_hellman_agrees() {
        let a = EphemeralKeypair::generate().unwrap();
        let b = EphemeralKeypair::generate().unwrap();
        let a_pub = peer_public_key(&a.x_message(), &a.y_message()).unwrap();
        let b_pub = peer_public_key(&b.x_message(), &b.y_message()).unwrap();

        let s1 = a.diffie_hellman(&b_pub);
        let s2 = b.diffie_hellman(&a_pub);
        assert_eq!(s1.as_bytes(), s2.as_bytes());
        assert!(!s1.as_bytes().is_empty());
    }

    #[test]
    fn test_keypair_generation_differs() {
        let kp1 = EphemeralKeypair::generate().unwrap();
        let kp2 = EphemeralKeypair::generate().unwrap();
        assert_ne!(kp1.x_message(), kp2.x_message());
    }
}
