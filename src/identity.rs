//! Long-term Ed25519 identity key, stored on disk.
//!
//! The key file holds a single line:
//!
//! ```text
//! <hex public key (32 bytes)> <hex keypair (64 bytes: secret || public)>
//! ```
//!
//! On Unix the file is created with mode `0600`.
//!
//! The identity is provisioned for future authentication. The channel
//! handshake does not use it.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use ed25519_dalek::{SigningKey, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Errors loading or storing an identity key file.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Reading or writing the key file failed.
    #[error("key file I/O error: {0}")]
    Io(#[from] io::Error),

    /// A key field is not valid hex.
    #[error("key file is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The file content does not describe a valid keypair.
    #[error("malformed key file: {0}")]
    Malformed(&'static str),
}

/// An Ed25519 keypair identifying this endpoint.
pub struct IdentityKeypair {
    signing: SigningKey,
}

impl IdentityKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing: SigningKey::generate(&mut OsRng),
        }
    }

    /// Load a keypair from `path`.
    ///
    /// The public half stored in the file must match the one derived from
    /// the secret half.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let content = Zeroizing::new(fs::read_to_string(path.as_ref())?);
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, IdentityError> {
        let mut fields = content.split_whitespace();
        let (Some(public_hex), Some(keypair_hex), None) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(IdentityError::Malformed("expected two fields"));
        };

        let public: [u8; PUBLIC_KEY_LENGTH] = hex::decode(public_hex)?
            .try_into()
            .map_err(|_| IdentityError::Malformed("public key must be 32 bytes"))?;

        let keypair_bytes = Zeroizing::new(hex::decode(keypair_hex)?);
        let keypair: &[u8; KEYPAIR_LENGTH] = keypair_bytes
            .as_slice()
            .try_into()
            .map_err(|_| IdentityError::Malformed("private key must be 64 bytes"))?;

        let signing = SigningKey::from_keypair_bytes(keypair)
            .map_err(|_| IdentityError::Malformed("private key does not match its public half"))?;
        if signing.verifying_key().to_bytes() != public {
            return Err(IdentityError::Malformed("public key does not match private key"));
        }

        Ok(Self { signing })
    }

    /// Write the keypair to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IdentityError> {
        let path = path.as_ref();
        let line = Zeroizing::new(format!(
            "{} {}\n",
            self.public_key_hex(),
            hex::encode(self.signing.to_keypair_bytes())
        ));

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(line.as_bytes())?;
        file.sync_all()?;
        debug!(path = %path.display(), "identity key saved");
        Ok(())
    }

    /// Load the keypair at `path`, or generate and save a new one if the
    /// file is missing or unreadable.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(identity) => {
                debug!(path = %path.display(), "identity key loaded");
                Ok(identity)
            }
            Err(e) => {
                info!(path = %path.display(), reason = %e, "generating new identity key");
                let identity = Self::generate();
                identity.save(path)?;
                Ok(identity)
            }
        }
    }

    /// Public half.
    pub fn public_key(&self) -> VerifyingKey {
        self.signing.verifying_key()
    }

    /// Public key as lowercase hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key().to_bytes())
    }

    /// Short human-readable fingerprint: the first 8 bytes of the SHA-256
    /// of the public key, colon separated.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.public_key().to_bytes());
        digest[..8]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl std::fmt::Debug for IdentityKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKeypair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_key_path(name: &str) -> PathBuf {
        let nonce: u64 = rand::random();
        std::env::temp_dir().join(format!("pcloud-{name}-{nonce:016x}.key"))
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_key_path("roundtrip");
        let identity = IdentityKeypair::generate();
        identity.save(&path).unwrap();

        let loaded = IdentityKeypair::load(&path).unwrap();
        assert_eq!(loaded.public_key_hex(), identity.public_key_hex());
        assert_eq!(loaded.fingerprint(), identity.fingerprint());

        let content = fs::read_to_string(&path).unwrap();
        let fields: Vec<&str> = content.split_whitespace().collect();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].len(), 64);
        assert_eq!(fields[1].len(), 128);

        fs::remove_file(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_key_path("mode");
        IdentityKeypair::generate().save(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_or_generate_creates_then_reuses() {
        let path = temp_key_path("reuse");
        assert!(!path.exists());

        let first = IdentityKeypair::load_or_generate(&path).unwrap();
        assert!(path.exists());
        let second = IdentityKeypair::load_or_generate(&path).unwrap();
        assert_eq!(first.public_key_hex(), second.public_key_hex());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_missing_file() {
        let path = temp_key_path("missing");
        assert!(matches!(
            IdentityKeypair::load(&path),
            Err(IdentityError::Io(_))
        ));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            IdentityKeypair::parse("onlyonefield"),
            Err(IdentityError::Malformed(_))
        ));
        assert!(matches!(
            IdentityKeypair::parse("zz zz"),
            Err(IdentityError::Hex(_))
        ));
        assert!(matches!(
            IdentityKeypair::parse("abcd abcd"),
            Err(IdentityError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_mismatched_public_key() {
        let a = IdentityKeypair::generate();
        let b = IdentityKeypair::generate();
        let line = format!(
            "{} {}",
            b.public_key_hex(),
            hex::encode(a.signing.to_keypair_bytes())
        );
        assert!(matches!(
            IdentityKeypair::parse(&line),
            Err(IdentityError::Malformed(_))
        ));
    }

    #[test]
    fn test_fingerprint_shape() {
        let fp = IdentityKeypair::generate().fingerprint();
        assert_eq!(fp.len(), 8 * 2 + 7);
        assert_eq!(fp.matches(':').count(), 7);
    }
}
