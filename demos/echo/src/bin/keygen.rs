//! Identity key utility.
//!
//! Creates the identity key file if it does not exist, then prints its
//! public key and fingerprint.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p pcloud-echo --bin keygen            # ./key
//! cargo run -p pcloud-echo --bin keygen -- my.key  # custom path
//! cargo run -p pcloud-echo --bin keygen -- --force # replace existing key
//! ```

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pcloud_channel::core::DEFAULT_KEY_PATH;
use pcloud_channel::identity::{IdentityError, IdentityKeypair};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("pcloud identity key utility");
        println!();
        println!("Usage:");
        println!("  keygen [PATH]           Create PATH (default ./{DEFAULT_KEY_PATH}) if missing and show it");
        println!("  keygen [PATH] --force   Replace PATH with a fresh key");
        return ExitCode::SUCCESS;
    }

    let force = args.iter().any(|a| a == "--force" || a == "-f");
    let path = args
        .iter()
        .find(|a| !a.starts_with('-'))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_PATH));

    match generate(&path, force) {
        Ok(identity) => {
            println!("Key file:    {}", path.display());
            println!("Public key:  {}", identity.public_key_hex());
            println!("Fingerprint: {}", identity.fingerprint());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("keygen: {e}");
            ExitCode::FAILURE
        }
    }
}

fn generate(path: &Path, force: bool) -> Result<IdentityKeypair, IdentityError> {
    if force {
        let identity = IdentityKeypair::generate();
        identity.save(path)?;
        Ok(identity)
    } else {
        IdentityKeypair::load_or_generate(path)
    }
}
