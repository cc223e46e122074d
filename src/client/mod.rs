//! Client helpers
//!
//! Dial a server and complete the key exchange in one call.

#[allow(clippy::module_inception)]
mod client;

pub use client::*;
