//! Server helpers
//!
//! Accept TCP connections and wrap each one as a server-role channel.

#[allow(clippy::module_inception)]
mod server;

pub use server::*;
