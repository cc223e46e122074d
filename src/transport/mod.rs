//! Transport layer
//!
//! The steady-state protocol of a channel:
//!
//! - **Framing**: [`read_frame`] / [`write_frame`] for the length-prefixed
//!   wire format
//! - **State**: [`ChannelPhase`] and the [`ChannelShared`] state both loops
//!   observe
//! - **Loops**: [`read_loop`] and [`write_loop`], one task each per channel
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Application (send / receive)     │
//! ├────────────────────┬────────────────────┤
//! │  outbound queue    │   inbound queue    │
//! │  write loop        │   read loop        │  ← This module
//! │  (local keystream) │  (remote keystream)│
//! ├────────────────────┴────────────────────┤
//! │              TCP stream                 │
//! └─────────────────────────────────────────┘
//! ```

mod frame;
mod pump;
mod state;

pub use frame::*;
pub use pump::*;
pub use state::*;
