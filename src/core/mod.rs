//! Core traits, types, and constants.
//!
//! Shared by every layer; depends on nothing but `thiserror`.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
