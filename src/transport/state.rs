//! Channel state shared by the I/O loops and the owning channel.
//!
//! The phase is the only value both loops touch. It lives in an atomic so
//! neither loop can observe a torn transition.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::ChannelError;

/// Channel lifecycle phase.
///
/// Linear, no cycles. `Closed` is reachable from every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelPhase {
    /// Frames pass through in clear.
    Unencrypted = 0,
    /// Key exchange running; frames still in clear.
    HandshakeInFlight = 1,
    /// Keystreams installed.
    Encrypted = 2,
    /// Torn down.
    Closed = 3,
}

impl ChannelPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ChannelPhase::Unencrypted,
            1 => ChannelPhase::HandshakeInFlight,
            2 => ChannelPhase::Encrypted,
            _ => ChannelPhase::Closed,
        }
    }
}

/// State shared between a channel and its two loops.
#[derive(Debug)]
pub struct ChannelShared {
    phase: AtomicU8,
    /// First fatal error observed by either loop.
    fault: Mutex<Option<ChannelError>>,
    shutdown: CancellationToken,
}

impl Default for ChannelShared {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelShared {
    /// Create state for a fresh, unencrypted channel.
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(ChannelPhase::Unencrypted as u8),
            fault: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ChannelPhase {
        ChannelPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Whether the channel has been torn down.
    pub fn is_closed(&self) -> bool {
        self.phase() == ChannelPhase::Closed
    }

    /// Move `from` → `to`; fails if the phase has moved on (e.g. closed).
    pub fn transition(&self, from: ChannelPhase, to: ChannelPhase) -> Result<(), ChannelPhase> {
        self.phase
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ChannelPhase::from_u8)
    }

    /// Token both loops watch for teardown.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Tear down the channel: phase `Closed`, both loops cancelled.
    pub fn close(&self) {
        let previous = self.phase.swap(ChannelPhase::Closed as u8, Ordering::AcqRel);
        if previous != ChannelPhase::Closed as u8 {
            debug!(from = ?ChannelPhase::from_u8(previous), "channel closed");
        }
        self.shutdown.cancel();
    }

    /// Record a fatal loop error (first one wins) and tear down.
    pub fn fail(&self, err: ChannelError) {
        debug!(error = %err, "channel loop failed");
        if let Ok(mut fault) = self.fault.lock() {
            if fault.is_none() {
                *fault = Some(err);
            }
        }
        self.close();
    }

    /// Copy of the recorded fatal error, leaving it in place.
    pub fn peek_fault(&self) -> Option<ChannelError> {
        self.fault.lock().ok().and_then(|fault| fault.clone())
    }

    /// Take the recorded fatal error, if any.
    pub fn take_fault(&self) -> Option<ChannelError> {
        self.fault.lock().ok().and_then(|mut fault| fault.take())
    }
}
