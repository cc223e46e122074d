//! Core traits for the secure channel.

use std::future::Future;

use super::error::ChannelError;

/// An ordered, message-oriented pipe to one peer.
///
/// The key exchange runs over this interface so that it uses the very same
/// queues as application data. Handshake messages are ordinary frames,
/// distinguished only by when they are sent.
///
/// # Requirements
///
/// - Messages MUST be delivered in submission order.
/// - `recv_message` MUST return an error, not suspend forever, once the
///   pipe can no longer produce messages.
pub trait MessagePipe {
    /// Queue one message for the peer.
    fn send_message(&self, payload: Vec<u8>) -> Result<(), ChannelError>;

    /// Wait for the next message from the peer.
    fn recv_message(&self) -> impl Future<Output = Result<Vec<u8>, ChannelError>> + Send;
}
