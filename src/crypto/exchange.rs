//! Anonymous P-256 Diffie-Hellman over a [`MessagePipe`].
//!
//! ```text
//! -> X(local)      -> Y(local)
//! <- X(remote)     <- Y(remote)
//! ```
//!
//! Both peers run the identical sequence at the same time. Both sends are
//! queued before either side blocks on a receive, so the exchange cannot
//! deadlock.
//!
//! # Security
//!
//! The exchange is unauthenticated: nothing binds the received point to a
//! known identity, so an active man-in-the-middle can run one exchange with
//! each side. Confidentiality holds only against passive observers.

use tracing::debug;

use crate::core::{HandshakeError, MessagePipe};

use super::keys::{peer_public_key, EphemeralKeypair, SharedSecret};

/// Run one key exchange and return the raw shared secret.
///
/// No secret is derived unless the peer's point passes curve validation.
/// The exchange is one-shot: failures are returned, never retried.
pub async fn perform_handshake<P>(pipe: &P) -> Result<SharedSecret, HandshakeError>
where
    P: MessagePipe + Sync,
{
    let keypair = EphemeralKeypair::generate()?;

    pipe.send_message(keypair.x_message())?;
    pipe.send_message(keypair.y_message())?;

    let x = pipe.recv_message().await?;
    let y = pipe.recv_message().await?;
    debug!(x_len = x.len(), y_len = y.len(), "received peer coordinates");

    let peer = peer_public_key(&x, &y)?;
    Ok(keypair.diffie_hellman(&peer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChannelError;
    use crate::crypto::{derive, Role};
    use tokio::sync::{mpsc, Mutex};

    /// In-memory pipe: one end of a pair of unbounded queues.
    struct MemoryPipe {
        tx: mpsc::UnboundedSender<Vec<u8>>,
        rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    }

    impl MemoryPipe {
        fn pair() -> (Self, Self) {
            let (a_tx, b_rx) = mpsc::unbounded_channel();
            let (b_tx, a_rx) = mpsc::unbounded_channel();
            (
                Self {
                    tx: a_tx,
                    rx: Mutex::new(a_rx),
                },
                Self {
                    tx: b_tx,
                    rx: Mutex::new(b_rx),
                },
            )
        }
    }

    impl MessagePipe for MemoryPipe {
        fn send_message(&self, payload: Vec<u8>) -> Result<(), ChannelError> {
            self.tx.send(payload).map_err(|_| ChannelError::Closed)
        }

        async fn recv_message(&self) -> Result<Vec<u8>, ChannelError> {
            self.rx
                .lock()
                .await
                .recv()
                .await
                .ok_or(ChannelError::PeerDisconnected)
        }
    }

    #[tokio::test]
    async fn test_both_sides_agree() {
        let (a, b) = MemoryPipe::pair();
        let (sa, sb) = tokio::join!(perform_handshake(&a), perform_handshake(&b));
        let (sa, sb) = (sa.unwrap(), sb.unwrap());
        assert_eq!(sa.as_bytes(), sb.as_bytes());

        let mut server = derive(&sa, Role::Server).unwrap();
        let mut client = derive(&sb, Role::Client).unwrap();

        let mut s_out = vec![0u8; 333];
        let mut c_in = vec![0u8; 333];
        server.outbound.apply(&mut s_out);
        client.inbound.apply(&mut c_in);
        assert_eq!(s_out, c_in);

        let mut c_out = vec![0u8; 77];
        let mut s_in = vec![0u8; 77];
        client.outbound.apply(&mut c_out);
        server.inbound.apply(&mut s_in);
        assert_eq!(c_out, s_in);
    }

    #[tokio::test]
    async fn test_sends_two_coordinates() {
        let (a, b) = MemoryPipe::pair();
        // Peer sends the generator point, which is valid.
        b.send_message(
            hex::decode("6b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296")
                .unwrap(),
        )
        .unwrap();
        b.send_message(
            hex::decode("4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5")
                .unwrap(),
        )
        .unwrap();

        perform_handshake(&a).await.unwrap();

        let x = b.recv_message().await.unwrap();
        let y = b.recv_message().await.unwrap();
        assert!(peer_public_key(&x, &y).is_ok());
    }

    #[tokio::test]
    async fn test_rejects_off_curve_point() {
        let (a, b) = MemoryPipe::pair();
        b.send_message(vec![1]).unwrap();
        b.send_message(vec![1]).unwrap();

        let result = perform_handshake(&a).await;
        assert!(matches!(result, Err(HandshakeError::InvalidPeerKey(_))));
    }

    #[tokio::test]
    async fn test_rejects_oversized_coordinate() {
        let (a, b) = MemoryPipe::pair();
        b.send_message(vec![0xff; 40]).unwrap();
        b.send_message(vec![0xff; 32]).unwrap();

        let result = perform_handshake(&a).await;
        assert!(matches!(result, Err(HandshakeError::InvalidPeerKey(_))));
    }

    #[tokio::test]
    async fn test_peer_gone_mid_exchange() {
        let (a, b) = MemoryPipe::pair();
        b.send_message(vec![1, 2, 3]).unwrap();
        drop(b);

        let result = perform_handshake(&a).await;
        assert!(matches!(result, Err(HandshakeError::PeerDisconnected)));
    }
}
