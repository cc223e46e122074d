//! The read and write loops.
//!
//! Each channel runs exactly two tasks. The write loop owns the write half of
//! the connection and the outbound keystream; the read loop owns the read half
//! and the inbound keystream. Neither keystream is ever touched by more than
//! one task, so no lock guards them.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace, warn};

use crate::core::ChannelError;
use crate::crypto::Keystream;

use super::frame::{is_disconnect, read_frame, write_frame};
use super::state::ChannelShared;

/// Item on the outbound queue.
#[derive(Debug)]
pub enum Outbound {
    /// A message to frame and send.
    Frame(Vec<u8>),
    /// Start encrypting with this keystream from this queue position on.
    Install(Keystream),
}

/// Drain the outbound queue onto the connection.
///
/// Ends when the queue is closed, the channel is cancelled, or a write fails.
/// A write failure is recorded and tears down the whole channel.
pub async fn write_loop<W>(
    mut writer: W,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    shared: Arc<ChannelShared>,
) where
    W: AsyncWrite + Unpin,
{
    let shutdown = shared.shutdown_token().clone();
    let mut keystream: Option<Keystream> = None;

    loop {
        let item = tokio::select! {
            _ = shutdown.cancelled() => break,
            item = queue.recv() => item,
        };

        match item {
            None => break,
            Some(Outbound::Install(ks)) => {
                debug!(direction = ?ks.direction(), "keystream installed");
                keystream = Some(ks);
            }
            Some(Outbound::Frame(mut payload)) => {
                if let Some(ks) = keystream.as_mut() {
                    ks.apply(&mut payload);
                }

                let written = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    res = write_frame(&mut writer, &payload) => res,
                };
                match written {
                    Ok(()) => {}
                    Err(e) if is_disconnect(&e) => {
                        debug!(error = %e, "peer gone while writing");
                        shared.fail(ChannelError::PeerDisconnected);
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "error writing frame");
                        shared.fail(ChannelError::Transport(e));
                        break;
                    }
                }
                trace!(len = payload.len(), "frame written");
            }
        }
    }

    let _ = writer.shutdown().await;
    debug!("write loop stopped");
}

/// Handshake hand-offs from a channel to its read loop.
#[derive(Debug)]
pub struct KeyCutover {
    /// Sent when the local handshake starts: how many clear frames the peer
    /// can deliver before its traffic turns encrypted.
    pub started: oneshot::Receiver<usize>,
    /// The inbound keystream, once derived.
    pub key: oneshot::Receiver<Keystream>,
}

/// Read frames off the connection onto the inbound queue.
///
/// Frames pass through in clear until the local handshake has started and
/// the announced number of clear frames has been relayed. Any frame past that
/// point is held until the inbound keystream arrives, so nothing encrypted by
/// the peer is ever delivered undecrypted. The peer can only encrypt after
/// receiving our coordinates, which are sent after the start signal, so a
/// frame read before the signal is always clear. If the keystream is
/// abandoned (the handshake failed or the channel was dropped) the loop stops.
pub async fn read_loop<R>(
    mut reader: R,
    inbound: mpsc::UnboundedSender<Vec<u8>>,
    mut cutover: KeyCutover,
    shared: Arc<ChannelShared>,
    max_frame_len: usize,
) where
    R: AsyncRead + Unpin,
{
    let shutdown = shared.shutdown_token().clone();
    let mut keystream: Option<Keystream> = None;
    let mut clear_limit: Option<usize> = None;
    let mut relayed = 0usize;

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = read_frame(&mut reader, max_frame_len) => frame,
        };

        let mut payload = match frame {
            Ok(payload) => payload,
            Err(ChannelError::PeerDisconnected) => {
                debug!("peer closed the connection");
                shared.fail(ChannelError::PeerDisconnected);
                break;
            }
            Err(e) => {
                warn!(error = %e, "error reading frame");
                shared.fail(e);
                break;
            }
        };

        if keystream.is_none() {
            if clear_limit.is_none() {
                clear_limit = cutover.started.try_recv().ok();
            }
            if clear_limit.is_some_and(|limit| relayed >= limit) {
                let installed = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    ks = &mut cutover.key => ks,
                };
                match installed {
                    Ok(ks) => {
                        debug!(direction = ?ks.direction(), "keystream installed");
                        keystream = Some(ks);
                    }
                    Err(_) => {
                        debug!("key rendezvous abandoned");
                        shared.close();
                        break;
                    }
                }
            }
        }

        match keystream.as_mut() {
            Some(ks) => ks.apply(&mut payload),
            None => relayed += 1,
        }
        trace!(len = payload.len(), "frame read");
        if inbound.send(payload).is_err() {
            // Receiver gone: the channel itself was dropped.
            break;
        }
    }

    debug!("read loop stopped");
}
