//! The secure channel: composition root of key exchange, key derivation and
//! the framing loops.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::{ChannelError, HandshakeError, MessagePipe, HANDSHAKE_FRAMES};
use crate::crypto::{derive, perform_handshake, Keystream, Role};
use crate::transport::{
    read_loop, write_loop, ChannelPhase, ChannelShared, KeyCutover, Outbound,
};

use super::config::ChannelConfig;

/// An encrypted, bidirectional message channel over one connection.
///
/// Construction starts the read and write loops immediately, in clear.
/// Call [`SecureChannel::handshake`] before sending anything confidential:
/// messages sent earlier go out unencrypted.
///
/// # Security
///
/// The key exchange is anonymous. It protects against passive observers only;
/// an active attacker can sit in the middle undetected.
pub struct SecureChannel {
    role: Role,
    shared: Arc<ChannelShared>,
    outbound: mpsc::UnboundedSender<Outbound>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    /// Frames taken off the inbound queue so far.
    received: AtomicUsize,
    /// Tells the read loop where the peer's clear frames end.
    started: Mutex<Option<oneshot::Sender<usize>>>,
    /// Hands the inbound keystream to the read loop.
    rendezvous: Mutex<Option<oneshot::Sender<Keystream>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    addrs: Option<(SocketAddr, SocketAddr)>,
}

impl SecureChannel {
    /// Wrap a connection with the default configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<S>(stream: S, role: Role) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_config(stream, role, ChannelConfig::default())
    }

    /// Wrap a connection.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_config<S>(stream: S, role: Role, config: ChannelConfig) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let shared = Arc::new(ChannelShared::new());

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (started_tx, started_rx) = oneshot::channel();
        let (key_tx, key_rx) = oneshot::channel();
        let cutover = KeyCutover {
            started: started_rx,
            key: key_rx,
        };

        let read_task = tokio::spawn(read_loop(
            reader,
            in_tx,
            cutover,
            Arc::clone(&shared),
            config.max_frame_len,
        ));
        let write_task = tokio::spawn(write_loop(writer, out_rx, Arc::clone(&shared)));
        debug!(?role, "channel loops started");

        Self {
            role,
            shared,
            outbound: out_tx,
            inbound: tokio::sync::Mutex::new(in_rx),
            received: AtomicUsize::new(0),
            started: Mutex::new(Some(started_tx)),
            rendezvous: Mutex::new(Some(key_tx)),
            tasks: Mutex::new(vec![read_task, write_task]),
            addrs: None,
        }
    }

    /// Wrap a TCP connection, remembering both endpoint addresses.
    pub fn from_tcp(stream: TcpStream, role: Role, config: ChannelConfig) -> io::Result<Self> {
        let addrs = (stream.local_addr()?, stream.peer_addr()?);
        stream.set_nodelay(true)?;
        let mut channel = Self::with_config(stream, role, config);
        channel.addrs = Some(addrs);
        Ok(channel)
    }

    /// Local address, for channels built with [`SecureChannel::from_tcp`].
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.addrs.map(|(local, _)| local)
    }

    /// Peer address, for channels built with [`SecureChannel::from_tcp`].
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.addrs.map(|(_, peer)| peer)
    }

    /// Local role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current phase.
    pub fn phase(&self) -> ChannelPhase {
        self.shared.phase()
    }

    /// Whether the channel has been torn down.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Run the key exchange and switch both loops to encrypted mode.
    ///
    /// One-shot per connection. Any failure is fatal: the channel is closed
    /// before the error is returned and no keystream is installed.
    ///
    /// The exchange reads from the same inbound queue as
    /// [`SecureChannel::receive`]; do not receive concurrently with it.
    pub async fn handshake(&self) -> Result<(), HandshakeError> {
        if let Err(phase) = self
            .shared
            .transition(ChannelPhase::Unencrypted, ChannelPhase::HandshakeInFlight)
        {
            return Err(match phase {
                ChannelPhase::Closed => HandshakeError::PeerDisconnected,
                _ => HandshakeError::AlreadyStarted,
            });
        }

        match self.exchange_and_install().await {
            Ok(()) => {
                info!(role = ?self.role, "handshake complete");
                Ok(())
            }
            Err(e) => {
                warn!(role = ?self.role, error = %e, "handshake failed");
                self.shared.close();
                Err(e)
            }
        }
    }

    async fn exchange_and_install(&self) -> Result<(), HandshakeError> {
        // The peer's coordinates are the next two frames on the inbound
        // queue; everything it sends after them is encrypted.
        let clear_frames = self.received.load(Ordering::Acquire) + HANDSHAKE_FRAMES;
        self.started
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or(HandshakeError::PeerDisconnected)?
            .send(clear_frames)
            .map_err(|_| HandshakeError::PeerDisconnected)?;

        let secret = perform_handshake(self).await?;
        let keys = derive(&secret, self.role)?;
        drop(secret);

        let rendezvous = self
            .rendezvous
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .ok_or(HandshakeError::PeerDisconnected)?;

        self.outbound
            .send(Outbound::Install(keys.outbound))
            .map_err(|_| HandshakeError::PeerDisconnected)?;
        rendezvous
            .send(keys.inbound)
            .map_err(|_| HandshakeError::PeerDisconnected)?;

        self.shared
            .transition(ChannelPhase::HandshakeInFlight, ChannelPhase::Encrypted)
            .map_err(|_| HandshakeError::PeerDisconnected)
    }

    /// Queue a message for the peer.
    ///
    /// Messages go out in submission order. Fails with
    /// [`ChannelError::Closed`] once the channel is torn down.
    pub fn send(&self, payload: impl Into<Vec<u8>>) -> Result<(), ChannelError> {
        if self.shared.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.outbound
            .send(Outbound::Frame(payload.into()))
            .map_err(|_| ChannelError::Closed)
    }

    /// Wait for the next message from the peer.
    ///
    /// Returns `None` once the channel has ended; [`SecureChannel::take_error`]
    /// then tells why.
    pub async fn receive(&self) -> Option<Vec<u8>> {
        let msg = self.inbound.lock().await.recv().await;
        if msg.is_some() {
            self.received.fetch_add(1, Ordering::AcqRel);
        }
        msg
    }

    /// The error that ended the channel, if it ended on an error.
    pub fn take_error(&self) -> Option<ChannelError> {
        self.shared.take_fault()
    }

    /// Tear the channel down and wait for both loops to release the
    /// connection.
    ///
    /// Abrupt: queued frames are dropped. Calling it again is a no-op.
    pub async fn close(&self) {
        self.shared.close();
        if let Ok(mut slot) = self.started.lock() {
            slot.take();
        }
        if let Ok(mut slot) = self.rendezvous.lock() {
            slot.take();
        }

        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => Vec::new(),
        };
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "channel loop panicked");
            }
        }
    }
}

impl MessagePipe for SecureChannel {
    fn send_message(&self, payload: Vec<u8>) -> Result<(), ChannelError> {
        self.send(payload)
    }

    async fn recv_message(&self) -> Result<Vec<u8>, ChannelError> {
        match self.receive().await {
            Some(payload) => Ok(payload),
            None => Err(self
                .shared
                .peek_fault()
                .unwrap_or(ChannelError::PeerDisconnected)),
        }
    }
}

impl Drop for SecureChannel {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("role", &self.role)
            .field("phase", &self.shared.phase())
            .field("peer", &self.peer_addr())
            .finish()
    }
}
