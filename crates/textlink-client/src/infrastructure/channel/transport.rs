//! The duplex transport between this process and the textlink host.
//!
//! [`HostTransport`] owns the single Unix-socket connection and hides the
//! host's "is it up yet" uncertainty behind four operations:
//!
//! - [`connect`](HostTransport::connect) – idempotent dial + handshake,
//! - [`write_message`](HostTransport::write_message) – one timed framed write,
//! - [`read_message`](HostTransport::read_message) – one cancellable framed read,
//! - [`reset`](HostTransport::reset) – cancel in-flight I/O and drop the link.
//!
//! The transport never retries anything internally. Every failure surfaces
//! to the owning loop as `false`/`None`, and the loop decides whether and
//! when to reconnect.
//!
//! # Concurrency
//!
//! The live connection sits in a slot guarded by a `std::sync::Mutex` that is
//! only ever held for a check or a pointer swap, never across I/O. The read
//! and write halves each carry their own async lock, and a per-connection
//! `watch` flag lets [`reset`](HostTransport::reset) unpark a read blocked
//! waiting for host data or a write stalled on a full socket buffer. The
//! flag is level-triggered: a reset that fires before the I/O arms the
//! signal still cancels it.

use std::io::ErrorKind;
use std::process;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use textlink_core::{
    decode_header, decode_inbound, encode_outbound_now,
    protocol::messages::{InitializedMessage, HEADER_SIZE},
    InboundMessage, OutboundMessage, SequenceCounter,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        unix::{OwnedReadHalf, OwnedWriteHalf},
        UnixStream,
    },
    sync::{watch, Mutex},
    time,
};
use tracing::{debug, info, warn};

use super::ChannelConfig;

/// One live connection to the host.
///
/// Dropped as a unit on [`HostTransport::reset`]; the socket closes once the
/// last clone of the `Arc` (possibly held by an in-flight read) goes away.
struct Link {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    /// Raised by `reset` to cancel a read parked on this connection.
    cancel: watch::Sender<bool>,
}

/// The single duplex channel to the host process.
pub struct HostTransport {
    config: ChannelConfig,
    /// Current connection, or `None` while disconnected. Held briefly for
    /// check/replace only.
    link: StdMutex<Option<Arc<Link>>>,
    /// Serializes concurrent dial attempts from the writer and reader loops
    /// so only one of them performs the connect-and-handshake sequence.
    dial_lock: Mutex<()>,
    seq: SequenceCounter,
}

impl HostTransport {
    /// Creates a disconnected transport for the endpoint in `config`.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            link: StdMutex::new(None),
            dial_lock: Mutex::new(()),
            seq: SequenceCounter::new(),
        }
    }

    /// Returns `true` while a connection is established.
    pub fn is_connected(&self) -> bool {
        self.link.lock().unwrap().is_some()
    }

    /// Connects to the host if not already connected.
    ///
    /// Idempotent: when a connection exists this returns `true` without
    /// re-dialing. Otherwise it dials the well-known socket path and sends
    /// the `Initialized{pid}` handshake on the fresh connection *before*
    /// publishing it, so the handshake is always the first frame the host
    /// observes, even when both loops race through here.
    ///
    /// Returns `false` when the host is not listening or the handshake write
    /// fails; the failed connection is discarded either way.
    pub async fn connect(&self) -> bool {
        if self.is_connected() {
            return true;
        }

        let _dialing = self.dial_lock.lock().await;
        // Another loop may have completed the dial while we waited.
        if self.is_connected() {
            return true;
        }

        let stream = match UnixStream::connect(&self.config.socket_path).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(
                    "host not reachable at {}: {e}",
                    self.config.socket_path.display()
                );
                return false;
            }
        };

        let (read_half, mut write_half) = stream.into_split();

        let handshake = OutboundMessage::Initialized(InitializedMessage {
            pid: process::id(),
        });
        if !self.write_frame(&mut write_half, &handshake).await {
            warn!("handshake write failed; discarding fresh connection");
            return false;
        }

        let (cancel, _) = watch::channel(false);
        let link = Arc::new(Link {
            reader: Mutex::new(read_half),
            writer: Mutex::new(write_half),
            cancel,
        });
        *self.link.lock().unwrap() = Some(link);

        info!("connected to host at {}", self.config.socket_path.display());
        true
    }

    /// Serializes `msg` and writes it with the configured write timeout.
    ///
    /// Returns `false` on timeout, on an I/O error, on cancellation by
    /// [`reset`](Self::reset), or when not connected. The message is
    /// consumed by the attempt either way; callers never retry a specific
    /// message.
    pub async fn write_message(&self, msg: &OutboundMessage) -> bool {
        let Some(link) = self.current_link() else {
            return false;
        };
        let mut cancel = link.cancel.subscribe();
        let mut writer = link.writer.lock().await;

        // A write stalled on a full socket buffer must not sit out the whole
        // timeout once the connection has been reset.
        tokio::select! {
            _ = cancel.wait_for(|cancelled| *cancelled) => {
                debug!("pending write cancelled");
                false
            }
            wrote = self.write_frame(&mut writer, msg) => wrote,
        }
    }

    /// Reads the next inbound message, blocking until data arrives, the
    /// connection fails, or [`reset`](Self::reset) cancels the wait.
    ///
    /// Returns `None` on EOF, on an I/O error, on a malformed frame, or on
    /// cancellation. The caller distinguishes shutdown from failure by its
    /// own running flag.
    pub async fn read_message(&self) -> Option<InboundMessage> {
        let link = self.current_link()?;
        let mut cancel = link.cancel.subscribe();

        tokio::select! {
            _ = cancel.wait_for(|cancelled| *cancelled) => {
                debug!("pending read cancelled");
                None
            }
            msg = Self::read_frame(&link) => msg,
        }
    }

    /// Cancels any in-flight I/O and drops the connection.
    ///
    /// Idempotent and safe to call from either loop (or both) while a read
    /// is parked on another task; the parked read returns `None` promptly.
    pub fn reset(&self) {
        let link = self.link.lock().unwrap().take();
        if let Some(link) = link {
            let _ = link.cancel.send(true);
            debug!("transport reset; connection dropped");
        }
    }

    fn current_link(&self) -> Option<Arc<Link>> {
        self.link.lock().unwrap().clone()
    }

    async fn write_frame(&self, writer: &mut OwnedWriteHalf, msg: &OutboundMessage) -> bool {
        let bytes = match encode_outbound_now(msg, self.seq.next()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode outbound message: {e}");
                return false;
            }
        };

        match time::timeout(self.config.write_timeout, writer.write_all(&bytes)).await {
            Ok(Ok(())) => {
                debug!("wrote {:?} ({} bytes)", msg.message_type(), bytes.len());
                true
            }
            Ok(Err(e)) => {
                debug!("write failed: {e}");
                false
            }
            Err(_) => {
                warn!("write timed out after {:?}", self.config.write_timeout);
                false
            }
        }
    }

    /// Reads header bytes, then payload bytes, accumulating until one
    /// complete logical message is assembled, then decodes it.
    async fn read_frame(link: &Link) -> Option<InboundMessage> {
        let mut reader = link.reader.lock().await;

        let mut frame = vec![0u8; HEADER_SIZE];
        if let Err(e) = reader.read_exact(&mut frame).await {
            if e.kind() != ErrorKind::UnexpectedEof {
                debug!("read error on channel: {e}");
            }
            return None;
        }

        let header = match decode_header(&frame) {
            Ok(header) => header,
            Err(e) => {
                warn!("bad frame header: {e}");
                return None;
            }
        };

        if header.payload_length > 0 {
            frame.resize(HEADER_SIZE + header.payload_length as usize, 0);
            if let Err(e) = reader.read_exact(&mut frame[HEADER_SIZE..]).await {
                debug!("read payload error: {e}");
                return None;
            }
        }

        match decode_inbound(&frame) {
            Ok((msg, _)) => {
                debug!("received {:?}", msg.message_type());
                Some(msg)
            }
            Err(e) => {
                warn!("failed to decode inbound message: {e}");
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
