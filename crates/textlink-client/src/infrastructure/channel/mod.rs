//! The resilient IPC channel to the textlink host.
//!
//! Architecture:
//!
//! - [`HostTransport`] owns the single duplex Unix-socket connection
//!   (`transport` submodule).
//! - A writer task drains an unbounded FIFO of outbound messages onto the
//!   transport, one at a time, reconnecting between attempts.
//! - A reader task blocks on the transport for inbound messages and
//!   broadcasts each to every registered [`InboundSubscriber`]
//!   (`subscribers` submodule).
//! - [`HostChannel`] is the lifecycle controller: it spawns both tasks at
//!   construction and coordinates bounded shutdown.
//!
//! Delivery semantics are deliberately at-most-once: a message dequeued
//! while the host is unreachable is discarded, not re-queued. Callers of
//! [`HostChannel::send`] get no acknowledgement and cannot distinguish
//! "delivered" from "discarded while the host was down". The host catches up
//! on fresh events once it is back.

pub mod subscribers;
pub mod transport;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use textlink_core::OutboundMessage;
use tokio::{
    sync::{
        mpsc::{self, error::TryRecvError},
        watch,
    },
    task::JoinHandle,
    time,
};
use tracing::{debug, info, warn};

pub use subscribers::{InboundSubscriber, SubscriberRegistry};
pub use transport::HostTransport;

/// Well-known socket path for the host endpoint.
///
/// Prefers the per-user runtime directory; falls back to `/tmp` when the
/// environment does not provide one (e.g. some service contexts).
pub fn default_socket_path() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("textlink.sock")
}

/// Timing and endpoint knobs for the channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Path of the host's Unix-socket endpoint.
    pub socket_path: PathBuf,
    /// Upper bound on a single framed write.
    pub write_timeout: Duration,
    /// Backoff after the writer loop fails to connect (the dequeued message
    /// is discarded first).
    pub send_retry_delay: Duration,
    /// Backoff after the reader loop fails to connect.
    pub connect_retry_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            write_timeout: Duration::from_secs(5),
            send_retry_delay: Duration::from_millis(500),
            connect_retry_delay: Duration::from_millis(3000),
        }
    }
}

/// Cheap cloneable handle for enqueueing outbound messages.
///
/// Handed to collaborators (e.g. the edit subscriber) that need to send
/// replies without owning the channel itself.
#[derive(Clone)]
pub struct ChannelSender {
    queue: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelSender {
    pub(crate) fn from_queue(queue: mpsc::UnboundedSender<OutboundMessage>) -> Self {
        Self { queue }
    }

    /// Enqueues `msg` for the writer loop. Best-effort: once the channel has
    /// stopped the message is silently dropped.
    pub fn send(&self, msg: OutboundMessage) {
        if self.queue.send(msg).is_err() {
            debug!("channel stopped; outbound message dropped");
        }
    }
}

/// Lifecycle controller for the duplex channel.
///
/// Construction via [`start`](HostChannel::start) spawns the writer and
/// reader tasks immediately; they begin disconnected with an empty queue and
/// keep dialing until the host appears. [`shutdown`](HostChannel::shutdown)
/// stops both tasks in bounded time regardless of host availability.
pub struct HostChannel {
    transport: Arc<HostTransport>,
    registry: Arc<SubscriberRegistry>,
    queue: mpsc::UnboundedSender<OutboundMessage>,
    shutdown: watch::Sender<bool>,
    writer_task: StdMutex<Option<JoinHandle<()>>>,
    reader_task: StdMutex<Option<JoinHandle<()>>>,
}

impl HostChannel {
    /// Starts the channel: spawns the writer and reader loops on the current
    /// Tokio runtime.
    pub fn start(config: ChannelConfig) -> Arc<Self> {
        let transport = Arc::new(HostTransport::new(config.clone()));
        let registry = Arc::new(SubscriberRegistry::new());
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let writer_task = tokio::spawn(writer_loop(
            Arc::clone(&transport),
            queue_rx,
            shutdown_rx.clone(),
            config.clone(),
        ));
        let reader_task = tokio::spawn(reader_loop(
            Arc::clone(&transport),
            Arc::clone(&registry),
            shutdown_rx,
            config,
        ));

        info!("host channel started");
        Arc::new(Self {
            transport,
            registry,
            queue: queue_tx,
            shutdown: shutdown_tx,
            writer_task: StdMutex::new(Some(writer_task)),
            reader_task: StdMutex::new(Some(reader_task)),
        })
    }

    /// Enqueues an outbound message and wakes the writer loop.
    ///
    /// Valid while running or shutting down; silently dropped once stopped.
    /// There is no return value by design: delivery is best-effort and no
    /// error ever propagates to producers.
    pub fn send(&self, msg: OutboundMessage) {
        if self.queue.send(msg).is_err() {
            debug!("channel stopped; outbound message dropped");
        }
    }

    /// Returns a cloneable sender handle for collaborators.
    pub fn sender(&self) -> ChannelSender {
        ChannelSender {
            queue: self.queue.clone(),
        }
    }

    /// Registers a subscriber for all future inbound messages.
    ///
    /// Callable at any time, including before the first connection.
    pub fn subscribe(&self, subscriber: Arc<dyn InboundSubscriber>) {
        self.registry.add(subscriber);
    }

    /// Returns `true` while the transport has a live connection.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Stops both loops and waits for them to exit.
    ///
    /// The shutdown flag wakes the writer's queue wait, and the transport
    /// reset cancels a read parked without a timeout; together they bound
    /// shutdown even when the host is silent or gone. Messages still queued
    /// when the writer exits are discarded along with the queue receiver.
    ///
    /// Idempotent: later calls return immediately.
    pub async fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            return; // already shut down
        }
        info!("host channel shutting down");

        // Unblock a read parked on the no-timeout inbound wait.
        self.transport.reset();

        let writer = self.writer_task.lock().unwrap().take();
        if let Some(task) = writer {
            let _ = task.await;
        }
        let reader = self.reader_task.lock().unwrap().take();
        if let Some(task) = reader {
            let _ = task.await;
        }

        info!("host channel stopped");
    }
}

// ── Writer loop ───────────────────────────────────────────────────────────────

/// Drains the outbound queue onto the transport, strictly FIFO.
///
/// Per iteration: dequeue one message (suspending while the queue is empty);
/// if `connect` fails, discard the message and back off; if the write fails,
/// reset the transport so the next iteration redials. A specific message is
/// never retried.
///
/// Shutdown ends the loop before the next dequeue, so at most the message
/// already in hand goes out; everything still queued is discarded when the
/// receiver drops with the loop.
async fn writer_loop(
    transport: Arc<HostTransport>,
    mut queue: mpsc::UnboundedReceiver<OutboundMessage>,
    mut shutdown: watch::Receiver<bool>,
    config: ChannelConfig,
) {
    debug!("writer loop started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let msg = match queue.try_recv() {
            Ok(msg) => msg,
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {
                tokio::select! {
                    received = queue.recv() => match received {
                        Some(msg) => msg,
                        None => break,
                    },
                    _ = shutdown.wait_for(|stop| *stop) => continue,
                }
            }
        };

        // The host may have gone away since the last send; check every time.
        if !transport.connect().await {
            debug!("host unavailable; discarding outbound message");
            tokio::select! {
                _ = time::sleep(config.send_retry_delay) => {}
                _ = shutdown.wait_for(|stop| *stop) => {}
            }
            continue;
        }

        if !transport.write_message(&msg).await {
            // Drop the connection so the next iteration redials; the message
            // itself is gone either way.
            transport.reset();
        }
    }
    debug!("writer loop exited");
}

// ── Reader loop ───────────────────────────────────────────────────────────────

/// Keeps a connection open for inbound messages and broadcasts each one.
///
/// A failed read while running means the connection is bad: reset and retry
/// immediately (the follow-up `connect` performs the actual redial and its
/// failure path supplies the backoff). A failed read during shutdown just
/// ends the loop.
async fn reader_loop(
    transport: Arc<HostTransport>,
    registry: Arc<SubscriberRegistry>,
    mut shutdown: watch::Receiver<bool>,
    config: ChannelConfig,
) {
    debug!("reader loop started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        if !transport.connect().await {
            tokio::select! {
                _ = time::sleep(config.connect_retry_delay) => {}
                _ = shutdown.wait_for(|stop| *stop) => {}
            }
            continue;
        }

        // The shutdown arm also covers the race where the lifecycle reset
        // lands between our dial and this read: wait_for is level-triggered,
        // so a flag raised earlier still fires here.
        let received = tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => {
                transport.reset();
                break;
            }
            received = transport.read_message() => received,
        };

        match received {
            Some(msg) => registry.broadcast(&msg),
            None => {
                if *shutdown.borrow() {
                    break;
                }
                warn!("inbound read failed; resetting connection");
                transport.reset();
            }
        }
    }
    debug!("reader loop exited");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
