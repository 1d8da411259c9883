//! Integration tests for the host channel lifecycle.
//!
//! # Purpose
//!
//! These tests exercise `HostChannel` through its *public* API in the same
//! way the application wires it up, against a fake host built from a plain
//! `UnixListener`.  They verify:
//!
//! - The happy path: the `Initialized` handshake precedes every other frame,
//!   and queued messages arrive at the host strictly in submission order.
//! - Recovery: the channel converges back to a working connection after the
//!   host starts late or restarts, with a fresh handshake each time.
//! - Broadcast: every registered subscriber sees every inbound message, and
//!   one failing subscriber never starves the others.
//! - Shutdown: `shutdown()` completes in bounded time even while a read is
//!   parked waiting for host data, and is safe to call twice.
//!
//! # The fake host
//!
//! The helpers below stand in for the host process: `accept` + `read_frame`
//! consume outbound frames exactly as the host's reader would, and
//! `write_inbound` pushes host requests at the client.  Timings in
//! `test_config` are shortened so reconnect paths run in milliseconds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use textlink_core::{
    decode_outbound, encode_inbound,
    protocol::messages::{
        EndEditMessage, FocusChangedMessage, GetFocusTextMessage, SetFocusTextMessage,
        HEADER_SIZE,
    },
    InboundMessage, OutboundMessage, ScreenRect,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{UnixListener, UnixStream},
    sync::mpsc,
    time,
};

use textlink_client::application::apply_edit::ApplyEditUseCase;
use textlink_client::infrastructure::channel::{
    ChannelConfig, HostChannel, InboundSubscriber,
};
use textlink_client::infrastructure::editor::{mock::MockFocusEditor, EditSubscriber};

// ── Fake host helpers ─────────────────────────────────────────────────────────

fn temp_socket_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("host.sock");
    (dir, path)
}

/// Shortened timings so failure paths retry within milliseconds.
fn test_config(path: &Path) -> ChannelConfig {
    ChannelConfig {
        socket_path: path.to_path_buf(),
        write_timeout: Duration::from_secs(1),
        send_retry_delay: Duration::from_millis(20),
        connect_retry_delay: Duration::from_millis(20),
    }
}

/// Reads one complete outbound frame from the client, as the host would.
async fn read_frame(stream: &mut UnixStream) -> OutboundMessage {
    let mut frame = vec![0u8; HEADER_SIZE];
    stream.read_exact(&mut frame).await.expect("frame header");

    let header = textlink_core::decode_header(&frame).expect("valid header");
    if header.payload_length > 0 {
        frame.resize(HEADER_SIZE + header.payload_length as usize, 0);
        stream
            .read_exact(&mut frame[HEADER_SIZE..])
            .await
            .expect("frame payload");
    }

    let (msg, _) = decode_outbound(&frame).expect("valid outbound frame");
    msg
}

/// Writes one host request at the client.
async fn write_inbound(stream: &mut UnixStream, msg: &InboundMessage) {
    let bytes = encode_inbound(msg, 0, 0).expect("encode");
    stream.write_all(&bytes).await.expect("write");
}

fn focus_changed(context_id: u64) -> OutboundMessage {
    OutboundMessage::FocusChanged(FocusChangedMessage {
        context_id,
        window_handle: 0x1000 + context_id,
        prev_context_id: 0,
        prev_window_handle: 0,
        screen_rect: ScreenRect {
            left: 0,
            top: 0,
            right: 800,
            bottom: 24,
        },
    })
}

/// Subscriber that forwards every delivery into a test-side channel.
struct ForwardingSubscriber {
    tx: mpsc::UnboundedSender<InboundMessage>,
}

impl InboundSubscriber for ForwardingSubscriber {
    fn deliver(&self, msg: &InboundMessage) -> anyhow::Result<()> {
        self.tx.send(msg.clone()).ok();
        Ok(())
    }
}

/// Subscriber whose every delivery fails.
struct FailingSubscriber;

impl InboundSubscriber for FailingSubscriber {
    fn deliver(&self, _msg: &InboundMessage) -> anyhow::Result<()> {
        anyhow::bail!("injected subscriber failure")
    }
}

// ── Handshake and ordering ────────────────────────────────────────────────────

/// The very first frame the host sees on any connection must be the
/// `Initialized` handshake carrying this process's id.
#[tokio::test]
async fn test_handshake_is_first_frame_on_the_connection() {
    let (_dir, path) = temp_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let channel = HostChannel::start(test_config(&path));

    // Queue a message immediately; it must still arrive after the handshake.
    channel.send(focus_changed(7));

    let (mut stream, _) = listener.accept().await.unwrap();
    match read_frame(&mut stream).await {
        OutboundMessage::Initialized(init) => assert_eq!(init.pid, std::process::id()),
        other => panic!("expected Initialized first, got {other:?}"),
    }
    match read_frame(&mut stream).await {
        OutboundMessage::FocusChanged(fc) => assert_eq!(fc.context_id, 7),
        other => panic!("expected FocusChanged second, got {other:?}"),
    }

    channel.shutdown().await;
}

/// Messages queued while connected arrive in exact submission order.
#[tokio::test]
async fn test_outbound_messages_arrive_in_fifo_order() {
    let (_dir, path) = temp_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let channel = HostChannel::start(test_config(&path));

    channel.send(focus_changed(1));
    channel.send(OutboundMessage::EndEdit(EndEditMessage { context_id: 1 }));
    channel.send(focus_changed(2));

    let (mut stream, _) = listener.accept().await.unwrap();
    assert!(matches!(
        read_frame(&mut stream).await,
        OutboundMessage::Initialized(_)
    ));
    match read_frame(&mut stream).await {
        OutboundMessage::FocusChanged(fc) => assert_eq!(fc.context_id, 1),
        other => panic!("expected FocusChanged(1), got {other:?}"),
    }
    match read_frame(&mut stream).await {
        OutboundMessage::EndEdit(ee) => assert_eq!(ee.context_id, 1),
        other => panic!("expected EndEdit(1), got {other:?}"),
    }
    match read_frame(&mut stream).await {
        OutboundMessage::FocusChanged(fc) => assert_eq!(fc.context_id, 2),
        other => panic!("expected FocusChanged(2), got {other:?}"),
    }

    channel.shutdown().await;
}

// ── Reconnection ──────────────────────────────────────────────────────────────

/// Messages sent while the host is absent are discarded, and the channel
/// converges once the host appears: the next message arrives on a fresh
/// connection right after its handshake.
#[tokio::test]
async fn test_channel_converges_after_host_starts_late() {
    let (_dir, path) = temp_socket_path();
    let channel = HostChannel::start(test_config(&path));

    // Host is not listening yet; this one is dequeued and discarded.
    channel.send(focus_changed(1));
    time::sleep(Duration::from_millis(100)).await;

    let listener = UnixListener::bind(&path).unwrap();
    // Give the reader loop a retry interval to establish the connection.
    let (mut stream, _) = time::timeout(Duration::from_secs(2), listener.accept())
        .await
        .expect("channel must dial once the host is listening")
        .unwrap();

    channel.send(focus_changed(2));

    assert!(matches!(
        read_frame(&mut stream).await,
        OutboundMessage::Initialized(_)
    ));
    match read_frame(&mut stream).await {
        OutboundMessage::FocusChanged(fc) => {
            assert_eq!(fc.context_id, 2, "pre-connection message must be discarded")
        }
        other => panic!("expected FocusChanged(2), got {other:?}"),
    }

    channel.shutdown().await;
}

/// When the host drops the connection, the channel reconnects and repeats
/// the handshake before delivering anything else.
#[tokio::test]
async fn test_channel_reconnects_with_fresh_handshake_after_host_restart() {
    let (_dir, path) = temp_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let channel = HostChannel::start(test_config(&path));

    let (mut stream, _) = listener.accept().await.unwrap();
    assert!(matches!(
        read_frame(&mut stream).await,
        OutboundMessage::Initialized(_)
    ));

    // Host restarts: close this connection and wait for the redial.
    drop(stream);
    let (mut stream, _) = time::timeout(Duration::from_secs(2), listener.accept())
        .await
        .expect("channel must redial after the host drops the connection")
        .unwrap();

    channel.send(OutboundMessage::EndEdit(EndEditMessage { context_id: 9 }));

    assert!(matches!(
        read_frame(&mut stream).await,
        OutboundMessage::Initialized(_)
    ));
    match read_frame(&mut stream).await {
        OutboundMessage::EndEdit(ee) => assert_eq!(ee.context_id, 9),
        other => panic!("expected EndEdit(9), got {other:?}"),
    }

    channel.shutdown().await;
}

// ── Inbound broadcast ─────────────────────────────────────────────────────────

/// Every subscriber sees every inbound message, even when an earlier
/// subscriber's delivery fails.
#[tokio::test]
async fn test_broadcast_reaches_all_subscribers_despite_one_failing() {
    let (_dir, path) = temp_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let channel = HostChannel::start(test_config(&path));

    let (tx, mut rx) = mpsc::unbounded_channel();
    channel.subscribe(Arc::new(FailingSubscriber));
    channel.subscribe(Arc::new(ForwardingSubscriber { tx }));

    let (mut stream, _) = listener.accept().await.unwrap();
    assert!(matches!(
        read_frame(&mut stream).await,
        OutboundMessage::Initialized(_)
    ));

    write_inbound(
        &mut stream,
        &InboundMessage::SetFocusText(SetFocusTextMessage {
            text: "from host".to_string(),
            append: false,
        }),
    )
    .await;
    write_inbound(
        &mut stream,
        &InboundMessage::GetFocusText(GetFocusTextMessage {
            selection_only: true,
        }),
    )
    .await;

    let first = time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("first broadcast")
        .unwrap();
    match first {
        InboundMessage::SetFocusText(set) => assert_eq!(set.text, "from host"),
        other => panic!("expected SetFocusText, got {other:?}"),
    }

    let second = time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("second broadcast")
        .unwrap();
    assert!(matches!(second, InboundMessage::GetFocusText(_)));

    channel.shutdown().await;
}

/// Full request/reply path: a `GetFocusText` from the host produces a
/// `FocusTextReply` carrying the editor's content.
#[tokio::test]
async fn test_get_focus_text_round_trip_through_edit_subscriber() {
    let (_dir, path) = temp_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let channel = HostChannel::start(test_config(&path));

    let editor = Arc::new(MockFocusEditor::new());
    *editor.buffer.lock().unwrap() = "current field text".to_string();
    let use_case = ApplyEditUseCase::new(Arc::clone(&editor) as _);
    channel.subscribe(Arc::new(EditSubscriber::new(use_case, channel.sender())));

    let (mut stream, _) = listener.accept().await.unwrap();
    assert!(matches!(
        read_frame(&mut stream).await,
        OutboundMessage::Initialized(_)
    ));

    write_inbound(
        &mut stream,
        &InboundMessage::GetFocusText(GetFocusTextMessage {
            selection_only: false,
        }),
    )
    .await;

    let reply = time::timeout(Duration::from_secs(2), read_frame(&mut stream))
        .await
        .expect("reply must arrive");
    match reply {
        OutboundMessage::FocusTextReply(reply) => {
            assert_eq!(reply.text, "current field text")
        }
        other => panic!("expected FocusTextReply, got {other:?}"),
    }

    channel.shutdown().await;
}

/// A `SetFocusText` from the host lands in the editor and produces no reply.
#[tokio::test]
async fn test_set_focus_text_is_applied_to_the_editor() {
    let (_dir, path) = temp_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let channel = HostChannel::start(test_config(&path));

    let editor = Arc::new(MockFocusEditor::new());
    let use_case = ApplyEditUseCase::new(Arc::clone(&editor) as _);
    channel.subscribe(Arc::new(EditSubscriber::new(use_case, channel.sender())));

    let (mut stream, _) = listener.accept().await.unwrap();
    assert!(matches!(
        read_frame(&mut stream).await,
        OutboundMessage::Initialized(_)
    ));

    write_inbound(
        &mut stream,
        &InboundMessage::SetFocusText(SetFocusTextMessage {
            text: "dictated text".to_string(),
            append: false,
        }),
    )
    .await;

    // Poll until the reader task has delivered the request.
    let deadline = time::Instant::now() + Duration::from_secs(2);
    loop {
        if editor.buffer.lock().unwrap().as_str() == "dictated text" {
            break;
        }
        assert!(
            time::Instant::now() < deadline,
            "editor must receive the replacement"
        );
        time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*editor.replacements.lock().unwrap(), vec![(
        "dictated text".to_string(),
        false
    )]);

    channel.shutdown().await;
}

// ── Shutdown ──────────────────────────────────────────────────────────────────

/// Shutdown completes in bounded time while a read is parked on a silent
/// host connection.
#[tokio::test]
async fn test_shutdown_is_bounded_while_read_is_parked() {
    let (_dir, path) = temp_socket_path();
    let listener = UnixListener::bind(&path).unwrap();
    let channel = HostChannel::start(test_config(&path));

    // Accept and hold the connection open without ever sending data, so the
    // client's read stays parked.
    let (stream, _) = listener.accept().await.unwrap();
    time::sleep(Duration::from_millis(50)).await;

    time::timeout(Duration::from_secs(2), channel.shutdown())
        .await
        .expect("shutdown must not hang on a silent host");
    drop(stream);
}

/// Messages still queued when shutdown begins are discarded, never sent,
/// even when the host becomes reachable right before the shutdown call.
#[tokio::test]
async fn test_queue_residue_is_discarded_at_shutdown() {
    let (_dir, path) = temp_socket_path();
    let config = ChannelConfig {
        // Long backoffs keep both loops parked once their first dial fails.
        send_retry_delay: Duration::from_secs(5),
        connect_retry_delay: Duration::from_secs(5),
        ..test_config(&path)
    };
    let channel = HostChannel::start(config);

    // No host yet: the first message is dequeued, fails to connect, and is
    // discarded; the writer parks in its retry backoff.
    channel.send(focus_changed(1));
    time::sleep(Duration::from_millis(100)).await;

    // These two are still queued when shutdown begins.
    channel.send(OutboundMessage::EndEdit(EndEditMessage { context_id: 2 }));
    channel.send(OutboundMessage::EndEdit(EndEditMessage { context_id: 3 }));

    // The host comes up just before shutdown; the residue must not chase it.
    let listener = UnixListener::bind(&path).unwrap();
    channel.shutdown().await;

    let post_shutdown_dial =
        time::timeout(Duration::from_millis(300), listener.accept()).await;
    assert!(
        post_shutdown_dial.is_err(),
        "messages queued at shutdown must be discarded, not sent"
    );
}

/// Shutdown also completes in bounded time when the host never existed.
#[tokio::test]
async fn test_shutdown_is_bounded_while_host_is_absent() {
    let (_dir, path) = temp_socket_path();
    let channel = HostChannel::start(test_config(&path));

    time::sleep(Duration::from_millis(50)).await;

    time::timeout(Duration::from_secs(2), channel.shutdown())
        .await
        .expect("shutdown must not hang while reconnecting");
}
