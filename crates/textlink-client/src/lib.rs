//! textlink-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does textlink-client do?
//!
//! The client runs alongside a text-service *host* process on the same
//! machine and keeps a resilient duplex IPC channel to it over a Unix
//! socket:
//!
//! 1. Connects to the host socket and identifies itself with an
//!    `Initialized` handshake carrying its process id.
//! 2. Forwards focus lifecycle events (`FocusChanged`, `EndEdit`) from its
//!    outbound queue, strictly in order, discarding messages while the host
//!    is unreachable.
//! 3. Receives `GetFocusText` and `SetFocusText` requests from the host and
//!    applies them to the focused text field through a `FocusTextEditor`.
//! 4. Reconnects automatically whenever the host restarts, with no action
//!    required from producers or subscribers.

/// Application layer: use cases for the client.
pub mod application;

/// Infrastructure layer: host channel, editors, and configuration.
pub mod infrastructure;
