//! Infrastructure layer for the client.
//!
//! Contains host-facing adapters: the IPC channel to the host process, the
//! focus-field editor implementations, and configuration loading.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `textlink_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`channel`** – Unix-socket client that connects to the host, performs
//!   the `Initialized` handshake, drains the outbound queue, reads framed
//!   inbound requests, and reconnects automatically if the connection drops.
//!
//! - **`editor`** – Implementations of `FocusTextEditor` plus the subscriber
//!   that wires host requests to the editor and sends replies back.
//!
//! - **`config`** – TOML configuration file loading and saving.

pub mod channel;
pub mod config;
pub mod editor;
