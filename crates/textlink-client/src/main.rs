//! textlink client application entry point.
//!
//! Wires together the host channel, the edit use case, and the focus-field
//! editor, then parks on the shutdown signal while the channel's background
//! tasks do the work.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML config with per-field defaults
//!  └─ HostChannel::start()     -- spawns writer + reader loops
//!  └─ subscribe(EditSubscriber) -- GetFocusText / SetFocusText handling
//!  └─ ctrl_c().await           -- then bounded shutdown
//! ```
//!
//! # Focus-field editor
//!
//! The `MockFocusEditor` used here applies edits to an in-memory buffer
//! rather than a real focused field.  In a production build it is replaced
//! by a desktop-specific `FocusTextEditor` implementation (AT-SPI on Linux,
//! the accessibility API on macOS).

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use textlink_client::application::apply_edit::ApplyEditUseCase;
use textlink_client::infrastructure::{
    channel::{ChannelConfig, HostChannel},
    config::load_config,
    editor::{mock::MockFocusEditor, EditSubscriber},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialise structured logging. RUST_LOG overrides the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.client.log_level.clone())),
        )
        .init();

    info!("textlink client starting");

    let channel_config = ChannelConfig::from(&config.channel);
    info!(socket = %channel_config.socket_path.display(), "connecting to host");

    let channel = HostChannel::start(channel_config);

    // ── Edit handling ─────────────────────────────────────────────────────────
    // In production: replace MockFocusEditor with the desktop-specific
    // FocusTextEditor implementation.
    let editor = Arc::new(MockFocusEditor::new());
    let use_case = ApplyEditUseCase::new(editor);
    channel.subscribe(Arc::new(EditSubscriber::new(use_case, channel.sender())));

    info!("textlink client ready");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    channel.shutdown().await;

    info!("textlink client stopped");
    Ok(())
}
