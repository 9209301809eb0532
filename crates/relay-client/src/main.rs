//! frame-relay camera client: entry point.
//!
//! Connects to every configured display server, then broadcasts one frame
//! per tick until `repeat_count` frames have been sent or Ctrl+C.
//!
//! ```text
//! FrameSource ──► FrameBroadcast ──► Endpoint (client) ──TCP──► relay-server
//!                                    Endpoint (client) ──TCP──► relay-server
//! ```
//!
//! Startup is all-or-nothing: if any server cannot be reached, every
//! connection that did succeed is closed and the client exits with an error.

use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use relay_client::application::frame_broadcast::FrameBroadcast;
use relay_client::infrastructure::cli::Cli;
use relay_client::infrastructure::config::AppConfig;
use relay_client::infrastructure::frame_source::FrameSource;
use relay_comm::{start_clients, EndpointOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    cli.apply_to(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.client.log_level)),
        )
        .init();

    let mut source = FrameSource::open(config.client.frame_dir.as_deref(), config.frame_len())
        .context("opening frame source")?;

    // ── Transport ─────────────────────────────────────────────────────────────
    let (ips, ports) = config.peer_lists();
    info!("relay-client connecting to {} server(s)", ports.len().max(1));
    let options = EndpointOptions {
        settings: config.comm.clone(),
        ..EndpointOptions::default()
    };
    let peers = tokio::task::spawn_blocking(move || start_clients(&ips, &ports, &options))
        .await
        .context("client startup task failed")?;
    if peers.is_empty() {
        bail!("could not connect to every server");
    }

    // ── Broadcast loop ────────────────────────────────────────────────────────
    let mut broadcast = FrameBroadcast::new(
        config.client.names.clone(),
        config.client.send_display_now,
    );
    broadcast.start(&peers).context("sending start-timer")?;

    let repeat = config.client.repeat_count;
    let began = Instant::now();
    let mut ticker = tokio::time::interval(config.tick_period());
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    while repeat == 0 || broadcast.frames_sent() < repeat {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = &mut shutdown => {
                match signal {
                    Ok(()) => info!("shutdown signal received"),
                    Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
                }
                break;
            }
        }

        if let Err(e) = broadcast.broadcast(&peers, source.next_frame()) {
            warn!("{e}; stopping");
            break;
        }
        broadcast.collect_replies(&peers);
    }

    for peer in &peers {
        peer.disconnect();
    }
    let seconds = began.elapsed().as_secs_f64();
    info!(
        "relay-client sent {} frame(s) in {seconds:.2}s, {} replies",
        broadcast.frames_sent(),
        broadcast.replies()
    );
    Ok(())
}
