//! frame-relay display server: entry point.
//!
//! Listens for one relay client, keeps the newest received images, and
//! shows the ones the client asks for at a fixed display rate.
//!
//! ```text
//! relay-client ──TCP──► Endpoint (server) ──next_received──► FrameIntake
//!                                                              │
//!                          FrameSink ◄── DisplayRouter ◄───────┘
//! ```
//!
//! # What happens at startup
//!
//! 1. CLI arguments are parsed and folded over the TOML config file.
//! 2. Logging is initialised from `RUST_LOG`, else from `[server] log_level`.
//! 3. The listening endpoint is started on a blocking thread; startup
//!    returns once the first client has been admitted.
//! 4. The display router starts its drain thread with the configured sink.
//! 5. The display loop runs at `fps` until Ctrl+C.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use relay_comm::{diagnostics, start_server, EndpointOptions};
use relay_core::DisplayRouter;
use relay_server::application::frame_intake::{snapshot_file_name, FrameIntake};
use relay_server::infrastructure::cli::Cli;
use relay_server::infrastructure::config::AppConfig;
use relay_server::infrastructure::frame_sink::{into_display_function, sink_for};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    cli.apply_to(&mut config);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    info!("relay-server starting on port {}", config.server.port);

    // ── Transport ─────────────────────────────────────────────────────────────
    let options = EndpointOptions {
        settings: config.comm_settings(),
        ..EndpointOptions::default()
    };
    let port = config.server.port.clone();
    let endpoint = tokio::task::spawn_blocking(move || start_server(Some(&port), &options))
        .await
        .context("server startup task failed")?;
    let Some(endpoint) = endpoint else {
        bail!("could not start server on port {}", config.server.port);
    };
    let port_label = endpoint
        .local_port()
        .map_or_else(|| config.server.port.clone(), |p| p.to_string());
    info!("client connected; display loop at {} fps", config.server.fps);

    // ── Display ───────────────────────────────────────────────────────────────
    let router = Arc::new(DisplayRouter::new());
    router.set_display_function(into_display_function(sink_for(
        config.server.frame_output.as_deref(),
    )));
    router.start().context("starting display thread")?;

    let mut intake = FrameIntake::new(Arc::clone(&router), config.server.cached_images);
    let snapshot_every = config.comm.stats_dump_every;
    let snapshot_path = config
        .server
        .diagnostics_dir
        .as_ref()
        .filter(|_| snapshot_every > 0)
        .map(|dir| dir.join(snapshot_file_name(&port_label)));

    // ── Display loop ──────────────────────────────────────────────────────────
    let mut ticker = tokio::time::interval(config.tick_period());
    let mut ticks: u64 = 0;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
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

        intake.poll(&endpoint);
        intake.tick(Instant::now());
        ticks += 1;

        if let Some(path) = &snapshot_path {
            if ticks % snapshot_every == 0 {
                if let Err(e) = diagnostics::write_snapshot(path, |out| intake.write_snapshot(out)) {
                    warn!("{e}");
                }
            }
        }
    }

    router.stop();
    endpoint.disconnect();
    info!(
        "relay-server stopped after {} ticks, {} images",
        ticks,
        intake.counters().images
    );
    Ok(())
}
