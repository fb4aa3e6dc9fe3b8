//! Camera stream server
//!
//! Usage:
//! ```
//! camstream --config camstream.yaml --frames ./stills --port 8081
//! ```

use anyhow::{Context, Result};
use camstream::server::{self, AppState};
use camstream::{Config, FrameSource, Indicator, LogIndicator, NoCamera, ReplaySource};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Motion-JPEG camera stream server", long_about = None)]
struct Args {
    /// YAML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listening port, overriding the configuration
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory of JPEG stills to replay, overriding the configuration
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// Log per-frame statistics
    #[arg(short, long)]
    debug: bool,
}

fn init_tracing(debug: bool) {
    let default = if debug { "info,camstream=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(frames) = &args.frames {
        config.source.directory = frames.clone();
    }
    if args.debug {
        config.stream.debug_data = true;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Open the camera; a failure is recorded as the critical error so the
/// server comes up in degraded mode.
fn open_camera(config: &mut Config) -> Box<dyn FrameSource> {
    match ReplaySource::open(&config.source.directory, config.source.pool_size) {
        Ok(source) => match config.source.capture_fps {
            Some(fps) => Box::new(source.with_capture_rate(fps)),
            None => Box::new(source),
        },
        Err(e) => {
            error!(error = %e, "Camera init failed");
            if config.critical_error().is_none() {
                config.critical_error = Some(format!("Camera init failed: {e}"));
            }
            Box::new(NoCamera)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut config = load_config(&args)?;
    let source = open_camera(&mut config);
    if let Some(message) = config.critical_error() {
        warn!("Starting in degraded mode: {}", message);
    }

    let indicator: Arc<dyn Indicator> = Arc::new(LogIndicator::new());
    let state = AppState::from_config(&config, source, indicator);

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received"),
            Err(e) => error!(error = %e, "Unable to listen for interrupt"),
        }
        on_signal.cancel();
    });

    server::serve(&config, state, shutdown).await?;
    Ok(())
}
