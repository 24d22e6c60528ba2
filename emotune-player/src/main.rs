//! Emotune player (emotune) - Main entry point
//!
//! Reads classifier output (recorded JSON lines from a file or stdin),
//! reports the detected expression and crossfades to the matching track.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use emotune_common::config::{ConfigResolver, ConfigSource, RetriggerPolicy, TomlConfig};
use emotune_common::events::EventBus;
use emotune_common::PresentationMapper;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emotune_player::audio::{AudioBackend, CpalBackend, NullBackend};
use emotune_player::detection::{ExpressionSource, ReplaySource};
use emotune_player::driver::{DetectionDriver, DriverOptions, DriverStats};
use emotune_player::playback::{CrossfadeScheduler, FadeParams};
use emotune_player::ui::{JsonLinesSink, PresentationSink, TracingSink};

/// Command-line arguments for emotune
#[derive(Parser, Debug)]
#[command(name = "emotune")]
#[command(about = "Plays music that follows the detected facial expression")]
#[command(version)]
struct Args {
    /// Config file (overrides EMOTUNE_CONFIG and the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Classifier output to replay, one JSON line per poll tick ("-" for stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Restart the input file from the top when it ends
    #[arg(long = "loop")]
    loop_input: bool,

    /// Run without audio output
    #[arg(long)]
    no_audio: bool,

    /// Write UI updates to stdout as JSON lines
    #[arg(long)]
    json: bool,

    /// Directory holding the per-emotion tracks
    #[arg(long, env = "EMOTUNE_SOUNDS_DIR")]
    sounds_dir: Option<PathBuf>,

    /// Detection poll period in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// When to restart the crossfade: every_tick or on_change
    #[arg(long)]
    retrigger: Option<String>,

    /// Log filter, e.g. "debug" or "emotune_player=trace"
    #[arg(long, env = "EMOTUNE_LOG")]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Resolve configuration before logging so [logging] can set the filter
    let (mut config, config_source) = ConfigResolver::new(args.config.clone())
        .resolve()
        .context("Failed to load configuration")?;
    apply_overrides(&mut config, &args)?;

    // Initialize tracing
    let filter = match &args.log_level {
        Some(filter) => filter.clone(),
        None => format!(
            "emotune_player={0},emotune_common={0}",
            config.logging.level
        ),
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting emotune v{}", env!("CARGO_PKG_VERSION"));
    match &config_source {
        ConfigSource::CompiledDefaults => info!("Configuration: compiled defaults"),
        ConfigSource::CommandLine(path)
        | ConfigSource::Environment(path)
        | ConfigSource::DefaultLocation(path) => info!("Configuration: {}", path.display()),
    }
    info!("Sounds directory: {}", config.sounds.dir.display());

    let backend = open_backend(&config, args.no_audio);
    let scheduler = Arc::new(CrossfadeScheduler::new(
        backend,
        FadeParams::from(&config.fade),
        EventBus::default(),
    ));

    let source = if args.input == "-" {
        if args.loop_input {
            warn!("--loop has no effect when reading stdin");
        }
        info!("Reading detections from stdin");
        ReplaySource::stdin()
    } else {
        let path = PathBuf::from(&args.input);
        ReplaySource::open(&path, args.loop_input)
            .await
            .with_context(|| format!("Failed to open input {}", path.display()))?
    };

    let mapper = PresentationMapper::new(&config.sounds);
    let options = DriverOptions::from(&config);

    let stats = if args.json {
        let sink = JsonLinesSink::new(std::io::stdout());
        drive(source, sink, mapper, Arc::clone(&scheduler), options).await
    } else {
        drive(source, TracingSink::new(), mapper, Arc::clone(&scheduler), options).await
    };

    scheduler.shutdown().await;

    info!(
        "Shutdown complete: {} play requests, {} failed",
        stats.play_requests, stats.play_failures
    );
    Ok(())
}

/// Apply command-line overrides on top of the resolved config
fn apply_overrides(config: &mut TomlConfig, args: &Args) -> Result<()> {
    if let Some(dir) = &args.sounds_dir {
        config.sounds.dir = dir.clone();
    }
    if let Some(ms) = args.poll_interval_ms {
        config.detection.poll_interval_ms = ms;
    }
    if let Some(policy) = &args.retrigger {
        config.detection.retrigger = policy
            .parse::<RetriggerPolicy>()
            .context("Invalid --retrigger value")?;
    }
    if args.no_audio {
        config.audio.enabled = false;
    }

    config.validate().context("Invalid configuration")?;
    Ok(())
}

/// Open the audio device, or fall back to silent playback
fn open_backend(config: &TomlConfig, no_audio: bool) -> Arc<dyn AudioBackend> {
    if no_audio || !config.audio.enabled {
        info!("Audio output disabled");
        return Arc::new(NullBackend);
    }

    match CpalBackend::open(config.audio.device.as_deref()) {
        Ok(backend) => {
            info!("Audio output on {}", backend.device_name());
            Arc::new(backend)
        }
        Err(e) => {
            warn!("Audio output unavailable, continuing without sound: {}", e);
            Arc::new(NullBackend)
        }
    }
}

async fn drive<S, K>(
    source: S,
    sink: K,
    mapper: PresentationMapper,
    scheduler: Arc<CrossfadeScheduler>,
    options: DriverOptions,
) -> DriverStats
where
    S: ExpressionSource,
    K: PresentationSink,
{
    let mut driver = DetectionDriver::new(source, sink, mapper, scheduler, options);
    driver.run(shutdown_signal()).await
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
