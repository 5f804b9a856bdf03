//! Nobel laureates harvester: entry point.

use clap::Parser;
use tracing::{debug, info, warn};

use nobel_laureates::progress::{self, ProgressEventKind, ProgressReceiver};
use nobel_laureates_cli::{build_harvester, ConfigOverrides, HarvestConfig};

/// Log a progress line every this many emitted records.
const SUMMARY_EVERY: u32 = 50;

#[derive(Parser)]
#[command(
    name = "nobel-laureates",
    about = "Harvest Nobel laureate records from Wikipedia and Wikidata as JSON lines",
    version
)]
struct Cli {
    /// Listing page to start from. Also reads NOBEL_START_URL.
    #[arg(long)]
    start_url: Option<String>,

    /// Output file, or `-` for stdout. Also reads NOBEL_OUTPUT.
    #[arg(short, long)]
    output: Option<String>,

    /// Directory for downloaded portraits. Also reads NOBEL_IMAGES_DIR.
    #[arg(long)]
    images_dir: Option<String>,

    /// Skip portrait download; records keep their candidate URLs.
    #[arg(long)]
    no_images: bool,

    /// Maximum laureates processed at once.
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Per-request timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// User-Agent header sent with every request.
    #[arg(long)]
    user_agent: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = HarvestConfig::resolve(ConfigOverrides {
        start_url: cli.start_url,
        output: cli.output,
        images_dir: cli.images_dir,
        no_images: cli.no_images,
        concurrency: cli.concurrency,
        timeout_ms: cli.timeout_ms,
        user_agent: cli.user_agent,
    })?;
    info!(
        "harvesting {} into {:?} (concurrency {})",
        config.start_url, config.output, config.concurrency
    );

    let (tx, rx) = progress::channel();
    let logger = tokio::spawn(log_progress(rx));
    let harvester = build_harvester(&config).await?.with_progress(tx);

    let shutdown = harvester.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping");
            shutdown.notify_one();
        }
    });

    let result = harvester.run(&config.start_url).await;
    drop(harvester);
    let _ = logger.await;

    let summary = result?;
    if summary.sink_errors > 0 {
        warn!("{} records could not be written", summary.sink_errors);
    }
    if summary.images_stored > 0 {
        info!(
            "{} portraits stored under {}",
            summary.images_stored,
            config.images_dir.display()
        );
    }
    Ok(())
}

/// Drain progress events, logging a running tally at debug level.
async fn log_progress(mut rx: ProgressReceiver) {
    use tokio::sync::broadcast::error::RecvError;

    let mut emitted = 0u32;
    let mut halted = 0u32;
    loop {
        match rx.recv().await {
            Ok(event) => match event.event {
                ProgressEventKind::RecordEmitted { .. } => {
                    emitted += 1;
                    if emitted % SUMMARY_EVERY == 0 {
                        debug!("progress: {emitted} emitted, {halted} halted");
                    }
                }
                ProgressEventKind::EntityHalted { link, stage, reason } => {
                    halted += 1;
                    debug!("halted {link} at {stage}: {reason}");
                }
                ProgressEventKind::Warning { message } => debug!("{message}"),
                _ => {}
            },
            Err(RecvError::Lagged(n)) => debug!("progress logger skipped {n} events"),
            Err(RecvError::Closed) => break,
        }
    }
}
