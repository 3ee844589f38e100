//! classview-ai - analyze one classroom image from the command line
//!
//! Prints the analysis as pretty JSON on stdout; logs go to stderr.
//!
//! ```text
//! classview-ai [--config PATH] [--roster N] [--skip-cache] [--stats] IMAGE
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use classview_ai::{AnalysisConfig, AnalyzeOptions, Analyzer};
use classview_common::config::LoggingConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for classview-ai
#[derive(Parser, Debug)]
#[command(name = "classview-ai")]
#[command(about = "Classroom image analysis: engagement, activity, safety and attendance")]
#[command(version)]
struct Args {
    /// Configuration file (overrides CLASSVIEW_CONFIG and the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Expected number of students; enables the attendance recommendation
    #[arg(short, long)]
    roster: Option<u32>,

    /// Ignore cached results
    #[arg(long)]
    skip_cache: bool,

    /// Include monitor statistics in the output
    #[arg(long)]
    stats: bool,

    /// Image file to analyze
    image: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = AnalysisConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&config.logging)?;

    info!("Starting classview-ai {}", env!("CARGO_PKG_VERSION"));

    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read image {}", args.image.display()))?;

    let analyzer = Analyzer::from_config(&config).context("Failed to initialize analyzer")?;

    let mut options = AnalyzeOptions::from_config(&config).with_skip_cache(args.skip_cache);
    if let Some(roster) = args.roster {
        options = options.with_expected_attendance(roster);
    }

    let result = analyzer
        .analyze(&image, &options)
        .await
        .with_context(|| format!("Analysis of {} failed", args.image.display()))?;

    let output = if args.stats {
        serde_json::json!({
            "analysis": result,
            "monitor": analyzer.monitor().snapshot(),
        })
    } else {
        serde_json::to_value(&result)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over `[logging] level`. Output goes to stderr, and is
/// also appended to `[logging] file` when set.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid logging level")?;

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}
