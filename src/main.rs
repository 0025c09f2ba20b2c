//! # Media Resizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Costruzione della configurazione (file JSON opzionale + flag CLI)
//! - Scelta del sink di presentazione (JSON, progress bar o solo log)
//! - Traduzione degli errori fatali in exit code
//!
//! ## Exit code:
//! - `0`: run completato (anche con fallimenti parziali, vedi riepilogo)
//! - `0`: cartella nascosta, uscita silenziosa senza output
//! - `1`: il path è un file, non esiste, o la configurazione non è valida
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-resizer ~/Pictures/2015-06-trip --videos-only --time-shift=-5 -v
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};

use media_resizer::pipeline::check_dependencies;
use media_resizer::platform::PlatformCommands;
use media_resizer::{
    Config, EventSink, JsonSink, LegacyTagCopy, LogSink, MediaResizer, ProgressSink, ResizeError,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LegacyTags {
    CopyAll,
    CommentOnly,
}

impl From<LegacyTags> for LegacyTagCopy {
    fn from(value: LegacyTags) -> Self {
        match value {
            LegacyTags::CopyAll => LegacyTagCopy::CopyAll,
            LegacyTags::CommentOnly => LegacyTagCopy::CommentOnly,
        }
    }
}

#[derive(Parser)]
#[command(name = "media-resizer")]
#[command(version)]
#[command(about = "Resize photos and transcode videos while keeping their capture metadata")]
struct Args {
    /// Folder containing the photos and videos to process
    folder: PathBuf,

    /// Quiet the logging to only ERROR level
    #[arg(short, long)]
    quiet: bool,

    /// Verbose output (INFO level)
    #[arg(short, long)]
    verbose: bool,

    /// Very verbose output (DEBUG level)
    #[arg(long)]
    debug: bool,

    /// Only resize photos
    #[arg(long, conflicts_with = "videos_only")]
    photos_only: bool,

    /// Only transcode videos
    #[arg(long)]
    videos_only: bool,

    /// Hours added to every output's modified time (e.g. --time-shift=-5)
    #[arg(long, allow_hyphen_values = true)]
    time_shift: Option<i64>,

    /// Maximum photo width
    #[arg(long)]
    width: Option<u32>,

    /// Maximum photo height
    #[arg(long)]
    height: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u8>,

    /// Number of parallel photo workers (default: available cores - 2)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Load settings from a JSON config file; flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this JSON file before running
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Output events as JSON lines for programmatic use
    #[arg(long)]
    json: bool,

    /// Kill a transcode that runs longer than this many seconds
    #[arg(long)]
    transcode_timeout: Option<u64>,

    /// Keep a video whose transcoder exits non-zero if it produced output
    #[arg(long)]
    ignore_transcoder_status: bool,

    /// Tag handling for GIF sources
    #[arg(long, value_enum)]
    legacy_tags: Option<LegacyTags>,
}

impl Args {
    fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.debug {
            tracing::Level::DEBUG
        } else if self.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }

    async fn build_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path).await?,
            None => Config::default(),
        };

        if let Some(width) = self.width {
            config.target.width = width;
        }
        if let Some(height) = self.height {
            config.target.height = height;
        }
        if let Some(quality) = self.quality {
            config.photo_quality = quality;
        }
        if let Some(hours) = self.time_shift {
            config.time_shift_hours = hours;
        }
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(secs) = self.transcode_timeout {
            config.transcode_timeout_secs = Some(secs);
        }
        if let Some(legacy) = self.legacy_tags {
            config.legacy_tag_copy = legacy.into();
        }
        config.photos_only |= self.photos_only;
        config.videos_only |= self.videos_only;
        config.json_output |= self.json;
        if self.ignore_transcoder_status {
            config.check_transcoder_status = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging; stdout stays free for JSON events
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    debug!("Running on {}", PlatformCommands::system_info());

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ResizeError>() {
            Some(ResizeError::HiddenFolder(folder)) => {
                debug!("Ignoring hidden folder {}", folder.display());
                ExitCode::SUCCESS
            }
            _ => {
                error!("{}", e);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(args: &Args) -> Result<()> {
    let config = args
        .build_config()
        .await
        .map_err(|e| ResizeError::Configuration(e.to_string()))?;

    if let Some(path) = &args.save_config {
        config.save_to_file(path).await?;
        info!("Saved configuration to {}", path.display());
    }

    // Fail fast before probing tools
    MediaResizer::validate_folder(&args.folder)?;

    let missing = check_dependencies(&config).await;
    if !missing.is_empty() {
        info!("Continuing without: {}", missing.join(", "));
    }

    let events: Arc<dyn EventSink> = if config.json_output {
        Arc::new(JsonSink)
    } else if args.quiet || args.verbose || args.debug {
        Arc::new(LogSink)
    } else {
        Arc::new(ProgressSink::new())
    };

    info!(
        "Target {} at quality {}, time shift {}h",
        config.target, config.photo_quality, config.time_shift_hours
    );

    let print_summary = !config.json_output && !args.quiet;
    let resizer = MediaResizer::new(config, events)?;
    let summary = resizer.run(&args.folder).await?;

    if print_summary {
        eprintln!("{}", summary.format_summary());
    }

    Ok(())
}
