//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'esecuzione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri del run
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! La configurazione è immutabile una volta validata: l'orchestratore la
//! avvolge in un `Arc<Config>` e la passa a ogni componente alla costruzione.
//!
//! ## Parametri di configurazione:
//! - `target`: Dimensioni massime delle foto (default: 1920x1080)
//! - `photo_quality`: Qualità JPEG (1-100, default: 85)
//! - `time_shift_hours`: Spostamento in ore applicato al modified time (default: 0)
//! - `photos_only` / `videos_only`: Esegue un solo stage
//! - `workers`: Worker paralleli per le foto (default: core disponibili - 2)
//! - `check_transcoder_status`: Considera fallito un exit code non-zero di ffmpeg
//! - `transcode_timeout_secs`: Timeout opzionale per la transcodifica
//! - `legacy_tag_copy`: Gestione tag per il sotto-tipo legacy (GIF)
//! - `json_output`: Eventi su stdout in formato JSON
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     photo_quality: 90,
//!     time_shift_hours: -5,
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Bounding box for resized photos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Tag handling for the legacy image sub-type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyTagCopy {
    /// Copy every tag, same as any other photo
    #[default]
    CopyAll,
    /// Copy only the comment tag
    CommentOnly,
}

/// Largest accepted time shift in either direction, about a thousand years
pub const MAX_TIME_SHIFT_HOURS: i64 = 24 * 365 * 1000;

/// Configuration for one resize run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bounding box for photos (never upscaled)
    pub target: Dimensions,
    /// JPEG quality (1-100)
    pub photo_quality: u8,
    /// Hours added to the captured modified time before it is re-applied
    pub time_shift_hours: i64,
    /// Skip the video stage
    pub photos_only: bool,
    /// Skip the photo stage
    pub videos_only: bool,
    /// Number of parallel photo workers (None = available cores - 2, at least 1)
    pub workers: Option<usize>,
    /// Fail a video when the transcoder exits with a non-zero status
    pub check_transcoder_status: bool,
    /// Kill the transcoder after this many seconds (None = wait forever)
    pub transcode_timeout_secs: Option<u64>,
    /// Tag handling for the legacy image sub-type
    pub legacy_tag_copy: LegacyTagCopy,
    /// Output events as JSON lines for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: Dimensions::default(),
            photo_quality: 85,
            time_shift_hours: 0,
            photos_only: false,
            videos_only: false,
            workers: None,
            check_transcoder_status: true,
            transcode_timeout_secs: None,
            legacy_tag_copy: LegacyTagCopy::default(),
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.target.width == 0 || self.target.height == 0 {
            return Err(anyhow::anyhow!("Target dimensions must be greater than 0 (got {})", self.target));
        }

        if self.photo_quality == 0 || self.photo_quality > 100 {
            return Err(anyhow::anyhow!("Photo quality must be between 1 and 100"));
        }

        if self.photos_only && self.videos_only {
            return Err(anyhow::anyhow!("photos-only and videos-only cannot be combined"));
        }

        if self.time_shift_hours.unsigned_abs() > MAX_TIME_SHIFT_HOURS.unsigned_abs() {
            return Err(anyhow::anyhow!(
                "Time shift must be within ±{} hours (got {})",
                MAX_TIME_SHIFT_HOURS,
                self.time_shift_hours
            ));
        }

        if self.workers == Some(0) {
            return Err(anyhow::anyhow!("Number of workers must be greater than 0"));
        }

        if self.transcode_timeout_secs == Some(0) {
            return Err(anyhow::anyhow!("Transcode timeout must be greater than 0 seconds"));
        }

        Ok(())
    }

    /// Effective photo pool size
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(default_worker_count)
    }

    /// Name of the output subdirectory created inside the input folder
    pub fn output_dir_name(&self) -> String {
        format!("resized_{}", self.target)
    }

    pub fn runs_photos(&self) -> bool {
        !self.videos_only
    }

    pub fn runs_videos(&self) -> bool {
        !self.photos_only
    }

    /// Load configuration from file; a missing file is an error
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Leave two cores to the rest of the host
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}
