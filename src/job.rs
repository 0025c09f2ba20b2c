//! # Job Descriptor Module
//!
//! Un `JobDescriptor` per ogni file di input: nasce nel classifier, viene
//! consumato da uno solo tra photo pool e video queue, poi riletto (solo
//! lettura) dal pass di sincronizzazione dei timestamp.
//!
//! ## Naming output:
//! - Foto: `{nome}_{W}x{H}.jpg`
//! - Video: `{nome}_compressed.mp4`
//!
//! Se due input producono lo stesso nome (es. `a.png` e `a.jpg`), il secondo
//! incorpora l'estensione sorgente nel nome (`a_jpg_1920x1080.jpg`) così che
//! ogni output resti unico nel run.

use crate::config::Dimensions;
use crate::error::ResizeError;
use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Extension of every photo output
pub const PHOTO_EXTENSION: &str = "jpg";
/// Extension of every video output
pub const VIDEO_EXTENSION: &str = "mp4";

/// Tag name to value, captured before transformation
pub type TagSnapshot = BTreeMap<String, String>;

/// Kind of media decided at classification time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Skipped,
}

impl MediaKind {
    /// Decide the kind from a sniffed mime type
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Photo
        } else if mime.starts_with("video/") {
            Self::Video
        } else {
            Self::Skipped
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photo => write!(f, "photo"),
            Self::Video => write!(f, "video"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Timestamps captured from a source file at enumeration time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTimes {
    pub accessed: SystemTime,
    pub modified: SystemTime,
}

impl SourceTimes {
    /// Apply the configured hour shift to the modified time
    pub fn shifted(self, hours: i64) -> Result<Self, ResizeError> {
        let modified: DateTime<Local> = self.modified.into();
        let shifted = Duration::try_hours(hours)
            .and_then(|delta| modified.checked_add_signed(delta))
            .ok_or_else(|| {
                ResizeError::Configuration(format!("time shift of {}h is out of range", hours))
            })?;
        Ok(Self {
            accessed: self.accessed,
            modified: shifted.into(),
        })
    }

    /// Render the modified time for logs and events
    pub fn modified_display(&self) -> String {
        let modified: DateTime<Local> = self.modified.into();
        modified.format("%Y-%m-%d %H:%M:%S %:z").to_string()
    }
}

/// One input file and everything the stages need to process it
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    pub id: usize,
    pub input_name: String,
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    kind: MediaKind,
    pub source_mime: String,
    pub times: SourceTimes,
    pub source_tags: Option<TagSnapshot>,
}

impl JobDescriptor {
    pub fn new(
        id: usize,
        input_name: String,
        source_path: PathBuf,
        output_path: PathBuf,
        kind: MediaKind,
        source_mime: String,
        times: SourceTimes,
    ) -> Self {
        Self {
            id,
            input_name,
            source_path,
            output_path,
            kind,
            source_mime,
            times,
            source_tags: None,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Directory the output lands in
    pub fn output_dir(&self) -> &Path {
        self.output_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Output file name for an input; `None` for skipped kinds
pub fn output_file_name(input_name: &str, kind: MediaKind, target: Dimensions) -> Option<String> {
    let stem = Path::new(input_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| input_name.to_string());

    match kind {
        MediaKind::Photo => Some(format!("{}_{}.{}", stem, target, PHOTO_EXTENSION)),
        MediaKind::Video => Some(format!("{}_compressed.{}", stem, VIDEO_EXTENSION)),
        MediaKind::Skipped => None,
    }
}

/// Same as `output_file_name`, with the source extension folded into the stem
pub fn disambiguated_file_name(input_name: &str, kind: MediaKind, target: Dimensions) -> Option<String> {
    output_file_name(&input_name.replace('.', "_"), kind, target)
}
