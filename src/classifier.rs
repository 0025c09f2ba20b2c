//! # Classifier Module
//!
//! Trasforma il listing della cartella in job tipizzati.
//!
//! ## Responsabilità:
//! - Sniffing del mime type tramite `MimeSniffer` (default: `file --brief --mime-type`)
//! - Partizione in job foto, job video ed entry saltate
//! - Calcolo di output path univoci nel run
//! - Cattura dei timestamp sorgente (con time shift applicato)
//! - Snapshot dei tag dei video prima della transcodifica
//!
//! Un errore di sniffing su un singolo file non interrompe il run: il file
//! viene registrato come saltato e si passa al successivo.

use crate::config::Config;
use crate::error::ResizeError;
use crate::file_manager::FileManager;
use crate::job::{disambiguated_file_name, output_file_name, JobDescriptor, MediaKind};
use crate::metadata::{MetadataTool, VIDEO_SNAPSHOT_TAGS};
use crate::platform::PlatformCommands;
use anyhow::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reserved generic binary type, never processed
pub const GENERIC_BINARY_MIME: &str = "application/octet-stream";
/// Image sub-type whose tag copy is configurable
pub const LEGACY_IMAGE_MIME: &str = "image/gif";

/// Contract with the content-type sniffer
pub trait MimeSniffer: Send + Sync {
    fn sniff(&self, path: &Path) -> Result<String>;
}

/// Sniffs content with `file --brief --mime-type`
#[derive(Debug, Default, Clone)]
pub struct FileCommandSniffer;

impl MimeSniffer for FileCommandSniffer {
    fn sniff(&self, path: &Path) -> Result<String> {
        let platform = PlatformCommands::instance();
        let file_cmd = platform.get_command("file");

        let output = Command::new(file_cmd)
            .args(["--brief", "--mime-type"])
            .arg(path)
            .output()
            .map_err(|e| anyhow::anyhow!("Failed to execute {}: {}", file_cmd, e))?;

        if !output.status.success() {
            return Err(ResizeError::Classification(format!(
                "{} failed on {}: {}",
                file_cmd,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into());
        }

        let mime = String::from_utf8_lossy(&output.stdout).trim().to_ascii_lowercase();
        if mime.is_empty() {
            return Err(ResizeError::Classification(format!("empty mime type for {}", path.display())).into());
        }
        Ok(mime)
    }
}

/// Entry excluded at classification time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub input_name: String,
    pub reason: String,
}

impl SkippedEntry {
    pub fn new(input_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input_name: input_name.into(),
            reason: reason.into(),
        }
    }
}

/// Jobs partitioned by stage
#[derive(Debug, Default)]
pub struct Classification {
    pub photos: Vec<JobDescriptor>,
    pub videos: Vec<JobDescriptor>,
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Clone)]
pub struct Classifier {
    config: Arc<Config>,
    sniffer: Arc<dyn MimeSniffer>,
    metadata: Arc<dyn MetadataTool>,
}

impl Classifier {
    pub fn new(config: Arc<Config>, sniffer: Arc<dyn MimeSniffer>, metadata: Arc<dyn MetadataTool>) -> Self {
        Self { config, sniffer, metadata }
    }

    /// Classify the flat `entries` listing of `folder`.
    ///
    /// Job ids follow the order of `entries`, whichever stage a job lands in.
    /// Kinds excluded by the stage selection are recorded as skipped.
    /// The run's own output directory is left out of the listing entirely.
    pub fn classify(&self, folder: &Path, entries: &[PathBuf]) -> Result<Classification> {
        let output_dir = folder.join(self.config.output_dir_name());
        let mut classification = Classification::default();
        let mut taken: HashSet<PathBuf> = HashSet::new();
        let mut next_id = 0;

        for path in entries {
            let input_name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };

            if *path == output_dir {
                debug!("Ignoring output directory {}", input_name);
                continue;
            }

            if FileManager::is_hidden_name(&input_name) {
                debug!("Skipping hidden entry {}", input_name);
                classification.skipped.push(SkippedEntry::new(input_name, "hidden entry"));
                continue;
            }
            if !path.is_file() {
                debug!("Skipping non-file entry {}", input_name);
                classification.skipped.push(SkippedEntry::new(input_name, "not a regular file"));
                continue;
            }

            // Captured before sniffing reads the content
            let times = match FileManager::capture_times(path)
                .and_then(|times| Ok(times.shifted(self.config.time_shift_hours)?))
            {
                Ok(times) => times,
                Err(e) => {
                    warn!("Could not capture timestamps of {}: {}", input_name, e);
                    classification
                        .skipped
                        .push(SkippedEntry::new(input_name, format!("timestamps unavailable: {}", e)));
                    continue;
                }
            };

            let mime = match self.sniffer.sniff(path) {
                Ok(mime) => mime,
                Err(e) => {
                    warn!("Could not determine type of {}: {}", input_name, e);
                    classification
                        .skipped
                        .push(SkippedEntry::new(input_name, format!("classification failed: {}", e)));
                    continue;
                }
            };

            if mime == GENERIC_BINARY_MIME {
                warn!("Ignoring {}: generic binary content", input_name);
                classification
                    .skipped
                    .push(SkippedEntry::new(input_name, format!("reserved type {}", mime)));
                continue;
            }

            let kind = MediaKind::from_mime(&mime);
            let stage_enabled = match kind {
                MediaKind::Photo => self.config.runs_photos(),
                MediaKind::Video => self.config.runs_videos(),
                MediaKind::Skipped => {
                    debug!("Ignoring {} ({})", input_name, mime);
                    classification
                        .skipped
                        .push(SkippedEntry::new(input_name, format!("unsupported type {}", mime)));
                    continue;
                }
            };
            if !stage_enabled {
                debug!("Ignoring {}: {} stage disabled", input_name, kind);
                classification
                    .skipped
                    .push(SkippedEntry::new(input_name, format!("{} stage disabled", kind)));
                continue;
            }

            let output_path = self.unique_output_path(&output_dir, &input_name, kind, next_id, &mut taken);
            let mut job = JobDescriptor::new(
                next_id,
                input_name,
                path.clone(),
                output_path,
                kind,
                mime,
                times,
            );
            next_id += 1;

            match kind {
                MediaKind::Photo => classification.photos.push(job),
                MediaKind::Video => {
                    job.source_tags = Some(self.capture_snapshot(&job));
                    classification.videos.push(job);
                }
                MediaKind::Skipped => {}
            }
        }

        info!(
            "Classified {} photos, {} videos, {} skipped",
            classification.photos.len(),
            classification.videos.len(),
            classification.skipped.len()
        );

        Ok(classification)
    }

    fn unique_output_path(
        &self,
        output_dir: &Path,
        input_name: &str,
        kind: MediaKind,
        id: usize,
        taken: &mut HashSet<PathBuf>,
    ) -> PathBuf {
        let target = self.config.target;
        let candidates = [
            output_file_name(input_name, kind, target),
            disambiguated_file_name(input_name, kind, target),
            disambiguated_file_name(&format!("{}.{}", input_name, id), kind, target),
        ];

        for name in candidates.into_iter().flatten() {
            let path = output_dir.join(name);
            if taken.insert(path.clone()) {
                return path;
            }
            debug!("Output name {} already taken", path.display());
        }

        // Only reachable if even the id-suffixed name repeats
        let fallback = output_dir.join(format!("{}_{}", id, input_name));
        taken.insert(fallback.clone());
        fallback
    }

    fn capture_snapshot(&self, job: &JobDescriptor) -> crate::job::TagSnapshot {
        match self.metadata.read_tags(&job.source_path, VIDEO_SNAPSHOT_TAGS) {
            Ok(tags) => {
                debug!("Captured {} tags from {}", tags.len(), job.input_name);
                tags
            }
            Err(e) => {
                warn!("Could not capture tags of {}: {}", job.input_name, e);
                Default::default()
            }
        }
    }
}
