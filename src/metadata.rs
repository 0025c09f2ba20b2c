//! # Metadata Synchronization Module
//!
//! Questo modulo gestisce la preservazione dei metadata tra sorgente e output.
//!
//! ## Responsabilità:
//! - `MetadataTool`: contratto verso il tool esterno di lettura/scrittura tag
//! - `ExifTool`: implementazione basata su `exiftool`
//! - `TimestampSync`: pass finale che riapplica accessed/modified time agli output
//!
//! ## Flusso:
//! 1. **Video**: snapshot dei tag catturato in classificazione (ffmpeg non li preserva)
//! 2. **Foto**: copia diretta dei tag sorgente → output dal worker
//! 3. **Video**: scrittura dello snapshot sull'output dopo la transcodifica
//! 4. **Timestamp**: dopo la barriera dello stage, per ogni output esistente
//!
//! La scrittura dei tag riscrive il file, quindi avviene sempre prima del pass
//! dei timestamp. Un errore sui metadata non annulla mai un resize riuscito.

use crate::error::ResizeError;
use crate::job::{JobDescriptor, TagSnapshot};
use crate::platform::PlatformCommands;
use crate::progress::JobReport;
use anyhow::Result;
use filetime::FileTime;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Tag that carries the original capture time of a video
pub const CAPTURE_TIME_TAG: &str = "CreateDate";

/// Tags captured from videos before transcoding
pub const VIDEO_SNAPSHOT_TAGS: &[&str] = &[
    CAPTURE_TIME_TAG,
    "ModifyDate",
    "DateTimeOriginal",
    "TrackCreateDate",
    "TrackModifyDate",
    "MediaCreateDate",
    "MediaModifyDate",
    "GPSCoordinates",
    "Make",
    "Model",
];

/// Which tags a photo copy carries over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagScope {
    /// Every writable tag except the stale pixel dimensions
    All,
    /// Only the comment tag
    CommentOnly,
}

/// Contract with the external metadata tool
pub trait MetadataTool: Send + Sync {
    /// Read the given tags from `source`
    fn read_tags(&self, source: &Path, tags: &[&str]) -> Result<TagSnapshot>;

    /// Copy tags straight from `source` onto `target`
    fn copy_tags(&self, source: &Path, target: &Path, scope: TagScope) -> Result<()>;

    /// Write a previously captured snapshot onto `target`
    fn write_tags(&self, target: &Path, tags: &TagSnapshot) -> Result<()>;
}

/// `exiftool` backed metadata tool
#[derive(Debug, Default, Clone)]
pub struct ExifTool;

impl ExifTool {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, args: Vec<String>, what: &str) -> Result<String> {
        let platform = PlatformCommands::instance();
        let exiftool_cmd = platform.get_command("exiftool");

        let output = Command::new(exiftool_cmd)
            .args(&args)
            .output()
            .map_err(|e| anyhow::anyhow!("Failed to execute {} for {}: {}", exiftool_cmd, what, e))?;

        if !output.status.success() {
            return Err(ResizeError::Metadata(format!(
                "exiftool failed to {}: {}",
                what,
                String::from_utf8_lossy(&output.stderr).trim()
            ))
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl MetadataTool for ExifTool {
    fn read_tags(&self, source: &Path, tags: &[&str]) -> Result<TagSnapshot> {
        let mut args = vec!["-json".to_string(), "-n".to_string()];
        args.extend(tags.iter().map(|tag| format!("-{}", tag)));
        args.push(source.to_string_lossy().into_owned());

        let stdout = self.run(args, "read tags")?;
        parse_exiftool_json(&stdout)
    }

    fn copy_tags(&self, source: &Path, target: &Path, scope: TagScope) -> Result<()> {
        let mut args = vec![
            "-tagsFromFile".to_string(),
            source.to_string_lossy().into_owned(),
        ];
        match scope {
            TagScope::All => args.extend(
                ["-all:all", "--ExifImageWidth", "--ExifImageHeight"].map(String::from),
            ),
            TagScope::CommentOnly => args.push("-Comment".to_string()),
        }
        args.extend(["-m", "-overwrite_original"].map(String::from));
        args.push(target.to_string_lossy().into_owned());

        self.run(args, "copy tags").map(|_| ())
    }

    fn write_tags(&self, target: &Path, tags: &TagSnapshot) -> Result<()> {
        if tags.is_empty() {
            debug!("No tags to write on {}", target.display());
            return Ok(());
        }

        let mut args = vec!["-n".to_string(), "-m".to_string(), "-overwrite_original".to_string()];
        args.extend(tags.iter().map(|(tag, value)| format!("-{}={}", tag, value)));
        args.push(target.to_string_lossy().into_owned());

        self.run(args, "write tags").map(|_| ())
    }
}

/// Parse the single-object array `exiftool -json` prints
pub fn parse_exiftool_json(stdout: &str) -> Result<TagSnapshot> {
    let parsed: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(stdout)?;
    let object = parsed
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("exiftool returned no records"))?;

    Ok(object
        .into_iter()
        .filter(|(tag, _)| tag != "SourceFile")
        .map(|(tag, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (tag, value)
        })
        .collect())
}

/// Re-applies captured timestamps once a stage has drained
pub struct TimestampSync;

impl TimestampSync {
    /// Apply `(accessed, modified)` of each job to its output, when the output exists.
    ///
    /// Returns the number of outputs touched. Failures become warnings on the report.
    pub fn apply(jobs: &[JobDescriptor], reports: &mut [JobReport]) -> usize {
        let mut applied = 0;

        for report in reports.iter_mut() {
            let Some(job) = jobs.iter().find(|job| job.id == report.job_id) else {
                continue;
            };
            if !job.output_path.exists() {
                debug!("No output to timestamp for {}", job.input_name);
                continue;
            }

            let accessed = FileTime::from_system_time(job.times.accessed);
            let modified = FileTime::from_system_time(job.times.modified);

            match filetime::set_file_times(&job.output_path, accessed, modified) {
                Ok(()) => {
                    debug!(
                        "Applied timestamps to {} (modified {})",
                        job.output_path.display(),
                        job.times.modified_display()
                    );
                    applied += 1;
                }
                Err(e) => {
                    warn!("Failed to set timestamps on {}: {}", job.output_path.display(), e);
                    report.warnings.push(format!("timestamps not applied: {}", e));
                }
            }
        }

        applied
    }
}
