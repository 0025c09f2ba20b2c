//! Fake collaborators shared by the unit tests.

use crate::image_processor::PhotoWorker;
use crate::job::{JobDescriptor, MediaKind, SourceTimes, TagSnapshot};
use crate::metadata::{MetadataTool, TagScope, CAPTURE_TIME_TAG};
use crate::classifier::MimeSniffer;
use crate::progress::{JobOutcome, JobReport, Stage};
use crate::video_processor::{TranscodeStatus, Transcoder};
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Decides the mime type from the extension alone
pub struct ExtensionSniffer;

impl MimeSniffer for ExtensionSniffer {
    fn sniff(&self, path: &Path) -> Result<String> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let mime = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "mov" => "video/quicktime",
            "mp4" => "video/mp4",
            "txt" => "text/plain",
            "bin" => "application/octet-stream",
            "unreadable" => anyhow::bail!("cannot open {}", path.display()),
            _ => "application/x-unknown",
        };
        Ok(mime.to_string())
    }
}

/// Records every call; optionally fails all of them
#[derive(Default)]
pub struct RecordingMetadata {
    fail: bool,
    reads: AtomicUsize,
    copies: Mutex<Vec<(PathBuf, TagScope)>>,
    writes: Mutex<Vec<(PathBuf, TagSnapshot)>>,
}

impl RecordingMetadata {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn copies(&self) -> Vec<(PathBuf, TagScope)> {
        self.copies.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<(PathBuf, TagSnapshot)> {
        self.writes.lock().unwrap().clone()
    }
}

impl MetadataTool for RecordingMetadata {
    fn read_tags(&self, _source: &Path, _tags: &[&str]) -> Result<TagSnapshot> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("exiftool unavailable");
        }
        let mut tags = TagSnapshot::new();
        tags.insert(CAPTURE_TIME_TAG.to_string(), "2015:06:01 12:30:00".to_string());
        Ok(tags)
    }

    fn copy_tags(&self, _source: &Path, target: &Path, scope: TagScope) -> Result<()> {
        if self.fail {
            anyhow::bail!("exiftool unavailable");
        }
        self.copies.lock().unwrap().push((target.to_path_buf(), scope));
        Ok(())
    }

    fn write_tags(&self, target: &Path, tags: &TagSnapshot) -> Result<()> {
        if self.fail {
            anyhow::bail!("exiftool unavailable");
        }
        self.writes.lock().unwrap().push((target.to_path_buf(), tags.clone()));
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Copy,
    FailWithoutOutput,
    FailWithOutput,
    Hang,
}

/// Copies source to output and records the order it was called in
#[derive(Default)]
pub struct CopyingTranscoder {
    special: Vec<(String, Behaviour)>,
    order: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CopyingTranscoder {
    fn with(names: &[&str], behaviour: Behaviour) -> Self {
        Self {
            special: names.iter().map(|n| (n.to_string(), behaviour)).collect(),
            ..Default::default()
        }
    }

    pub fn failing_on(names: &[&str]) -> Self {
        Self::with(names, Behaviour::FailWithoutOutput)
    }

    pub fn nonzero_with_output(names: &[&str]) -> Self {
        Self::with(names, Behaviour::FailWithOutput)
    }

    pub fn hanging_on(names: &[&str]) -> Self {
        Self::with(names, Behaviour::Hang)
    }

    pub fn order(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn behaviour(&self, name: &str) -> Behaviour {
        self.special
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| *b)
            .unwrap_or(Behaviour::Copy)
    }
}

#[async_trait]
impl Transcoder for CopyingTranscoder {
    async fn transcode(&self, source: &Path, output: &Path) -> Result<TranscodeStatus> {
        let name = source.file_name().unwrap().to_string_lossy().into_owned();
        self.order.lock().unwrap().push(name.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;

        let status = match self.behaviour(&name) {
            Behaviour::Copy => {
                tokio::fs::copy(source, output).await?;
                TranscodeStatus { success: true, exit_code: Some(0), diagnostics: String::new() }
            }
            Behaviour::FailWithoutOutput => TranscodeStatus {
                success: false,
                exit_code: Some(1),
                diagnostics: "Invalid data found when processing input".to_string(),
            },
            Behaviour::FailWithOutput => {
                tokio::fs::copy(source, output).await?;
                TranscodeStatus {
                    success: false,
                    exit_code: Some(234),
                    diagnostics: "Non-monotonous DTS in output stream".to_string(),
                }
            }
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                TranscodeStatus { success: true, exit_code: Some(0), diagnostics: String::new() }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(status)
    }
}

/// Sleeps for each job and tracks how many ran at once
pub struct CountingPhotoWorker {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

impl CountingPhotoWorker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

impl PhotoWorker for CountingPhotoWorker {
    fn process(&self, job: &JobDescriptor) -> JobReport {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        JobReport::new(job, Stage::Photo, JobOutcome::Succeeded)
    }
}

/// Photo jobs with no files behind them
pub fn photo_jobs(count: usize) -> Vec<JobDescriptor> {
    let now = SystemTime::now();
    (0..count)
        .map(|id| {
            JobDescriptor::new(
                id,
                format!("IMG_{:04}.jpg", id),
                PathBuf::from(format!("/photos/IMG_{:04}.jpg", id)),
                PathBuf::from(format!("/photos/resized_1920x1080/IMG_{:04}_1920x1080.jpg", id)),
                MediaKind::Photo,
                "image/jpeg".to_string(),
                SourceTimes { accessed: now, modified: now },
            )
        })
        .collect()
}

/// Video job backed by a small file in `dir`, with tags captured as the classifier would
pub fn video_job(dir: &Path, id: usize, name: &str) -> JobDescriptor {
    let source = dir.join(name);
    std::fs::write(&source, b"frames").unwrap();
    let stem = Path::new(name).file_stem().unwrap().to_string_lossy().into_owned();
    let now = SystemTime::now();

    let mut tags = TagSnapshot::new();
    tags.insert(CAPTURE_TIME_TAG.to_string(), "2015:06:01 12:30:00".to_string());

    let mut job = JobDescriptor::new(
        id,
        name.to_string(),
        source,
        dir.join("resized_1920x1080").join(format!("{}_compressed.mp4", stem)),
        MediaKind::Video,
        "video/quicktime".to_string(),
        SourceTimes { accessed: now, modified: now },
    );
    job.source_tags = Some(tags);
    job
}
