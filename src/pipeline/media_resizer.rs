//! # Media Resizer Orchestrator
//!
//! Orchestratore del run: delega il lavoro ai componenti specializzati.
//!
//! ## Flusso:
//! 1. Validazione della cartella (file o inesistente → errore, nascosta → uscita silenziosa)
//! 2. Listing piatto e classificazione
//! 3. Stage foto e stage video in concorrenza (`tokio::join!`)
//! 4. Per ogni stage, dopo la sua barriera: pass dei timestamp
//! 5. Aggregazione dei risultati e riepilogo
//!
//! La cartella di output viene creata solo se almeno un job la usa.

use crate::classifier::{Classifier, FileCommandSniffer, MimeSniffer};
use crate::config::Config;
use crate::error::ResizeError;
use crate::events::{EventSink, RunEvent};
use crate::file_manager::FileManager;
use crate::image_processor::{PhotoResizer, PhotoWorker};
use crate::job::JobDescriptor;
use crate::metadata::{ExifTool, MetadataTool, TimestampSync};
use crate::pipeline::photo_pool::PhotoPool;
use crate::pipeline::video_queue::VideoQueue;
use crate::platform::PlatformCommands;
use crate::progress::{JobReport, ResultAggregator, RunSummary, Stage};
use crate::video_processor::{FfmpegTranscoder, Transcoder};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct MediaResizer {
    config: Arc<Config>,
    classifier: Classifier,
    photo_pool: PhotoPool,
    video_queue: VideoQueue,
    events: Arc<dyn EventSink>,
}

impl MediaResizer {
    /// Build a resizer backed by `file`, `exiftool` and `ffmpeg`
    pub fn new(config: Config, events: Arc<dyn EventSink>) -> Result<Self> {
        Self::with_collaborators(
            config,
            Arc::new(FileCommandSniffer),
            Arc::new(ExifTool::new()),
            Arc::new(FfmpegTranscoder::new()),
            events,
        )
    }

    /// Build a resizer around explicit collaborators
    pub fn with_collaborators(
        config: Config,
        sniffer: Arc<dyn MimeSniffer>,
        metadata: Arc<dyn MetadataTool>,
        transcoder: Arc<dyn Transcoder>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ResizeError::Configuration(e.to_string()))?;
        let config = Arc::new(config);

        let photo_worker: Arc<dyn PhotoWorker> =
            Arc::new(PhotoResizer::new(Arc::clone(&config), Arc::clone(&metadata)));

        Ok(Self {
            classifier: Classifier::new(Arc::clone(&config), sniffer, Arc::clone(&metadata)),
            photo_pool: PhotoPool::new(photo_worker, config.worker_count(), Arc::clone(&events)),
            video_queue: VideoQueue::new(Arc::clone(&config), transcoder, metadata, Arc::clone(&events)),
            config,
            events,
        })
    }

    /// Replace the per-photo work
    pub fn with_photo_worker(mut self, worker: Arc<dyn PhotoWorker>) -> Self {
        self.photo_pool = PhotoPool::new(worker, self.config.worker_count(), Arc::clone(&self.events));
        self
    }

    /// Reject anything that is not a visible directory
    pub fn validate_folder(folder: &Path) -> Result<(), ResizeError> {
        if folder.is_file() {
            return Err(ResizeError::Configuration(format!(
                "Program only handles folders, not files: {}",
                folder.display()
            )));
        }
        if !folder.is_dir() {
            return Err(ResizeError::Configuration(format!(
                "Folder does not exist: {}",
                folder.display()
            )));
        }
        if FileManager::is_hidden(folder) {
            return Err(ResizeError::HiddenFolder(folder.to_path_buf()));
        }
        Ok(())
    }

    /// Resize every photo and transcode every video in `folder`
    pub async fn run(&self, folder: &Path) -> Result<RunSummary> {
        let start_time = Instant::now();
        Self::validate_folder(folder)?;

        let entries = FileManager::list_entries(folder)?;
        debug!("Found {} entries in {}", entries.len(), folder.display());

        let classifier = self.classifier.clone();
        let folder_owned = folder.to_path_buf();
        let classification =
            tokio::task::spawn_blocking(move || classifier.classify(&folder_owned, &entries)).await??;

        self.events.emit(&RunEvent::RunStarted {
            folder: folder.to_path_buf(),
            output_dir: folder.join(self.config.output_dir_name()),
            photos: classification.photos.len(),
            videos: classification.videos.len(),
            skipped: classification.skipped.len(),
            workers: self.photo_pool.workers(),
        });

        let photo_stage = self.run_stage(Stage::Photo, &classification.photos);
        let video_stage = self.run_stage(Stage::Video, &classification.videos);
        let (photo_reports, video_reports) = tokio::join!(photo_stage, video_stage);

        let mut aggregator = ResultAggregator::new();
        aggregator.record_all(photo_reports);
        aggregator.record_all(video_reports);
        aggregator.record_skipped(classification.skipped);
        let summary = aggregator.finish();

        self.events.emit(&RunEvent::RunCompleted {
            tally: summary.tally(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        });
        info!("{}", summary.format_summary());

        Ok(summary)
    }

    async fn run_stage(&self, stage: Stage, jobs: &[JobDescriptor]) -> Vec<JobReport> {
        if jobs.is_empty() {
            return Vec::new();
        }

        let mut reports = match stage {
            Stage::Photo => self.photo_pool.run(jobs).await,
            Stage::Video => self.video_queue.run(jobs).await,
        };

        let applied = TimestampSync::apply(jobs, &mut reports);
        self.events.emit(&RunEvent::TimestampsApplied {
            stage,
            applied,
            shift_hours: self.config.time_shift_hours,
        });

        reports
    }
}

/// Warn about external tools missing from PATH; the run goes on regardless
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let platform = PlatformCommands::instance();
    let mut tools = vec!["file", "exiftool"];
    if config.runs_videos() {
        tools.push("ffmpeg");
    }

    let mut missing = Vec::new();
    for tool in tools {
        if !platform.is_command_available(tool).await {
            let err = ResizeError::MissingDependency(format!("{} not found on PATH", platform.get_command(tool)));
            warn!("{}", err);
            missing.push(tool.to_string());
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dimensions;
    use crate::events::NullSink;
    use crate::progress::JobOutcome;
    use crate::test_support::{CopyingTranscoder, ExtensionSniffer, RecordingMetadata};
    use filetime::FileTime;
    use image::{GenericImageView, Rgb, RgbImage};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const SOURCE_MTIME: i64 = 1_400_000_000;
    const SOURCE_ATIME: i64 = 1_500_000_000;

    fn resizer(config: Config) -> MediaResizer {
        MediaResizer::with_collaborators(
            config,
            Arc::new(ExtensionSniffer),
            Arc::new(RecordingMetadata::default()),
            Arc::new(CopyingTranscoder::default()),
            Arc::new(NullSink),
        )
        .unwrap()
    }

    // tempfile's default names start with a dot, which the run treats as hidden
    fn input_dir() -> TempDir {
        tempfile::Builder::new().prefix("album").tempdir().unwrap()
    }

    fn write_photo(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, Rgb([120, 80, 40])).save(&path).unwrap();
        set_source_times(&path);
        path
    }

    fn write_video(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"not really a movie").unwrap();
        set_source_times(&path);
        path
    }

    fn set_source_times(path: &Path) {
        filetime::set_file_times(
            path,
            FileTime::from_unix_time(SOURCE_ATIME, 0),
            FileTime::from_unix_time(SOURCE_MTIME, 0),
        )
        .unwrap();
    }

    fn times_of(path: &Path) -> (i64, i64) {
        let metadata = fs::metadata(path).unwrap();
        (
            FileTime::from_last_access_time(&metadata).unix_seconds(),
            FileTime::from_last_modification_time(&metadata).unix_seconds(),
        )
    }

    #[tokio::test]
    async fn test_oversized_jpegs_fit_target_and_keep_mtime() {
        let temp_dir = input_dir();
        write_photo(temp_dir.path(), "wide.jpg", 600, 400);
        write_photo(temp_dir.path(), "tall.jpg", 300, 900);
        write_photo(temp_dir.path(), "tiny.jpg", 50, 20);

        let config = Config { target: Dimensions::new(192, 108), workers: Some(2), ..Default::default() };
        let summary = resizer(config).run(temp_dir.path()).await.unwrap();

        let tally = summary.tally();
        assert_eq!(tally.succeeded, 3);
        assert_eq!(tally.failed, 0);

        let output_dir = temp_dir.path().join("resized_192x108");
        let expected = [("wide", (162, 108)), ("tall", (36, 108)), ("tiny", (50, 20))];
        for (stem, dims) in expected {
            let output = output_dir.join(format!("{}_192x108.jpg", stem));
            // Check times before decoding bumps atime
            assert_eq!(times_of(&output), (SOURCE_ATIME, SOURCE_MTIME));
            let decoded = image::open(&output).unwrap();
            assert_eq!(GenericImageView::dimensions(&decoded), dims, "{}", stem);
        }
    }

    #[tokio::test]
    async fn test_videos_only_with_time_shift() {
        let temp_dir = input_dir();
        write_photo(temp_dir.path(), "photo.jpg", 40, 40);
        write_video(temp_dir.path(), "clip.mov");

        let config = Config { videos_only: true, time_shift_hours: -5, ..Default::default() };
        let summary = resizer(config).run(temp_dir.path()).await.unwrap();

        assert_eq!(summary.reports_for(Stage::Photo).count(), 0);
        assert_eq!(summary.reports_for(Stage::Video).count(), 1);

        let output_dir = temp_dir.path().join("resized_1920x1080");
        let video_output = output_dir.join("clip_compressed.mp4");
        assert_eq!(times_of(&video_output), (SOURCE_ATIME, SOURCE_MTIME - 5 * 3600));
        assert!(!output_dir.join("photo_1920x1080.jpg").exists());
    }

    #[tokio::test]
    async fn test_hidden_folder_exits_before_any_output() {
        let temp_dir = input_dir();
        let hidden = temp_dir.path().join(".private");
        fs::create_dir(&hidden).unwrap();
        write_photo(&hidden, "secret.jpg", 400, 400);

        let err = resizer(Config::default()).run(&hidden).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ResizeError>(), Some(ResizeError::HiddenFolder(_))));
        assert!(!hidden.join("resized_1920x1080").exists());

        assert!(matches!(
            MediaResizer::validate_folder(Path::new(".")),
            Err(ResizeError::HiddenFolder(_))
        ));
    }

    #[tokio::test]
    async fn test_file_instead_of_folder_is_configuration_error() {
        let temp_dir = input_dir();
        let file = write_video(temp_dir.path(), "clip.mov");

        let err = resizer(Config::default()).run(&file).await.unwrap_err();
        let err = err.downcast_ref::<ResizeError>().unwrap();
        assert!(matches!(err, ResizeError::Configuration(_)));

        let missing = temp_dir.path().join("nope");
        assert!(MediaResizer::validate_folder(&missing).is_err());
    }

    #[tokio::test]
    async fn test_one_corrupt_photo_among_many() {
        let temp_dir = input_dir();
        for i in 0..4 {
            write_photo(temp_dir.path(), &format!("ok{}.jpg", i), 300, 200);
        }
        fs::write(temp_dir.path().join("corrupt.jpg"), b"garbage bytes").unwrap();

        let config = Config { target: Dimensions::new(100, 100), ..Default::default() };
        let summary = resizer(config).run(temp_dir.path()).await.unwrap();

        let tally = summary.tally();
        assert_eq!(tally.succeeded, 4);
        assert_eq!(tally.failed, 1);

        let failures: Vec<_> = summary.failures().map(|r| r.input_name.as_str()).collect();
        assert_eq!(failures, vec!["corrupt.jpg"]);

        let outputs = fs::read_dir(temp_dir.path().join("resized_100x100")).unwrap().count();
        assert_eq!(outputs, 4);
    }

    #[tokio::test]
    async fn test_mixed_folder_runs_both_stages() {
        let temp_dir = input_dir();
        write_photo(temp_dir.path(), "a.jpg", 64, 64);
        write_video(temp_dir.path(), "b.mov");
        write_video(temp_dir.path(), "c.mp4");
        fs::write(temp_dir.path().join("notes.txt"), b"hello").unwrap();
        fs::write(temp_dir.path().join(".DS_Store"), b"junk").unwrap();

        let summary = resizer(Config::default()).run(temp_dir.path()).await.unwrap();
        let tally = summary.tally();

        assert_eq!(tally.succeeded, 3);
        assert_eq!(tally.skipped, 2);

        let sequences: Vec<_> = summary
            .reports_for(Stage::Video)
            .map(|r| (r.input_name.as_str(), r.sequence))
            .collect();
        assert_eq!(sequences, vec![("b.mov", Some(1)), ("c.mp4", Some(2))]);
        assert!(summary.reports.iter().all(|r| r.outcome == JobOutcome::Succeeded));
    }

    #[tokio::test]
    async fn test_rerun_does_not_count_own_output_dir() {
        let temp_dir = input_dir();
        write_photo(temp_dir.path(), "a.jpg", 64, 64);

        let resizer = resizer(Config::default());
        resizer.run(temp_dir.path()).await.unwrap();
        let summary = resizer.run(temp_dir.path()).await.unwrap();

        let tally = summary.tally();
        assert_eq!(tally.succeeded, 1);
        assert_eq!(tally.skipped, 0);
    }

    #[tokio::test]
    async fn test_empty_folder_creates_no_output_dir() {
        let temp_dir = input_dir();
        let summary = resizer(Config::default()).run(temp_dir.path()).await.unwrap();

        assert_eq!(summary.tally().total(), 0);
        assert!(!temp_dir.path().join("resized_1920x1080").exists());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config { photo_quality: 0, ..Default::default() };
        let result = MediaResizer::with_collaborators(
            config,
            Arc::new(ExtensionSniffer),
            Arc::new(RecordingMetadata::default()),
            Arc::new(CopyingTranscoder::default()),
            Arc::new(NullSink),
        );
        let err = result.err().unwrap();
        assert!(matches!(err.downcast_ref::<ResizeError>(), Some(ResizeError::Configuration(_))));
    }
}
