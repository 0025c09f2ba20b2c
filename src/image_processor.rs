//! # Image Processing Module
//!
//! Questo modulo esegue il lavoro di un singolo job foto.
//!
//! ## Pipeline per job:
//! 1. **Decode**: apertura con formato dedotto dal contenuto (non dall'estensione)
//! 2. **Bounding box**: calcolo della dimensione finale, mai upscaling
//! 3. **Resize**: filtro Lanczos3
//! 4. **Encode**: JPEG alla qualità configurata, sempre (alpha scartato)
//! 5. **Scrittura atomica**: file temporaneo nella directory di output, poi `persist`
//! 6. **Tag**: copia dei metadata sorgente → output (warning se fallisce)
//!
//! Il worker è sincrono: il photo pool lo esegue su un thread bloccante.
//!
//! ## Esempio:
//! ```rust,ignore
//! let resizer = PhotoResizer::new(config, metadata);
//! let report = resizer.process(&job);
//! ```

use crate::classifier::LEGACY_IMAGE_MIME;
use crate::config::{Config, Dimensions, LegacyTagCopy};
use crate::error::ResizeError;
use crate::file_manager::FileManager;
use crate::job::JobDescriptor;
use crate::metadata::{MetadataTool, TagScope};
use crate::progress::{JobOutcome, JobReport, Stage};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, GenericImageView};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

/// Work executed for each photo job
pub trait PhotoWorker: Send + Sync {
    fn process(&self, job: &JobDescriptor) -> JobReport;
}

/// Largest size that fits `source` inside `target`, preserving aspect ratio.
///
/// Returns `source` unchanged when it already fits.
pub fn fit_within(source: (u32, u32), target: Dimensions) -> (u32, u32) {
    let (width, height) = source;
    if width <= target.width && height <= target.height {
        return source;
    }

    let scale = f64::min(
        target.width as f64 / width as f64,
        target.height as f64 / height as f64,
    );

    let new_width = ((width as f64 * scale).round() as u32).clamp(1, target.width);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, target.height);
    (new_width, new_height)
}

/// Resizes photos in process and copies their tags with the metadata tool
pub struct PhotoResizer {
    config: Arc<Config>,
    metadata: Arc<dyn MetadataTool>,
}

impl PhotoResizer {
    pub fn new(config: Arc<Config>, metadata: Arc<dyn MetadataTool>) -> Self {
        Self { config, metadata }
    }

    fn tag_scope(&self, job: &JobDescriptor) -> TagScope {
        if job.source_mime == LEGACY_IMAGE_MIME && self.config.legacy_tag_copy == LegacyTagCopy::CommentOnly {
            TagScope::CommentOnly
        } else {
            TagScope::All
        }
    }

    fn resize(&self, job: &JobDescriptor) -> Result<(u32, u32), ResizeError> {
        let source = image::io::Reader::open(&job.source_path)?
            .with_guessed_format()?
            .decode()?;

        let original = GenericImageView::dimensions(&source);
        let (width, height) = fit_within(original, self.config.target);
        debug!(
            "Resizing {} from {}x{} to {}x{}",
            job.input_name, original.0, original.1, width, height
        );

        let resized = if (width, height) == original {
            source
        } else {
            source.resize_exact(width, height, FilterType::Lanczos3)
        };
        let rgb = resized.to_rgb8();

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, self.config.photo_quality)
            .encode(rgb.as_raw(), width, height, ColorType::Rgb8)?;

        let output_dir = job.output_dir();
        FileManager::ensure_dir(output_dir).map_err(|e| ResizeError::Transform(e.to_string()))?;

        let mut temp_file = NamedTempFile::new_in(output_dir)?;
        temp_file.write_all(&encoded)?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(&job.output_path)
            .map_err(|e| ResizeError::Io(e.error))?;
        make_world_readable(&job.output_path);
        debug!(
            "Wrote {} ({})",
            job.output_path.display(),
            FileManager::format_size(encoded.len() as u64)
        );

        Ok((width, height))
    }
}

impl PhotoWorker for PhotoResizer {
    fn process(&self, job: &JobDescriptor) -> JobReport {
        match self.resize(job) {
            Ok(_) => {
                let warning = self
                    .metadata
                    .copy_tags(&job.source_path, &job.output_path, self.tag_scope(job))
                    .err()
                    .map(|e| {
                        warn!("Metadata not preserved for {}: {}", job.input_name, e);
                        format!("tags not copied: {}", e)
                    });
                JobReport::new(job, Stage::Photo, JobOutcome::Succeeded).with_warning(warning)
            }
            Err(e) => {
                error!("Failed to resize {}: {}", job.input_name, e);
                JobReport::new(job, Stage::Photo, JobOutcome::Failed(e.to_string()))
            }
        }
    }
}

// Temp files are created owner-only
#[cfg(unix)]
fn make_world_readable(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)) {
        debug!("Could not relax permissions on {}: {}", path.display(), e);
    }
}

#[cfg(not(unix))]
fn make_world_readable(_path: &std::path::Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{MediaKind, SourceTimes};
    use crate::test_support::RecordingMetadata;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::path::Path;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn photo_job(dir: &Path, name: &str, mime: &str) -> JobDescriptor {
        let now = SystemTime::now();
        JobDescriptor::new(
            0,
            name.to_string(),
            dir.join(name),
            dir.join("resized_192x108").join(format!("{}_192x108.jpg", name)),
            MediaKind::Photo,
            mime.to_string(),
            SourceTimes { accessed: now, modified: now },
        )
    }

    fn resizer(config: Config) -> (PhotoResizer, Arc<RecordingMetadata>) {
        let metadata = Arc::new(RecordingMetadata::default());
        (PhotoResizer::new(Arc::new(config), metadata.clone()), metadata)
    }

    #[test]
    fn test_fit_within_never_upscales() {
        let target = Dimensions::new(1920, 1080);
        assert_eq!(fit_within((800, 600), target), (800, 600));
        assert_eq!(fit_within((1920, 1080), target), (1920, 1080));
        assert_eq!(fit_within((3840, 2160), target), (1920, 1080));
        assert_eq!(fit_within((4000, 3000), target), (1440, 1080));
        assert_eq!(fit_within((3000, 4000), target), (810, 1080));
        assert_eq!(fit_within((10000, 1), target), (1920, 1));
    }

    #[test]
    fn test_png_with_alpha_becomes_jpeg_within_target() {
        let temp_dir = TempDir::new().unwrap();
        let source = RgbaImage::from_pixel(600, 400, Rgba([10, 200, 30, 128]));
        DynamicImage::ImageRgba8(source)
            .save(temp_dir.path().join("logo.png"))
            .unwrap();

        let config = Config { target: Dimensions::new(192, 108), ..Default::default() };
        let (resizer, metadata) = resizer(config);
        let job = photo_job(temp_dir.path(), "logo.png", "image/png");

        let report = resizer.process(&job);
        assert_eq!(report.outcome, JobOutcome::Succeeded);
        assert!(report.warnings.is_empty());
        assert_eq!(metadata.copies(), vec![(job.output_path.clone(), TagScope::All)]);

        let output = image::io::Reader::open(&job.output_path)
            .unwrap()
            .with_guessed_format()
            .unwrap();
        assert_eq!(output.format(), Some(image::ImageFormat::Jpeg));
        let output = output.decode().unwrap();
        assert_eq!(GenericImageView::dimensions(&output), (162, 108));
    }

    #[test]
    fn test_corrupt_photo_fails_without_output() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("broken.jpg"), b"\xFF\xD8 not really").unwrap();

        let (resizer, metadata) = resizer(Config::default());
        let job = photo_job(temp_dir.path(), "broken.jpg", "image/jpeg");

        let report = resizer.process(&job);
        assert!(matches!(report.outcome, JobOutcome::Failed(_)));
        assert!(report.output_path.is_none());
        assert!(!job.output_path.exists());
        assert!(metadata.copies().is_empty());
    }

    #[test]
    fn test_tag_failure_keeps_output() {
        let temp_dir = TempDir::new().unwrap();
        RgbaImage::from_pixel(20, 10, Rgba([0, 0, 0, 255]))
            .save(temp_dir.path().join("small.png"))
            .unwrap();

        let metadata = Arc::new(RecordingMetadata::failing());
        let resizer = PhotoResizer::new(Arc::new(Config::default()), metadata);
        let job = photo_job(temp_dir.path(), "small.png", "image/png");

        let report = resizer.process(&job);
        assert_eq!(report.outcome, JobOutcome::Succeeded);
        assert_eq!(report.warnings.len(), 1);
        assert!(job.output_path.exists());
    }

    #[test]
    fn test_legacy_subtype_scope() {
        let temp_dir = TempDir::new().unwrap();
        let gif = photo_job(temp_dir.path(), "anim.gif", LEGACY_IMAGE_MIME);
        let jpeg = photo_job(temp_dir.path(), "pic.jpg", "image/jpeg");

        let (copy_all, _) = resizer(Config::default());
        assert_eq!(copy_all.tag_scope(&gif), TagScope::All);

        let (comment_only, _) = resizer(Config {
            legacy_tag_copy: LegacyTagCopy::CommentOnly,
            ..Default::default()
        });
        assert_eq!(comment_only.tag_scope(&gif), TagScope::CommentOnly);
        assert_eq!(comment_only.tag_scope(&jpeg), TagScope::All);
    }
}
