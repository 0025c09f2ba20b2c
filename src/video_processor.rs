//! # Video Processing Module
//!
//! Questo modulo incapsula la transcodifica video con FFmpeg.
//!
//! ## Preset fisso:
//! - Codec video: libx264, preset `slow`, CRF 23, profilo `high`, `yuv420p`
//! - Codec audio: AAC 128k
//! - Container: MP4 con `+faststart` (moov atom in testa, streaming-friendly)
//!
//! FFmpeg è trattato come risorsa singleton: la video queue garantisce che ci
//! sia al massimo una transcodifica in corso. Il processo figlio viene
//! terminato se il future viene droppato (timeout della queue).
//!
//! ## Esito:
//! `TranscodeStatus` riporta exit code e diagnostica (stderr a `-loglevel error`);
//! decidere se è un fallimento spetta al chiamante (`check_transcoder_status`).

use crate::platform::PlatformCommands;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

pub const VIDEO_CODEC: &str = "libx264";
pub const VIDEO_PRESET: &str = "slow";
pub const VIDEO_CRF: u8 = 23;
pub const VIDEO_PROFILE: &str = "high";
pub const PIXEL_FORMAT: &str = "yuv420p";
pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_BITRATE: &str = "128k";

/// Outcome of one transcoder invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeStatus {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Whatever the transcoder printed on stderr
    pub diagnostics: String,
}

impl TranscodeStatus {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.trim().is_empty()
    }
}

/// Contract with the external video transcoder
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Run one transcode; `Err` only when the transcoder could not be run at all
    async fn transcode(&self, source: &Path, output: &Path) -> Result<TranscodeStatus>;
}

#[derive(Debug, Default, Clone)]
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self
    }

    /// Arguments for the fixed preset
    pub fn preset_args(source: &Path, output: &Path) -> Vec<String> {
        let crf = VIDEO_CRF.to_string();
        let mut args: Vec<String> = [
            "-hide_banner", "-nostdin",
            "-loglevel", "error",
            "-y",
            "-i",
        ]
        .map(String::from)
        .to_vec();
        args.push(source.to_string_lossy().into_owned());
        args.extend(
            [
                "-c:v", VIDEO_CODEC,
                "-preset", VIDEO_PRESET,
                "-crf", crf.as_str(),
                "-profile:v", VIDEO_PROFILE,
                "-pix_fmt", PIXEL_FORMAT,
                "-c:a", AUDIO_CODEC,
                "-b:a", AUDIO_BITRATE,
                "-movflags", "+faststart",
                "-f", "mp4",
            ]
            .map(String::from),
        );
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, source: &Path, output: &Path) -> Result<TranscodeStatus> {
        let platform = PlatformCommands::instance();
        let ffmpeg_cmd = platform.get_command("ffmpeg");

        debug!("🎬 Transcoding {} -> {}", source.display(), output.display());
        let start_time = std::time::Instant::now();

        let result = Command::new(ffmpeg_cmd)
            .args(Self::preset_args(source, output))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to execute {}: {}", ffmpeg_cmd, e))?;

        debug!(
            "FFmpeg finished in {:.1}s with {}",
            start_time.elapsed().as_secs_f64(),
            result.status
        );

        Ok(TranscodeStatus {
            success: result.status.success(),
            exit_code: result.status.code(),
            diagnostics: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        })
    }
}
