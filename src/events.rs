//! # Run Events Module
//!
//! Il core non stampa nulla direttamente: emette `RunEvent` verso un `EventSink`.
//!
//! ## Tipi di evento:
//! - `run_started`: Inizio run (cartella, numero di job per stage)
//! - `job_started`: Un worker o il consumer video prende in carico un job
//! - `job_finished`: Esito del job (`JobReport` completo)
//! - `timestamps_applied`: Pass dei timestamp completato per uno stage
//! - `run_completed`: Riepilogo finale con i conteggi
//!
//! ## Sink disponibili:
//! - `JsonSink`: una riga JSON per evento su stdout
//! - `LogSink`: eventi come log `tracing`
//! - `ProgressSink`: progress bar `indicatif`
//! - `NullSink`: scarta tutto (test)

use crate::progress::{JobOutcome, JobReport, ProgressManager, RunTally, Stage};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Structured event emitted by the core
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        folder: PathBuf,
        output_dir: PathBuf,
        photos: usize,
        videos: usize,
        skipped: usize,
        workers: usize,
    },
    JobStarted {
        job_id: usize,
        stage: Stage,
        input_name: String,
    },
    JobFinished {
        report: JobReport,
    },
    TimestampsApplied {
        stage: Stage,
        applied: usize,
        shift_hours: i64,
    },
    RunCompleted {
        tally: RunTally,
        duration_seconds: f64,
    },
}

/// Destination for run events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &RunEvent);
}

/// JSON lines on stdout
#[derive(Debug, Default)]
pub struct JsonSink;

impl EventSink for JsonSink {
    fn emit(&self, event: &RunEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            println!("{}", json);
        }
    }
}

/// Plain log lines
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { folder, photos, videos, skipped, workers, .. } => {
                info!(
                    "Resizing {}: {} photos ({} workers), {} videos, {} skipped",
                    folder.display(),
                    photos,
                    workers,
                    videos,
                    skipped
                );
            }
            RunEvent::JobStarted { job_id, stage, input_name } => {
                debug!("[{}] {} job started: {}", job_id, stage, input_name);
            }
            RunEvent::JobFinished { report } => {
                match &report.outcome {
                    JobOutcome::Succeeded => info!("[{}] {} done", report.job_id, report.input_name),
                    JobOutcome::Failed(reason) => {
                        error!("[{}] {} failed: {}", report.job_id, report.input_name, reason)
                    }
                }
                for warning in &report.warnings {
                    warn!("[{}] {}: {}", report.job_id, report.input_name, warning);
                }
            }
            RunEvent::TimestampsApplied { stage, applied, shift_hours } => {
                info!("Timestamps applied to {} {} outputs (shift {}h)", applied, stage, shift_hours);
            }
            RunEvent::RunCompleted { tally, duration_seconds } => {
                if tally.failed > 0 {
                    warn!("{} jobs failed", tally.failed);
                }
                info!(
                    "Run completed in {:.1}s: {} succeeded, {} failed, {} skipped",
                    duration_seconds, tally.succeeded, tally.failed, tally.skipped
                );
            }
        }
    }
}

/// Progress bar driven by events
pub struct ProgressSink {
    progress: ProgressManager,
}

impl ProgressSink {
    pub fn new() -> Self {
        Self { progress: ProgressManager::new(0) }
    }
}

impl Default for ProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ProgressSink {
    fn emit(&self, event: &RunEvent) {
        match event {
            RunEvent::RunStarted { photos, videos, .. } => {
                self.progress.set_total((photos + videos) as u64);
            }
            RunEvent::JobStarted { input_name, .. } => {
                self.progress.set_message(input_name);
            }
            RunEvent::JobFinished { report } => {
                self.progress
                    .update(&format!("[{}] {}", report.outcome.label(), report.input_name));
            }
            RunEvent::TimestampsApplied { .. } => {}
            RunEvent::RunCompleted { tally, .. } => {
                self.progress.finish(&format!(
                    "{} succeeded, {} failed, {} skipped",
                    tally.succeeded, tally.failed, tally.skipped
                ));
            }
        }
    }
}

/// Discards every event
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &RunEvent) {}
}
