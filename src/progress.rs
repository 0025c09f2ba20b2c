//! # Progress Tracking and Result Aggregation Module
//!
//! Questo modulo raccoglie gli esiti per job e il progress visuale.
//!
//! ## Componenti principali:
//! - `JobReport`: Esito di un singolo job (stage, outcome, output, warning)
//! - `ResultAggregator`: Raccoglie i report e le entry saltate
//! - `RunSummary` / `RunTally`: Riepilogo finale (successi, fallimenti, skip)
//! - `ProgressManager`: Progress bar con `indicatif`
//!
//! L'aggregatore è puramente osservazionale: nessun retry automatico.
//! L'exit code del processo non distingue un run con fallimenti parziali da
//! un run pulito; il riepilogo è l'unico posto dove leggerlo.
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:00:42] [========================>---------------] 12/20 (60%) [OK] IMG_0042.jpg
//! ```

use crate::classifier::SkippedEntry;
use crate::job::JobDescriptor;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Stage that owned a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Photo,
    Video,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photo => write!(f, "photo"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Final state of a job that entered a stage.
///
/// Entries dropped before any stage are carried as `SkippedEntry` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "OK",
            Self::Failed(_) => "ERROR",
        }
    }
}

/// Outcome of one job as seen by the aggregator
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: usize,
    pub input_name: String,
    pub stage: Stage,
    pub outcome: JobOutcome,
    pub output_path: Option<PathBuf>,
    /// Dequeue order for videos
    pub sequence: Option<u64>,
    /// Metadata problems that did not fail the job
    pub warnings: Vec<String>,
}

impl JobReport {
    pub fn new(job: &JobDescriptor, stage: Stage, outcome: JobOutcome) -> Self {
        let output_path = outcome.is_success().then(|| job.output_path.clone());
        Self {
            job_id: job.id,
            input_name: job.input_name.clone(),
            stage,
            outcome,
            output_path,
            sequence: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warnings.extend(warning);
        self
    }
}

/// Counts for the run-level summary
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunTally {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub warnings: usize,
}

impl RunTally {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Collects per-job outcomes
#[derive(Debug, Default)]
pub struct ResultAggregator {
    reports: Vec<JobReport>,
    skipped: Vec<SkippedEntry>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_all(&mut self, reports: impl IntoIterator<Item = JobReport>) {
        self.reports.extend(reports);
    }

    pub fn record_skipped(&mut self, entries: impl IntoIterator<Item = SkippedEntry>) {
        self.skipped.extend(entries);
    }

    pub fn finish(mut self) -> RunSummary {
        self.reports.sort_by_key(|report| report.job_id);
        RunSummary {
            reports: self.reports,
            skipped: self.skipped,
        }
    }
}

/// Everything a run produced, ordered by job id
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub reports: Vec<JobReport>,
    pub skipped: Vec<SkippedEntry>,
}

impl RunSummary {
    pub fn tally(&self) -> RunTally {
        let mut tally = RunTally {
            skipped: self.skipped.len(),
            ..Default::default()
        };
        for report in &self.reports {
            match report.outcome {
                JobOutcome::Succeeded => tally.succeeded += 1,
                JobOutcome::Failed(_) => tally.failed += 1,
            }
            tally.warnings += report.warnings.len();
        }
        tally
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(|r| matches!(r.outcome, JobOutcome::Failed(_)))
    }

    pub fn reports_for(&self, stage: Stage) -> impl Iterator<Item = &JobReport> {
        self.reports.iter().filter(move |r| r.stage == stage)
    }

    pub fn format_summary(&self) -> String {
        let tally = self.tally();
        format!(
            "Processed: {} files | Succeeded: {} | Failed: {} | Skipped: {} | Metadata warnings: {}",
            tally.total(),
            tally.succeeded,
            tally.failed,
            tally.skipped,
            tally.warnings
        )
    }
}

/// Manages progress reporting for a run
#[derive(Clone)]
pub struct ProgressManager {
    bar: ProgressBar,
}

impl ProgressManager {
    /// Create a progress bar; the length is set once classification is done
    pub fn new(total_files: u64) -> Self {
        let bar = ProgressBar::new(total_files);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn set_total(&self, total_files: u64) {
        self.bar.set_length(total_files);
    }

    /// Update progress with a message
    pub fn update(&self, message: &str) {
        self.bar.inc(1);
        self.bar.set_message(message.to_string());
    }

    /// Set a custom message without incrementing
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}
