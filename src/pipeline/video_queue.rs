//! # Video Queue Processor
//!
//! Coda FIFO produttore/consumatore singolo: il transcoder è una risorsa
//! singleton, quindi al massimo una transcodifica alla volta.
//!
//! ## Flusso:
//! 1. Il produttore accoda ogni job video in ordine di enumerazione, poi `EndOfInput`
//! 2. Il consumer (task dedicato) estrae, assegna il numero di sequenza, transcodifica
//! 3. Se la transcodifica riesce, scrive lo snapshot dei tag sull'output
//! 4. Al sentinel il consumer termina e restituisce i report
//!
//! Un fallimento non ferma il consumer: l'errore viene loggato e si passa al
//! job successivo. Senza timeout un transcoder bloccato blocca lo stage video.

use crate::config::Config;
use crate::error::ResizeError;
use crate::events::{EventSink, RunEvent};
use crate::file_manager::FileManager;
use crate::job::JobDescriptor;
use crate::metadata::MetadataTool;
use crate::progress::{JobOutcome, JobReport, Stage};
use crate::video_processor::{TranscodeStatus, Transcoder};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Entry in the video queue
#[derive(Debug)]
pub enum QueueItem {
    Job(JobDescriptor),
    /// No more jobs will follow
    EndOfInput,
}

#[derive(Clone)]
pub struct VideoQueue {
    config: Arc<Config>,
    transcoder: Arc<dyn Transcoder>,
    metadata: Arc<dyn MetadataTool>,
    events: Arc<dyn EventSink>,
}

impl VideoQueue {
    pub fn new(
        config: Arc<Config>,
        transcoder: Arc<dyn Transcoder>,
        metadata: Arc<dyn MetadataTool>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            transcoder,
            metadata,
            events,
        }
    }

    /// Feed every job through the single consumer and wait for it to drain
    pub async fn run(&self, jobs: &[JobDescriptor]) -> Vec<JobReport> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let consumer = tokio::spawn(self.clone().consume(receiver));

        for job in jobs {
            if sender.send(QueueItem::Job(job.clone())).is_err() {
                error!("Video consumer stopped before {} was queued", job.input_name);
                break;
            }
        }
        let _ = sender.send(QueueItem::EndOfInput);

        match consumer.await {
            Ok(reports) => reports,
            Err(e) => {
                error!("Video consumer panicked: {}", e);
                jobs.iter()
                    .map(|job| {
                        JobReport::new(job, Stage::Video, JobOutcome::Failed(format!("consumer panicked: {}", e)))
                    })
                    .collect()
            }
        }
    }

    async fn consume(self, mut receiver: mpsc::UnboundedReceiver<QueueItem>) -> Vec<JobReport> {
        let mut reports = Vec::new();
        let mut sequence = 0u64;

        debug!("Video consumer started");

        while let Some(item) = receiver.recv().await {
            let job = match item {
                QueueItem::Job(job) => job,
                QueueItem::EndOfInput => break,
            };
            sequence += 1;

            self.events.emit(&RunEvent::JobStarted {
                job_id: job.id,
                stage: Stage::Video,
                input_name: job.input_name.clone(),
            });

            let report = self.process(&job).await.with_sequence(sequence);
            self.events.emit(&RunEvent::JobFinished { report: report.clone() });
            reports.push(report);
        }

        debug!("Video consumer stopped after {} jobs", sequence);
        reports
    }

    async fn process(&self, job: &JobDescriptor) -> JobReport {
        info!("🎬 Transcoding {}", job.input_name);

        if let Err(e) = FileManager::ensure_dir(job.output_dir()) {
            error!("Cannot prepare output for {}: {}", job.input_name, e);
            return JobReport::new(job, Stage::Video, JobOutcome::Failed(e.to_string()));
        }

        let outcome = match self.transcode(job).await {
            Ok(status) => self.judge(job, &status),
            Err(e) => {
                error!("Transcoding {} failed: {}", job.input_name, e);
                JobOutcome::Failed(e.to_string())
            }
        };

        let warning = match outcome {
            JobOutcome::Succeeded => self.write_snapshot(job).await,
            _ => None,
        };

        JobReport::new(job, Stage::Video, outcome).with_warning(warning)
    }

    async fn transcode(&self, job: &JobDescriptor) -> Result<TranscodeStatus> {
        let transcode = self.transcoder.transcode(&job.source_path, &job.output_path);

        match self.config.transcode_timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), transcode).await {
                Ok(result) => result,
                Err(_) => Err(ResizeError::Timeout(format!(
                    "transcoding {} exceeded {}s",
                    job.input_name, secs
                ))
                .into()),
            },
            None => transcode.await,
        }
    }

    fn judge(&self, job: &JobDescriptor, status: &TranscodeStatus) -> JobOutcome {
        if status.has_diagnostics() {
            error!("Transcoder reported for {}: {}", job.input_name, status.diagnostics);
        }

        if status.success {
            return if job.output_path.exists() {
                JobOutcome::Succeeded
            } else {
                JobOutcome::Failed("transcoder produced no output".to_string())
            };
        }

        let code = status
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());

        if self.config.check_transcoder_status {
            error!("Transcoder exited with {} for {}", code, job.input_name);
            return JobOutcome::Failed(
                ResizeError::Transcoder(format!("exit status {}: {}", code, status.diagnostics)).to_string(),
            );
        }

        warn!("Ignoring transcoder exit status {} for {}", code, job.input_name);
        if job.output_path.exists() {
            JobOutcome::Succeeded
        } else {
            JobOutcome::Failed("transcoder produced no output".to_string())
        }
    }

    async fn write_snapshot(&self, job: &JobDescriptor) -> Option<String> {
        let tags = match &job.source_tags {
            Some(tags) if !tags.is_empty() => tags.clone(),
            _ => {
                debug!("No captured tags for {}", job.input_name);
                return None;
            }
        };

        let metadata = Arc::clone(&self.metadata);
        let output = job.output_path.clone();
        let result = tokio::task::spawn_blocking(move || metadata.write_tags(&output, &tags)).await;

        let error = match result {
            Ok(Ok(())) => return None,
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        warn!("Metadata not preserved for {}: {}", job.input_name, error);
        Some(format!("tags not written: {}", error))
    }
}
