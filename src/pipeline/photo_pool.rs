//! # Photo Worker Pool
//!
//! Pool a parallelismo limitato per i job foto.
//!
//! - Un `Semaphore` con `P` permessi: la sottomissione si blocca finché `P`
//!   job sono in volo
//! - Ogni job gira su un thread bloccante (`spawn_blocking`) che abbassa la
//!   propria priorità prima di lavorare
//! - `run` ritorna solo quando tutti i job sono terminati (barriera completa)
//!
//! Nessuna garanzia di ordine di completamento; i report tornano nell'ordine
//! di sottomissione.

use crate::events::{EventSink, RunEvent};
use crate::image_processor::PhotoWorker;
use crate::job::JobDescriptor;
use crate::platform::lower_current_thread_priority;
use crate::progress::{JobOutcome, JobReport, Stage};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

pub struct PhotoPool {
    worker: Arc<dyn PhotoWorker>,
    workers: usize,
    events: Arc<dyn EventSink>,
}

impl PhotoPool {
    pub fn new(worker: Arc<dyn PhotoWorker>, workers: usize, events: Arc<dyn EventSink>) -> Self {
        Self {
            worker,
            workers: workers.max(1),
            events,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every job and wait for all of them
    pub async fn run(&self, jobs: &[JobDescriptor]) -> Vec<JobReport> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(jobs.len());

        debug!("Submitting {} photo jobs to {} workers", jobs.len(), self.workers);

        for job in jobs {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Photo pool closed before {} was submitted: {}", job.input_name, e);
                    handles.push(None);
                    continue;
                }
            };

            let worker = Arc::clone(&self.worker);
            let events = Arc::clone(&self.events);
            let job = job.clone();

            handles.push(Some(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                lower_current_thread_priority();

                events.emit(&RunEvent::JobStarted {
                    job_id: job.id,
                    stage: Stage::Photo,
                    input_name: job.input_name.clone(),
                });
                let report = worker.process(&job);
                events.emit(&RunEvent::JobFinished { report: report.clone() });
                report
            })));
        }

        let results = join_all(handles.into_iter().map(|handle| async move {
            match handle {
                Some(handle) => Some(handle.await),
                None => None,
            }
        }))
        .await;

        jobs.iter()
            .zip(results)
            .map(|(job, result)| match result {
                Some(Ok(report)) => report,
                Some(Err(e)) => {
                    error!("Photo worker for {} panicked: {}", job.input_name, e);
                    JobReport::new(job, Stage::Photo, JobOutcome::Failed(format!("worker panicked: {}", e)))
                }
                None => JobReport::new(job, Stage::Photo, JobOutcome::Failed("not submitted".to_string())),
            })
            .collect()
    }
}
