//! In-process export job queue.
//!
//! Jobs are tracked in memory and move from queued to processing to completed
//! on a background task. The queue keeps the most recent jobs only.

use crate::models::{ExportFormat, ExportJob, ExportState};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

const MAX_RETAINED_JOBS: usize = 1000;
const DEFAULT_PROCESSING_TIME: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct ExportQueue {
    jobs: Arc<RwLock<Vec<ExportJob>>>,
    processing_time: Duration,
}

impl Default for ExportQueue {
    fn default() -> Self {
        Self::with_processing_time(DEFAULT_PROCESSING_TIME)
    }
}

impl ExportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_processing_time(processing_time: Duration) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(Vec::new())),
            processing_time,
        }
    }

    /// Record a new job and start working on it in the background.
    pub async fn submit(&self, format: ExportFormat) -> ExportJob {
        let job = ExportJob {
            export_id: uuid::Uuid::new_v4().to_string(),
            format,
            status: ExportState::Queued,
            created_at: Utc::now().to_rfc3339(),
            completed_at: None,
            file_name: None,
        };

        {
            let mut jobs = self.jobs.write().await;
            jobs.push(job.clone());
            if jobs.len() > MAX_RETAINED_JOBS {
                let excess = jobs.len() - MAX_RETAINED_JOBS;
                jobs.drain(..excess);
            }
        }
        info!("Queued {:?} export {}", job.format, job.export_id);

        let queue = self.clone();
        let export_id = job.export_id.clone();
        tokio::spawn(async move { queue.process(export_id).await });

        job
    }

    /// Current state of one job.
    pub async fn get(&self, export_id: &str) -> Option<ExportJob> {
        let jobs = self.jobs.read().await;
        jobs.iter().find(|job| job.export_id == export_id).cloned()
    }

    /// Most recent jobs first.
    pub async fn history(&self, limit: usize) -> Vec<ExportJob> {
        let jobs = self.jobs.read().await;
        jobs.iter().rev().take(limit).cloned().collect()
    }

    async fn process(&self, export_id: String) {
        self.update(&export_id, |job| job.status = ExportState::Processing)
            .await;
        tokio::time::sleep(self.processing_time).await;

        self.update(&export_id, |job| {
            job.status = ExportState::Completed;
            job.completed_at = Some(Utc::now().to_rfc3339());
            job.file_name = Some(format!(
                "meter-readings-{}.{}",
                job.export_id,
                job.format.extension()
            ));
        })
        .await;
        debug!("Export {} completed", export_id);
    }

    async fn update<F>(&self, export_id: &str, apply: F)
    where
        F: FnOnce(&mut ExportJob),
    {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.iter_mut().find(|job| job.export_id == export_id) {
            apply(job);
        }
    }
}
