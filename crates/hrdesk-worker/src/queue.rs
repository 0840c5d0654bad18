//! Report job queue: bounded channel plus a worker pool.
//!
//! Submission never blocks. A dispatcher task pulls ids off the channel and
//! spawns one runner task per id, bounded by a semaphore. Shutdown closes the
//! channel, drains what was already accepted and waits for running jobs.

use crate::runner::ReportJobRunner;
use hrdesk_core::AppError;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ReportQueueConfig {
    pub capacity: usize,
    pub max_concurrent_jobs: usize,
}

impl Default for ReportQueueConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            max_concurrent_jobs: 4,
        }
    }
}

pub struct ReportJobQueue {
    sender: mpsc::Sender<Uuid>,
    shutdown_tx: mpsc::Sender<()>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl ReportJobQueue {
    /// Spawn the dispatcher on the current runtime.
    pub fn start(runner: ReportJobRunner, config: ReportQueueConfig) -> Self {
        let (sender, receiver) = mpsc::channel(config.capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let max_workers = config.max_concurrent_jobs.max(1);

        let dispatcher = tokio::spawn(Self::dispatch(runner, receiver, shutdown_rx, max_workers));

        Self {
            sender,
            shutdown_tx,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Hand a report id to the worker pool without waiting.
    #[tracing::instrument(skip(self), fields(report_id = %report_id))]
    pub fn submit(&self, report_id: Uuid) -> Result<(), AppError> {
        match self.sender.try_send(report_id) {
            Ok(()) => {
                tracing::debug!("Report job queued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(AppError::Internal("Report queue is full".to_string()))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(AppError::Internal("Report queue is shut down".to_string()))
            }
        }
    }

    /// Stop accepting ids and wait until every accepted job has finished.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.dispatcher.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Report queue dispatcher ended abnormally");
            }
        }
    }

    async fn dispatch(
        runner: ReportJobRunner,
        mut receiver: mpsc::Receiver<Uuid>,
        mut shutdown_rx: mpsc::Receiver<()>,
        max_workers: usize,
    ) {
        tracing::info!(max_workers, "Report job queue started");
        let semaphore = Arc::new(Semaphore::new(max_workers));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Report job queue shutting down");
                    receiver.close();
                    while let Some(report_id) = receiver.recv().await {
                        Self::spawn_job(&runner, &semaphore, report_id).await;
                    }
                    break;
                }
                next = receiver.recv() => match next {
                    Some(report_id) => Self::spawn_job(&runner, &semaphore, report_id).await,
                    None => break,
                },
            }
        }

        // Every permit back means every job has finished
        let drained = semaphore.acquire_many(max_workers as u32).await;
        match drained {
            Ok(_) => tracing::info!("Report job queue stopped"),
            Err(e) => tracing::warn!(error = %e, "Report job queue stopped without draining"),
        };
    }

    async fn spawn_job(runner: &ReportJobRunner, semaphore: &Arc<Semaphore>, report_id: Uuid) {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::error!(error = %e, report_id = %report_id, "Worker pool closed, dropping job");
                return;
            }
        };

        let runner = runner.clone();
        tokio::spawn(async move {
            let _permit = permit;
            runner.run(report_id).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{attendance_scenario, Harness};
    use hrdesk_core::models::ReportStatus;
    use hrdesk_db::ReportRepository;
    use std::time::Duration;

    #[tokio::test]
    async fn test_queued_jobs_complete_before_shutdown_returns() {
        let harness = Harness::new(attendance_scenario()).await;
        let queue = ReportJobQueue::start(
            harness.runner.clone(),
            ReportQueueConfig {
                capacity: 8,
                max_concurrent_jobs: 2,
            },
        );

        let mut ids = Vec::new();
        for _ in 0..4 {
            let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;
            queue.submit(report.id).unwrap();
            ids.push(report.id);
        }
        queue.shutdown().await;

        for id in ids {
            let stored = harness.reports.get(id).await.unwrap().unwrap();
            assert_eq!(stored.status, ReportStatus::Completed);
        }
        assert_eq!(harness.notifications.all().await.len(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_submissions_run_once() {
        let gateway = attendance_scenario().with_delay(Duration::from_millis(100));
        let harness = Harness::new(gateway).await;
        let queue = ReportJobQueue::start(harness.runner.clone(), ReportQueueConfig::default());

        let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;
        queue.submit(report.id).unwrap();
        queue.submit(report.id).unwrap();
        queue.shutdown().await;

        assert_eq!(harness.notifications.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_rejects_submission() {
        let gateway = attendance_scenario().with_delay(Duration::from_millis(200));
        let harness = Harness::new(gateway).await;
        let queue = ReportJobQueue::start(
            harness.runner.clone(),
            ReportQueueConfig {
                capacity: 1,
                max_concurrent_jobs: 1,
            },
        );

        let mut rejected = 0;
        for _ in 0..6 {
            let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;
            if let Err(e) = queue.submit(report.id) {
                assert!(matches!(e, AppError::Internal(ref m) if m == "Report queue is full"));
                rejected += 1;
            }
        }
        assert!(rejected > 0);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let harness = Harness::new(attendance_scenario()).await;
        let queue = ReportJobQueue::start(harness.runner.clone(), ReportQueueConfig::default());
        queue.shutdown().await;

        let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;
        assert!(queue.submit(report.id).is_err());
    }
}
