//! Stale report reaper
//!
//! Rows stay GENERATING forever when the process dies mid-job or when an id
//! never made it onto the queue. The reaper periodically fails such rows once
//! they are older than `stale_after`, skipping any id whose job lock is held.

use chrono::Utc;
use hrdesk_core::AppError;
use hrdesk_db::{JobLock, ReportRepository};
use hrdesk_services::NotificationService;
use hrdesk_storage::{report_artifact_key, Storage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const STALE_REPORT_REASON: &str = "Report generation timed out";

/// Rows examined per sweep
const REAP_BATCH_SIZE: i64 = 100;

#[derive(Clone)]
pub struct StaleReportReaper {
    reports: Arc<dyn ReportRepository>,
    lock: Arc<dyn JobLock>,
    storage: Arc<dyn Storage>,
    notifications: NotificationService,
    stale_after: Duration,
}

impl StaleReportReaper {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        lock: Arc<dyn JobLock>,
        storage: Arc<dyn Storage>,
        notifications: NotificationService,
        stale_after: Duration,
    ) -> Self {
        Self {
            reports,
            lock,
            storage,
            notifications,
            stale_after,
        }
    }

    /// One sweep. Returns the number of rows moved to FAILED.
    #[tracing::instrument(skip(self), fields(reaped = tracing::field::Empty))]
    pub async fn reap_once(&self) -> Result<usize, AppError> {
        let stale_after = chrono::Duration::from_std(self.stale_after)
            .map_err(|e| AppError::Internal(format!("Invalid staleness threshold: {}", e)))?;
        let cutoff = Utc::now() - stale_after;

        let stale = self
            .reports
            .find_stale_generating(cutoff, REAP_BATCH_SIZE)
            .await?;

        let mut reaped = 0;
        for id in stale {
            match self.lock.try_acquire(id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(report_id = %id, "Stale report has a running job, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, report_id = %id, "Failed to lock stale report");
                    continue;
                }
            }

            match self.fail_stale(id).await {
                Ok(true) => reaped += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(error = %e, report_id = %id, "Failed to reap stale report"),
            }

            if let Err(e) = self.lock.release(id).await {
                tracing::warn!(error = %e, report_id = %id, "Failed to release report job lock");
            }
        }

        tracing::Span::current().record("reaped", reaped);
        if reaped > 0 {
            tracing::warn!(reaped, "Failed stale GENERATING reports");
        }
        Ok(reaped)
    }

    async fn fail_stale(&self, id: Uuid) -> Result<bool, AppError> {
        let key = report_artifact_key(id);
        if let Err(e) = self.storage.delete(&key).await {
            tracing::warn!(error = %e, storage_key = %key, "Failed to remove partial artifact");
        }

        if !self.reports.mark_failed(id, STALE_REPORT_REASON).await? {
            return Ok(false);
        }
        if let Some(report) = self.reports.get(id).await? {
            self.notifications
                .report_failed(&report, STALE_REPORT_REASON)
                .await;
        }
        Ok(true)
    }

    /// Sweep every `interval` until the handle is shut down. A zero interval
    /// disables the reaper and returns `None`.
    pub fn spawn(self, interval: Duration) -> Option<ReaperHandle> {
        if interval.is_zero() {
            tracing::info!("Stale report reaper disabled");
            return None;
        }

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            tracing::info!(
                interval_secs = interval.as_secs(),
                stale_after_secs = self.stale_after.as_secs(),
                "Stale report reaper started"
            );
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.reap_once().await {
                            tracing::error!(error = %e, "Stale report reaper failed");
                        }
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
            tracing::info!("Stale report reaper stopped");
        });

        Some(ReaperHandle {
            shutdown_tx,
            handle,
        })
    }
}

pub struct ReaperHandle {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl ReaperHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Stale report reaper ended abnormally");
        }
    }
}
