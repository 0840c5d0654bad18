//! Repository, worker and service wiring

use crate::services::ReportService;
use crate::state::{AppState, HealthState};
use hrdesk_core::Config;
use hrdesk_db::{
    AdminDirectory, HrDataGateway, JobLock, NotificationRepository, PostgresAdminDirectory,
    PostgresHrDataGateway, PostgresJobLock, PostgresNotificationRepository,
    PostgresReportRepository, ReportRepository,
};
use hrdesk_processing::ReportRenderer;
use hrdesk_services::{NotificationService, NotificationServiceConfig};
use hrdesk_storage::Storage;
use hrdesk_worker::{
    ReaperHandle, ReportJobQueue, ReportJobRunner, ReportQueueConfig, StaleReportReaper,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Extra lease on the job lock beyond the generation timeout
const LOCK_LEASE_MARGIN_SECS: u64 = 60;
/// Lock lease when generation has no timeout
const UNBOUNDED_JOB_LEASE_SECS: u64 = 6 * 3600;

/// Storage backends the report subsystem runs on
#[derive(Clone)]
pub struct ReportBackends {
    pub reports: Arc<dyn ReportRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub gateway: Arc<dyn HrDataGateway>,
    pub admins: Arc<dyn AdminDirectory>,
    pub lock: Arc<dyn JobLock>,
    pub storage: Arc<dyn Storage>,
    pub pool: Option<PgPool>,
}

impl ReportBackends {
    pub fn postgres(pool: PgPool, storage: Arc<dyn Storage>, config: &Config) -> Self {
        let lease_secs = match config.report_job_timeout_secs() {
            0 => UNBOUNDED_JOB_LEASE_SECS,
            timeout => timeout + LOCK_LEASE_MARGIN_SECS,
        };
        Self {
            reports: Arc::new(PostgresReportRepository::new(pool.clone())),
            notifications: Arc::new(PostgresNotificationRepository::new(pool.clone())),
            gateway: Arc::new(PostgresHrDataGateway::new(pool.clone())),
            admins: Arc::new(PostgresAdminDirectory::new(pool.clone())),
            lock: Arc::new(PostgresJobLock::new(
                pool.clone(),
                i64::try_from(lease_secs).unwrap_or(i64::MAX),
            )),
            storage,
            pool: Some(pool),
        }
    }
}

/// Tasks that outlive a request and must be drained on shutdown
pub struct BackgroundJobs {
    pub queue: Arc<ReportJobQueue>,
    pub reaper: Option<ReaperHandle>,
}

impl BackgroundJobs {
    /// Stop the reaper, then let queued and running jobs finish.
    pub async fn shutdown(self) {
        if let Some(reaper) = self.reaper {
            reaper.shutdown().await;
        }
        self.queue.shutdown().await;
        tracing::info!("Background jobs stopped");
    }
}

/// Build the shared state and start the job queue and reaper.
///
/// Must be called from within a tokio runtime.
pub fn build_state(config: &Config, backends: ReportBackends) -> (Arc<AppState>, BackgroundJobs) {
    let notifier = NotificationService::new(
        backends.notifications.clone(),
        NotificationServiceConfig {
            max_attempts: config.notification_max_attempts(),
            retry_base_delay: Duration::from_millis(config.notification_retry_base_ms()),
        },
    );

    let job_timeout = match config.report_job_timeout_secs() {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };
    let runner = ReportJobRunner::new(
        backends.reports.clone(),
        backends.gateway.clone(),
        backends.admins.clone(),
        backends.lock.clone(),
        backends.storage.clone(),
        notifier.clone(),
        ReportRenderer::new(config.report_organization_name()),
    )
    .with_timeout(job_timeout);

    let queue = Arc::new(ReportJobQueue::start(
        runner,
        ReportQueueConfig {
            capacity: config.report_queue_capacity(),
            max_concurrent_jobs: config.report_max_concurrent_jobs(),
        },
    ));

    let reaper = StaleReportReaper::new(
        backends.reports.clone(),
        backends.lock.clone(),
        backends.storage.clone(),
        notifier,
        Duration::from_secs(config.report_stale_after_secs()),
    )
    .spawn(Duration::from_secs(config.report_stale_reap_interval_secs()));

    tracing::info!(
        queue_capacity = config.report_queue_capacity(),
        max_concurrent_jobs = config.report_max_concurrent_jobs(),
        job_timeout_secs = config.report_job_timeout_secs(),
        "Report services initialized"
    );

    let state = Arc::new(AppState {
        reports: ReportService::new(
            backends.reports,
            backends.admins,
            backends.storage.clone(),
            queue.clone(),
        ),
        notifications: backends.notifications,
        health: HealthState {
            pool: backends.pool,
            storage: backends.storage,
        },
    });

    (state, BackgroundJobs { queue, reaper })
}
