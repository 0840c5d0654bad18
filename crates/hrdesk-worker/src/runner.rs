//! Single report generation run
//!
//! A run owns the report's job lock for its whole duration. Generation runs in
//! its own task so that a panic surfaces as a join error and is recorded as a
//! failure instead of leaving the row GENERATING.

use chrono::Utc;
use hrdesk_core::models::{ReportRequest, ReportStatus};
use hrdesk_db::{AdminDirectory, HrDataGateway, JobLock, ReportRepository};
use hrdesk_processing::{report_definition, RenderMetadata, ReportError, ReportQuery, ReportRenderer};
use hrdesk_services::NotificationService;
use hrdesk_storage::{report_artifact_key, Storage};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Buffer between the renderer and the storage upload
const PIPE_CAPACITY: usize = 64 * 1024;

/// Result of one [`ReportJobRunner::run`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Another run holds the lock for this report
    AlreadyRunning,
    /// Nothing to do: the row is gone, already terminal, or could not be read
    Skipped,
    Completed,
    Failed,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::AlreadyRunning => "already_running",
            JobOutcome::Skipped => "skipped",
            JobOutcome::Completed => "completed",
            JobOutcome::Failed => "failed",
        }
    }
}

#[derive(Clone)]
pub struct ReportJobRunner {
    reports: Arc<dyn ReportRepository>,
    gateway: Arc<dyn HrDataGateway>,
    admins: Arc<dyn AdminDirectory>,
    lock: Arc<dyn JobLock>,
    storage: Arc<dyn Storage>,
    notifications: NotificationService,
    renderer: ReportRenderer,
    job_timeout: Option<Duration>,
}

impl ReportJobRunner {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        gateway: Arc<dyn HrDataGateway>,
        admins: Arc<dyn AdminDirectory>,
        lock: Arc<dyn JobLock>,
        storage: Arc<dyn Storage>,
        notifications: NotificationService,
        renderer: ReportRenderer,
    ) -> Self {
        Self {
            reports,
            gateway,
            admins,
            lock,
            storage,
            notifications,
            renderer,
            job_timeout: None,
        }
    }

    /// Bound each generation. `None` or a zero duration disables the limit.
    pub fn with_timeout(mut self, job_timeout: Option<Duration>) -> Self {
        self.job_timeout = job_timeout.filter(|d| !d.is_zero());
        self
    }

    /// Generate the report `id` unless another run already owns it.
    ///
    /// Each accepted run performs at most one artifact write and at most one
    /// terminal transition. The lock is released on every path.
    #[tracing::instrument(skip(self), fields(report_id = %id, job.status = tracing::field::Empty))]
    pub async fn run(&self, id: Uuid) -> JobOutcome {
        let span = tracing::Span::current();

        match self.lock.try_acquire(id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Report generation already in progress, ignoring duplicate");
                span.record("job.status", JobOutcome::AlreadyRunning.as_str());
                return JobOutcome::AlreadyRunning;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire report job lock");
                span.record("job.status", JobOutcome::Skipped.as_str());
                return JobOutcome::Skipped;
            }
        }

        let outcome = self.process(id).await;

        if let Err(e) = self.lock.release(id).await {
            tracing::warn!(error = %e, "Failed to release report job lock");
        }

        span.record("job.status", outcome.as_str());
        outcome
    }

    async fn process(&self, id: Uuid) -> JobOutcome {
        let report = match self.reports.get(id).await {
            Ok(Some(report)) if report.status == ReportStatus::Generating => report,
            Ok(Some(report)) => {
                tracing::debug!(status = %report.status, "Report already finalized, skipping");
                return JobOutcome::Skipped;
            }
            Ok(None) => {
                tracing::debug!("Report no longer exists, skipping");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load report request");
                return JobOutcome::Skipped;
            }
        };

        let runner = self.clone();
        let job_report = report.clone();
        let handle = tokio::spawn(
            async move { runner.generate_bounded(&job_report).await }
                .instrument(tracing::Span::current()),
        );

        match handle.await {
            Ok(Ok(size)) => self.finalize_success(&report, size).await,
            Ok(Err(reason)) => self.finalize_failure(&report, &reason).await,
            Err(join_error) => {
                tracing::error!(error = %join_error, "Report generation task aborted");
                let reason = if join_error.is_panic() {
                    "Report generation crashed unexpectedly"
                } else {
                    "Report generation was cancelled"
                };
                self.finalize_failure(&report, reason).await
            }
        }
    }

    /// Generation under the configured timeout. Errors are flattened to the
    /// reason stored on the row.
    async fn generate_bounded(&self, report: &ReportRequest) -> Result<u64, String> {
        let generation = self.generate(report);
        let result = match self.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, generation).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(format!(
                        "Report generation timed out after {} seconds",
                        limit.as_secs()
                    ))
                }
            },
            None => generation.await,
        };
        result.map_err(|e| e.to_string())
    }

    async fn generate(&self, report: &ReportRequest) -> Result<u64, ReportError> {
        let report_type = report
            .parsed_type()
            .map_err(|_| ReportError::UnsupportedType(report.report_type.clone()))?;
        let definition = report_definition(report_type);

        let query = ReportQuery::resolve(self.gateway.as_ref(), report.parameters.clone()).await?;
        let requested_by = self.requester_name(report.requested_by).await;

        let data = definition
            .aggregator
            .aggregate(self.gateway.as_ref(), &query)
            .await?;
        tracing::debug!(
            report.type = %report_type,
            total_records = data.total_records,
            "Report data aggregated"
        );

        let meta = RenderMetadata {
            title: report.title.clone(),
            requested_by,
            generated_at: Utc::now(),
        };
        let key = report_artifact_key(report.id);
        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);

        let (rendered, uploaded) = tokio::join!(
            self.renderer.render(&data, &meta, &definition, writer),
            self.storage
                .upload_stream(&key, PDF_CONTENT_TYPE, Box::pin(reader)),
        );

        // A failed upload closes the pipe, so its error is the root cause.
        let stored = uploaded.map_err(|e| ReportError::Storage(e.to_string()))?;
        let written = rendered?;
        if stored != written {
            return Err(ReportError::Storage(format!(
                "stored {} of {} bytes",
                stored, written
            )));
        }

        Ok(stored)
    }

    async fn requester_name(&self, admin_id: i64) -> String {
        match self.admins.find_admin(admin_id).await {
            Ok(Some(admin)) if !admin.name.trim().is_empty() => admin.name,
            Ok(_) => format!("Admin #{}", admin_id),
            Err(e) => {
                tracing::warn!(error = %e, admin_id, "Failed to look up requester name");
                format!("Admin #{}", admin_id)
            }
        }
    }

    async fn finalize_success(&self, report: &ReportRequest, size: u64) -> JobOutcome {
        let key = report_artifact_key(report.id);
        match self
            .reports
            .mark_completed(report.id, &key, size as i64, Utc::now())
            .await
        {
            Ok(true) => {
                tracing::info!(artifact_size = size, "Report generated");
                self.notifications.report_ready(report).await;
                JobOutcome::Completed
            }
            Ok(false) => {
                tracing::warn!(
                    storage_key = %key,
                    "Report was deleted or finalized during generation, removing artifact"
                );
                self.remove_artifact(report.id).await;
                JobOutcome::Skipped
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to record report completion");
                let reason = format!("Failed to record report completion: {}", e);
                self.finalize_failure(report, &reason).await
            }
        }
    }

    async fn finalize_failure(&self, report: &ReportRequest, reason: &str) -> JobOutcome {
        tracing::error!(reason, "Report generation failed");
        self.remove_artifact(report.id).await;

        match self.reports.mark_failed(report.id, reason).await {
            Ok(true) => {
                self.notifications.report_failed(report, reason).await;
                JobOutcome::Failed
            }
            Ok(false) => {
                tracing::debug!("Report was deleted or finalized during generation");
                JobOutcome::Skipped
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to mark report as failed");
                JobOutcome::Failed
            }
        }
    }

    async fn remove_artifact(&self, id: Uuid) {
        let key = report_artifact_key(id);
        if let Err(e) = self.storage.delete(&key).await {
            tracing::warn!(error = %e, storage_key = %key, "Failed to remove report artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{attendance_scenario, Harness, ADMIN_ID};
    use hrdesk_core::models::{
        AttendanceRecord, Department, LeaveRecord, NotificationType, PayrollRecord,
        PerformanceRecord, ReportParameters,
    };
    use hrdesk_core::AppError;
    use hrdesk_db::memory::InMemoryHrDataGateway;

    #[tokio::test]
    async fn test_attendance_report_completes() {
        let harness = Harness::new(attendance_scenario()).await;
        let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;

        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Completed);

        let stored = harness.reports.get(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Completed);
        assert_eq!(
            stored.artifact_path.as_deref(),
            Some(format!("reports/{}.pdf", report.id).as_str())
        );
        assert!(stored.artifact_size.unwrap() > 0);
        assert!(stored.generated_at.is_some());
        assert!(stored.error_message.is_none());

        let bytes = harness.artifact(report.id).await.unwrap();
        assert_eq!(bytes.len() as i64, stored.artifact_size.unwrap());
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("Ada Admin"));

        let notifications = harness.notifications.all().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].notification_type, NotificationType::ReportReady);
        assert_eq!(notifications[0].recipient, ADMIN_ID);
        assert_eq!(notifications[0].report_id, report.id);

        assert!(!harness.lock.is_held(report.id));
    }

    #[tokio::test]
    async fn test_unknown_type_fails_with_error_notification() {
        let harness = Harness::new(InMemoryHrDataGateway::new()).await;
        let report = harness.submit("UNKNOWN_TYPE", None).await;

        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Failed);

        let stored = harness.reports.get(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Failed);
        let reason = stored.error_message.unwrap();
        assert!(reason.contains("UNKNOWN_TYPE"), "{}", reason);
        assert!(stored.artifact_path.is_none());
        assert!(harness.artifact(report.id).await.is_none());

        let notifications = harness.notifications.all().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].notification_type, NotificationType::Error);
        assert!(notifications[0].message.contains("UNKNOWN_TYPE"));
        assert!(!harness.lock.is_held(report.id));
    }

    #[tokio::test]
    async fn test_data_failure_marks_failed() {
        let gateway = InMemoryHrDataGateway::new().with_failure("connection reset by peer");
        let harness = Harness::new(gateway).await;
        let report = harness.submit("LEAVE_SUMMARY", None).await;

        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Failed);

        let stored = harness.reports.get(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Failed);
        assert!(stored
            .error_message
            .unwrap()
            .contains("connection reset by peer"));
        assert!(harness.artifact(report.id).await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_runs_generate_once() {
        let gateway = attendance_scenario().with_delay(Duration::from_millis(150));
        let harness = Harness::new(gateway).await;
        let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;

        let (first, second) = tokio::join!(
            harness.runner.run(report.id),
            harness.runner.run(report.id)
        );
        let mut outcomes = [first, second];
        outcomes.sort_by_key(|o| o.as_str());
        assert_eq!(outcomes, [JobOutcome::AlreadyRunning, JobOutcome::Completed]);

        assert_eq!(harness.notifications.all().await.len(), 1);
        assert!(!harness.lock.is_held(report.id));
    }

    #[tokio::test]
    async fn test_rerun_of_finished_report_is_skipped() {
        let harness = Harness::new(attendance_scenario()).await;
        let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;

        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Completed);
        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Skipped);
        assert_eq!(harness.notifications.all().await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_report_is_skipped() {
        let harness = Harness::new(InMemoryHrDataGateway::new()).await;
        assert_eq!(harness.runner.run(Uuid::new_v4()).await, JobOutcome::Skipped);
        assert!(harness.notifications.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_during_generation_leaves_no_artifact() {
        let gateway = attendance_scenario().with_delay(Duration::from_millis(200));
        let harness = Harness::new(gateway).await;
        let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;

        let runner = harness.runner.clone();
        let id = report.id;
        let job = tokio::spawn(async move { runner.run(id).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(harness.reports.delete(report.id).await.unwrap());

        assert_eq!(job.await.unwrap(), JobOutcome::Skipped);
        assert!(harness.artifact(report.id).await.is_none());
        assert!(harness.notifications.all().await.is_empty());
        assert!(!harness.lock.is_held(report.id));
    }

    #[tokio::test]
    async fn test_timeout_marks_failed() {
        let gateway = attendance_scenario().with_delay(Duration::from_millis(500));
        let harness = Harness::with_timeout(gateway, Some(Duration::from_millis(50))).await;
        let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;

        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Failed);

        let stored = harness.reports.get(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Failed);
        assert!(stored.error_message.unwrap().contains("timed out"));
        assert!(harness.artifact(report.id).await.is_none());
        assert!(!harness.lock.is_held(report.id));
    }

    #[tokio::test]
    async fn test_notification_outage_does_not_change_outcome() {
        let harness = Harness::new(attendance_scenario()).await;
        harness.notifications.fail_next_inserts(10);
        let report = harness.submit("ATTENDANCE_SUMMARY", Some(2)).await;

        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Completed);
        let stored = harness.reports.get(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Completed);
        assert!(harness.notifications.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_requester_is_labelled_by_id() {
        let harness = Harness::new(attendance_scenario()).await;
        let report = harness
            .reports
            .create(hrdesk_core::models::NewReport {
                report_type: "ATTENDANCE_SUMMARY".to_string(),
                title: "Orphaned requester".to_string(),
                description: None,
                parameters: harness.july(Some(2)),
                requested_by: 404,
            })
            .await
            .unwrap();

        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Completed);
        let text = String::from_utf8_lossy(&harness.artifact(report.id).await.unwrap()).to_string();
        assert!(text.contains("Admin #404"));
    }

    /// Gateway whose dataset queries panic
    struct PanickingGateway;

    #[async_trait::async_trait]
    impl HrDataGateway for PanickingGateway {
        async fn attendance(&self, _: &ReportParameters) -> Result<Vec<AttendanceRecord>, AppError> {
            panic!("attendance query exploded")
        }
        async fn leave_requests(&self, _: &ReportParameters) -> Result<Vec<LeaveRecord>, AppError> {
            panic!("leave query exploded")
        }
        async fn payroll(&self, _: &ReportParameters) -> Result<Vec<PayrollRecord>, AppError> {
            panic!("payroll query exploded")
        }
        async fn performance_reviews(
            &self,
            _: &ReportParameters,
        ) -> Result<Vec<PerformanceRecord>, AppError> {
            panic!("performance query exploded")
        }
        async fn department(&self, _: i64) -> Result<Option<Department>, AppError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_panic_is_recorded_as_failure() {
        let harness = Harness::with_gateway(Arc::new(PanickingGateway), None).await;
        let report = harness.submit("PAYROLL_SUMMARY", None).await;

        assert_eq!(harness.runner.run(report.id).await, JobOutcome::Failed);
        let stored = harness.reports.get(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Failed);
        assert!(!harness.lock.is_held(report.id));
        assert_eq!(harness.notifications.all().await.len(), 1);
    }
}
