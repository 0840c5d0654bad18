//! Notification emitter
//!
//! Writes one in-app notification per terminal report transition. Delivery is
//! retried with exponential backoff and never fails the caller: a notification
//! that cannot be stored is logged and dropped.

use hrdesk_core::models::{NewNotification, NotificationType, ReportRequest};
use hrdesk_db::NotificationRepository;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NotificationServiceConfig {
    pub max_attempts: u32,
    pub retry_base_delay: Duration,
}

impl Default for NotificationServiceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    config: NotificationServiceConfig,
}

impl NotificationService {
    pub fn new(repository: Arc<dyn NotificationRepository>, config: NotificationServiceConfig) -> Self {
        Self { repository, config }
    }

    /// REPORT_READY for the requester. Returns whether it was stored.
    pub async fn report_ready(&self, report: &ReportRequest) -> bool {
        self.deliver(NewNotification {
            report_id: report.id,
            recipient: report.requested_by,
            title: "Report ready".to_string(),
            message: format!("Your report \"{}\" is ready for download.", report.title),
            notification_type: NotificationType::ReportReady,
        })
        .await
    }

    /// ERROR carrying the failure reason. Returns whether it was stored.
    pub async fn report_failed(&self, report: &ReportRequest, reason: &str) -> bool {
        self.deliver(NewNotification {
            report_id: report.id,
            recipient: report.requested_by,
            title: "Report generation failed".to_string(),
            message: format!(
                "Your report \"{}\" could not be generated: {}",
                report.title, reason
            ),
            notification_type: NotificationType::Error,
        })
        .await
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    #[tracing::instrument(skip(self, notification), fields(report_id = %notification.report_id, notification.type = %notification.notification_type))]
    async fn deliver(&self, notification: NewNotification) -> bool {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            match self.repository.insert(notification.clone()).await {
                Ok(stored) => {
                    tracing::debug!(notification_id = %stored.id, attempt, "Notification stored");
                    return true;
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        "Failed to store notification, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        attempts = max_attempts,
                        "Giving up on notification delivery"
                    );
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use hrdesk_core::models::{ReportParameters, ReportStatus};
    use hrdesk_db::memory::InMemoryNotificationRepository;
    use uuid::Uuid;

    fn report() -> ReportRequest {
        ReportRequest {
            id: Uuid::new_v4(),
            report_type: "LEAVE_SUMMARY".to_string(),
            title: "Q3 leave".to_string(),
            description: None,
            parameters: ReportParameters {
                date_from: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                date_to: NaiveDate::from_ymd_opt(2025, 9, 30).unwrap(),
                department_id: None,
            },
            status: ReportStatus::Generating,
            artifact_path: None,
            artifact_size: None,
            requested_by: 42,
            error_message: None,
            download_count: 0,
            created_at: Utc::now(),
            generated_at: None,
        }
    }

    fn service(repo: &InMemoryNotificationRepository, max_attempts: u32) -> NotificationService {
        NotificationService::new(
            Arc::new(repo.clone()),
            NotificationServiceConfig {
                max_attempts,
                retry_base_delay: Duration::from_millis(1),
            },
        )
    }

    #[tokio::test]
    async fn test_report_ready_emits_one_notification() {
        let repo = InMemoryNotificationRepository::new();
        let report = report();

        assert!(service(&repo, 3).report_ready(&report).await);

        let stored = repo.list_for_report(report.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].notification_type, NotificationType::ReportReady);
        assert_eq!(stored[0].recipient, 42);
    }

    #[tokio::test]
    async fn test_failure_message_carries_reason() {
        let repo = InMemoryNotificationRepository::new();
        let report = report();

        assert!(service(&repo, 3).report_failed(&report, "Unsupported report type: X").await);

        let stored = repo.list_for_report(report.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].notification_type, NotificationType::Error);
        assert!(stored[0].message.contains("Unsupported report type: X"));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let repo = InMemoryNotificationRepository::new();
        repo.fail_next_inserts(2);
        let report = report();

        assert!(service(&repo, 3).report_ready(&report).await);
        assert_eq!(repo.list_for_report(report.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_without_error() {
        let repo = InMemoryNotificationRepository::new();
        repo.fail_next_inserts(5);
        let report = report();

        assert!(!service(&repo, 3).report_ready(&report).await);
        assert!(repo.all().await.is_empty());
    }

    #[test]
    fn test_backoff_is_exponential() {
        let svc = NotificationService::new(
            Arc::new(InMemoryNotificationRepository::new()),
            NotificationServiceConfig::default(),
        );
        assert_eq!(svc.backoff(1), Duration::from_millis(100));
        assert_eq!(svc.backoff(2), Duration::from_millis(200));
        assert_eq!(svc.backoff(3), Duration::from_millis(400));
    }
}
