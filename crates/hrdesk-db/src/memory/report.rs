use crate::db::ReportRepository;
use chrono::{DateTime, Utc};
use hrdesk_core::models::{
    NewReport, ReportListQuery, ReportRequest, ReportStats, ReportStatus,
};
use hrdesk_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryReportRepository {
    reports: Arc<RwLock<HashMap<Uuid, ReportRequest>>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fully formed row, e.g. one with a backdated `created_at`.
    pub async fn seed(&self, report: ReportRequest) {
        self.reports.write().await.insert(report.id, report);
    }
}

fn matches(report: &ReportRequest, query: &ReportListQuery) -> bool {
    if let Some(report_type) = query.report_type.as_deref() {
        if report.report_type != report_type {
            return false;
        }
    }
    if let Some(status) = query.status {
        if report.status != status {
            return false;
        }
    }
    if let Some(requested_by) = query.requested_by {
        if report.requested_by != requested_by {
            return false;
        }
    }
    match query.search_term() {
        Some(term) => report
            .title
            .to_lowercase()
            .contains(&term.to_lowercase()),
        None => true,
    }
}

#[async_trait::async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn create(&self, new_report: NewReport) -> Result<ReportRequest, AppError> {
        let report = ReportRequest {
            id: Uuid::new_v4(),
            report_type: new_report.report_type,
            title: new_report.title,
            description: new_report.description,
            parameters: new_report.parameters,
            status: ReportStatus::Generating,
            artifact_path: None,
            artifact_size: None,
            requested_by: new_report.requested_by,
            error_message: None,
            download_count: 0,
            created_at: Utc::now(),
            generated_at: None,
        };
        self.reports.write().await.insert(report.id, report.clone());
        Ok(report)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ReportRequest>, AppError> {
        Ok(self.reports.read().await.get(&id).cloned())
    }

    async fn list(&self, query: &ReportListQuery) -> Result<(Vec<ReportRequest>, i64), AppError> {
        let reports = self.reports.read().await;
        let mut matching: Vec<ReportRequest> = reports
            .values()
            .filter(|r| matches(r, query))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .collect();
        Ok((page, total))
    }

    async fn stats(&self, month_start: DateTime<Utc>) -> Result<ReportStats, AppError> {
        let reports = self.reports.read().await;
        let mut stats = ReportStats::default();
        for report in reports.values() {
            stats.total_reports += 1;
            if report.created_at >= month_start {
                stats.reports_this_month += 1;
            }
            match report.status {
                ReportStatus::Generating => stats.in_progress_count += 1,
                ReportStatus::Completed => stats.completed_count += 1,
                ReportStatus::Failed => stats.failed_count += 1,
            }
            stats.total_downloads += report.download_count;
        }
        Ok(stats)
    }

    async fn mark_completed(
        &self,
        id: Uuid,
        artifact_path: &str,
        artifact_size: i64,
        generated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&id) {
            Some(report) if report.status == ReportStatus::Generating => {
                report.status = ReportStatus::Completed;
                report.artifact_path = Some(artifact_path.to_string());
                report.artifact_size = Some(artifact_size);
                report.generated_at = Some(generated_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<bool, AppError> {
        let mut reports = self.reports.write().await;
        match reports.get_mut(&id) {
            Some(report) if report.status == ReportStatus::Generating => {
                report.status = ReportStatus::Failed;
                report.error_message = Some(reason.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_downloads(&self, id: Uuid) -> Result<(), AppError> {
        if let Some(report) = self.reports.write().await.get_mut(&id) {
            report.download_count += 1;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.reports.write().await.remove(&id).is_some())
    }

    async fn find_stale_generating(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, AppError> {
        let reports = self.reports.read().await;
        let mut stale: Vec<&ReportRequest> = reports
            .values()
            .filter(|r| r.status == ReportStatus::Generating && r.created_at < created_before)
            .collect();
        stale.sort_by_key(|r| r.created_at);
        Ok(stale
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|r| r.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use hrdesk_core::models::ReportParameters;

    fn new_report(title: &str, report_type: &str, requested_by: i64) -> NewReport {
        NewReport {
            report_type: report_type.to_string(),
            title: title.to_string(),
            description: None,
            parameters: ReportParameters {
                date_from: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                date_to: NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
                department_id: None,
            },
            requested_by,
        }
    }

    #[tokio::test]
    async fn test_create_starts_generating() {
        let repo = InMemoryReportRepository::new();
        let report = repo
            .create(new_report("July attendance", "ATTENDANCE_SUMMARY", 1))
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Generating);
        assert!(report.artifact_path.is_none());
        assert_eq!(repo.get(report.id).await.unwrap().unwrap().title, "July attendance");
    }

    #[tokio::test]
    async fn test_terminal_transition_applies_once() {
        let repo = InMemoryReportRepository::new();
        let report = repo
            .create(new_report("Payroll", "PAYROLL_SUMMARY", 1))
            .await
            .unwrap();

        assert!(repo
            .mark_completed(report.id, "reports/x.pdf", 10, Utc::now())
            .await
            .unwrap());
        assert!(!repo.mark_failed(report.id, "late failure").await.unwrap());
        assert!(!repo
            .mark_completed(report.id, "reports/y.pdf", 20, Utc::now())
            .await
            .unwrap());

        let stored = repo.get(report.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReportStatus::Completed);
        assert_eq!(stored.artifact_path.as_deref(), Some("reports/x.pdf"));
        assert!(stored.error_message.is_none());
    }

    #[tokio::test]
    async fn test_transition_on_deleted_row_does_not_apply() {
        let repo = InMemoryReportRepository::new();
        let report = repo
            .create(new_report("Leave", "LEAVE_SUMMARY", 1))
            .await
            .unwrap();

        assert!(repo.delete(report.id).await.unwrap());
        assert!(!repo.delete(report.id).await.unwrap());
        assert!(!repo
            .mark_completed(report.id, "reports/x.pdf", 10, Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_filters_and_paginates() {
        let repo = InMemoryReportRepository::new();
        for i in 0..12 {
            repo.create(new_report(&format!("Attendance {}", i), "ATTENDANCE_SUMMARY", 1))
                .await
                .unwrap();
        }
        repo.create(new_report("Quarterly payroll", "PAYROLL_SUMMARY", 2))
            .await
            .unwrap();

        let (page, total) = repo.list(&ReportListQuery::default()).await.unwrap();
        assert_eq!(total, 13);
        assert_eq!(page.len(), 10);

        let query = ReportListQuery {
            page: Some(2),
            report_type: Some("ATTENDANCE_SUMMARY".to_string()),
            ..Default::default()
        };
        let (page, total) = repo.list(&query).await.unwrap();
        assert_eq!(total, 12);
        assert_eq!(page.len(), 2);

        let query = ReportListQuery {
            search: Some("PAYROLL".to_string()),
            ..Default::default()
        };
        let (page, total) = repo.list(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].requested_by, 2);
    }

    #[tokio::test]
    async fn test_stats_counts_by_status() {
        let repo = InMemoryReportRepository::new();
        let a = repo.create(new_report("a", "LEAVE_SUMMARY", 1)).await.unwrap();
        let b = repo.create(new_report("b", "LEAVE_SUMMARY", 1)).await.unwrap();
        repo.create(new_report("c", "LEAVE_SUMMARY", 1)).await.unwrap();

        repo.mark_completed(a.id, "reports/a.pdf", 1, Utc::now())
            .await
            .unwrap();
        repo.increment_downloads(a.id).await.unwrap();
        repo.increment_downloads(a.id).await.unwrap();
        repo.mark_failed(b.id, "boom").await.unwrap();

        let stats = repo.stats(Utc::now() - Duration::days(1)).await.unwrap();
        assert_eq!(stats.total_reports, 3);
        assert_eq!(stats.reports_this_month, 3);
        assert_eq!(stats.in_progress_count, 1);
        assert_eq!(stats.completed_count, 1);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.total_downloads, 2);
    }

    #[tokio::test]
    async fn test_find_stale_generating() {
        let repo = InMemoryReportRepository::new();
        let fresh = repo.create(new_report("fresh", "LEAVE_SUMMARY", 1)).await.unwrap();

        let mut old = fresh.clone();
        old.id = Uuid::new_v4();
        old.created_at = Utc::now() - Duration::hours(2);
        repo.seed(old.clone()).await;

        let stale = repo
            .find_stale_generating(Utc::now() - Duration::hours(1), 10)
            .await
            .unwrap();
        assert_eq!(stale, vec![old.id]);
    }
}
