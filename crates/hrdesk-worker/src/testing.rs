use crate::runner::ReportJobRunner;
use chrono::NaiveDate;
use hrdesk_core::models::{
    AttendanceRecord, AttendanceStatus, NewReport, ReportParameters, ReportRequest,
};
use hrdesk_db::memory::{
    InMemoryAdminDirectory, InMemoryHrDataGateway, InMemoryJobLock,
    InMemoryNotificationRepository, InMemoryReportRepository,
};
use hrdesk_db::{HrDataGateway, ReportRepository};
use hrdesk_processing::ReportRenderer;
use hrdesk_services::{NotificationService, NotificationServiceConfig};
use hrdesk_storage::{report_artifact_key, LocalStorage, Storage};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub const ADMIN_ID: i64 = 7;

pub struct Harness {
    pub reports: InMemoryReportRepository,
    pub notifications: InMemoryNotificationRepository,
    pub lock: InMemoryJobLock,
    pub storage: Arc<LocalStorage>,
    pub notifier: NotificationService,
    pub runner: ReportJobRunner,
    _dir: TempDir,
}

impl Harness {
    pub async fn new(gateway: InMemoryHrDataGateway) -> Self {
        Self::with_timeout(gateway, None).await
    }

    pub async fn with_timeout(gateway: InMemoryHrDataGateway, timeout: Option<Duration>) -> Self {
        Self::with_gateway(Arc::new(gateway), timeout).await
    }

    pub async fn with_gateway(gateway: Arc<dyn HrDataGateway>, timeout: Option<Duration>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let reports = InMemoryReportRepository::new();
        let notifications = InMemoryNotificationRepository::new();
        let lock = InMemoryJobLock::new();
        let admins = InMemoryAdminDirectory::new().with_admin(ADMIN_ID, "Ada Admin", "ada@example.com");
        let notifier = NotificationService::new(
            Arc::new(notifications.clone()),
            NotificationServiceConfig {
                max_attempts: 2,
                retry_base_delay: Duration::from_millis(1),
            },
        );

        let runner = ReportJobRunner::new(
            Arc::new(reports.clone()),
            gateway,
            Arc::new(admins),
            Arc::new(lock.clone()),
            storage.clone(),
            notifier.clone(),
            ReportRenderer::new("Acme HR"),
        )
        .with_timeout(timeout);

        Self {
            reports,
            notifications,
            lock,
            storage,
            notifier,
            runner,
            _dir: dir,
        }
    }

    pub fn july(&self, department_id: Option<i64>) -> ReportParameters {
        ReportParameters {
            date_from: day(1),
            date_to: day(31),
            department_id,
        }
    }

    pub async fn submit(&self, report_type: &str, department_id: Option<i64>) -> ReportRequest {
        self.reports
            .create(NewReport {
                report_type: report_type.to_string(),
                title: "July report".to_string(),
                description: None,
                parameters: self.july(department_id),
                requested_by: ADMIN_ID,
            })
            .await
            .unwrap()
    }

    pub async fn artifact(&self, id: Uuid) -> Option<Vec<u8>> {
        self.storage.download(&report_artifact_key(id)).await.ok()
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
}

fn attendance(employee_id: i64, date: u32, status: AttendanceStatus, department_id: i64) -> AttendanceRecord {
    AttendanceRecord {
        employee_id,
        employee_name: format!("Employee {}", employee_id),
        department_id: Some(department_id),
        department_name: Some(format!("Dept {}", department_id)),
        date: day(date),
        check_in: None,
        check_out: None,
        status: Some(status),
        total_hours: Some(8.0),
        overtime: None,
    }
}

/// Department 2 holds 15 PRESENT, 3 LATE and 2 ABSENT days in July
pub fn attendance_scenario() -> InMemoryHrDataGateway {
    let mut records = Vec::new();
    for i in 0..15 {
        records.push(attendance(i, (i as u32 % 28) + 1, AttendanceStatus::Present, 2));
    }
    for i in 0..3 {
        records.push(attendance(20 + i, i as u32 + 1, AttendanceStatus::Late, 2));
    }
    for i in 0..2 {
        records.push(attendance(30 + i, i as u32 + 1, AttendanceStatus::Absent, 2));
    }
    records.push(attendance(99, 4, AttendanceStatus::Absent, 1));

    InMemoryHrDataGateway::new()
        .with_attendance(records)
        .with_department(1, "Finance")
        .with_department(2, "Engineering")
}
