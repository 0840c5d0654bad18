//! Test helpers: build the router over in-memory backends.
//!
//! Run with: `cargo test -p hrdesk-api`. No database is required.

pub mod fixtures;

use axum_test::TestServer;
use hrdesk_api::constants;
use hrdesk_api::setup::{routes, services, BackgroundJobs, ReportBackends};
use hrdesk_core::models::ReportResponse;
use hrdesk_core::{BaseConfig, Config, ReportServiceConfig};
use hrdesk_db::memory::{
    InMemoryAdminDirectory, InMemoryHrDataGateway, InMemoryJobLock,
    InMemoryNotificationRepository, InMemoryReportRepository,
};
use hrdesk_storage::{LocalStorage, Storage};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

pub const ADMIN_ID: i64 = 1;

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus handles on the in-memory backends.
pub struct TestApp {
    pub server: TestServer,
    pub reports: InMemoryReportRepository,
    pub notifications: InMemoryNotificationRepository,
    pub storage: Arc<LocalStorage>,
    pub background: BackgroundJobs,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Poll the report until it leaves GENERATING.
    pub async fn wait_for_terminal(&self, id: Uuid) -> ReportResponse {
        for _ in 0..200 {
            let report: ReportResponse = self
                .client()
                .get(&api_path(&format!("/reports/{}", id)))
                .await
                .json();
            if report.status.is_terminal() {
                return report;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("report {} never left GENERATING", id);
    }
}

pub fn test_config(storage_path: &str) -> Config {
    Config(Box::new(ReportServiceConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 1,
            environment: "test".to_string(),
            log_format: "compact".to_string(),
        },
        database_url: "postgres://unused".to_string(),
        local_storage_path: storage_path.to_string(),
        report_queue_capacity: 32,
        report_max_concurrent_jobs: 2,
        report_job_timeout_secs: 30,
        report_stale_reap_interval_secs: 0,
        report_stale_after_secs: 3600,
        notification_max_attempts: 2,
        notification_retry_base_ms: 1,
        report_organization_name: "Acme HR".to_string(),
    }))
}

/// Setup test app with the given HR dataset and one admin (`ADMIN_ID`).
pub async fn setup_test_app(gateway: InMemoryHrDataGateway) -> TestApp {
    setup_test_app_with_storage(gateway, |local| local as Arc<dyn Storage>).await
}

/// Like [`setup_test_app`], but the service sees the local storage through `wrap`.
///
/// `TestApp::storage` stays the unwrapped local storage.
pub async fn setup_test_app_with_storage<F>(gateway: InMemoryHrDataGateway, wrap: F) -> TestApp
where
    F: FnOnce(Arc<LocalStorage>) -> Arc<dyn Storage>,
{
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage_path = temp_dir.path().to_string_lossy().to_string();
    let config = test_config(&storage_path);

    let storage = Arc::new(
        LocalStorage::new(&storage_path)
            .await
            .expect("Failed to create local storage"),
    );
    let reports = InMemoryReportRepository::new();
    let notifications = InMemoryNotificationRepository::new();

    let backends = ReportBackends {
        reports: Arc::new(reports.clone()),
        notifications: Arc::new(notifications.clone()),
        gateway: Arc::new(gateway),
        admins: Arc::new(
            InMemoryAdminDirectory::new().with_admin(ADMIN_ID, "Grace Hopper", "grace@example.com"),
        ),
        lock: Arc::new(InMemoryJobLock::new()),
        storage: wrap(storage.clone()),
        pool: None,
    };

    let (state, background) = services::build_state(&config, backends);
    let app = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(app).expect("Failed to create test server");

    TestApp {
        server,
        reports,
        notifications,
        storage,
        background,
        _temp_dir: temp_dir,
    }
}
