//! Application state shared by every handler

use crate::services::ReportService;
use hrdesk_db::NotificationRepository;
use hrdesk_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub reports: ReportService,
    pub notifications: Arc<dyn NotificationRepository>,
    pub health: HealthState,
}

/// Dependencies probed by the health endpoint
#[derive(Clone)]
pub struct HealthState {
    /// Absent when the service runs on in-memory repositories
    pub pool: Option<PgPool>,
    pub storage: Arc<dyn Storage>,
}
