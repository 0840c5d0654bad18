//! OpenAPI documentation served at `/api/openapi.json` and rendered at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use hrdesk_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "hrdesk Report API",
        version = "0.1.0",
        description = "Asynchronous HR analytics reports. Submitting a report returns immediately; the PDF is generated in the background and announced through in-app notifications. All endpoints are versioned under /api/v1/."
    ),
    paths(
        // Reports
        handlers::reports::submit_report,
        handlers::reports::list_reports,
        handlers::reports::report_stats,
        handlers::reports::get_report,
        handlers::reports::download_report,
        handlers::reports::delete_report,
        // Notifications
        handlers::notifications::list_notifications,
        handlers::notifications::list_report_notifications,
        handlers::notifications::mark_notification_read,
    ),
    components(
        schemas(
            models::ReportType,
            models::ReportStatus,
            models::ReportParameters,
            models::SubmitReportRequest,
            models::ReportParametersInput,
            models::SubmitReportResponse,
            models::ReportResponse,
            models::ReportListResponse,
            models::Pagination,
            models::ReportStats,
            models::Notification,
            models::NotificationType,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "reports", description = "Report submission, listing, download and deletion"),
        (name = "notifications", description = "In-app notifications about finished reports")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_versioned_paths() {
        let spec = get_openapi_spec();
        for path in [
            "/api/v1/reports",
            "/api/v1/reports/stats",
            "/api/v1/reports/{id}",
            "/api/v1/reports/{id}/download",
            "/api/v1/notifications/{id}/read",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
