//! Report request handling: validation, registration, listing, download and deletion.
//!
//! Submission only registers the request and hands its id to the job queue; the
//! generation itself happens in the worker.

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use hrdesk_core::models::{
    NewReport, Pagination, ReportListQuery, ReportListResponse, ReportParameters, ReportRequest,
    ReportResponse, ReportStats, ReportStatus, SubmitReportRequest,
};
use hrdesk_core::AppError;
use hrdesk_db::{AdminDirectory, ReportRepository};
use hrdesk_storage::{report_artifact_key, ByteStream, Storage, StorageError};
use hrdesk_worker::ReportJobQueue;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Artifact body plus the headers the download response needs
pub struct ReportDownload {
    pub filename: String,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
    admins: Arc<dyn AdminDirectory>,
    storage: Arc<dyn Storage>,
    queue: Arc<ReportJobQueue>,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportRepository>,
        admins: Arc<dyn AdminDirectory>,
        storage: Arc<dyn Storage>,
        queue: Arc<ReportJobQueue>,
    ) -> Self {
        Self {
            reports,
            admins,
            storage,
            queue,
        }
    }

    /// Register a report request and queue its generation.
    ///
    /// The report type is not checked here; an unknown type is accepted and
    /// fails inside the job.
    #[tracing::instrument(skip(self, request), fields(report_id = tracing::field::Empty))]
    pub async fn submit(&self, request: SubmitReportRequest) -> Result<Uuid, AppError> {
        let new_report = validate_submission(request)?;

        if self.admins.find_admin(new_report.requested_by).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Admin {} not found",
                new_report.requested_by
            )));
        }

        let report = self.reports.create(new_report).await?;
        tracing::Span::current().record("report_id", tracing::field::display(report.id));

        // The row exists either way; an id that misses the queue is failed by the reaper
        if let Err(e) = self.queue.submit(report.id) {
            tracing::warn!(error = %e, "Report registered but could not be queued");
        }

        tracing::info!(
            report.type = %report.report_type,
            requested_by = report.requested_by,
            "Report generation requested"
        );
        Ok(report.id)
    }

    pub async fn list(&self, query: &ReportListQuery) -> Result<ReportListResponse, AppError> {
        let (reports, total) = self.reports.list(query).await?;
        Ok(ReportListResponse {
            reports: reports.into_iter().map(ReportResponse::from).collect(),
            pagination: Pagination::new(query.page(), query.limit(), total),
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<ReportRequest, AppError> {
        self.reports
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
    }

    pub async fn stats(&self) -> Result<ReportStats, AppError> {
        self.reports.stats(month_start(Utc::now())).await
    }

    #[tracing::instrument(skip(self), fields(report_id = %id))]
    pub async fn download(&self, id: Uuid) -> Result<ReportDownload, AppError> {
        let report = self.get(id).await?;

        if report.status != ReportStatus::Completed {
            return Err(AppError::NotReady(format!(
                "Report is not ready for download (status: {})",
                report.status
            )));
        }

        let Some(artifact_path) = report.artifact_path.as_deref() else {
            tracing::warn!("Completed report has no artifact path");
            return Err(AppError::NotFound("Report file not found".to_string()));
        };

        let body = match self.storage.download_stream(artifact_path).await {
            Ok(body) => body,
            Err(StorageError::NotFound(_)) => {
                tracing::warn!(storage_key = %artifact_path, "Completed report artifact is missing from storage");
                return Err(AppError::NotFound("Report file not found".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.reports.increment_downloads(id).await {
            tracing::warn!(error = %e, "Failed to record report download");
        }

        Ok(ReportDownload {
            filename: format!("{}.pdf", filename_slug(&report.title)),
            content_length: report.artifact_size.and_then(|s| u64::try_from(s).ok()),
            body,
        })
    }

    /// Remove the row, then the artifact.
    ///
    /// The row goes first so a job finishing concurrently either fails its
    /// conditional completion and cleans up after itself, or completes before
    /// the row delete and leaves an artifact this call removes.
    #[tracing::instrument(skip(self), fields(report_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        if !self.reports.delete(id).await? {
            return Err(AppError::NotFound("Report not found".to_string()));
        }
        let artifact_key = report_artifact_key(id);
        if let Err(e) = self.storage.delete(&artifact_key).await {
            tracing::warn!(error = %e, storage_key = %artifact_key, "Failed to delete report artifact");
        }
        tracing::info!("Report deleted");
        Ok(())
    }
}

fn blank(value: Option<&str>) -> bool {
    value.map(str::trim).map_or(true, str::is_empty)
}

/// Check required fields, lengths and the date window, producing the row to insert.
fn validate_submission(request: SubmitReportRequest) -> Result<NewReport, AppError> {
    let mut missing = Vec::new();
    if blank(request.report_type.as_deref()) {
        missing.push("reportType");
    }
    if blank(request.title.as_deref()) {
        missing.push("title");
    }
    match &request.parameters {
        None => missing.push("parameters"),
        Some(parameters) => {
            if parameters.date_from.is_none() {
                missing.push("parameters.dateFrom");
            }
            if parameters.date_to.is_none() {
                missing.push("parameters.dateTo");
            }
        }
    }
    if request.requested_by.is_none() {
        missing.push("requestedBy");
    }
    if !missing.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    request.validate()?;

    let (Some(report_type), Some(title), Some(parameters), Some(requested_by)) = (
        request.report_type,
        request.title,
        request.parameters,
        request.requested_by,
    ) else {
        return Err(AppError::InvalidInput("Missing required fields".to_string()));
    };
    let (Some(date_from), Some(date_to)) = (parameters.date_from, parameters.date_to) else {
        return Err(AppError::InvalidInput("Missing required fields".to_string()));
    };

    if date_from > date_to {
        return Err(AppError::InvalidInput(
            "parameters.dateFrom must not be after parameters.dateTo".to_string(),
        ));
    }

    Ok(NewReport {
        report_type: report_type.trim().to_string(),
        title: title.trim().to_string(),
        description: request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        parameters: ReportParameters {
            date_from,
            date_to,
            department_id: parameters.department_id,
        },
        requested_by,
    })
}

/// First instant of the UTC calendar month containing `now`
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    date.with_day(1)
        .unwrap_or(date)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Download file name stem derived from the report title.
///
/// ASCII alphanumerics, `-` and `_` are kept, whitespace runs become a single
/// `_`, everything else is dropped.
pub fn filename_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;
    for ch in title.trim().chars() {
        if ch.is_whitespace() {
            pending_separator = true;
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch);
        }
    }
    if slug.is_empty() {
        "report".to_string()
    } else {
        slug
    }
}
