use crate::error::{ErrorResponse, HttpAppError, ValidatedJson, ValidatedQuery};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
    Json,
};
use futures::StreamExt;
use hrdesk_core::models::{
    ReportListQuery, ReportListResponse, ReportResponse, ReportStats, SubmitReportRequest,
    SubmitReportResponse,
};
use hrdesk_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/reports",
    tag = "reports",
    request_body = SubmitReportRequest,
    responses(
        (status = 202, description = "Report accepted; generation runs in the background", body = SubmitReportResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 404, description = "Requesting admin not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn submit_report(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SubmitReportRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let report_id = state.reports.submit(request).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitReportResponse { report_id })))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports",
    tag = "reports",
    params(ReportListQuery),
    responses(
        (status = 200, description = "Page of reports, newest first", body = ReportListResponse),
        (status = 400, description = "Invalid query string", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ReportListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state.reports.list(&query).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/stats",
    tag = "reports",
    responses(
        (status = 200, description = "Aggregate report counters", body = ReportStats),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn report_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let stats = state.reports.stats().await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    tag = "reports",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report request", body = ReportResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let report = state.reports.get(id).await?;
    Ok(Json(ReportResponse::from(report)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}/download",
    tag = "reports",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Rendered report", content_type = "application/pdf"),
        (status = 404, description = "Report or artifact not found", body = ErrorResponse),
        (status = 409, description = "Report is not COMPLETED", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(report_id = %id, operation = "download_report"))]
pub async fn download_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let download = state.reports.download(id).await?;

    let body_stream = download.body.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let content_disposition = format!("attachment; filename=\"{}\"", download.filename);

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, hrdesk_worker::PDF_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .header(header::CACHE_CONTROL, "private, no-store");
    if let Some(length) = download.content_length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    let response = builder
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/api/v1/reports/{id}",
    tag = "reports",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 204, description = "Report and artifact deleted"),
        (status = 404, description = "Report not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.reports.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
