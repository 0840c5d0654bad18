use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;

/// Closed set of report kinds the generator knows how to build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    AttendanceSummary,
    LeaveSummary,
    PayrollSummary,
    EmployeePerformance,
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [
        ReportType::AttendanceSummary,
        ReportType::LeaveSummary,
        ReportType::PayrollSummary,
        ReportType::EmployeePerformance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::AttendanceSummary => "ATTENDANCE_SUMMARY",
            ReportType::LeaveSummary => "LEAVE_SUMMARY",
            ReportType::PayrollSummary => "PAYROLL_SUMMARY",
            ReportType::EmployeePerformance => "EMPLOYEE_PERFORMANCE",
        }
    }

    /// Human-readable name used in rendered artifacts
    pub fn label(&self) -> &'static str {
        match self {
            ReportType::AttendanceSummary => "Attendance Summary",
            ReportType::LeaveSummary => "Leave Summary",
            ReportType::PayrollSummary => "Payroll Summary",
            ReportType::EmployeePerformance => "Employee Performance",
        }
    }
}

impl Display for ReportType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ATTENDANCE_SUMMARY" => Ok(ReportType::AttendanceSummary),
            "LEAVE_SUMMARY" => Ok(ReportType::LeaveSummary),
            "PAYROLL_SUMMARY" => Ok(ReportType::PayrollSummary),
            "EMPLOYEE_PERFORMANCE" => Ok(ReportType::EmployeePerformance),
            other => Err(AppError::UnsupportedReportType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Generating,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Generating => "GENERATING",
            ReportStatus::Completed => "COMPLETED",
            ReportStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReportStatus::Generating)
    }
}

impl Display for ReportStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERATING" => Ok(ReportStatus::Generating),
            "COMPLETED" => Ok(ReportStatus::Completed),
            "FAILED" => Ok(ReportStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid report status: {}", s)),
        }
    }
}

/// Date range and scope a report is generated for. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportParameters {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department_id: Option<i64>,
}

impl ReportParameters {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.date_from && date <= self.date_to
    }

    pub fn matches_department(&self, department_id: Option<i64>) -> bool {
        match self.department_id {
            Some(wanted) => department_id == Some(wanted),
            None => true,
        }
    }

    /// "YYYY-MM-DD to YYYY-MM-DD"
    pub fn period(&self) -> String {
        format!(
            "{} to {}",
            self.date_from.format("%Y-%m-%d"),
            self.date_to.format("%Y-%m-%d")
        )
    }
}

/// A persisted report request. The report type is kept as submitted and is only
/// resolved against [`ReportType`] when the generation job runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub id: Uuid,
    pub report_type: String,
    pub title: String,
    pub description: Option<String>,
    pub parameters: ReportParameters,
    pub status: ReportStatus,
    pub artifact_path: Option<String>,
    pub artifact_size: Option<i64>,
    pub requested_by: i64,
    pub error_message: Option<String>,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
    pub generated_at: Option<DateTime<Utc>>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for ReportRequest {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        let parameters: sqlx::types::Json<ReportParameters> = row.try_get("parameters")?;
        Ok(ReportRequest {
            id: row.try_get("id")?,
            report_type: row.try_get("report_type")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            parameters: parameters.0,
            status: row.try_get::<String, _>("status")?.parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse report status: {}", e).into())
            })?,
            artifact_path: row.try_get("artifact_path")?,
            artifact_size: row.try_get("artifact_size")?,
            requested_by: row.try_get("requested_by")?,
            error_message: row.try_get("error_message")?,
            download_count: row.try_get("download_count")?,
            created_at: row.try_get("created_at")?,
            generated_at: row.try_get("generated_at")?,
        })
    }
}

impl ReportRequest {
    /// Resolve the stored type string against the supported report types.
    pub fn parsed_type(&self) -> Result<ReportType, AppError> {
        self.report_type.parse()
    }

    pub fn is_downloadable(&self) -> bool {
        self.status == ReportStatus::Completed && self.artifact_path.is_some()
    }
}

/// Fields required to register a new report request
#[derive(Debug, Clone)]
pub struct NewReport {
    pub report_type: String,
    pub title: String,
    pub description: Option<String>,
    pub parameters: ReportParameters,
    pub requested_by: i64,
}

/// Submission payload. Every field is optional at the wire level so that missing
/// values surface as validation errors naming the field.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    #[validate(required, length(min = 1, max = 64))]
    #[schema(example = "ATTENDANCE_SUMMARY")]
    pub report_type: Option<String>,
    #[validate(required, length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(required)]
    pub parameters: Option<ReportParametersInput>,
    #[validate(required)]
    pub requested_by: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportParametersInput {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub department_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportResponse {
    pub report_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: Uuid,
    pub report_type: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: ReportParameters,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_size: Option<i64>,
    pub requested_by: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

impl From<ReportRequest> for ReportResponse {
    fn from(report: ReportRequest) -> Self {
        Self {
            id: report.id,
            report_type: report.report_type,
            title: report.title,
            description: report.description,
            parameters: report.parameters,
            status: report.status,
            artifact_size: report.artifact_size,
            requested_by: report.requested_by,
            error_message: report.error_message,
            download_count: report.download_count,
            created_at: report.created_at,
            generated_at: report.generated_at,
        }
    }
}

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters for listing reports
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportListQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size (1-100, default 10)
    pub limit: Option<u32>,
    /// Filter by report type
    #[serde(rename = "type")]
    pub report_type: Option<String>,
    pub status: Option<ReportStatus>,
    pub requested_by: Option<i64>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
}

impl ReportListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }

    /// Trimmed, non-empty search term
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i64 = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit_i64 - 1) / limit_i64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportListResponse {
    pub reports: Vec<ReportResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total_reports: i64,
    pub reports_this_month: i64,
    pub in_progress_count: i64,
    pub completed_count: i64,
    pub failed_count: i64,
    pub total_downloads: i64,
}
