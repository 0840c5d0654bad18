use chrono::{DateTime, Utc};
use hrdesk_core::models::{
    NewReport, ReportListQuery, ReportParameters, ReportRequest, ReportStats, ReportStatus,
};
use hrdesk_core::AppError;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};
use uuid::Uuid;

/// Report Registry: the only writer of report request rows.
///
/// Terminal transitions are conditional on the row still being GENERATING and
/// report whether they applied, so a row moves to a terminal state at most once.
#[async_trait::async_trait]
pub trait ReportRepository: Send + Sync {
    async fn create(&self, new_report: NewReport) -> Result<ReportRequest, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<ReportRequest>, AppError>;

    /// Filtered, paginated listing ordered by creation time (newest first), plus the total match count.
    async fn list(&self, query: &ReportListQuery) -> Result<(Vec<ReportRequest>, i64), AppError>;

    async fn stats(&self, month_start: DateTime<Utc>) -> Result<ReportStats, AppError>;

    /// GENERATING -> COMPLETED. Returns false when the row is gone or already terminal.
    async fn mark_completed(
        &self,
        id: Uuid,
        artifact_path: &str,
        artifact_size: i64,
        generated_at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// GENERATING -> FAILED. Returns false when the row is gone or already terminal.
    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<bool, AppError>;

    async fn increment_downloads(&self, id: Uuid) -> Result<(), AppError>;

    /// Returns false when no row existed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Ids of GENERATING rows created before `created_before`, oldest first.
    async fn find_stale_generating(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, AppError>;
}

const REPORT_COLUMNS: &str = "id, report_type, title, description, parameters, status, \
     artifact_path, artifact_size, requested_by, error_message, download_count, created_at, generated_at";

/// Escape LIKE wildcards so user search terms match literally
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Clone)]
pub struct PostgresReportRepository {
    pool: PgPool,
}

impl PostgresReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReportRepository for PostgresReportRepository {
    #[tracing::instrument(skip(self, new_report), fields(db.table = "report_requests", db.operation = "insert"))]
    async fn create(&self, new_report: NewReport) -> Result<ReportRequest, AppError> {
        let report = sqlx::query_as::<Postgres, ReportRequest>(&format!(
            r#"
            INSERT INTO report_requests (id, report_type, title, description, parameters, status, requested_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            REPORT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&new_report.report_type)
        .bind(&new_report.title)
        .bind(&new_report.description)
        .bind(Json::<&ReportParameters>(&new_report.parameters))
        .bind(ReportStatus::Generating.as_str())
        .bind(new_report.requested_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(report)
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_requests", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<ReportRequest>, AppError> {
        let report = sqlx::query_as::<Postgres, ReportRequest>(&format!(
            "SELECT {} FROM report_requests WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_requests", db.operation = "select"))]
    async fn list(&self, query: &ReportListQuery) -> Result<(Vec<ReportRequest>, i64), AppError> {
        const FILTER: &str = r#"
            WHERE ($1::text IS NULL OR report_type = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::bigint IS NULL OR requested_by = $3)
              AND ($4::text IS NULL OR title ILIKE '%' || $4 || '%' ESCAPE '\')
        "#;

        let status = query.status.map(|s| s.as_str());
        let search = query.search_term().map(escape_like);

        let total = sqlx::query_scalar::<Postgres, i64>(&format!(
            "SELECT COUNT(*) FROM report_requests {}",
            FILTER
        ))
        .bind(query.report_type.as_deref())
        .bind(status)
        .bind(query.requested_by)
        .bind(search.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let reports = sqlx::query_as::<Postgres, ReportRequest>(&format!(
            "SELECT {} FROM report_requests {} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6",
            REPORT_COLUMNS, FILTER
        ))
        .bind(query.report_type.as_deref())
        .bind(status)
        .bind(query.requested_by)
        .bind(search.as_deref())
        .bind(i64::from(query.limit()))
        .bind(query.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((reports, total))
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_requests", db.operation = "select"))]
    async fn stats(&self, month_start: DateTime<Utc>) -> Result<ReportStats, AppError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_reports,
                COUNT(*) FILTER (WHERE created_at >= $1) AS reports_this_month,
                COUNT(*) FILTER (WHERE status = 'GENERATING') AS in_progress_count,
                COUNT(*) FILTER (WHERE status = 'COMPLETED') AS completed_count,
                COUNT(*) FILTER (WHERE status = 'FAILED') AS failed_count,
                COALESCE(SUM(download_count), 0)::BIGINT AS total_downloads
            FROM report_requests
            "#,
        )
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;

        Ok(ReportStats {
            total_reports: row.try_get("total_reports")?,
            reports_this_month: row.try_get("reports_this_month")?,
            in_progress_count: row.try_get("in_progress_count")?,
            completed_count: row.try_get("completed_count")?,
            failed_count: row.try_get("failed_count")?,
            total_downloads: row.try_get("total_downloads")?,
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_requests", db.operation = "update", db.record_id = %id))]
    async fn mark_completed(
        &self,
        id: Uuid,
        artifact_path: &str,
        artifact_size: i64,
        generated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE report_requests
            SET status = 'COMPLETED', artifact_path = $2, artifact_size = $3, generated_at = $4
            WHERE id = $1 AND status = 'GENERATING'
            "#,
        )
        .bind(id)
        .bind(artifact_path)
        .bind(artifact_size)
        .bind(generated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, reason), fields(db.table = "report_requests", db.operation = "update", db.record_id = %id))]
    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE report_requests
            SET status = 'FAILED', error_message = $2
            WHERE id = $1 AND status = 'GENERATING'
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_requests", db.operation = "update", db.record_id = %id))]
    async fn increment_downloads(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE report_requests SET download_count = download_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_requests", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM report_requests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_requests", db.operation = "select"))]
    async fn find_stale_generating(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            SELECT id FROM report_requests
            WHERE status = 'GENERATING' AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(created_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_done"), "100\\%\\_done");
        assert_eq!(escape_like("plain"), "plain");
    }
}
