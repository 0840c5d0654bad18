//! Domain Data Gateway.
//!
//! Read-only access to the HR tables owned by the host system. Every query
//! filters on the inclusive `[date_from, date_to]` window of the record date
//! and on the optional department.

use hrdesk_core::models::{
    AttendanceRecord, Department, LeaveRecord, PayrollRecord, PerformanceRecord, ReportParameters,
};
use hrdesk_core::AppError;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};

#[async_trait::async_trait]
pub trait HrDataGateway: Send + Sync {
    async fn attendance(&self, params: &ReportParameters)
        -> Result<Vec<AttendanceRecord>, AppError>;

    /// Leave requests whose start date falls inside the window
    async fn leave_requests(&self, params: &ReportParameters) -> Result<Vec<LeaveRecord>, AppError>;

    async fn payroll(&self, params: &ReportParameters) -> Result<Vec<PayrollRecord>, AppError>;

    async fn performance_reviews(
        &self,
        params: &ReportParameters,
    ) -> Result<Vec<PerformanceRecord>, AppError>;

    async fn department(&self, id: i64) -> Result<Option<Department>, AppError>;
}

#[derive(Clone)]
pub struct PostgresHrDataGateway {
    pool: PgPool,
}

impl PostgresHrDataGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EMPLOYEE_COLUMNS: &str = r#"
    e.id::BIGINT AS employee_id,
    CONCAT_WS(' ', e.first_name, e.last_name) AS employee_name,
    d.id::BIGINT AS department_id,
    d.name AS department_name
"#;

const EMPLOYEE_JOIN: &str = r#"
    JOIN employees e ON e.id = r.employee_id
    LEFT JOIN departments d ON d.id = e.department_id
"#;

/// Known status, or `None` for NULL and values added by the host system later.
///
/// A record with an odd status still belongs in the report; it is listed but
/// left out of the per-status counts.
fn parse_status<T>(raw: Option<&str>) -> Option<T>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    let raw = raw?;
    match raw.parse() {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::debug!(error = %e, status = raw, "Unrecognized record status");
            None
        }
    }
}

fn decode_status<T>(row: &PgRow) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    let raw: Option<String> = row.try_get("status")?;
    Ok(parse_status(raw.as_deref()))
}

fn attendance_from_row(row: &PgRow) -> Result<AttendanceRecord, AppError> {
    Ok(AttendanceRecord {
        employee_id: row.try_get("employee_id")?,
        employee_name: row.try_get("employee_name")?,
        department_id: row.try_get("department_id")?,
        department_name: row.try_get("department_name")?,
        date: row.try_get("date")?,
        check_in: row.try_get("check_in")?,
        check_out: row.try_get("check_out")?,
        status: decode_status(row)?,
        total_hours: row.try_get("total_hours")?,
        overtime: row.try_get("overtime")?,
    })
}

fn leave_from_row(row: &PgRow) -> Result<LeaveRecord, AppError> {
    Ok(LeaveRecord {
        employee_id: row.try_get("employee_id")?,
        employee_name: row.try_get("employee_name")?,
        department_id: row.try_get("department_id")?,
        department_name: row.try_get("department_name")?,
        leave_type: row.try_get("leave_type")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status: decode_status(row)?,
        reason: row.try_get("reason")?,
    })
}

fn payroll_from_row(row: &PgRow) -> Result<PayrollRecord, AppError> {
    Ok(PayrollRecord {
        employee_id: row.try_get("employee_id")?,
        employee_name: row.try_get("employee_name")?,
        department_id: row.try_get("department_id")?,
        department_name: row.try_get("department_name")?,
        pay_date: row.try_get("pay_date")?,
        base_salary: row.try_get("base_salary")?,
        allowances: row.try_get("allowances")?,
        deductions: row.try_get("deductions")?,
    })
}

fn performance_from_row(row: &PgRow) -> Result<PerformanceRecord, AppError> {
    Ok(PerformanceRecord {
        employee_id: row.try_get("employee_id")?,
        employee_name: row.try_get("employee_name")?,
        department_id: row.try_get("department_id")?,
        department_name: row.try_get("department_name")?,
        review_date: row.try_get("review_date")?,
        rating: row
            .try_get::<Option<f64>, _>("rating")?
            .filter(|r| r.is_finite()),
        reviewer_name: row.try_get("reviewer_name")?,
        comments: row.try_get("comments")?,
    })
}

#[async_trait::async_trait]
impl HrDataGateway for PostgresHrDataGateway {
    #[tracing::instrument(skip(self), fields(db.table = "attendance", db.operation = "select"))]
    async fn attendance(
        &self,
        params: &ReportParameters,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS},
                r.date, r.check_in, r.check_out, r.status::TEXT AS status,
                r.total_hours::FLOAT8 AS total_hours, r.overtime::FLOAT8 AS overtime
            FROM attendance r
            {EMPLOYEE_JOIN}
            WHERE r.date BETWEEN $1 AND $2
              AND ($3::bigint IS NULL OR e.department_id = $3)
            "#
        );

        let rows = sqlx::query::<Postgres>(&sql)
            .bind(params.date_from)
            .bind(params.date_to)
            .bind(params.department_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(attendance_from_row).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "leave_requests", db.operation = "select"))]
    async fn leave_requests(&self, params: &ReportParameters) -> Result<Vec<LeaveRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS},
                r.leave_type::TEXT AS leave_type, r.start_date, r.end_date,
                r.status::TEXT AS status, r.reason
            FROM leave_requests r
            {EMPLOYEE_JOIN}
            WHERE r.start_date BETWEEN $1 AND $2
              AND ($3::bigint IS NULL OR e.department_id = $3)
            "#
        );

        let rows = sqlx::query::<Postgres>(&sql)
            .bind(params.date_from)
            .bind(params.date_to)
            .bind(params.department_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(leave_from_row).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "payroll", db.operation = "select"))]
    async fn payroll(&self, params: &ReportParameters) -> Result<Vec<PayrollRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS},
                r.pay_date,
                COALESCE(r.base_salary, 0)::NUMERIC AS base_salary,
                COALESCE(r.allowances, 0)::NUMERIC AS allowances,
                COALESCE(r.deductions, 0)::NUMERIC AS deductions
            FROM payroll r
            {EMPLOYEE_JOIN}
            WHERE r.pay_date BETWEEN $1 AND $2
              AND ($3::bigint IS NULL OR e.department_id = $3)
            "#
        );

        let rows = sqlx::query::<Postgres>(&sql)
            .bind(params.date_from)
            .bind(params.date_to)
            .bind(params.department_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(payroll_from_row).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "performance_reviews", db.operation = "select"))]
    async fn performance_reviews(
        &self,
        params: &ReportParameters,
    ) -> Result<Vec<PerformanceRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS},
                r.review_date, r.rating::FLOAT8 AS rating,
                NULLIF(CONCAT_WS(' ', rv.first_name, rv.last_name), '') AS reviewer_name,
                r.comments
            FROM performance_reviews r
            {EMPLOYEE_JOIN}
            LEFT JOIN employees rv ON rv.id = r.reviewer_id
            WHERE r.review_date BETWEEN $1 AND $2
              AND ($3::bigint IS NULL OR e.department_id = $3)
            "#
        );

        let rows = sqlx::query::<Postgres>(&sql)
            .bind(params.date_from)
            .bind(params.date_to)
            .bind(params.department_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(performance_from_row).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "departments", db.operation = "select", db.record_id = id))]
    async fn department(&self, id: i64) -> Result<Option<Department>, AppError> {
        let row = sqlx::query_as::<Postgres, (i64, String)>(
            "SELECT id::BIGINT, name FROM departments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name)| Department { id, name }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrdesk_core::models::{AttendanceStatus, LeaveStatus};

    #[test]
    fn test_known_statuses_decode() {
        assert_eq!(
            parse_status::<AttendanceStatus>(Some("HALF_DAY")),
            Some(AttendanceStatus::HalfDay)
        );
        assert_eq!(
            parse_status::<LeaveStatus>(Some("approved")),
            Some(LeaveStatus::Approved)
        );
    }

    #[test]
    fn test_unknown_or_null_status_decodes_to_none() {
        assert_eq!(parse_status::<AttendanceStatus>(Some("WORK_FROM_HOME")), None);
        assert_eq!(parse_status::<AttendanceStatus>(Some("REMOTE")), None);
        assert_eq!(parse_status::<LeaveStatus>(Some("")), None);
        assert_eq!(parse_status::<LeaveStatus>(None), None);
    }
}
