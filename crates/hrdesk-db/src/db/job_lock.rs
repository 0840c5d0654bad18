use hrdesk_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Per-report dedup guard.
///
/// `try_acquire` is an atomic check-and-insert: of any number of concurrent
/// callers for the same id, exactly one observes `true` until `release`.
#[async_trait::async_trait]
pub trait JobLock: Send + Sync {
    async fn try_acquire(&self, report_id: Uuid) -> Result<bool, AppError>;

    async fn release(&self, report_id: Uuid) -> Result<(), AppError>;
}

/// Lock rows in `report_job_locks`, valid across worker processes.
///
/// A row older than `lease_secs` belongs to a dead holder and may be taken over.
#[derive(Clone)]
pub struct PostgresJobLock {
    pool: PgPool,
    lease_secs: i64,
}

impl PostgresJobLock {
    pub fn new(pool: PgPool, lease_secs: i64) -> Self {
        Self { pool, lease_secs }
    }
}

#[async_trait::async_trait]
impl JobLock for PostgresJobLock {
    #[tracing::instrument(skip(self), fields(db.table = "report_job_locks", db.operation = "insert", report_id = %report_id))]
    async fn try_acquire(&self, report_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO report_job_locks (report_id, acquired_at)
            VALUES ($1, NOW())
            ON CONFLICT (report_id) DO UPDATE SET acquired_at = NOW()
            WHERE report_job_locks.acquired_at < NOW() - make_interval(secs => $2)
            "#,
        )
        .bind(report_id)
        .bind(self.lease_secs as f64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_job_locks", db.operation = "delete", report_id = %report_id))]
    async fn release(&self, report_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM report_job_locks WHERE report_id = $1")
            .bind(report_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
