use hrdesk_core::models::AdminIdentity;
use hrdesk_core::AppError;
use sqlx::{PgPool, Postgres};

/// Lookup of administrators who may request reports
#[async_trait::async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn find_admin(&self, id: i64) -> Result<Option<AdminIdentity>, AppError>;
}

#[derive(Clone)]
pub struct PostgresAdminDirectory {
    pool: PgPool,
}

impl PostgresAdminDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AdminDirectory for PostgresAdminDirectory {
    #[tracing::instrument(skip(self), fields(db.table = "admins", db.operation = "select", db.record_id = id))]
    async fn find_admin(&self, id: i64) -> Result<Option<AdminIdentity>, AppError> {
        let row = sqlx::query_as::<Postgres, (i64, String, String)>(
            r#"
            SELECT id::BIGINT, CONCAT_WS(' ', first_name, last_name), email
            FROM admins
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, name, email)| AdminIdentity { id, name, email }))
    }
}
