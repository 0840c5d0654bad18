use hrdesk_core::models::{NewNotification, Notification, NotificationListQuery};
use hrdesk_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Sink for in-app notifications
#[async_trait::async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: NewNotification) -> Result<Notification, AppError>;

    /// Newest first
    async fn list(&self, query: &NotificationListQuery) -> Result<Vec<Notification>, AppError>;

    async fn list_for_report(&self, report_id: Uuid) -> Result<Vec<Notification>, AppError>;

    /// Returns false when the notification does not exist.
    async fn mark_read(&self, id: Uuid) -> Result<bool, AppError>;
}

const NOTIFICATION_COLUMNS: &str =
    "id, report_id, recipient, title, message, notification_type, created_at, is_read";

#[derive(Clone)]
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    #[tracing::instrument(skip(self, notification), fields(db.table = "report_notifications", db.operation = "insert", report_id = %notification.report_id))]
    async fn insert(&self, notification: NewNotification) -> Result<Notification, AppError> {
        let row = sqlx::query_as::<Postgres, Notification>(&format!(
            r#"
            INSERT INTO report_notifications (id, report_id, recipient, title, message, notification_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(notification.report_id)
        .bind(notification.recipient)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.notification_type.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_notifications", db.operation = "select"))]
    async fn list(&self, query: &NotificationListQuery) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query_as::<Postgres, Notification>(&format!(
            r#"
            SELECT {} FROM report_notifications
            WHERE ($1::bigint IS NULL OR recipient = $1)
              AND (NOT $2 OR is_read = FALSE)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
            NOTIFICATION_COLUMNS
        ))
        .bind(query.recipient)
        .bind(query.unread_only())
        .bind(i64::from(query.limit()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_notifications", db.operation = "select"))]
    async fn list_for_report(&self, report_id: Uuid) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query_as::<Postgres, Notification>(&format!(
            "SELECT {} FROM report_notifications WHERE report_id = $1 ORDER BY created_at ASC",
            NOTIFICATION_COLUMNS
        ))
        .bind(report_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "report_notifications", db.operation = "update", db.record_id = %id))]
    async fn mark_read(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE report_notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
