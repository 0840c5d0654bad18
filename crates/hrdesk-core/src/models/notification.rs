use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    ReportReady,
    Error,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::ReportReady => "REPORT_READY",
            NotificationType::Error => "ERROR",
        }
    }
}

impl Display for NotificationType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REPORT_READY" => Ok(NotificationType::ReportReady),
            "ERROR" => Ok(NotificationType::Error),
            _ => Err(anyhow::anyhow!("Invalid notification type: {}", s)),
        }
    }
}

/// In-app notification about a report reaching a terminal state.
///
/// `report_id` is a weak reference: the notification outlives the report if the
/// report is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub report_id: Uuid,
    pub recipient: i64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Notification {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Notification {
            id: row.try_get("id")?,
            report_id: row.try_get("report_id")?,
            recipient: row.try_get("recipient")?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            notification_type: row
                .try_get::<String, _>("notification_type")?
                .parse()
                .map_err(|e| {
                    sqlx::Error::Decode(format!("Failed to parse notification type: {}", e).into())
                })?,
            created_at: row.try_get("created_at")?,
            is_read: row.try_get("is_read")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub report_id: Uuid,
    pub recipient: i64,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationListQuery {
    /// Only notifications addressed to this admin
    pub recipient: Option<i64>,
    /// Only notifications that have not been read yet
    pub unread_only: Option<bool>,
    /// Maximum number of notifications (default 50, max 200)
    pub limit: Option<u32>,
}

impl NotificationListQuery {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }

    pub fn unread_only(&self) -> bool {
        self.unread_only.unwrap_or(false)
    }
}
