use crate::db::NotificationRepository;
use chrono::Utc;
use hrdesk_core::models::{NewNotification, Notification, NotificationListQuery};
use hrdesk_core::AppError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryNotificationRepository {
    notifications: Arc<RwLock<Vec<Notification>>>,
    failing_inserts: Arc<AtomicU32>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` inserts fail with a database error.
    pub fn fail_next_inserts(&self, count: u32) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    /// Every stored notification in insertion order
    pub async fn all(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }
}

#[async_trait::async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, notification: NewNotification) -> Result<Notification, AppError> {
        let should_fail = self
            .failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }

        let stored = Notification {
            id: Uuid::new_v4(),
            report_id: notification.report_id,
            recipient: notification.recipient,
            title: notification.title,
            message: notification.message,
            notification_type: notification.notification_type,
            created_at: Utc::now(),
            is_read: false,
        };
        self.notifications.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, query: &NotificationListQuery) -> Result<Vec<Notification>, AppError> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .rev()
            .filter(|n| query.recipient.map_or(true, |r| n.recipient == r))
            .filter(|n| !query.unread_only() || !n.is_read)
            .take(query.limit() as usize)
            .cloned()
            .collect())
    }

    async fn list_for_report(&self, report_id: Uuid) -> Result<Vec<Notification>, AppError> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| n.report_id == report_id)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: Uuid) -> Result<bool, AppError> {
        let mut notifications = self.notifications.write().await;
        match notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrdesk_core::models::NotificationType;

    fn ready(report_id: Uuid, recipient: i64) -> NewNotification {
        NewNotification {
            report_id,
            recipient,
            title: "Report ready".to_string(),
            message: "Your report is ready".to_string(),
            notification_type: NotificationType::ReportReady,
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_filtered() {
        let repo = InMemoryNotificationRepository::new();
        let first = repo.insert(ready(Uuid::new_v4(), 1)).await.unwrap();
        let second = repo.insert(ready(Uuid::new_v4(), 1)).await.unwrap();
        repo.insert(ready(Uuid::new_v4(), 2)).await.unwrap();

        let query = NotificationListQuery {
            recipient: Some(1),
            ..Default::default()
        };
        let listed = repo.list(&query).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);

        assert!(repo.mark_read(first.id).await.unwrap());
        let query = NotificationListQuery {
            recipient: Some(1),
            unread_only: Some(true),
            ..Default::default()
        };
        let listed = repo.list(&query).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, second.id);
    }

    #[tokio::test]
    async fn test_mark_read_missing() {
        let repo = InMemoryNotificationRepository::new();
        assert!(!repo.mark_read(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let repo = InMemoryNotificationRepository::new();
        repo.fail_next_inserts(2);

        assert!(repo.insert(ready(Uuid::new_v4(), 1)).await.is_err());
        assert!(repo.insert(ready(Uuid::new_v4(), 1)).await.is_err());
        assert!(repo.insert(ready(Uuid::new_v4(), 1)).await.is_ok());
        assert_eq!(repo.all().await.len(), 1);
    }
}
