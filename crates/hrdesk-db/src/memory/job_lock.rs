use crate::db::JobLock;
use dashmap::DashSet;
use hrdesk_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Process-local job lock. `DashSet::insert` is the atomic check-and-insert.
#[derive(Clone, Default)]
pub struct InMemoryJobLock {
    held: Arc<DashSet<Uuid>>,
}

impl InMemoryJobLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, report_id: Uuid) -> bool {
        self.held.contains(&report_id)
    }
}

#[async_trait::async_trait]
impl JobLock for InMemoryJobLock {
    async fn try_acquire(&self, report_id: Uuid) -> Result<bool, AppError> {
        Ok(self.held.insert(report_id))
    }

    async fn release(&self, report_id: Uuid) -> Result<(), AppError> {
        self.held.remove(&report_id);
        Ok(())
    }
}
