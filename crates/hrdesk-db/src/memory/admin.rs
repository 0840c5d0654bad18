use crate::db::AdminDirectory;
use hrdesk_core::models::AdminIdentity;
use hrdesk_core::AppError;
use std::collections::HashMap;

#[derive(Clone, Default)]
pub struct InMemoryAdminDirectory {
    admins: HashMap<i64, AdminIdentity>,
}

impl InMemoryAdminDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_admin(mut self, id: i64, name: &str, email: &str) -> Self {
        self.admins.insert(
            id,
            AdminIdentity {
                id,
                name: name.to_string(),
                email: email.to_string(),
            },
        );
        self
    }
}

#[async_trait::async_trait]
impl AdminDirectory for InMemoryAdminDirectory {
    async fn find_admin(&self, id: i64) -> Result<Option<AdminIdentity>, AppError> {
        Ok(self.admins.get(&id).cloned())
    }
}
