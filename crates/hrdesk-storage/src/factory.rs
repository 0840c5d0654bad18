use crate::{LocalStorage, Storage, StorageResult};
use hrdesk_core::Config;
use std::sync::Arc;

/// Create the artifact storage backend from configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.local_storage_path()).await?;
    tracing::info!(
        base_path = %storage.base_path().display(),
        "Local artifact storage ready"
    );
    Ok(Arc::new(storage))
}
