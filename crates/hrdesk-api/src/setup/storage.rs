//! Artifact storage setup

use anyhow::{Context, Result};
use hrdesk_core::Config;
use hrdesk_storage::Storage;
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    hrdesk_storage::create_storage(config)
        .await
        .with_context(|| {
            format!(
                "Failed to initialize artifact storage at {}",
                config.local_storage_path()
            )
        })
}
