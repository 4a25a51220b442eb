use crate::{
    CloudinaryClient, LocalOnlyDeleter, ObjectStore, RemoteDeleter, SignedDeleter, StorageError,
    StorageResult,
};
use std::sync::Arc;
use tempdrop_core::{Config, DeleteMode};

/// Create the upload client from configuration
pub fn create_object_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    let cloud_name = config.cloud_name().ok_or_else(|| {
        StorageError::ConfigError("TEMPDROP_CLOUD_NAME not configured".to_string())
    })?;

    let client = CloudinaryClient::new(
        config.api_base_url.clone(),
        cloud_name,
        config.upload_preset.clone(),
        config.upload_timeout(),
    )?;
    Ok(Arc::new(client))
}

/// Create the deleter variant selected by `TEMPDROP_DELETE_MODE`
pub fn create_deleter(config: &Config) -> StorageResult<Arc<dyn RemoteDeleter>> {
    match config.delete_mode {
        DeleteMode::LocalOnly => Ok(Arc::new(LocalOnlyDeleter)),
        DeleteMode::Trusted => {
            let cloud_name = config.cloud_name().ok_or_else(|| {
                StorageError::ConfigError("TEMPDROP_CLOUD_NAME not configured".to_string())
            })?;
            let api_key = config.api_key().ok_or_else(|| {
                StorageError::ConfigError("TEMPDROP_API_KEY not configured".to_string())
            })?;
            let api_secret = config.api_secret().ok_or_else(|| {
                StorageError::ConfigError(
                    "TEMPDROP_API_SECRET is required for trusted deletes".to_string(),
                )
            })?;

            let deleter = SignedDeleter::new(
                config.api_base_url.clone(),
                cloud_name,
                api_key,
                api_secret,
            )?;
            Ok(Arc::new(deleter))
        }
    }
}
