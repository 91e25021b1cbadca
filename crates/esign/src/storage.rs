//! Object store selection for contract files

use anyhow::{anyhow, Result};
use std::sync::Arc;
use storage::{MemoryStore, ObjectStore, S3Client, S3Config};
use tracing::{info, warn};

use crate::config::{ServiceConfig, StorageBackend};

/// Bucket label used by the in-memory store when none is configured
pub const LOCAL_BUCKET: &str = "local";

/// Build the object store described by the configuration
pub async fn build_object_store(config: &ServiceConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .filter(|b| !b.trim().is_empty())
                .ok_or_else(|| anyhow!("S3_BUCKET must be set when STORAGE_BACKEND=s3"))?;

            let mut s3_config = S3Config::new(bucket).with_region(config.s3_region.clone());
            if let Some(endpoint) = &config.s3_endpoint {
                s3_config = s3_config.with_endpoint(endpoint.clone());
            }

            let client = S3Client::new(s3_config)
                .await
                .map_err(|e| anyhow!("Failed to initialize S3 client: {}", e))?;
            info!("Contract files stored in S3 bucket {}", client.bucket_name());
            Ok(Arc::new(client))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory object store - contract files are lost on restart");
            let bucket = config
                .s3_bucket
                .clone()
                .unwrap_or_else(|| LOCAL_BUCKET.to_string());
            Ok(Arc::new(MemoryStore::new(bucket)))
        }
    }
}
