//! In-memory object store for tests and local runs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

use crate::constants::MEMORY_PROVIDER;
use crate::error::{Result, StorageError};
use crate::ObjectStore;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// Object store keeping every blob in a shared map
#[derive(Debug, Clone)]
pub struct MemoryStore {
    bucket_name: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl MemoryStore {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.content_type.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        debug!("Storing {} bytes in memory under {}", data.len(), key);
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    fn provider(&self) -> &str {
        MEMORY_PROVIDER
    }

    async fn presigned_get_url(&self, key: &str, ttl: Duration) -> Option<String> {
        if !self.contains(key).await {
            return None;
        }
        Some(format!(
            "memory://{}/{}?expires_in={}",
            self.bucket_name,
            key,
            ttl.as_secs()
        ))
    }
}
