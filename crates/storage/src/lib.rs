//! Object storage for contract files
//!
//! This crate provides:
//! - the `ObjectStore` trait used by the contract service
//! - an S3 implementation (AWS, Backblaze B2, MinIO via endpoint override)
//! - an in-memory implementation for tests and local runs
//! - object key generation

use async_trait::async_trait;
use std::time::Duration;

pub mod constants;
pub mod error;
pub mod key;
pub mod memory;
pub mod s3;

pub use error::{Result, StorageError};
pub use key::{generate_object_key, sha256_hex};
pub use memory::MemoryStore;
pub use s3::{S3Client, S3Config};

/// Blob store holding uploaded contract files
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()>;

    /// Read the whole object stored under `key`
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Name of the bucket objects are written to
    fn bucket_name(&self) -> &str;

    /// Provider label recorded next to each stored version
    fn provider(&self) -> &str;

    /// Time-limited, credential-free GET URL for `key`.
    /// Returns `None` when the URL cannot be produced.
    async fn presigned_get_url(&self, key: &str, ttl: Duration) -> Option<String>;

    /// Generate a fresh key for `original_filename` and store the blob under it
    async fn upload(
        &self,
        data: Vec<u8>,
        original_filename: &str,
        content_type: &str,
    ) -> Result<String> {
        let key = generate_object_key(original_filename);
        self.put(&key, data, content_type).await?;
        Ok(key)
    }
}
