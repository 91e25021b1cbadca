//! Service configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use storage::constants::{DEFAULT_PRESIGNED_URL_TTL_MINUTES, DEFAULT_S3_REGION};

/// Which object store backs contract files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    pub jwt_secret: String,
    #[serde(default)]
    pub storage_backend: StorageBackend,
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    #[serde(default = "default_s3_region")]
    pub s3_region: String,
    #[serde(default = "default_presigned_url_ttl_minutes")]
    pub presigned_url_ttl_minutes: u64,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default)]
    pub auto_migrate: bool,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_s3_region() -> String {
    DEFAULT_S3_REGION.to_string()
}

fn default_presigned_url_ttl_minutes() -> u64 {
    DEFAULT_PRESIGNED_URL_TTL_MINUTES
}

fn default_db_max_connections() -> u32 {
    20
}

fn default_max_upload_mb() -> usize {
    20
}

impl ServiceConfig {
    /// Configuration for tests and local runs: in-memory store, given database
    pub fn local(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            listen_addr: default_listen_addr(),
            jwt_secret: jwt_secret.into(),
            storage_backend: StorageBackend::Memory,
            s3_bucket: None,
            s3_endpoint: None,
            s3_region: default_s3_region(),
            presigned_url_ttl_minutes: default_presigned_url_ttl_minutes(),
            db_max_connections: default_db_max_connections(),
            auto_migrate: true,
            max_upload_mb: default_max_upload_mb(),
        }
    }

    pub fn presigned_url_ttl(&self) -> Duration {
        Duration::from_secs(self.presigned_url_ttl_minutes.max(1) * 60)
    }

    /// Request body limit, multipart uploads included
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.max(1) * 1024 * 1024
    }
}
