use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::constants::{DEFAULT_S3_REGION, MAX_PRESIGNED_URL_TTL_MINUTES, S3_PROVIDER};
use crate::error::{Result, StorageError};
use crate::key::sha256_hex;
use crate::ObjectStore;

/// Connection settings for an S3-compatible bucket
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket_name: String,
    /// Endpoint override for S3-compatible providers (B2, MinIO)
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl S3Config {
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            endpoint: None,
            region: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

#[derive(Clone)]
pub struct S3Client {
    client: Arc<Client>,
    bucket_name: String,
}

impl S3Client {
    /// Create a new S3Client for the configured bucket.
    /// Credentials come from the standard AWS provider chain.
    pub async fn new(config: S3Config) -> Result<Self> {
        if config.bucket_name.trim().is_empty() {
            return Err(StorageError::Config("bucket name is empty".to_string()));
        }

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_S3_REGION.to_string());

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            // Path-style addressing is what B2 and MinIO expect
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Arc::new(Client::from_conf(builder.build()));

        info!(
            "S3 client initialized (bucket: {}, region: {}, endpoint: {})",
            config.bucket_name,
            region,
            config.endpoint.as_deref().unwrap_or("aws default")
        );

        Ok(Self {
            client,
            bucket_name: config.bucket_name,
        })
    }

    pub async fn exists(&self, key: &str) -> Result<bool> {
        debug!(
            "Checking if exists in S3 bucket {} with key: {}",
            self.bucket_name, key
        );

        match self
            .client
            .head_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(format!(
                        "Failed to check existence in S3: {}",
                        service_error
                    )))
                }
            }
        }
    }

    /// Write binary data to S3, recording its SHA256 as object metadata
    ///
    /// # Returns
    /// The SHA256 hash of the stored data
    pub async fn write_binary(
        &self,
        data: Vec<u8>,
        key: &str,
        mime_type: &str,
    ) -> Result<String> {
        debug!(
            "Writing binary to S3 bucket {} with key: {}, size: {} bytes",
            self.bucket_name,
            key,
            data.len()
        );

        let calculated_hash = sha256_hex(&data);

        match self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .body(data.into())
            .content_type(mime_type)
            .metadata("sha256", calculated_hash.clone())
            .send()
            .await
        {
            Ok(_) => {}
            Err(e) => {
                error!(
                    "S3 PUT failed - Bucket: {}, Key: {}, Error: {:?}",
                    self.bucket_name, key, e
                );
                return Err(StorageError::Backend(format!(
                    "Failed to write binary to S3: {}",
                    e
                )));
            }
        }

        info!(
            "Successfully wrote binary to S3 bucket {} with key: {}, SHA256: {}",
            self.bucket_name, key, calculated_hash
        );

        Ok(calculated_hash)
    }

    /// Read binary data from S3 and calculate its SHA256 hash
    ///
    /// # Returns
    /// A tuple of (binary data, SHA256 hash)
    pub async fn read_binary(&self, key: &str) -> Result<(Vec<u8>, String)> {
        debug!(
            "Reading binary from S3 bucket {} with key: {}",
            self.bucket_name, key
        );

        let get_object_output = match self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                if let Some(service_error) = e.as_service_error() {
                    if service_error.is_no_such_key() {
                        warn!("S3 key not found - Bucket: {}, Key: {}", self.bucket_name, key);
                        return Err(StorageError::NotFound(key.to_string()));
                    }
                    error!("S3 Service Error Details: {:?}", service_error);
                }
                error!(
                    "S3 GET failed - Bucket: {}, Key: {}, Error: {:?}",
                    self.bucket_name, key, e
                );
                return Err(StorageError::Backend(format!(
                    "Failed to read binary from S3: {}",
                    e
                )));
            }
        };

        let body = get_object_output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to collect body: {}", e)))?;
        let data = body.to_vec();

        let calculated_hash = sha256_hex(&data);

        info!(
            "Successfully read binary from S3 bucket {} with key: {}, size: {} bytes, SHA256: {}",
            self.bucket_name,
            key,
            data.len(),
            calculated_hash
        );

        Ok((data, calculated_hash))
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<()> {
        self.write_binary(data, key, content_type).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let (data, _hash) = self.read_binary(key).await?;
        Ok(data)
    }

    fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    fn provider(&self) -> &str {
        S3_PROVIDER
    }

    async fn presigned_get_url(&self, key: &str, ttl: Duration) -> Option<String> {
        let max_ttl = Duration::from_secs(MAX_PRESIGNED_URL_TTL_MINUTES * 60);
        let ttl = ttl.min(max_ttl);

        debug!(
            "Generating presigned URL for key: {}, duration: {}s",
            key,
            ttl.as_secs()
        );

        let presigning = match PresigningConfig::expires_in(ttl) {
            Ok(config) => config,
            Err(e) => {
                error!("Invalid presigning duration for key {}: {}", key, e);
                return None;
            }
        };

        match self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning)
            .await
        {
            Ok(request) => {
                info!("Generated presigned URL for {}", key);
                Some(request.uri().to_string())
            }
            Err(e) => {
                error!("Error generating presigned URL for key {}: {}", key, e);
                None
            }
        }
    }
}
