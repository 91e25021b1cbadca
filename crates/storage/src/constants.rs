//! Centralized constants for the storage crate

// =============================================================================
// Object keys
// =============================================================================

/// Prefix under which every contract file is stored.
pub const CONTRACT_KEY_PREFIX: &str = "contracts";

/// Timestamp layout used in object keys (`yyyyMMddHHmmss`).
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Number of random hex characters placed between the timestamp and the filename.
pub const KEY_RANDOM_SUFFIX_LEN: usize = 8;

/// Filename used when the upload did not carry one.
pub const DEFAULT_FILENAME: &str = "document.pdf";

// =============================================================================
// S3 Configuration
// =============================================================================

/// Provider label recorded on versions stored through the S3 client.
pub const S3_PROVIDER: &str = "S3";

/// Provider label recorded on versions stored in memory.
pub const MEMORY_PROVIDER: &str = "MEMORY";

/// Default region when none is configured (B2 and MinIO accept any region).
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default MIME type for uploads that did not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Default lifetime of presigned GET URLs, in minutes.
pub const DEFAULT_PRESIGNED_URL_TTL_MINUTES: u64 = 10;

/// Longest lifetime S3 accepts for a presigned URL (7 days).
pub const MAX_PRESIGNED_URL_TTL_MINUTES: u64 = 7 * 24 * 60;
