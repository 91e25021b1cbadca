//! Object key generation for uploaded contract files

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::constants::{
    CONTRACT_KEY_PREFIX, DEFAULT_FILENAME, KEY_RANDOM_SUFFIX_LEN, KEY_TIMESTAMP_FORMAT,
};

/// Generate a storage key for a newly uploaded file.
///
/// Layout: `contracts/{yyyyMMddHHmmss}_{8 hex chars}_{original filename}`.
pub fn generate_object_key(original_filename: &str) -> String {
    generate_object_key_at(original_filename, Utc::now())
}

/// Same as [`generate_object_key`] with an explicit timestamp.
pub fn generate_object_key_at(original_filename: &str, now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}_{}_{}",
        CONTRACT_KEY_PREFIX,
        now.format(KEY_TIMESTAMP_FORMAT),
        &random[..KEY_RANDOM_SUFFIX_LEN],
        sanitize_filename(original_filename)
    )
}

/// Keep the client filename readable but never let it introduce extra path segments.
pub fn sanitize_filename(original_filename: &str) -> String {
    let trimmed = original_filename.trim();
    if trimmed.is_empty() {
        return DEFAULT_FILENAME.to_string();
    }

    trimmed
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Hex-encoded SHA256 of a blob
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_key_layout() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let key = generate_object_key_at("lease.pdf", now);

        assert!(key.starts_with("contracts/20250314092653_"));
        assert!(key.ends_with("_lease.pdf"));

        let middle = key
            .trim_start_matches("contracts/20250314092653_")
            .trim_end_matches("_lease.pdf");
        assert_eq!(middle.len(), 8);
        assert!(middle.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_keys_are_unique() {
        let a = generate_object_key("a.pdf");
        let b = generate_object_key("a.pdf");
        assert_ne!(a, b);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("  "), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename("계약서 v2.pdf"), "계약서 v2.pdf");
    }

    #[test]
    fn test_hash_generation() {
        let hash = sha256_hex(b"test data");

        // SHA256 should produce 64 character hex string
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "916f0027a575074ce72a331777c3478d6513f786a591bd892da1a577bf2335f9"
        );
    }
}
