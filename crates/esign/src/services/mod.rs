//! Business operations over the database and object store.
//!
//! Every operation receives the acting user explicitly; nothing here reads
//! request-global state.

pub mod access;
pub mod contracts;
pub mod signatures;
pub mod users;

use sea_orm::{DbBackend, DbErr, SqlErr};
use serde::Serialize;

pub use access::{
    can_access, open_contract_file, open_file_by_key, presigned_file_url, ContractFile, FileUrl,
    VersionSelector,
};
pub use contracts::{ContractFilter, ContractSummary, UploadContract, UploadFile};
pub use signatures::{SignOutcome, SignatureView};
pub use users::{NewUser, UserSummary};

/// One page of results, `page` is zero-based
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn empty(page: u64, size: u64) -> Self {
        Self {
            items: Vec::new(),
            page,
            size,
            total_items: 0,
            total_pages: 0,
        }
    }
}

/// Case-insensitive substring pattern for LIKE with `\` as the escape character.
///
/// The term is folded the same way the backend's `LOWER()` folds the column:
/// SQLite only folds ASCII letters, MySQL and Postgres fold Unicode.
pub(crate) fn contains_pattern(term: &str, backend: DbBackend) -> String {
    let folded = match backend {
        DbBackend::Sqlite => term.to_ascii_lowercase(),
        _ => term.to_lowercase(),
    };
    let mut pattern = String::with_capacity(folded.len() + 2);
    pattern.push('%');
    for c in folded.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Trimmed search term, `None` when blank
pub(crate) fn normalize_term(term: Option<&str>) -> Option<&str> {
    term.map(str::trim).filter(|t| !t.is_empty())
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        let sqlite = DbBackend::Sqlite;
        assert_eq!(contains_pattern("Lease", sqlite), "%lease%");
        assert_eq!(contains_pattern("50%_off", sqlite), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b", sqlite), "%a\\\\b%");
    }

    #[test]
    fn test_contains_pattern_folds_like_backend_lower() {
        assert_eq!(contains_pattern("École", DbBackend::Sqlite), "%École%");
        assert_eq!(contains_pattern("École", DbBackend::Postgres), "%école%");
        assert_eq!(contains_pattern("École", DbBackend::MySql), "%école%");
    }

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term(None), None);
        assert_eq!(normalize_term(Some("")), None);
        assert_eq!(normalize_term(Some("   ")), None);
        assert_eq!(normalize_term(Some(" nda ")), Some("nda"));
    }
}
