//! Authorization-checked access to stored contract files

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::Serialize;
use std::time::Duration;
use storage::{ObjectStore, StorageError};
use tracing::{debug, warn};

use crate::entity::{
    contract_parties, contract_versions, contracts, users, ContractParties, ContractVersions,
    Contracts,
};
use crate::error::{Result, ServiceError};

/// Which version of a contract to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Current,
    Number(i32),
}

/// A stored file together with the rows describing it
#[derive(Debug, Clone)]
pub struct ContractFile {
    pub contract: contracts::Model,
    pub version: contract_versions::Model,
    pub data: Vec<u8>,
}

impl ContractFile {
    /// `Title_vN.ext`, extension taken from the uploaded filename
    pub fn download_filename(&self) -> String {
        let title: String = self
            .contract
            .title
            .chars()
            .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
            .collect();
        let extension = self
            .version
            .original_filename
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && !ext.contains('/'));
        match extension {
            Some(ext) => format!("{}_v{}.{}", title, self.version.version_number, ext),
            None => format!("{}_v{}", title, self.version.version_number),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileUrl {
    pub version_id: i64,
    pub url: String,
    pub expires_in_seconds: u64,
}

/// True when `user` created the contract or is one of its parties.
/// Soft-deleted contracts are never accessible.
pub async fn can_access<C: ConnectionTrait>(
    db: &C,
    contract: &contracts::Model,
    user: &users::Model,
) -> Result<bool> {
    if contract.is_deleted() {
        return Ok(false);
    }
    if contract.created_by == user.id {
        return Ok(true);
    }
    let memberships = ContractParties::find()
        .filter(contract_parties::Column::ContractId.eq(contract.id))
        .filter(contract_parties::Column::UserId.eq(user.id))
        .count(db)
        .await?;
    Ok(memberships > 0)
}

pub(crate) async fn ensure_access<C: ConnectionTrait>(
    db: &C,
    contract: &contracts::Model,
    user: &users::Model,
) -> Result<()> {
    if can_access(db, contract, user).await? {
        Ok(())
    } else {
        warn!("Access to contract {} denied for {}", contract.id, user.identifier);
        Err(ServiceError::forbidden("you do not have access to this contract"))
    }
}

/// Contract that exists and is not soft-deleted
pub(crate) async fn find_live_contract<C: ConnectionTrait>(
    db: &C,
    contract_id: i64,
) -> Result<contracts::Model> {
    Contracts::find_by_id(contract_id)
        .one(db)
        .await?
        .filter(|c| !c.is_deleted())
        .ok_or_else(|| ServiceError::not_found("contract not found"))
}

pub(crate) async fn find_version<C: ConnectionTrait>(
    db: &C,
    version_id: i64,
) -> Result<contract_versions::Model> {
    ContractVersions::find_by_id(version_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("contract version not found"))
}

async fn select_version<C: ConnectionTrait>(
    db: &C,
    contract: &contracts::Model,
    selector: VersionSelector,
) -> Result<contract_versions::Model> {
    let version = match selector {
        VersionSelector::Current => match contract.current_version_id {
            Some(version_id) => ContractVersions::find_by_id(version_id).one(db).await?,
            None => None,
        },
        VersionSelector::Number(number) => {
            ContractVersions::find()
                .filter(contract_versions::Column::ContractId.eq(contract.id))
                .filter(contract_versions::Column::VersionNumber.eq(number))
                .one(db)
                .await?
        }
    };
    version
        .filter(|v| v.contract_id == contract.id)
        .ok_or_else(|| ServiceError::not_found("contract version not found"))
}

async fn read_blob(store: &dyn ObjectStore, key: &str) -> Result<Vec<u8>> {
    store.get(key).await.map_err(|e| {
        if let StorageError::NotFound(_) = &e {
            warn!("Stored object {} is missing", key);
        }
        ServiceError::from(e)
    })
}

/// Open a contract file after checking the caller may see it.
/// Authorization is checked before the version lookup, so a non-member is
/// refused whatever version number they ask for.
pub async fn open_contract_file<C: ConnectionTrait>(
    db: &C,
    store: &dyn ObjectStore,
    contract_id: i64,
    selector: VersionSelector,
    user: &users::Model,
) -> Result<ContractFile> {
    let contract = find_live_contract(db, contract_id).await?;
    ensure_access(db, &contract, user).await?;
    let version = select_version(db, &contract, selector).await?;
    let data = read_blob(store, &version.file_path).await?;

    debug!(
        "Serving contract {} version {} ({} bytes) to {}",
        contract.id,
        version.version_number,
        data.len(),
        user.identifier
    );
    Ok(ContractFile {
        contract,
        version,
        data,
    })
}

/// Open a file by its raw storage key
pub async fn open_file_by_key<C: ConnectionTrait>(
    db: &C,
    store: &dyn ObjectStore,
    key: &str,
    user: &users::Model,
) -> Result<ContractFile> {
    let version = ContractVersions::find()
        .filter(contract_versions::Column::FilePath.eq(key))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("file not found"))?;
    let contract = find_live_contract(db, version.contract_id).await?;
    ensure_access(db, &contract, user).await?;
    let data = read_blob(store, key).await?;

    Ok(ContractFile {
        contract,
        version,
        data,
    })
}

/// Time-limited URL the caller can fetch the version file from directly
pub async fn presigned_file_url<C: ConnectionTrait>(
    db: &C,
    store: &dyn ObjectStore,
    version_id: i64,
    user: &users::Model,
    ttl: Duration,
) -> Result<FileUrl> {
    let version = find_version(db, version_id).await?;
    let contract = find_live_contract(db, version.contract_id).await?;
    ensure_access(db, &contract, user).await?;

    let url = store
        .presigned_get_url(&version.file_path, ttl)
        .await
        .ok_or_else(|| {
            ServiceError::Storage(StorageError::Backend(format!(
                "could not presign {}",
                version.file_path
            )))
        })?;

    Ok(FileUrl {
        version_id,
        url,
        expires_in_seconds: ttl.as_secs(),
    })
}
