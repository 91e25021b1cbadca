//! Contract upload, listing and soft delete

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use storage::constants::{DEFAULT_CONTENT_TYPE, DEFAULT_FILENAME};
use storage::{sha256_hex, ObjectStore};
use tracing::{debug, info, warn};

use super::{contains_pattern, normalize_term};
use crate::entity::{
    contract_parties, contract_versions, contracts, users, ContractParties, ContractStatus,
    ContractVersions, Contracts, PartyRole, Users, VersionStatus,
};
use crate::error::{Result, ServiceError};

/// Metadata part of an upload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadContract {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Identifiers of the counterparties to invite
    #[serde(default)]
    pub participant_ids: Vec<String>,
}

/// File part of an upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub data: Vec<u8>,
    pub original_filename: String,
    pub content_type: String,
}

/// Filters for the contract listing query
#[derive(Debug, Clone, Default)]
pub struct ContractFilter {
    pub ids: Option<Vec<i64>>,
    pub title_contains: Option<String>,
    pub exclude_deleted: bool,
}

impl ContractFilter {
    /// Build one parameterized select for `backend`, newest first
    pub fn to_select(&self, backend: DbBackend) -> Select<Contracts> {
        let mut condition = Condition::all();
        if let Some(ids) = &self.ids {
            condition = condition.add(contracts::Column::Id.is_in(ids.iter().copied()));
        }
        if let Some(term) = normalize_term(self.title_contains.as_deref()) {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((Contracts, contracts::Column::Title))))
                    .like(LikeExpr::new(contains_pattern(term, backend)).escape('\\')),
            );
        }
        if self.exclude_deleted {
            condition = condition.add(contracts::Column::DeletedAt.is_null());
        }

        Contracts::find()
            .filter(condition)
            .order_by_desc(contracts::Column::CreatedAt)
            .order_by_desc(contracts::Column::Id)
    }
}

/// Listing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: ContractStatus,
    pub created_by: i64,
    pub creator_name: Option<String>,
    pub current_version_id: Option<i64>,
    pub current_version_number: Option<i32>,
    pub current_version_status: Option<VersionStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create a contract, its first version and its party rows in one transaction.
/// Returns the new contract id.
pub async fn upload_contract(
    db: &DatabaseConnection,
    store: &dyn ObjectStore,
    uploader: &users::Model,
    request: UploadContract,
    file: UploadFile,
) -> Result<i64> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(ServiceError::validation("title is required"));
    }
    if file.data.is_empty() {
        return Err(ServiceError::validation("file is required"));
    }

    let txn = db.begin().await?;

    // Resolve every participant before anything is written
    let mut seen = HashSet::from([uploader.id]);
    let mut counterparties = Vec::new();
    for identifier in &request.participant_ids {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            continue;
        }
        let participant = Users::find()
            .filter(users::Column::Identifier.eq(identifier))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::validation(format!("unknown participant: {}", identifier))
            })?;
        if seen.insert(participant.id) {
            counterparties.push(participant);
        } else {
            debug!("Skipping duplicate participant {}", identifier);
        }
    }

    let now = Utc::now();
    let contract = contracts::ActiveModel {
        title: Set(title),
        description: Set(request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())),
        status: Set(ContractStatus::Open),
        created_by: Set(uploader.id),
        current_version_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let original_filename = if file.original_filename.trim().is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        file.original_filename
    };
    let content_type = if file.content_type.trim().is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        file.content_type
    };
    let file_hash = sha256_hex(&file.data);
    let file_size = file.data.len() as i64;

    let file_path = store
        .upload(file.data, &original_filename, &content_type)
        .await?;

    // Any failure from here on leaves the stored object without a version row
    let contract_id = contract.id;
    let persisted = async {
        let version = contract_versions::ActiveModel {
            contract_id: Set(contract_id),
            version_number: Set(1),
            file_path: Set(file_path.clone()),
            file_hash: Set(file_hash),
            original_filename: Set(original_filename),
            content_type: Set(content_type),
            file_size: Set(file_size),
            status: Set(VersionStatus::PendingSignature),
            storage_provider: Set(store.provider().to_string()),
            bucket_name: Set(store.bucket_name().to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut contract = contract.into_active_model();
        contract.current_version_id = Set(Some(version.id));
        contract.update(&txn).await?;

        let parties = std::iter::once((uploader.id, PartyRole::Initiator))
            .chain(counterparties.iter().map(|u| (u.id, PartyRole::Counterparty)))
            .map(|(user_id, role)| contract_parties::ActiveModel {
                contract_id: Set(contract_id),
                user_id: Set(user_id),
                role: Set(role),
                created_at: Set(now),
                ..Default::default()
            });
        ContractParties::insert_many(parties).exec(&txn).await?;

        txn.commit().await?;
        Ok::<i64, ServiceError>(version.id)
    }
    .await;
    let version_id = match persisted {
        Ok(version_id) => version_id,
        Err(e) => {
            warn!(
                "Stored object {} is orphaned, contract {} was not saved: {}",
                file_path, contract_id, e
            );
            return Err(e);
        }
    };

    info!(
        "Contract {} uploaded by {} with {} counterparties (version {}, key {})",
        contract_id,
        uploader.identifier,
        counterparties.len(),
        version_id,
        file_path
    );
    Ok(contract_id)
}

/// Contracts the user takes part in, optionally filtered by title.
/// A blank search term is the same as none.
pub async fn my_contracts<C: ConnectionTrait>(
    db: &C,
    user: &users::Model,
    search: Option<&str>,
) -> Result<Vec<ContractSummary>> {
    let ids: Vec<i64> = ContractParties::find()
        .select_only()
        .column(contract_parties::Column::ContractId)
        .filter(contract_parties::Column::UserId.eq(user.id))
        .distinct()
        .into_tuple()
        .all(db)
        .await?;

    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let filter = ContractFilter {
        ids: Some(ids),
        title_contains: normalize_term(search).map(str::to_string),
        exclude_deleted: true,
    };
    let rows = filter
        .to_select(db.get_database_backend())
        .find_also_related(Users)
        .all(db)
        .await?;

    let version_ids: Vec<i64> = rows
        .iter()
        .filter_map(|(contract, _)| contract.current_version_id)
        .collect();
    let versions: HashMap<i64, contract_versions::Model> = if version_ids.is_empty() {
        HashMap::new()
    } else {
        ContractVersions::find()
            .filter(contract_versions::Column::Id.is_in(version_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|(contract, creator)| {
            let current = contract
                .current_version_id
                .and_then(|id| versions.get(&id));
            ContractSummary {
                id: contract.id,
                current_version_number: current.map(|v| v.version_number),
                current_version_status: current.map(|v| v.status),
                current_version_id: contract.current_version_id,
                title: contract.title,
                description: contract.description,
                status: contract.status,
                created_by: contract.created_by,
                creator_name: creator.map(|u| u.user_name),
                created_at: contract.created_at,
                updated_at: contract.updated_at,
            }
        })
        .collect())
}

/// Soft delete: only the creator may do it, and it cannot be undone through the API
pub async fn delete_contract<C: ConnectionTrait>(
    db: &C,
    contract_id: i64,
    user: &users::Model,
) -> Result<()> {
    let contract = Contracts::find_by_id(contract_id)
        .one(db)
        .await?
        .filter(|c| !c.is_deleted())
        .ok_or_else(|| ServiceError::not_found("contract not found"))?;

    if contract.created_by != user.id {
        warn!(
            "User {} tried to delete contract {} they did not create",
            user.identifier, contract_id
        );
        return Err(ServiceError::forbidden("only the creator can delete a contract"));
    }

    let now = Utc::now();
    let mut contract = contract.into_active_model();
    contract.deleted_at = Set(Some(now));
    contract.status = Set(ContractStatus::Closed);
    contract.updated_at = Set(now);
    contract.update(db).await?;

    info!("Contract {} soft-deleted by {}", contract_id, user.identifier);
    Ok(())
}
