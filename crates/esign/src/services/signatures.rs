//! Signature ledger and version completion

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::access::{ensure_access, find_live_contract, find_version};
use super::is_unique_violation;
use crate::entity::{
    contract_parties, contract_versions, signatures, users, ContractParties, ContractVersions,
    Signatures, Users, VersionStatus,
};
use crate::error::{Result, ServiceError};

/// Result of a successful signing
#[derive(Debug, Clone, Serialize)]
pub struct SignOutcome {
    pub signature_id: i64,
    pub version_id: i64,
    pub signature_hash: String,
    pub signed_at: DateTime<Utc>,
    pub version_status: VersionStatus,
    pub signed_count: u64,
    pub party_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureView {
    pub id: i64,
    pub version_id: i64,
    pub signer_id: i64,
    pub signer_identifier: Option<String>,
    pub signer_name: Option<String>,
    pub signature_hash: String,
    pub signed_at: DateTime<Utc>,
}

/// Hex SHA256 over `identifier || file_hash || signed_at` (RFC 3339, whole seconds)
pub fn compute_signature_hash(
    signer_identifier: &str,
    file_hash: &str,
    signed_at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(signer_identifier.as_bytes());
    hasher.update(file_hash.as_bytes());
    hasher.update(signed_at.to_rfc3339_opts(SecondsFormat::Secs, true).as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute a stored signature's hash from its columns
pub fn verify_signature_hash(
    signature: &signatures::Model,
    signer_identifier: &str,
    file_hash: &str,
) -> bool {
    compute_signature_hash(signer_identifier, file_hash, signature.signed_at)
        == signature.signature_hash
}

/// Record `signer`'s signature on a version.
///
/// The version row is locked for the whole transaction so concurrent signers
/// of one version are serialized, and the PENDING_SIGNATURE -> SIGNED
/// transition is a conditional update that can only fire once.
pub async fn sign(
    db: &DatabaseConnection,
    version_id: i64,
    signer: &users::Model,
) -> Result<SignOutcome> {
    let txn = db.begin().await?;

    let version = ContractVersions::find_by_id(version_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("contract version not found"))?;
    let contract = find_live_contract(&txn, version.contract_id).await?;

    let membership = ContractParties::find()
        .filter(contract_parties::Column::ContractId.eq(contract.id))
        .filter(contract_parties::Column::UserId.eq(signer.id))
        .one(&txn)
        .await?;
    if membership.is_none() {
        return Err(ServiceError::forbidden("not a participant of this contract"));
    }

    let existing = Signatures::find()
        .filter(signatures::Column::VersionId.eq(version.id))
        .filter(signatures::Column::SignerId.eq(signer.id))
        .count(&txn)
        .await?;
    if existing > 0 {
        return Err(ServiceError::Conflict("already signed".to_string()));
    }

    let signed_at = Utc::now().trunc_subsecs(0);
    let signature_hash = compute_signature_hash(&signer.identifier, &version.file_hash, signed_at);

    let signature = signatures::ActiveModel {
        version_id: Set(version.id),
        signer_id: Set(signer.id),
        signature_hash: Set(signature_hash),
        signed_at: Set(signed_at),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ServiceError::Conflict("already signed".to_string())
        } else {
            ServiceError::from(e)
        }
    })?;

    let party_count = ContractParties::find()
        .filter(contract_parties::Column::ContractId.eq(contract.id))
        .count(&txn)
        .await?;
    let signed_count = Signatures::find()
        .filter(signatures::Column::VersionId.eq(version.id))
        .count(&txn)
        .await?;

    let version_status = if signed_count >= party_count {
        let updated = ContractVersions::update_many()
            .col_expr(
                contract_versions::Column::Status,
                Expr::value(VersionStatus::Signed),
            )
            .filter(contract_versions::Column::Id.eq(version.id))
            .filter(contract_versions::Column::Status.eq(VersionStatus::PendingSignature))
            .exec(&txn)
            .await?;
        if updated.rows_affected > 0 {
            info!(
                "Version {} of contract {} fully signed ({} signatures)",
                version.id, contract.id, signed_count
            );
        }
        VersionStatus::Signed
    } else {
        version.status
    };

    txn.commit().await?;

    info!(
        "User {} signed version {} ({}/{})",
        signer.identifier, version.id, signed_count, party_count
    );
    Ok(SignOutcome {
        signature_id: signature.id,
        version_id: version.id,
        signature_hash: signature.signature_hash,
        signed_at: signature.signed_at,
        version_status,
        signed_count,
        party_count,
    })
}

/// Signatures recorded on a version, oldest first
pub async fn list_signatures<C: ConnectionTrait>(
    db: &C,
    version_id: i64,
    user: &users::Model,
) -> Result<Vec<SignatureView>> {
    let version = find_version(db, version_id).await?;
    let contract = find_live_contract(db, version.contract_id).await?;
    ensure_access(db, &contract, user).await?;

    let rows = Signatures::find()
        .filter(signatures::Column::VersionId.eq(version.id))
        .order_by_asc(signatures::Column::SignedAt)
        .order_by_asc(signatures::Column::Id)
        .find_also_related(Users)
        .all(db)
        .await?;
    debug!("Version {} has {} signatures", version.id, rows.len());

    Ok(rows
        .into_iter()
        .map(|(signature, signer)| SignatureView {
            id: signature.id,
            version_id: signature.version_id,
            signer_id: signature.signer_id,
            signer_identifier: signer.as_ref().map(|u| u.identifier.clone()),
            signer_name: signer.map(|u| u.user_name),
            signature_hash: signature.signature_hash,
            signed_at: signature.signed_at,
        })
        .collect())
}
