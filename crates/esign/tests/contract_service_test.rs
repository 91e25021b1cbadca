mod common;

use common::*;
use esign::entity::{
    contract_parties, contract_versions, ContractParties, ContractStatus, ContractVersions,
    Contracts, PartyRole, VersionStatus,
};
use esign::services::contracts::{delete_contract, my_contracts, upload_contract};
use esign::services::{UploadContract, UploadFile};
use esign::ServiceError;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn test_upload_creates_contract_version_and_parties() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let bob = user(&env, "Bob").await;
    let carol = user(&env, "Carol").await;

    let contract_id = upload(&env, &alice, "Lease", &[&bob, &carol]).await;
    println!("Uploaded contract {}", contract_id);

    let db = env.db.connection();
    let contract = Contracts::find_by_id(contract_id).one(db).await.unwrap().unwrap();
    assert_eq!(contract.title, "Lease");
    assert_eq!(contract.status, ContractStatus::Open);
    assert_eq!(contract.created_by, alice.id);
    assert!(contract.deleted_at.is_none());

    let versions = ContractVersions::find()
        .filter(contract_versions::Column::ContractId.eq(contract_id))
        .all(db)
        .await
        .unwrap();
    assert_eq!(versions.len(), 1);
    let version = &versions[0];
    assert_eq!(version.version_number, 1);
    assert_eq!(version.status, VersionStatus::PendingSignature);
    assert_eq!(contract.current_version_id, Some(version.id));
    assert_eq!(version.file_hash, storage::sha256_hex(PDF_BYTES));
    assert_eq!(version.file_size, PDF_BYTES.len() as i64);
    assert_eq!(version.bucket_name, BUCKET);
    assert_eq!(version.storage_provider, "MEMORY");
    assert_eq!(version.original_filename, "contract.pdf");
    assert!(version.file_path.starts_with("contracts/"));
    assert!(version.file_path.ends_with("_contract.pdf"));
    assert!(env.store.contains(&version.file_path).await);

    let parties = ContractParties::find()
        .filter(contract_parties::Column::ContractId.eq(contract_id))
        .all(db)
        .await
        .unwrap();
    assert_eq!(parties.len(), 3);
    let initiators: Vec<_> = parties
        .iter()
        .filter(|p| p.role == PartyRole::Initiator)
        .collect();
    assert_eq!(initiators.len(), 1);
    assert_eq!(initiators[0].user_id, alice.id);
    assert_eq!(
        parties
            .iter()
            .filter(|p| p.role == PartyRole::Counterparty)
            .count(),
        2
    );
}

#[tokio::test]
async fn test_upload_with_unknown_participant_persists_nothing() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let bob = user(&env, "Bob").await;

    let mut request = request("Lease", &[&bob]);
    request
        .participant_ids
        .push("00000000-0000-0000-0000-000000000000".to_string());

    let result =
        upload_contract(env.db.connection(), &env.store, &alice, request, pdf()).await;
    println!("Upload result: {:?}", result);
    assert!(matches!(result, Err(ServiceError::Validation(_))));

    let db = env.db.connection();
    assert_eq!(Contracts::find().count(db).await.unwrap(), 0);
    assert_eq!(ContractVersions::find().count(db).await.unwrap(), 0);
    assert_eq!(ContractParties::find().count(db).await.unwrap(), 0);
    assert!(env.store.is_empty().await);
}

#[tokio::test]
async fn test_upload_skips_duplicate_and_self_participants() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let bob = user(&env, "Bob").await;

    let contract_id = upload(&env, &alice, "NDA", &[&bob, &bob, &alice]).await;

    let parties = ContractParties::find()
        .filter(contract_parties::Column::ContractId.eq(contract_id))
        .count(env.db.connection())
        .await
        .unwrap();
    assert_eq!(parties, 2);
}

#[tokio::test]
async fn test_upload_validation() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;

    let blank_title = UploadContract {
        title: "   ".to_string(),
        ..Default::default()
    };
    let result =
        upload_contract(env.db.connection(), &env.store, &alice, blank_title, pdf()).await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));

    let empty_file = UploadFile {
        data: Vec::new(),
        original_filename: "empty.pdf".to_string(),
        content_type: "application/pdf".to_string(),
    };
    let result = upload_contract(
        env.db.connection(),
        &env.store,
        &alice,
        request("Lease", &[]),
        empty_file,
    )
    .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
    assert!(env.store.is_empty().await);
}

#[tokio::test]
async fn test_my_contracts_search() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let bob = user(&env, "Bob").await;
    let carol = user(&env, "Carol").await;

    let lease = upload(&env, &alice, "Office Lease", &[&bob]).await;
    let nda = upload(&env, &bob, "Mutual NDA", &[&alice]).await;
    let discount = upload(&env, &alice, "50% discount", &[]).await;
    let _private = upload(&env, &carol, "Carol only", &[]).await;

    let db = env.db.connection();
    let all = my_contracts(db, &alice, None).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|c| c.id).collect();
    println!("Alice sees {:?}", ids);
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&lease) && ids.contains(&nda) && ids.contains(&discount));

    // Blank terms behave like no term
    let blank = my_contracts(db, &alice, Some("")).await.unwrap();
    let spaces = my_contracts(db, &alice, Some("   ")).await.unwrap();
    assert_eq!(blank, all);
    assert_eq!(spaces, all);

    // Case-insensitive substring
    let leases = my_contracts(db, &alice, Some("LEASE")).await.unwrap();
    assert_eq!(leases.len(), 1);
    assert_eq!(leases[0].id, lease);
    assert_eq!(leases[0].creator_name.as_deref(), Some("Alice"));
    assert_eq!(leases[0].current_version_number, Some(1));
    assert_eq!(
        leases[0].current_version_status,
        Some(VersionStatus::PendingSignature)
    );

    // LIKE wildcards are matched literally
    let percent = my_contracts(db, &alice, Some("%")).await.unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].id, discount);

    let nda_rows = my_contracts(db, &alice, Some("nda")).await.unwrap();
    assert_eq!(nda_rows.len(), 1);
    assert_eq!(nda_rows[0].created_by, bob.id);
}

#[tokio::test]
async fn test_my_contracts_empty_for_uninvolved_user() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let dave = user(&env, "Dave").await;
    upload(&env, &alice, "Lease", &[]).await;

    let rows = my_contracts(env.db.connection(), &dave, None).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_soft_delete() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let bob = user(&env, "Bob").await;
    let contract_id = upload(&env, &alice, "Lease", &[&bob]).await;
    let db = env.db.connection();

    // Only the creator may delete
    let result = delete_contract(db, contract_id, &bob).await;
    assert!(matches!(result, Err(ServiceError::Forbidden(_))));

    delete_contract(db, contract_id, &alice).await.unwrap();

    let contract = Contracts::find_by_id(contract_id).one(db).await.unwrap().unwrap();
    assert!(contract.deleted_at.is_some());
    assert_eq!(contract.status, ContractStatus::Closed);

    assert!(my_contracts(db, &alice, None).await.unwrap().is_empty());
    assert!(my_contracts(db, &bob, None).await.unwrap().is_empty());
    assert!(my_contracts(db, &alice, Some("Lease")).await.unwrap().is_empty());

    // A second delete sees nothing
    let result = delete_contract(db, contract_id, &alice).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_search_matches_non_ascii_title() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let school = upload(&env, &alice, "École Lease", &[]).await;
    let db = env.db.connection();

    for term in ["École", "ÉCOLE", "LEASE"] {
        let rows = my_contracts(db, &alice, Some(term)).await.unwrap();
        println!("{:?} -> {} rows", term, rows.len());
        assert_eq!(rows.len(), 1, "{}", term);
        assert_eq!(rows[0].id, school);
    }
}

#[tokio::test]
async fn test_failed_party_insert_rolls_back_after_blob_write() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let bob = user(&env, "Bob").await;
    let db = env.db.connection();
    db.execute_unprepared("DROP TABLE contract_parties")
        .await
        .unwrap();

    let result = upload_contract(db, &env.store, &alice, request("Lease", &[&bob]), pdf()).await;
    assert!(matches!(result, Err(ServiceError::Database(_))));

    // The blob is already written, the rows are not
    assert_eq!(env.store.len().await, 1);
    assert_eq!(Contracts::find().count(db).await.unwrap(), 0);
    assert_eq!(ContractVersions::find().count(db).await.unwrap(), 0);
}
