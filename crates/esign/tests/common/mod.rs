#![allow(dead_code)]

use esign::database::Database;
use esign::entity::users;
use esign::services::users::create_user;
use esign::services::{NewUser, UploadContract, UploadFile};
use std::sync::Arc;
use storage::MemoryStore;

pub const BUCKET: &str = "test-bucket";
pub const PDF_BYTES: &[u8] = b"%PDF-1.7 contract body";

pub struct TestEnv {
    pub db: Arc<Database>,
    pub store: MemoryStore,
}

pub async fn setup() -> TestEnv {
    let db = Database::new("sqlite::memory:")
        .await
        .expect("in-memory database");
    db.ensure_schema().await.expect("schema");
    TestEnv {
        db: Arc::new(db),
        store: MemoryStore::new(BUCKET),
    }
}

pub async fn user(env: &TestEnv, name: &str) -> users::Model {
    create_user(
        env.db.connection(),
        NewUser {
            identifier: None,
            user_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password_hash: "$2b$10$hash".to_string(),
        },
    )
    .await
    .expect("create user")
}

pub fn request(title: &str, participants: &[&users::Model]) -> UploadContract {
    UploadContract {
        title: title.to_string(),
        description: Some(format!("{} description", title)),
        participant_ids: participants.iter().map(|u| u.identifier.clone()).collect(),
    }
}

pub fn pdf() -> UploadFile {
    UploadFile {
        data: PDF_BYTES.to_vec(),
        original_filename: "contract.pdf".to_string(),
        content_type: "application/pdf".to_string(),
    }
}

pub async fn upload(
    env: &TestEnv,
    uploader: &users::Model,
    title: &str,
    participants: &[&users::Model],
) -> i64 {
    esign::services::contracts::upload_contract(
        env.db.connection(),
        &env.store,
        uploader,
        request(title, participants),
        pdf(),
    )
    .await
    .expect("upload contract")
}
