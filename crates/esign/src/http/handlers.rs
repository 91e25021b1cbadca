//! Route handlers; each one resolves the caller and delegates to a service

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::extract::{CurrentUser, Path, Query};
use super::response::{file_response, ApiResponse, Disposition};
use super::AppState;
use crate::error::{Result, ServiceError};
use crate::services::{
    self, access, contracts, signatures, users, UploadContract, UploadFile, VersionSelector,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health(State(state): State<AppState>) -> Response {
    let (code, status) = match state.db.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };
    (
        code,
        ApiResponse::ok(HealthResponse {
            status: status.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub contract_id: i64,
}

pub async fn upload_contract(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut request: Option<UploadContract> = None;
    let mut file: Option<UploadFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::validation(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServiceError::validation(format!("unreadable data part: {}", e)))?;
                let parsed = serde_json::from_str::<UploadContract>(&text)
                    .map_err(|e| ServiceError::validation(format!("invalid data part: {}", e)))?;
                request = Some(parsed);
            }
            Some("file") => {
                let original_filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::validation(format!("unreadable file part: {}", e)))?;
                file = Some(UploadFile {
                    data: data.to_vec(),
                    original_filename,
                    content_type,
                });
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    let request = request.ok_or_else(|| ServiceError::validation("data part is required"))?;
    let file = file.ok_or_else(|| ServiceError::validation("file is required"))?;

    let contract_id = contracts::upload_contract(
        state.db.connection(),
        state.store.as_ref(),
        &user,
        request,
        file,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok_with_message(UploadResponse { contract_id }, "contract uploaded"),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct MyContractsQuery {
    pub search: Option<String>,
}

pub async fn my_contracts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<MyContractsQuery>,
) -> Result<ApiResponse<Vec<services::ContractSummary>>> {
    let contracts =
        contracts::my_contracts(state.db.connection(), &user, query.search.as_deref()).await?;
    Ok(ApiResponse::ok(contracts))
}

pub async fn delete_contract(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(contract_id): Path<i64>,
) -> Result<ApiResponse<()>> {
    contracts::delete_contract(state.db.connection(), contract_id, &user).await?;
    Ok(ApiResponse::ok_with_message((), "contract deleted"))
}

async fn serve_contract_file(
    state: &AppState,
    user: &crate::entity::users::Model,
    contract_id: i64,
    selector: VersionSelector,
    disposition: Disposition,
) -> Result<Response> {
    let file = access::open_contract_file(
        state.db.connection(),
        state.store.as_ref(),
        contract_id,
        selector,
        user,
    )
    .await?;
    Ok(file_response(file, disposition))
}

pub async fn preview_current(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(contract_id): Path<i64>,
) -> Result<Response> {
    serve_contract_file(&state, &user, contract_id, VersionSelector::Current, Disposition::Inline)
        .await
}

pub async fn download_current(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(contract_id): Path<i64>,
) -> Result<Response> {
    serve_contract_file(
        &state,
        &user,
        contract_id,
        VersionSelector::Current,
        Disposition::Attachment,
    )
    .await
}

pub async fn preview_version(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((contract_id, number)): Path<(i64, i32)>,
) -> Result<Response> {
    serve_contract_file(
        &state,
        &user,
        contract_id,
        VersionSelector::Number(number),
        Disposition::Inline,
    )
    .await
}

pub async fn download_version(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((contract_id, number)): Path<(i64, i32)>,
) -> Result<Response> {
    serve_contract_file(
        &state,
        &user,
        contract_id,
        VersionSelector::Number(number),
        Disposition::Attachment,
    )
    .await
}

pub async fn file_by_key(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(key): Path<String>,
) -> Result<Response> {
    let file =
        access::open_file_by_key(state.db.connection(), state.store.as_ref(), &key, &user).await?;
    Ok(file_response(file, Disposition::Inline))
}

pub async fn version_file_url(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(version_id): Path<i64>,
) -> Result<ApiResponse<services::FileUrl>> {
    let url = access::presigned_file_url(
        state.db.connection(),
        state.store.as_ref(),
        version_id,
        &user,
        state.config.presigned_url_ttl(),
    )
    .await?;
    Ok(ApiResponse::ok(url))
}

pub async fn sign_version(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(version_id): Path<i64>,
) -> Result<ApiResponse<services::SignOutcome>> {
    let outcome = signatures::sign(state.db.connection(), version_id, &user).await?;
    Ok(ApiResponse::ok_with_message(outcome, "signature recorded"))
}

pub async fn list_signatures(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(version_id): Path<i64>,
) -> Result<ApiResponse<Vec<services::SignatureView>>> {
    let signatures =
        signatures::list_signatures(state.db.connection(), version_id, &user).await?;
    Ok(ApiResponse::ok(signatures))
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub keyword: Option<String>,
    #[serde(default)]
    pub page: u64,
    pub size: Option<u64>,
}

pub async fn search_users(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Query(query): Query<UserSearchQuery>,
) -> Result<ApiResponse<services::Page<services::UserSummary>>> {
    let page = users::search_users(
        state.db.connection(),
        query.keyword.as_deref(),
        query.page,
        query.size,
    )
    .await?;
    Ok(ApiResponse::ok(page))
}
