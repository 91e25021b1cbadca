mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::*;
use esign::entity::{users, ContractVersions};
use esign::{create_jwt, router, AppState, ServiceConfig};
use sea_orm::EntityTrait;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "http-test-secret";
const BOUNDARY: &str = "----esign-test-boundary";

fn app(env: &TestEnv) -> Router {
    let config = ServiceConfig::local("sqlite::memory:", SECRET);
    router(AppState::new(
        env.db.clone(),
        Arc::new(env.store.clone()),
        config,
    ))
}

fn token(user: &users::Model) -> String {
    format!("Bearer {}", create_jwt(SECRET, &user.identifier, 3600).unwrap())
}

fn get(uri: &str, user: &users::Model) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, token(user))
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, user: &users::Model) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, token(user))
        .body(Body::empty())
        .unwrap()
}

fn upload_request(user: &users::Model, data: Value, file: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\nContent-Type: application/json\r\n\r\n{}\r\n",
            data
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"lease.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/contracts/upload")
        .header(header::AUTHORIZATION, token(user))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let env = setup().await;
    let response = app(&env)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let env = setup().await;

    let response = app(&env)
        .oneshot(
            Request::builder()
                .uri("/api/contracts/my")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());

    let forged = create_jwt("wrong-secret", "someone", 3600).unwrap();
    let response = app(&env)
        .oneshot(
            Request::builder()
                .uri("/api/contracts/my")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upload_list_preview_download_sign() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let bob = user(&env, "Bob").await;
    let mallory = user(&env, "Mallory").await;

    // Upload
    let data = json!({
        "title": "Office Lease",
        "description": "Ground floor",
        "participant_ids": [bob.identifier],
    });
    let response = app(&env)
        .oneshot(upload_request(&alice, data, PDF_BYTES))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    println!("Upload response: {}", body);
    let contract_id = body["data"]["contract_id"].as_i64().unwrap();

    // Listing for the counterparty
    let response = app(&env)
        .oneshot(get("/api/contracts/my?search=lease", &bob))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], contract_id);
    assert_eq!(rows[0]["status"], "OPEN");
    assert_eq!(rows[0]["creator_name"], "Alice");
    let version_id = rows[0]["current_version_id"].as_i64().unwrap();

    // Preview
    let response = app(&env)
        .oneshot(get(&format!("/api/contracts/{}/preview", contract_id), &bob))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_DISPOSITION], "inline");
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(headers[header::CACHE_CONTROL], "private, max-age=3600");
    assert_eq!(
        headers[header::ETAG],
        format!("\"{}\"", storage::sha256_hex(PDF_BYTES)).as_str()
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], PDF_BYTES);

    // Download of version 1
    let response = app(&env)
        .oneshot(get(
            &format!("/api/contracts/{}/versions/1/download", contract_id),
            &alice,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename*=UTF-8''Office%20Lease_v1.pdf"
    );
    assert_eq!(response.headers()[header::PRAGMA], "no-cache");

    // Outsider
    for uri in [
        format!("/api/contracts/{}/preview", contract_id),
        format!("/api/contracts/{}/download", contract_id),
        format!("/api/contracts/{}/versions/1/preview", contract_id),
        format!("/api/contracts/{}/versions/7/download", contract_id),
        format!("/api/contracts/versions/{}/file-url", version_id),
        format!("/api/contracts/versions/{}/signatures", version_id),
    ] {
        let response = app(&env).oneshot(get(&uri, &mallory)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
    }

    // Signing
    let sign_uri = format!("/api/contracts/{}/sign", version_id);
    let response = app(&env).oneshot(post(&sign_uri, &bob)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["version_status"], "PENDING_SIGNATURE");

    let response = app(&env).oneshot(post(&sign_uri, &bob)).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["message"], "already signed");

    let response = app(&env).oneshot(post(&sign_uri, &mallory)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app(&env).oneshot(post(&sign_uri, &alice)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["version_status"], "SIGNED");

    let response = app(&env)
        .oneshot(get(
            &format!("/api/contracts/versions/{}/signatures", version_id),
            &alice,
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_upload_with_unknown_participant_is_bad_request() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;

    let data = json!({
        "title": "Lease",
        "participant_ids": ["00000000-0000-0000-0000-000000000000"],
    });
    let response = app(&env)
        .oneshot(upload_request(&alice, data, PDF_BYTES))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(env.store.is_empty().await);
}

#[tokio::test]
async fn test_delete_and_raw_key_access() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    let contract_id = upload(&env, &alice, "Lease", &[]).await;

    let rows = esign::services::contracts::my_contracts(env.db.connection(), &alice, None)
        .await
        .unwrap();
    let version_id = rows[0].current_version_id.unwrap();
    let key = ContractVersions::find_by_id(version_id)
        .one(env.db.connection())
        .await
        .unwrap()
        .unwrap()
        .file_path;

    let response = app(&env)
        .oneshot(get(&format!("/api/contracts/files/{}", key), &alice))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&env)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/contracts/{}", contract_id))
                .header(header::AUTHORIZATION, token(&alice))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app(&env)
        .oneshot(get(&format!("/api/contracts/files/{}", key), &alice))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app(&env)
        .oneshot(get("/api/contracts/my", &alice))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_user_search_endpoint() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;
    user(&env, "Bob").await;

    let response = app(&env)
        .oneshot(get("/api/users/search?keyword=bob&page=0&size=5", &alice))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["total_items"], 1);
    assert_eq!(body["data"]["items"][0]["name"], "Bob");
    assert_eq!(body["data"]["size"], 5);
}

#[tokio::test]
async fn test_malformed_parameters_keep_json_envelope() {
    let env = setup().await;
    let alice = user(&env, "Alice").await;

    for uri in [
        "/api/contracts/abc/preview",
        "/api/contracts/1/versions/first/download",
        "/api/contracts/versions/x/signatures",
        "/api/users/search?keyword=a&page=minus-one",
        "/api/users/search?keyword=a&page=18446744073709551615",
    ] {
        let response = app(&env).oneshot(get(uri, &alice)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json",
            "{}",
            uri
        );
        let body = json_body(response).await;
        assert_eq!(body["success"], false, "{}", uri);
        assert!(body["data"].is_null(), "{}", uri);
        assert!(body["message"].is_string(), "{}", uri);
    }

    let response = app(&env)
        .oneshot(post("/api/contracts/not-a-number/sign", &alice))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
