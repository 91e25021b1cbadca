//! HTTP surface: shared state, routes and request tracing

pub mod extract;
pub mod handlers;
pub mod response;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use storage::ObjectStore;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::database::Database;

pub use extract::CurrentUser;
pub use response::ApiResponse;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub store: Arc<dyn ObjectStore>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(db: Arc<Database>, store: Arc<dyn ObjectStore>, config: ServiceConfig) -> Self {
        Self {
            db,
            store,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes();

    let contracts = Router::new()
        .route("/upload", post(handlers::upload_contract))
        .route("/my", get(handlers::my_contracts))
        .route("/files/{*key}", get(handlers::file_by_key))
        .route("/versions/{version_id}/file-url", get(handlers::version_file_url))
        .route("/versions/{version_id}/signatures", get(handlers::list_signatures))
        .route("/{id}", delete(handlers::delete_contract))
        .route("/{id}/preview", get(handlers::preview_current))
        .route("/{id}/download", get(handlers::download_current))
        .route("/{id}/versions/{number}/preview", get(handlers::preview_version))
        .route("/{id}/versions/{number}/download", get(handlers::download_version))
        // `id` is a version id here
        .route("/{id}/sign", post(handlers::sign_version));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/users/search", get(handlers::search_users))
        .nest("/api/contracts", contracts)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
