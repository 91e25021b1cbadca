//! Request extractors that reject with the JSON error envelope

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::AppState;
use crate::auth::{bearer_token, verify_jwt};
use crate::entity::users;
use crate::error::ServiceError;
use crate::services::users::find_by_identifier;

/// The user behind the request's bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub users::Model);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

        let identifier = verify_jwt(token, &state.config.jwt_secret).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            ServiceError::Unauthorized("invalid or expired token".to_string())
        })?;

        let user = find_by_identifier(state.db.connection(), &identifier)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("unknown user".to_string()))?;

        Ok(CurrentUser(user))
    }
}

/// Path parameters; a malformed segment is a validation error
#[derive(Debug, Clone)]
pub struct Path<T>(pub T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => {
                debug!("Rejected path parameters: {}", rejection);
                Err(ServiceError::validation(rejection.body_text()))
            }
        }
    }
}

/// Query string parameters; a malformed value is a validation error
#[derive(Debug, Clone)]
pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        axum::extract::Query::<T>::from_request_parts(parts, state)
            .await
            .map(|axum::extract::Query(value)| Query(value))
            .map_err(|rejection| ServiceError::validation(rejection.body_text()))
    }
}
