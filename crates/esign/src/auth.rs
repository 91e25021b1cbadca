//! JWT bearer authentication with HS256 signatures

use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User identifier (UUID)
    pub exp: u64,  // Expiration timestamp
    pub iat: u64,  // Issued at timestamp
}

/// Verify an HS256 token and return the subject identifier
pub fn verify_jwt(token: &str, secret: &str) -> Result<String> {
    if secret.is_empty() {
        return Err(anyhow!("JWT secret is not configured"));
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => anyhow!("Token expired"),
        _ => anyhow!("Invalid token: {}", e),
    })?;

    if token_data.claims.sub.trim().is_empty() {
        return Err(anyhow!("Token has no subject"));
    }

    Ok(token_data.claims.sub)
}

/// Create a JWT token (for tests and operator tooling)
pub fn create_jwt(secret: &str, subject: &str, duration_secs: i64) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)?
        .as_secs();

    let claims = Claims {
        sub: subject.to_string(),
        exp: now.saturating_add_signed(duration_secs),
        iat: now,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Strip the `Bearer ` scheme from an Authorization header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
