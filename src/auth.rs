use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    repository::RepositoryState,
};

/// Claims
///
/// The payload structure expected inside a provider-issued access token (JWT).
/// Signed by the provider's secret and validated on every guarded request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the owner, used to look up the mirrored
    /// record in the owners table.
    pub sub: Uuid,
    /// Expiration time (exp): timestamp after which the token must not be
    /// accepted.
    pub exp: usize,
    /// Issued at (iat): timestamp when the token was issued.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers use this to
/// stamp owner_id on created listings and to scope mutations.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// AuthUser Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthUser usable as a
/// function argument in any guarded handler and as the rejection point of the
/// route guard middleware. The process:
/// 1. Dependency resolution: Repository and AppConfig from the application state.
/// 2. Local bypass: development-time access via the 'x-user-id' header.
/// 3. Token validation: Bearer extraction and JWT decoding (exp enforced).
/// 4. Mirror lookup: the owner must still exist locally; a valid token for a
///    deleted identity is rejected.
///
/// Rejection: StatusCode::UNAUTHORIZED (401) on any failure — the signal that
/// sends unauthenticated clients to the login flow.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // Local Development Bypass
        // In Env::Local, a known owner UUID in the 'x-user-id' header
        // authenticates directly. The owner must still exist in the local
        // database so downstream lookups behave as in production.
        if config.env == Env::Local {
            if let Some(user_id_header) = parts.headers.get("x-user-id") {
                if let Ok(id_str) = user_id_header.to_str() {
                    if let Ok(user_id) = Uuid::parse_str(id_str) {
                        if let Ok(Some(owner)) = repo.get_owner(user_id).await {
                            return Ok(AuthUser {
                                id: owner.id,
                                email: owner.email,
                            });
                        }
                    }
                }
            }
        }
        // In Production, or when the bypass did not resolve, fall through to
        // the standard JWT validation flow.

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::default();
        validation.validate_exp = true;
        // Provider tokens carry an audience claim we do not pin.
        validation.validate_aud = false;

        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        // Final verification against the local mirror: the token may be valid
        // while the identity behind it no longer is.
        let owner = repo
            .get_owner(token_data.claims.sub)
            .await
            .map_err(|_| StatusCode::UNAUTHORIZED)?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(AuthUser {
            id: owner.id,
            email: owner.email,
        })
    }
}
