use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::AuthError;

/// Session
///
/// An authenticated identity's active login state, established by exchanging a
/// one-time email code with the external auth provider. The access token is
/// what clients present as a bearer header on guarded routes; the provider
/// owns its persistence and expiry.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub user_id: Uuid,
    pub email: String,
}

/// AuthProvider
///
/// Abstract contract for the external one-time-code auth collaborator. The
/// real implementation (OtpAuthClient) talks to the provider's REST API over
/// HTTP; MockAuthProvider stands in for tests. All failures come back as
/// `AuthError` values, never as panics.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Triggers issuance of a one-time login code to the given email.
    async fn request_code(&self, email: &str) -> Result<(), AuthError>;

    /// Exchanges a previously issued code for a session. A wrong or expired
    /// code fails without any side effects.
    async fn verify_code(&self, email: &str, code: &str) -> Result<Session, AuthError>;

    /// Invalidates the remote session behind the given access token.
    /// Idempotent: signing out an already-dead token succeeds.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// AuthState
///
/// The concrete type used to share the auth provider across the application state.
pub type AuthState = Arc<dyn AuthProvider>;

/// is_plausible_email
///
/// Cheap local shape check so obviously malformed addresses are rejected
/// before a round trip to the provider. The provider remains the authority on
/// deliverability.
pub fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

// Wire shapes of the provider's verify response.
#[derive(Deserialize)]
struct VerifyResponse {
    access_token: String,
    user: VerifiedUser,
}

#[derive(Deserialize)]
struct VerifiedUser {
    id: Uuid,
    email: String,
}

/// OtpAuthClient
///
/// The concrete `AuthProvider` backed by a GoTrue-compatible auth service
/// (Supabase Auth in production, its local emulator in development). Each
/// operation is a single REST call carrying the project API key; the provider
/// handles code generation, delivery, expiry, and token signing.
pub struct OtpAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OtpAuthClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl AuthProvider for OtpAuthClient {
    async fn request_code(&self, email: &str) -> Result<(), AuthError> {
        if !is_plausible_email(email) {
            return Err(AuthError::InvalidEmail);
        }

        let response = self
            .http
            .post(format!("{}/auth/v1/otp", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            // The provider refused the address (blocked, malformed, etc.).
            Err(AuthError::InvalidEmail)
        } else {
            Err(AuthError::ProviderUnavailable(format!(
                "otp request failed with status {status}"
            )))
        }
    }

    async fn verify_code(&self, email: &str, code: &str) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/verify", self.base_url))
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({
                "email": email,
                "token": code,
                "type": "email",
            }))
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::InvalidCode);
        }
        if !status.is_success() {
            return Err(AuthError::ProviderUnavailable(format!(
                "verification failed with status {status}"
            )));
        }

        let verified: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        Ok(Session {
            access_token: verified.access_token,
            user_id: verified.user.id,
            email: verified.user.email,
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        // A token the provider no longer recognizes is already signed out.
        if status.is_success() || status.is_client_error() {
            Ok(())
        } else {
            Err(AuthError::ProviderUnavailable(format!(
                "sign-out failed with status {status}"
            )))
        }
    }
}

/// MockAuthProvider
///
/// Deterministic `AuthProvider` for tests: one accepted code, a fixed user
/// identity, and a record of issued/revoked tokens so tests can assert the
/// flow without a live provider.
pub struct MockAuthProvider {
    pub accepted_code: String,
    pub user_id: Uuid,
    /// When true, every operation reports a provider outage.
    pub should_fail: bool,
    signed_out: Mutex<Vec<String>>,
}

impl MockAuthProvider {
    pub fn new(accepted_code: &str, user_id: Uuid) -> Self {
        Self {
            accepted_code: accepted_code.to_string(),
            user_id,
            should_fail: false,
            signed_out: Mutex::new(Vec::new()),
        }
    }

    pub fn new_failing() -> Self {
        Self {
            accepted_code: String::new(),
            user_id: Uuid::nil(),
            should_fail: true,
            signed_out: Mutex::new(Vec::new()),
        }
    }

    pub fn signed_out_tokens(&self) -> Vec<String> {
        self.signed_out.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn request_code(&self, email: &str) -> Result<(), AuthError> {
        if self.should_fail {
            return Err(AuthError::ProviderUnavailable("mock outage".to_string()));
        }
        if !is_plausible_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        Ok(())
    }

    async fn verify_code(&self, email: &str, code: &str) -> Result<Session, AuthError> {
        if self.should_fail {
            return Err(AuthError::ProviderUnavailable("mock outage".to_string()));
        }
        if code != self.accepted_code {
            return Err(AuthError::InvalidCode);
        }
        Ok(Session {
            access_token: format!("mock-token-{}", self.user_id),
            user_id: self.user_id,
            email: email.to_string(),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        if self.should_fail {
            return Err(AuthError::ProviderUnavailable("mock outage".to_string()));
        }
        self.signed_out
            .lock()
            .unwrap()
            .push(access_token.to_string());
        Ok(())
    }
}
