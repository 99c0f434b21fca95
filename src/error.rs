use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// ErrorBody
///
/// The uniform JSON error payload returned for every failed operation.
/// Clients map this into a transient notification; no failure is fatal
/// to the process and nothing here triggers an automatic retry.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// AuthError
///
/// Failures of the one-time-code login flow against the external auth provider.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email address")]
    InvalidEmail,
    /// Wrong, expired, or already-consumed one-time code.
    #[error("invalid or expired code")]
    InvalidCode,
    #[error("auth provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// RepositoryError
///
/// Failures of the listing persistence layer. Every repository operation
/// returns these as values; handlers translate them into HTTP statuses.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("store rejected the operation: {0}")]
    ValidationRejected(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// Invariant violation inside the store (e.g. multiple rows for one id).
    #[error("internal store inconsistency: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db) if db.constraint().is_some() => {
                RepositoryError::ValidationRejected(db.message().to_string())
            }
            other => RepositoryError::StoreUnavailable(other.to_string()),
        }
    }
}

/// UploadError
///
/// Failures of the blob store collaborator during image upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The object key already exists and the store refuses to overwrite it.
    #[error("object key already exists: {0}")]
    DuplicateKey(String),
    #[error("store rejected the upload: {0}")]
    Rejected(String),
    #[error("blob store unavailable: {0}")]
    StoreUnavailable(String),
}

/// ApiError
///
/// Umbrella error for handlers, so `?` works uniformly across the auth,
/// repository, and storage layers. Response mapping is delegated to the
/// underlying variant.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Repo(#[from] RepositoryError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

fn error_response(status: StatusCode, message: String) -> Response {
    if status.is_server_error() {
        tracing::error!(status = %status, error = %message, "request failed");
    }
    (status, Json(ErrorBody { error: message })).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::InvalidEmail => StatusCode::BAD_REQUEST,
            AuthError::InvalidCode => StatusCode::UNAUTHORIZED,
            AuthError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
        };
        error_response(status, self.to_string())
    }
}

impl IntoResponse for RepositoryError {
    fn into_response(self) -> Response {
        let status = match &self {
            RepositoryError::NotFound => StatusCode::NOT_FOUND,
            RepositoryError::ValidationRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RepositoryError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RepositoryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = match &self {
            UploadError::DuplicateKey(_) => StatusCode::CONFLICT,
            UploadError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            UploadError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        error_response(status, self.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(e) => e.into_response(),
            ApiError::Repo(e) => e.into_response(),
            ApiError::Upload(e) => e.into_response(),
        }
    }
}
