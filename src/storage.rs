use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::error::SdkError;
use s3::primitives::ByteStream;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::UploadError;

// Caching hint attached to every stored image (one hour).
const IMAGE_CACHE_CONTROL: &str = "max-age=3600";

/// StorageService
///
/// Defines the abstract contract for all interactions with the object storage
/// layer. This trait allows us to swap the concrete implementation—the real S3
/// client (S3StorageClient) in production and the in-memory Mock
/// (MockStorageService) during testing—without affecting the calling handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used primarily in the `Env::Local`
    /// setup to automatically provision the bucket in MinIO. No-op in production.
    async fn ensure_bucket_exists(&self);

    /// Stores an image under a collision-resistant key derived from the
    /// original file name, without overwriting on collision, and returns the
    /// publicly reachable URL of the stored object.
    async fn upload_image(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, UploadError>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

/// sanitize_file_name
///
/// Makes a user-provided file name safe to embed in an object key: whitespace
/// becomes `-` (path-unsafe in URLs), and directory navigation components
/// (`..`, `.`, separators) are stripped to prevent traversal.
pub fn sanitize_file_name(name: &str) -> String {
    let flattened: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();

    flattened
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("-")
}

/// object_key
///
/// Combines a fresh v4 UUID with the sanitized original name. The UUID token
/// guarantees distinct keys even for repeated uploads of the same file name.
pub fn object_key(file_name: &str) -> String {
    format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name))
}

/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3. Due to S3
/// compatibility, this client transparently handles connections to:
/// - **Local:** Dockerized MinIO instance.
/// - **Production:** Supabase Storage endpoint.
///
/// The `force_path_style(true)` is critical for MinIO and Supabase
/// compatibility, and makes the public URL of an object deterministic:
/// `endpoint/bucket/key`.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    endpoint: String,
    bucket_name: String,
}

impl S3StorageClient {
    /// Constructs the S3 client using credentials and configuration from AppConfig.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key) is required
            // for MinIO and Supabase Storage API gateways.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_name: bucket.to_string(),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket_name, key)
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// Calls the S3 CreateBucket API. S3 APIs are idempotent, so this only
    /// creates the bucket if it does not already exist. Safe at startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    /// upload_image
    ///
    /// PutObject with a conditional write (`If-None-Match: *`), so an existing
    /// object under the same key is never overwritten; the store answers 412
    /// in that case, surfaced as a duplicate-key error. The UUID token in the
    /// key makes that outcome practically unreachable, but the policy holds
    /// regardless.
    async fn upload_image(&self, bytes: Vec<u8>, file_name: &str) -> Result<String, UploadError> {
        let key = object_key(file_name);

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(ByteStream::from(bytes))
            .cache_control(IMAGE_CACHE_CONTROL)
            .if_none_match("*")
            .send()
            .await;

        match result {
            Ok(_) => Ok(self.public_url(&key)),
            Err(err) => {
                if let SdkError::ServiceError(ref service_err) = err {
                    if service_err.raw().status().as_u16() == 412 {
                        return Err(UploadError::DuplicateKey(key));
                    }
                }
                tracing::error!(key = %key, error = %err, "image upload failed");
                Err(UploadError::StoreUnavailable(err.to_string()))
            }
        }
    }
}

/// MockStorageService
///
/// In-memory implementation of `StorageService` used for unit and integration
/// testing, isolating handler tests from any network boundary. Records every
/// stored key and can simulate blanket or per-file failures.
#[derive(Default)]
pub struct MockStorageService {
    /// When true, every upload returns a simulated outage.
    pub should_fail: bool,
    /// Uploads whose file name contains this substring fail, for
    /// partial-batch tests.
    pub fail_matching: Option<String>,
    stored: Mutex<HashSet<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn failing_on(substring: &str) -> Self {
        Self {
            fail_matching: Some(substring.to_string()),
            ..Self::default()
        }
    }

    /// Number of objects stored so far.
    pub fn stored_count(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn upload_image(&self, _bytes: Vec<u8>, file_name: &str) -> Result<String, UploadError> {
        if self.should_fail {
            return Err(UploadError::StoreUnavailable(
                "mock storage outage".to_string(),
            ));
        }
        if let Some(needle) = &self.fail_matching {
            if file_name.contains(needle.as_str()) {
                return Err(UploadError::Rejected(format!(
                    "mock rejected file: {file_name}"
                )));
            }
        }

        let key = object_key(file_name);
        // Same reject-on-duplicate contract as the real store.
        if !self.stored.lock().unwrap().insert(key.clone()) {
            return Err(UploadError::DuplicateKey(key));
        }

        Ok(format!("http://localhost:9000/room-images/{}", key))
    }
}
