use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;

/// StorageService
///
/// The contract with the image store. Event submission never touches this —
/// the client uploads directly to the bucket using a presigned URL issued
/// here, and the API only ever receives the resulting URLs. Swappable
/// between the real S3 client and the in-memory mock used in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Ensures the configured bucket exists. Used in `Env::Local` to
    /// provision the MinIO bucket automatically. No-op in production.
    async fn ensure_bucket_exists(&self);

    /// Generates a temporary, signed URL allowing a client to PUT one image
    /// directly into the bucket, constrained by expiry and content type.
    ///
    /// # Arguments
    /// * `key`: the final object key (path + filename) in the bucket.
    /// * `content_type`: the expected MIME type (e.g. "image/jpeg").
    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String>;
}

/// S3StorageClient
///
/// The concrete implementation using the AWS SDK for S3, compatible with a
/// Dockerized MinIO instance locally and a hosted S3 gateway in production.
/// `force_path_style(true)` is required for both.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// Constructs the S3 client using credentials from AppConfig.
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
            // for MinIO and proxied storage gateways.
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        Self {
            client,
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// CreateBucket is idempotent, so this is safe to call at every startup.
    async fn ensure_bucket_exists(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        // Expiration constrained to 10 minutes (600 seconds).
        let expires_in = Duration::from_secs(600);

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            // The upload request must carry exactly this Content-Type header.
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(expires_in).map_err(|e| e.to_string())?)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Strips directory navigation components (`..`, `.`) from a user-provided
/// key segment so a crafted filename cannot escape the upload prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-memory implementation of `StorageService` for unit and integration
/// tests, isolating handler logic from the network.
#[derive(Clone)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn get_presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }

        let sanitized_key = sanitize_key(key);

        // Deterministic, local-style URL for mock assertions.
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitized_key
        ))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the
/// application state.
pub type StorageState = Arc<dyn StorageService>;
