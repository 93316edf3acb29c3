use campus_connect::storage::{MockStorageService, StorageService};

// The mock storage service stands in for S3/MinIO in every handler test, so
// its contract needs pinning down: deterministic URLs, sanitized keys, and a
// controllable failure mode.

#[tokio::test]
async fn test_mock_presigned_url_contains_key() {
    let storage = MockStorageService::new();

    let url = storage
        .get_presigned_upload_url("events/abc123.jpg", "image/jpeg")
        .await
        .expect("mock never fails by default");

    assert!(url.starts_with("http://localhost:9000/mock-bucket/"));
    assert!(url.contains("events/abc123.jpg"));
}

#[tokio::test]
async fn test_mock_sanitizes_traversal_segments() {
    let storage = MockStorageService::new();

    // A crafted filename must not escape the upload prefix.
    let url = storage
        .get_presigned_upload_url("events/../../etc/passwd", "image/png")
        .await
        .unwrap();

    assert!(!url.contains(".."));
    assert!(url.contains("events/etc/passwd"));
}

#[tokio::test]
async fn test_mock_failure_mode() {
    let storage = MockStorageService::new_failing();

    let result = storage
        .get_presigned_upload_url("events/x.jpg", "image/jpeg")
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_ensure_bucket_is_noop() {
    // Must not panic or hit the network.
    MockStorageService::new().ensure_bucket_exists().await;
}
