use async_trait::async_trait;
use aws_sdk_s3 as s3;
use axum::body::Bytes;
use s3::primitives::ByteStream;
use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{Arc, Mutex},
};

/// StorageError
///
/// Failure reported by an attachment backend. Surfaces to clients as a 502.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload of '{key}' failed: {reason}")]
    Upload { key: String, reason: String },
    #[error("release of '{key}' failed: {reason}")]
    Release { key: String, reason: String },
}

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for the attachment store. Handlers only ever see this trait, so the
/// S3 client, the local-disk backend and the test mock are interchangeable.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Provisions the configured bucket (or upload directory). Idempotent and best-effort.
    async fn ensure_bucket_exists(&self);

    /// put_object
    ///
    /// Stores `bytes` under `key` and returns the public locator clients use to fetch it.
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, StorageError>;

    /// delete_object
    ///
    /// Releases the object stored under `key`. Releasing an unknown key is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
}

// 2. The Real Implementation (S3/MinIO)
/// S3StorageClient
///
/// Attachment backend over any S3-compatible endpoint (MinIO locally, a managed bucket in
/// production). Path-style addressing is forced for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_url: String,
}

impl S3StorageClient {
    /// new
    ///
    /// `public_url` is the base that object keys are appended to when building locators;
    /// when absent it defaults to `<endpoint>/<bucket>`.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        public_url: Option<&str>,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        let client = s3::Client::from_conf(config);

        let public_url = public_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));

        Self {
            client,
            bucket_name: bucket.to_string(),
            public_url,
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, sanitize_key(key))
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = ?e, "create_bucket skipped");
        }
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.clone(),
                reason: e.to_string(),
            })?;

        Ok(self.object_url(&key))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .send()
            .await
            .map_err(|e| StorageError::Release {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

/// LocalDiskStorage
///
/// Writes attachments below a directory on the server's filesystem. Locators are
/// `<public_prefix>/<key>`; serving that prefix is left to the reverse proxy.
#[derive(Clone, Debug)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            tracing::warn!(dir = %self.root.display(), error = %e, "could not create upload directory");
        }
    }

    async fn put_object(
        &self,
        key: &str,
        _content_type: &str,
        bytes: Bytes,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        let path = self.root.join(&key);
        let upload_err = |e: std::io::Error| StorageError::Upload {
            key: key.clone(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(upload_err)?;
        }
        tokio::fs::write(&path, &bytes).await.map_err(upload_err)?;

        Ok(format!("{}/{}", self.public_prefix, key))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let key = sanitize_key(key);
        match tokio::fs::remove_file(self.root.join(&key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Release {
                key,
                reason: e.to_string(),
            }),
        }
    }
}

/// sanitize_key
///
/// Strips directory navigation components (`..`, `.`) and empty segments from a key so a
/// crafted key can never escape the bucket prefix or the upload directory.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory stand-in used by the handler tests. It records every stored and released key
/// so tests can assert on upload/release ordering, and can be told to fail on demand.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every upload fails.
    pub should_fail: bool,
    /// When true, every release fails (uploads still succeed).
    pub fail_deletes: bool,
    /// Fails only the upload with this zero-based index (counted across the mock's lifetime).
    pub fail_on_upload: Option<usize>,
    stored: Arc<Mutex<Vec<String>>>,
    deleted: Arc<Mutex<Vec<String>>>,
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

    pub fn failing_on_upload(index: usize) -> Self {
        Self {
            fail_on_upload: Some(index),
            ..Self::default()
        }
    }

    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    /// Keys currently held by the mock (stored and not yet released).
    pub fn stored_keys(&self) -> Vec<String> {
        let deleted = self.deleted_keys();
        self.stored
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|key| !key.starts_with("!failed:") && !deleted.contains(key))
            .cloned()
            .collect()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn upload_count(&self) -> usize {
        self.stored.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {
        // No-op in mock environment.
    }

    async fn put_object(
        &self,
        key: &str,
        _content_type: &str,
        _bytes: Bytes,
    ) -> Result<String, StorageError> {
        let key = sanitize_key(key);
        if self.should_fail || self.fail_on_upload == Some(self.upload_count()) {
            // Count the attempt so later uploads are not affected by `fail_on_upload`.
            self.stored
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(format!("!failed:{key}"));
            return Err(StorageError::Upload {
                key,
                reason: "Mock Storage Error: Simulation requested".to_string(),
            });
        }

        self.stored
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(key.clone());

        Ok(format!("http://localhost:9000/mock-bucket/{key}"))
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_deletes {
            return Err(StorageError::Release {
                key: key.to_string(),
                reason: "Mock Storage Error: Simulation requested".to_string(),
            });
        }
        self.deleted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sanitize_key(key));
        Ok(())
    }
}

/// StorageState
///
/// Shared handle to whichever attachment backend the server was started with.
pub type StorageState = Arc<dyn StorageService>;
