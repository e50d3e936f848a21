//! Attachment helper: policy checks, bulk upload with rollback, best-effort release.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    extract::UploadedFile,
    models::Attachment,
    storage::StorageService,
};

const MB: usize = 1024 * 1024;

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

const DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "text/plain",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
];

/// MediaPolicy
///
/// Which MIME types a folder accepts and how large a single file may be.
#[derive(Debug, Clone, Copy)]
pub struct MediaPolicy {
    pub folder: &'static str,
    pub allowed_types: &'static [&'static str],
    pub max_bytes: usize,
    /// Upper bound on files per request.
    pub max_files: usize,
    /// Label used in the rejection message.
    pub kinds: &'static str,
}

pub const NEWS_IMAGES: MediaPolicy = MediaPolicy {
    folder: "news",
    allowed_types: IMAGE_TYPES,
    max_bytes: 6 * MB,
    max_files: 10,
    kinds: "JPG, PNG, WEBP",
};

pub const DOCUMENTS: MediaPolicy = MediaPolicy {
    folder: "docs",
    allowed_types: DOCUMENT_TYPES,
    max_bytes: 20 * MB,
    max_files: 1,
    kinds: "PDF, DOC, DOCX, XLS, XLSX, PPT, PPTX, TXT, JPG, PNG, WEBP",
};

impl MediaPolicy {
    /// Rejects an out-of-policy file as a validation failure on `field`.
    pub fn check(&self, field: &str, file: &UploadedFile) -> AppResult<()> {
        if !self.allowed_types.contains(&file.content_type.as_str()) {
            return Err(AppError::invalid(
                field,
                format!(
                    "Invalid file type '{}'. Allowed types: {}",
                    file.content_type, self.kinds
                ),
            ));
        }
        if file.bytes.len() > self.max_bytes {
            return Err(AppError::invalid(
                field,
                format!(
                    "File '{}' exceeds the {} MB limit",
                    file.file_name,
                    self.max_bytes / MB
                ),
            ));
        }
        Ok(())
    }

    /// `<folder>/<uuid>.<ext>`; the client's file name never reaches the key.
    pub fn object_key(&self, file: &UploadedFile) -> String {
        match file.extension() {
            Some(ext) => format!("{}/{}.{}", self.folder, Uuid::new_v4(), ext),
            None => format!("{}/{}", self.folder, Uuid::new_v4()),
        }
    }
}

/// store_all
///
/// Checks every file against `policy` before touching the store, then uploads them in
/// order. If any upload fails, the ones already stored are released and the whole call
/// fails, so a caller never holds a partial attachment set.
pub async fn store_all(
    storage: &dyn StorageService,
    policy: &MediaPolicy,
    field: &str,
    files: &[UploadedFile],
) -> AppResult<Vec<Attachment>> {
    if files.len() > policy.max_files {
        return Err(AppError::invalid(
            field,
            format!("At most {} files may be uploaded", policy.max_files),
        ));
    }
    for file in files {
        policy.check(field, file)?;
    }

    let mut stored: Vec<Attachment> = Vec::with_capacity(files.len());
    for file in files {
        let key = policy.object_key(file);
        match storage
            .put_object(&key, &file.content_type, file.bytes.clone())
            .await
        {
            Ok(url) => stored.push(Attachment {
                url,
                storage_key: key,
            }),
            Err(e) => {
                tracing::error!(key = %key, error = %e, "attachment upload failed, rolling back");
                release_all(storage, &stored).await;
                return Err(AppError::Storage(e));
            }
        }
    }

    tracing::debug!(count = stored.len(), folder = policy.folder, "attachments stored");
    Ok(stored)
}

/// Stores a single file; see [`store_all`].
pub async fn store(
    storage: &dyn StorageService,
    policy: &MediaPolicy,
    field: &str,
    file: &UploadedFile,
) -> AppResult<Attachment> {
    let mut stored = store_all(storage, policy, field, std::slice::from_ref(file)).await?;
    stored
        .pop()
        .ok_or_else(|| AppError::Internal("upload returned no attachment".to_string()))
}

/// release
///
/// Best-effort removal. Failures are logged and swallowed; a record mutation must never be
/// blocked by a stale object.
pub async fn release(storage: &dyn StorageService, storage_key: &str) {
    if let Err(e) = storage.delete_object(storage_key).await {
        tracing::warn!(key = %storage_key, error = %e, "failed to release attachment");
    }
}

pub async fn release_all(storage: &dyn StorageService, attachments: &[Attachment]) {
    for attachment in attachments {
        release(storage, &attachment.storage_key).await;
    }
}
