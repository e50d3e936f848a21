//! Steps shared by every resource handler: id parsing, visibility lookups, validation
//! plumbing, list shaping, and the ordering rules around attachment mutations.

use std::future::Future;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    media,
    models::Attachment,
    pagination::{Page, PageRequest},
    storage::StorageService,
    validation::Validated,
};

/// An id that is not a UUID cannot name a live record, so it is a 404 rather than a 400.
pub fn parse_id(raw: &str, entity: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::not_found(entity))
}

/// Turns a visibility-filtered lookup into the record or `NotFound`.
pub fn found<T>(row: Option<T>, entity: &str) -> AppResult<T> {
    row.ok_or_else(|| AppError::not_found(entity))
}

pub fn validated<T>(result: Validated<T>) -> AppResult<T> {
    result.map_err(AppError::Validation)
}

/// Wraps a repository window into the list envelope, converting each row.
pub fn paged<R, T>(window: PageRequest, (rows, total): (Vec<R>, i64)) -> Page<T>
where
    T: From<R>,
{
    Page::new(window, total, rows.into_iter().map(T::from).collect())
}

/// commit_attachments
///
/// Final step of a create or update that carries attachments. By the time this runs the
/// `fresh` objects are already stored. The `superseded` ones are released first
/// (best-effort), then `commit` runs; if the commit fails the fresh objects are released
/// too, so a failed write never leaves new orphans behind.
pub async fn commit_attachments<T, F>(
    storage: &dyn StorageService,
    fresh: &[Attachment],
    superseded: &[Attachment],
    commit: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    media::release_all(storage, superseded).await;

    match commit.await {
        Ok(value) => Ok(value),
        Err(e) => {
            if !fresh.is_empty() {
                tracing::warn!(count = fresh.len(), "commit failed, releasing new attachments");
                media::release_all(storage, fresh).await;
            }
            Err(e)
        }
    }
}

/// retire
///
/// Removal step for records with attachments: release them best-effort, then run the
/// soft or hard delete. The delete reports whether a live row was affected.
pub async fn retire<F>(
    storage: &dyn StorageService,
    attachments: &[Attachment],
    entity: &str,
    delete: F,
) -> AppResult<()>
where
    F: Future<Output = AppResult<bool>>,
{
    media::release_all(storage, attachments).await;
    if delete.await? {
        Ok(())
    } else {
        Err(AppError::not_found(entity))
    }
}
