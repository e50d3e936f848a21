use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    extract::FormPayload,
    lifecycle::{commit_attachments, found, paged, parse_id, retire, validated},
    media::{self, DOCUMENTS},
    models::{Attachment, Document, DocumentFilter, Envelope, NewDocument},
    pagination::{Page, PageRequest},
    policy::{self, Operation, Resource},
    validation::{self, CreateDocumentRequest, UpdateDocumentRequest},
};

const ENTITY: &str = "Document";
const FILE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DocsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
}

fn stored_file(document: &Document) -> Attachment {
    Attachment {
        url: document.file_url.clone(),
        storage_key: document.storage_key.clone(),
    }
}

/// list_docs
///
/// [Public Route] Paginated, newest-first listing of documents.
#[utoipa::path(
    get,
    path = "/docs",
    tag = "docs",
    params(DocsQuery),
    responses((status = 200, description = "Page of documents", body = Page<Document>))
)]
pub async fn list_docs(
    State(state): State<AppState>,
    Query(query): Query<DocsQuery>,
) -> AppResult<Json<Page<Document>>> {
    policy::authorize(Resource::Document, Operation::List, None, None)?;

    let filter = DocumentFilter {
        category: query
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };
    let window = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());

    let rows = state.repo.list_documents(filter, window).await?;
    Ok(Json(paged(window, rows)))
}

/// get_doc
///
/// [Public Route]
#[utoipa::path(
    get,
    path = "/docs/{id}",
    tag = "docs",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document", body = Envelope<Document>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_doc(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Envelope<Document>>> {
    policy::authorize(Resource::Document, Operation::Get, None, None)?;
    let id = parse_id(&raw_id, ENTITY)?;
    let document = found(state.repo.find_document(id).await?, ENTITY)?;
    Ok(Json(Envelope::data(document)))
}

/// create_doc
///
/// [Authenticated Route] ADMIN or SUPER_ADMIN. Multipart with a required `file` part.
#[utoipa::path(
    post,
    path = "/docs",
    tag = "docs",
    request_body(content = CreateDocumentRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = Envelope<Document>),
        (status = 400, description = "Validation failed or file missing"),
        (status = 403, description = "Role not allowed"),
        (status = 502, description = "Attachment storage failure")
    )
)]
pub async fn create_doc(
    user: AuthUser,
    State(state): State<AppState>,
    payload: FormPayload<CreateDocumentRequest>,
) -> AppResult<(StatusCode, Json<Envelope<Document>>)> {
    user.require(Resource::Document, Operation::Create)?;
    let draft = validated(validation::create_document(&payload.fields))?;

    let file = payload
        .files_named(&[FILE_FIELD])
        .into_iter()
        .next()
        .ok_or_else(|| AppError::invalid(FILE_FIELD, "File is required"))?;
    let attachment = media::store(state.storage.as_ref(), &DOCUMENTS, FILE_FIELD, &file).await?;

    let record = NewDocument {
        title: draft.title,
        description: draft.description,
        category: draft.category,
        file_url: attachment.url.clone(),
        file_type: file.content_type.clone(),
        storage_key: attachment.storage_key.clone(),
    };
    let document = commit_attachments(
        state.storage.as_ref(),
        std::slice::from_ref(&attachment),
        &[],
        state.repo.create_document(record),
    )
    .await?;

    tracing::info!(document_id = %document.id, actor_id = %user.id, "document created");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Document created successfully", document)),
    ))
}

/// update_doc
///
/// [Authenticated Route] ADMIN or SUPER_ADMIN. Partial update; a new `file` part replaces
/// the stored file (new upload, then release of the old one, then commit).
#[utoipa::path(
    put,
    path = "/docs/{id}",
    tag = "docs",
    params(("id" = String, Path, description = "Document id")),
    request_body(content = UpdateDocumentRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated", body = Envelope<Document>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Role not allowed"),
        (status = 404, description = "Not found"),
        (status = 502, description = "Attachment storage failure")
    )
)]
pub async fn update_doc(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: FormPayload<UpdateDocumentRequest>,
) -> AppResult<Json<Envelope<Document>>> {
    user.require(Resource::Document, Operation::Update)?;
    let id = parse_id(&raw_id, ENTITY)?;
    let existing = found(state.repo.find_document(id).await?, ENTITY)?;
    let mut changes = validated(validation::update_document(&payload.fields))?;

    let (fresh, superseded) = match payload.files_named(&[FILE_FIELD]).into_iter().next() {
        None => (Vec::new(), Vec::new()),
        Some(file) => {
            let attachment =
                media::store(state.storage.as_ref(), &DOCUMENTS, FILE_FIELD, &file).await?;
            changes.file = Some((attachment.clone(), file.content_type.clone()));
            (vec![attachment], vec![stored_file(&existing)])
        }
    };

    let repo = state.repo.clone();
    let document = commit_attachments(state.storage.as_ref(), &fresh, &superseded, async move {
        found(repo.update_document(id, changes).await?, ENTITY)
    })
    .await?;

    tracing::info!(document_id = %id, actor_id = %user.id, "document updated");
    Ok(Json(Envelope::with_message(
        "Document updated successfully",
        document,
    )))
}

/// delete_doc
///
/// [Authenticated Route] ADMIN or SUPER_ADMIN. Hard delete; the stored file is released
/// best-effort first.
#[utoipa::path(
    delete,
    path = "/docs/{id}",
    tag = "docs",
    params(("id" = String, Path, description = "Document id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Role not allowed"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_doc(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<StatusCode> {
    user.require(Resource::Document, Operation::Delete)?;
    let id = parse_id(&raw_id, ENTITY)?;
    let existing = found(state.repo.find_document(id).await?, ENTITY)?;

    retire(
        state.storage.as_ref(),
        &[stored_file(&existing)],
        ENTITY,
        state.repo.delete_document(id),
    )
    .await?;

    tracing::info!(document_id = %id, actor_id = %user.id, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}
