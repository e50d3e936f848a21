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
    error::AppResult,
    extract::FormPayload,
    lifecycle::{commit_attachments, found, paged, parse_id, retire, validated},
    media::{self, NEWS_IMAGES},
    models::{Article, ArticleFilter, Envelope, NewArticle},
    pagination::{Page, PageRequest},
    policy::{self, Operation, Resource},
    validation::{self, CreateArticleRequest, UpdateArticleRequest},
};

const ENTITY: &str = "News";
/// Multipart field names accepted for image files.
const IMAGE_FIELDS: &[&str] = &["images", "images[]"];

/// NewsQuery
///
/// Query parameters for `GET /news`. Unknown category or language values are rejected
/// rather than ignored.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NewsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// TRENDING, TODAY, WEEKLY or GENERAL (case-insensitive).
    pub category: Option<String>,
    /// EN or AM (case-insensitive).
    pub language: Option<String>,
}

/// list_news
///
/// [Public Route] Paginated, newest-first listing of live articles.
#[utoipa::path(
    get,
    path = "/news",
    tag = "news",
    params(NewsQuery),
    responses(
        (status = 200, description = "Page of articles", body = Page<Article>),
        (status = 400, description = "Unknown category or language filter")
    )
)]
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> AppResult<Json<Page<Article>>> {
    policy::authorize(Resource::Article, Operation::List, None, None)?;

    let filter = ArticleFilter {
        category: validated(validation::category_filter(query.category.as_deref()))?,
        language: validated(validation::language_filter(query.language.as_deref()))?,
    };
    let window = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());

    let rows = state.repo.list_articles(filter, window).await?;
    Ok(Json(paged(window, rows)))
}

/// get_news
///
/// [Public Route] A single live article. Soft-deleted and malformed ids are 404.
#[utoipa::path(
    get,
    path = "/news/{id}",
    tag = "news",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = Envelope<Article>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_news(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Envelope<Article>>> {
    policy::authorize(Resource::Article, Operation::Get, None, None)?;
    let id = parse_id(&raw_id, ENTITY)?;
    let article = found(state.repo.find_article(id).await?, ENTITY)?;
    Ok(Json(Envelope::data(article)))
}

/// create_news
///
/// [Authenticated Route] ADMIN or WRITER. Accepts multipart (text fields plus `images`
/// files) or JSON without images. Images are uploaded before the row is written; if the
/// write fails they are released again.
#[utoipa::path(
    post,
    path = "/news",
    tag = "news",
    request_body(content = CreateArticleRequest, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = Envelope<Article>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Role not allowed"),
        (status = 502, description = "Attachment storage failure")
    )
)]
pub async fn create_news(
    user: AuthUser,
    State(state): State<AppState>,
    payload: FormPayload<CreateArticleRequest>,
) -> AppResult<(StatusCode, Json<Envelope<Article>>)> {
    user.require(Resource::Article, Operation::Create)?;
    let draft = validated(validation::create_article(
        &payload.fields,
        state.config.category_fallback,
    ))?;

    let files = payload.files_named(IMAGE_FIELDS);
    let images = media::store_all(state.storage.as_ref(), &NEWS_IMAGES, "images", &files).await?;

    let record = NewArticle {
        title: draft.title,
        content: draft.content,
        author_id: user.id,
        category: draft.category,
        language: draft.language,
        images: images.clone(),
    };
    let article = commit_attachments(
        state.storage.as_ref(),
        &images,
        &[],
        state.repo.create_article(record),
    )
    .await?;

    tracing::info!(article_id = %article.id, author_id = %user.id, images = article.images.len(), "article created");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("News created successfully", article)),
    ))
}

/// update_news
///
/// [Authenticated Route] The author, or any ADMIN/SUPER_ADMIN. Only present fields change.
/// Supplying images replaces the whole set: the new images are uploaded first, the old
/// ones released, then the row is committed.
#[utoipa::path(
    put,
    path = "/news/{id}",
    tag = "news",
    params(("id" = String, Path, description = "Article id")),
    request_body(content = UpdateArticleRequest, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated", body = Envelope<Article>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not the author and not an admin"),
        (status = 404, description = "Not found"),
        (status = 502, description = "Attachment storage failure")
    )
)]
pub async fn update_news(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: FormPayload<UpdateArticleRequest>,
) -> AppResult<Json<Envelope<Article>>> {
    let id = parse_id(&raw_id, ENTITY)?;
    let existing = found(state.repo.find_article(id).await?, ENTITY)?;
    user.require_role_or_owner(Resource::Article, Operation::Update, existing.author_id)?;

    let mut changes = validated(validation::update_article(
        &payload.fields,
        state.config.category_fallback,
    ))?;

    let files = payload.files_named(IMAGE_FIELDS);
    let (fresh, superseded) = if files.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let fresh =
            media::store_all(state.storage.as_ref(), &NEWS_IMAGES, "images", &files).await?;
        changes.images = Some(fresh.clone());
        (fresh, existing.images)
    };

    let repo = state.repo.clone();
    let article = commit_attachments(state.storage.as_ref(), &fresh, &superseded, async move {
        found(repo.update_article(id, changes).await?, ENTITY)
    })
    .await?;

    tracing::info!(article_id = %id, editor_id = %user.id, "article updated");
    Ok(Json(Envelope::with_message("News updated successfully", article)))
}

/// delete_news
///
/// [Authenticated Route] The author, or any ADMIN/SUPER_ADMIN. Images are released
/// best-effort, then the article is soft-deleted.
#[utoipa::path(
    delete,
    path = "/news/{id}",
    tag = "news",
    params(("id" = String, Path, description = "Article id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author and not an admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_news(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&raw_id, ENTITY)?;
    let existing = found(state.repo.find_article(id).await?, ENTITY)?;
    user.require_role_or_owner(Resource::Article, Operation::Delete, existing.author_id)?;

    retire(
        state.storage.as_ref(),
        &existing.images,
        ENTITY,
        state.repo.soft_delete_article(id),
    )
    .await?;

    tracing::info!(article_id = %id, actor_id = %user.id, "article soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}
