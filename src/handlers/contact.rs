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
    extract::JsonBody,
    lifecycle::{found, paged, parse_id, validated},
    models::{ContactFilter, ContactMessage, Envelope},
    pagination::{Page, PageRequest},
    policy::{self, Operation, Resource},
    validation::{self, CreateContactRequest},
};

const ENTITY: &str = "Contact message";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContactQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// `true` or `false`; any other value is ignored.
    pub responded: Option<String>,
}

/// create_contact
///
/// [Public Route] Submits a message through the contact form.
#[utoipa::path(
    post,
    path = "/contact",
    tag = "contact",
    request_body = CreateContactRequest,
    responses(
        (status = 201, description = "Message received", body = Envelope<ContactMessage>),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn create_contact(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateContactRequest>,
) -> AppResult<(StatusCode, Json<Envelope<ContactMessage>>)> {
    policy::authorize(Resource::ContactMessage, Operation::Create, None, None)?;
    let message = validated(validation::create_contact(&payload))?;
    let stored = state.repo.create_contact(message).await?;

    tracing::info!(contact_id = %stored.id, "contact message received");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message("Message sent successfully", stored)),
    ))
}

/// list_contacts
///
/// [Authenticated Route] ADMIN or SUPER_ADMIN.
#[utoipa::path(
    get,
    path = "/contact",
    tag = "contact",
    params(ContactQuery),
    responses(
        (status = 200, description = "Page of messages", body = Page<ContactMessage>),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Role not allowed")
    )
)]
pub async fn list_contacts(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ContactQuery>,
) -> AppResult<Json<Page<ContactMessage>>> {
    user.require(Resource::ContactMessage, Operation::List)?;

    let filter = ContactFilter {
        responded: validation::responded_filter(query.responded.as_deref()),
    };
    let window = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());

    let rows = state.repo.list_contacts(filter, window).await?;
    Ok(Json(paged(window, rows)))
}

/// get_contact
///
/// [Authenticated Route] ADMIN or SUPER_ADMIN.
#[utoipa::path(
    get,
    path = "/contact/{id}",
    tag = "contact",
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message", body = Envelope<ContactMessage>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_contact(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Envelope<ContactMessage>>> {
    user.require(Resource::ContactMessage, Operation::Get)?;
    let id = parse_id(&raw_id, ENTITY)?;
    let message = found(state.repo.find_contact(id).await?, ENTITY)?;
    Ok(Json(Envelope::data(message)))
}

/// mark_responded
///
/// [Authenticated Route] ADMIN or SUPER_ADMIN. Idempotent.
#[utoipa::path(
    patch,
    path = "/contact/{id}/responded",
    tag = "contact",
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "Marked as responded", body = Envelope<ContactMessage>),
        (status = 404, description = "Not found")
    )
)]
pub async fn mark_responded(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Envelope<ContactMessage>>> {
    user.require(Resource::ContactMessage, Operation::MarkResponded)?;
    let id = parse_id(&raw_id, ENTITY)?;
    let message = found(state.repo.mark_contact_responded(id).await?, ENTITY)?;

    tracing::info!(contact_id = %id, actor_id = %user.id, "contact message marked responded");
    Ok(Json(Envelope::with_message(
        "Message marked as responded",
        message,
    )))
}
