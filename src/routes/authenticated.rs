use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

/// Authenticated Router Module
///
/// Staff endpoints. The whole router sits behind the authentication layer, so every handler
/// receives a resolved `AuthUser`; role and ownership checks happen inside the handlers.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /auth/me, PUT /auth/password
        // The caller's own profile and password change.
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/password", put(handlers::auth::change_password))
        // --- News ---
        // POST /news (ADMIN, WRITER). Multipart with optional `images` parts.
        .route("/news", post(handlers::news::create_news))
        // PUT/DELETE /news/{id}
        // Author or ADMIN/SUPER_ADMIN; ownership is checked against the stored article.
        .route(
            "/news/{id}",
            put(handlers::news::update_news).delete(handlers::news::delete_news),
        )
        // --- Contact inbox ---
        .route("/contact", get(handlers::contact::list_contacts))
        .route("/contact/{id}", get(handlers::contact::get_contact))
        // PATCH /contact/{id}/responded
        // Idempotent: marking an answered message again is still a success.
        .route(
            "/contact/{id}/responded",
            patch(handlers::contact::mark_responded),
        )
        // --- Documents ---
        .route("/docs", post(handlers::docs::create_doc))
        .route(
            "/docs/{id}",
            put(handlers::docs::update_doc).delete(handlers::docs::delete_doc),
        )
}
