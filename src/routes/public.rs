use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a token. Listing and detail handlers rely on the repository
/// to hide soft-deleted rows, so nothing here can leak a deleted record.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(handlers::health))
        // POST /auth/login, POST /auth/logout
        // Session entry and exit. Login sets the `portal_token` cookie, logout clears it.
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        // GET /news?page&limit&category&language
        .route("/news", get(handlers::news::list_news))
        .route("/news/{id}", get(handlers::news::get_news))
        // POST /contact
        // The citizen-facing contact form.
        .route("/contact", post(handlers::contact::create_contact))
        // GET /docs?page&limit&category
        .route("/docs", get(handlers::docs::list_docs))
        .route("/docs/{id}", get(handlers::docs::get_doc))
}
