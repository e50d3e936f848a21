use crate::{AppState, handlers::admins};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Admin Router Module
///
/// Account management, nested under `/admins` and wrapped in the authentication layer.
/// Only SUPER_ADMIN passes the per-handler policy check, and SUPER_ADMIN targets are
/// refused by the managed-account guard.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /admins/create
        .route("/create", post(admins::create_admin))
        // GET /admins?page&limit
        // Deactivated accounts are listed; soft-deleted ones are not.
        .route("/", get(admins::list_admins))
        .route("/count", get(admins::count_admins))
        .route(
            "/{id}",
            get(admins::get_admin)
                .put(admins::update_admin)
                .delete(admins::delete_admin),
        )
        // PATCH /admins/{id}/activate, PATCH /admins/{id}/deactivate
        .route("/{id}/activate", patch(admins::activate_admin))
        .route("/{id}/deactivate", patch(admins::deactivate_admin))
        // POST /admins/{id}/reset-password
        // Returns the generated password once. Disabled unless plaintext resets are allowed.
        .route("/{id}/reset-password", post(admins::reset_admin_password))
}
