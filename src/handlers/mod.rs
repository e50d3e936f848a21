//! HTTP handlers, one module per resource. Every handler follows the same order:
//! authorize, validate, mutate (storing attachments first when present), shape the response.

pub mod admins;
pub mod auth;
pub mod contact;
pub mod docs;
pub mod news;

/// health
///
/// [Public Route] Liveness probe for load balancers and monitoring.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}
