use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain and persistence.
pub mod models;
pub mod repository;
pub mod validation;

// Access control and credentials.
pub mod auth;
pub mod password;
pub mod policy;

// Shared request/response plumbing.
pub mod error;
pub mod extract;
pub mod lifecycle;
pub mod pagination;

// Attachments.
pub mod media;
pub mod storage;

pub mod config;
pub mod handlers;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::{AppConfig, Env};
pub use error::{AppError, AppResult};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{LocalDiskStorage, MockStorageService, S3StorageClient, StorageState};

/// Upper bound on any request body. Individual attachments are limited further by their
/// media policy; this only has to admit a multipart request carrying several of them.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and the schemas they reference. Generic
/// envelopes (`Envelope<T>`, `Page<T>`) are collected from the handler signatures.
/// Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::auth::login, handlers::auth::logout, handlers::auth::me,
        handlers::auth::change_password,
        handlers::news::list_news, handlers::news::get_news, handlers::news::create_news,
        handlers::news::update_news, handlers::news::delete_news,
        handlers::contact::create_contact, handlers::contact::list_contacts,
        handlers::contact::get_contact, handlers::contact::mark_responded,
        handlers::docs::list_docs, handlers::docs::get_doc, handlers::docs::create_doc,
        handlers::docs::update_doc, handlers::docs::delete_doc,
        handlers::admins::create_admin, handlers::admins::list_admins,
        handlers::admins::count_admins, handlers::admins::get_admin,
        handlers::admins::update_admin, handlers::admins::delete_admin,
        handlers::admins::activate_admin, handlers::admins::deactivate_admin,
        handlers::admins::reset_admin_password
    ),
    components(
        schemas(
            models::Role, models::Category, models::Language, models::Attachment,
            models::AccountProfile, models::Article, models::Document, models::ContactMessage,
            models::MessageResponse, models::LoginResponse, models::CountResponse,
            models::PasswordResetResponse,
            validation::FieldError, validation::LoginRequest, validation::CreateAccountRequest,
            validation::UpdateAccountRequest, validation::ChangePasswordRequest,
            validation::CreateArticleRequest, validation::UpdateArticleRequest,
            validation::CreateContactRequest, validation::CreateDocumentRequest,
            validation::UpdateDocumentRequest,
        )
    ),
    tags(
        (name = "auth", description = "Staff sessions"),
        (name = "news", description = "News articles"),
        (name = "contact", description = "Citizen contact messages"),
        (name = "docs", description = "Public documents"),
        (name = "admins", description = "Staff account management"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single container of shared services, cloned into every request. Persistence and
/// storage are trait objects so tests can swap in the in-memory repository and the mock
/// storage without touching the handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, `MemoryRepository` in tests.
    pub repo: RepositoryState,
    /// Attachment storage: S3-compatible, local disk, or the mock.
    pub storage: StorageState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors such as `AuthUser` pull individual services out of the shared state.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Route layer for the authenticated and admin routers. Resolving `AuthUser` is the whole
/// check: a missing, invalid or expired token, or an inactive account, rejects the request
/// with 401 before any handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, applies the scoped auth layer and the global observability
/// stack, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");
    let require_auth = || middleware::from_fn_with_state(state.clone(), auth_middleware);

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: no middleware.
        .merge(public::public_routes())
        // Authenticated Routes: shares paths with the public router (different methods).
        .merge(authenticated::authenticated_routes().route_layer(require_auth()))
        // Admin Routes: nested under '/admins', same auth layer; the SUPER_ADMIN rule is
        // enforced per handler through the policy table.
        .nest("/admins", admin::admin_routes().route_layer(require_auth()))
        // 5xx bodies carry `details` only when this router's config is `local`.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::internal_details,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the request id set by
/// `SetRequestIdLayer`, so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
