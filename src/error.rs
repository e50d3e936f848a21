use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    config::{AppConfig, Env},
    storage::StorageError,
    validation::FieldError,
};

/// The underlying error text of a 5xx response. Travels as a response extension and is
/// only written into the body by [`internal_details`].
#[derive(Debug, Clone)]
pub struct InternalDetails(pub String);

/// internal_details
///
/// Response middleware: in `local`, copies [`InternalDetails`] into the JSON body as
/// `details`. Other environments never expose them.
pub async fn internal_details(
    State(config): State<AppConfig>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if config.env != Env::Local {
        return response;
    }
    let Some(InternalDetails(details)) = response.extensions().get::<InternalDetails>().cloned()
    else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return parts.status.into_response(),
    };
    let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    value["details"] = json!(details);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(value.to_string()))
}

/// AppError
///
/// The single failure taxonomy shared by every resource. Each variant maps to exactly one
/// HTTP status, and every response body carries a human-readable `error` field.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 400: the payload is malformed; carries one entry per offending field.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// 401: missing, malformed, expired or forged credential.
    #[error("{0}")]
    Unauthenticated(String),

    /// 403: the caller is known but may not perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// 404: unknown id, malformed id, or a soft-deleted record.
    #[error("{0}")]
    NotFound(String),

    /// 409: a unique field (account email) is already taken.
    #[error("{0}")]
    Conflict(String),

    /// 502: the attachment store rejected or failed an upload.
    #[error("attachment storage failure: {0}")]
    Storage(#[from] StorageError),

    /// 500: persistence failure that is not a known constraint violation.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// 500: anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn not_found(entity: &str) -> Self {
        AppError::NotFound(format!("{entity} not found"))
    }
}

impl From<sqlx::Error> for AppError {
    /// Unique violations (SQLSTATE 23505) become `Conflict`; the only unique index the
    /// schema declares besides primary keys is the live-account email index.
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
                AppError::Conflict("Email already exists".to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let details = status
            .is_server_error()
            .then(|| InternalDetails(self.to_string()));

        let body = match &self {
            AppError::Validation(fields) => json!({
                "error": "Validation failed",
                "fields": fields,
            }),
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => json!({ "error": msg }),
            AppError::Storage(err) => {
                tracing::error!(error = %err, "attachment storage failure");
                json!({ "error": "Attachment storage is unavailable" })
            }
            AppError::Database(err) => {
                tracing::error!(error = ?err, "database failure");
                json!({ "error": "Internal server error" })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal failure");
                json!({ "error": "Internal server error" })
            }
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(details) = details {
            response.extensions_mut().insert(details);
        }
        response
    }
}
