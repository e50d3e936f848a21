//! Shared scaffolding for the router-level tests: an in-memory app, seeded accounts and
//! request builders (JSON and hand-assembled multipart).
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;
use zone_portal::{
    AppConfig, AppState, MemoryRepository, MockStorageService, auth, create_router,
    models::{Account, Role},
    password,
    repository::RepositoryState,
    storage::StorageState,
};

pub const PASSWORD: &str = "Str0ng!Pass";
const BOUNDARY: &str = "zone-portal-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepository>,
    pub storage: MockStorageService,
    pub config: AppConfig,
    password_hash: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(AppConfig::default(), MockStorageService::new())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with(config, MockStorageService::new())
    }

    pub fn with_storage(storage: MockStorageService) -> Self {
        Self::with(AppConfig::default(), storage)
    }

    pub fn with(config: AppConfig, storage: MockStorageService) -> Self {
        let repo = Arc::new(MemoryRepository::new());
        let state = AppState {
            repo: repo.clone() as RepositoryState,
            storage: Arc::new(storage.clone()) as StorageState,
            config: config.clone(),
        };
        Self {
            router: create_router(state),
            repo,
            storage,
            config,
            password_hash: password::hash_password(PASSWORD).expect("hashing should succeed"),
        }
    }

    /// Inserts an active account whose password is [`PASSWORD`].
    pub async fn seed(&self, role: Role, email: &str) -> Account {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            name: format!("{role} user"),
            email: email.to_string(),
            password_hash: self.password_hash.clone(),
            role,
            active: true,
            soft_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_account(account.clone()).await;
        account
    }

    /// Seeds an account and returns it with a bearer token.
    pub async fn login_as(&self, role: Role, email: &str) -> (Account, String) {
        let account = self.seed(role, email).await;
        let token = self.token(&account);
        (account, token)
    }

    pub fn token(&self, account: &Account) -> String {
        auth::issue_token(account, &self.config).expect("signing should succeed")
    }

    /// Sends a request through the full router and decodes the body as JSON
    /// (`Value::Null` for empty bodies).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}

fn with_token(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method(Method::GET).uri(uri), token)
        .body(Body::empty())
        .expect("valid request")
}

pub fn empty(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method(method).uri(uri), token)
        .body(Body::empty())
        .expect("valid request")
}

pub fn json(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    with_token(Request::builder().method(method).uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

/// A file part for [`multipart`]: `(field, file name, content type, bytes)`.
pub type FilePart<'a> = (&'a str, &'a str, &'a str, &'a [u8]);

pub fn multipart(
    method: Method,
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    files: &[FilePart<'_>],
) -> Request<Body> {
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    with_token(Request::builder().method(method).uri(uri), token)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("valid request")
}

/// Field names of a validation failure body, in response order.
pub fn error_fields(body: &Value) -> Vec<String> {
    body["fields"]
        .as_array()
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
