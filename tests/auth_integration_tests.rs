mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header, request::Parts},
};
use common::{PASSWORD, TestApp, error_fields, get, json};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;
use zone_portal::{
    AppConfig, AppError, AppState, MemoryRepository, MockStorageService,
    auth::{self, AuthUser, Claims, TOKEN_COOKIE},
    models::Role,
    repository::RepositoryState,
    storage::StorageState,
};

// --- Helper Functions ---

fn parts_with(header_name: header::HeaderName, value: &str) -> Parts {
    Request::builder()
        .method(Method::GET)
        .uri("/auth/me")
        .header(header_name, value)
        .body(())
        .expect("valid request")
        .into_parts()
        .0
}

fn state_over(repo: Arc<MemoryRepository>) -> AppState {
    AppState {
        repo: repo as RepositoryState,
        storage: Arc::new(MockStorageService::new()) as StorageState,
        config: AppConfig::default(),
    }
}

fn forge_token(sub: Uuid, secret: &str, exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub,
        role: Role::SuperAdmin,
        iat: now as usize,
        exp: (now + exp_offset_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("signing should succeed")
}

// --- Extractor ---

#[tokio::test]
async fn test_extractor_accepts_bearer_and_cookie() {
    let app = TestApp::new();
    let (account, token) = app.login_as(Role::Writer, "writer@zone.gov").await;
    let state = state_over(app.repo.clone());

    let mut parts = parts_with(header::AUTHORIZATION, &format!("Bearer {token}"));
    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .expect("bearer token should authenticate");
    assert_eq!(user.id, account.id);
    assert_eq!(user.role, Role::Writer);

    let mut parts = parts_with(header::COOKIE, &format!("{TOKEN_COOKIE}={token}"));
    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .expect("cookie token should authenticate");
    assert_eq!(user.id, account.id);
}

#[tokio::test]
async fn test_extractor_rejects_bad_credentials() {
    let app = TestApp::new();
    let (account, _) = app.login_as(Role::Admin, "admin@zone.gov").await;
    let state = state_over(app.repo.clone());
    let secret = &state.config.jwt_secret;

    let cases = [
        "Bearer not.a.jwt".to_string(),
        format!("Bearer {}", forge_token(account.id, "wrong-secret", 3600)),
        format!("Bearer {}", forge_token(account.id, secret, -3600)),
        format!("Bearer {}", forge_token(Uuid::new_v4(), secret, 3600)),
        "Basic dXNlcjpwYXNz".to_string(),
    ];

    for value in cases {
        let mut parts = parts_with(header::AUTHORIZATION, &value);
        let result = AuthUser::from_request_parts(&mut parts, &state).await;
        assert!(
            matches!(result, Err(AppError::Unauthenticated(_))),
            "expected 401 for {value}"
        );
    }
}

#[tokio::test]
async fn test_stored_role_overrides_token_role() {
    let app = TestApp::new();
    let (_, super_token) = app.login_as(Role::SuperAdmin, "root@zone.gov").await;
    let (writer, writer_token) = app.login_as(Role::Writer, "writer@zone.gov").await;

    let (status, _) = app.send(get("/contact", Some(&writer_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(json(
            Method::PUT,
            &format!("/admins/{}", writer.id),
            Some(&super_token),
            json!({ "role": "ADMIN" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Same token, promoted account.
    let (status, _) = app.send(get("/contact", Some(&writer_token))).await;
    assert_eq!(status, StatusCode::OK);
}

// --- Login / Logout ---

#[tokio::test]
async fn test_login_returns_token_and_sets_cookie() {
    let app = TestApp::new();
    let account = app.seed(Role::Admin, "admin@zone.gov").await;

    let response = app
        .router
        .clone()
        .oneshot(json(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "  ADMIN@zone.gov ", "password": PASSWORD }),
        ))
        .await
        .expect("router is infallible");

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("login should set a cookie")
        .to_string();
    assert!(cookie.starts_with(&format!("{TOKEN_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["user"]["id"], account.id.to_string());
    assert_eq!(body["user"]["role"], "ADMIN");
    assert!(body["user"].get("passwordHash").is_none());

    let token = body["token"].as_str().expect("token string");
    let claims = auth::resolve_identity(token, &app.config.jwt_secret).expect("valid token");
    assert_eq!(claims.sub, account.id);
    assert_eq!(claims.exp - claims.iat, 24 * 3600);
}

#[tokio::test]
async fn test_login_failures_do_not_reveal_accounts() {
    let app = TestApp::new();
    app.seed(Role::Writer, "writer@zone.gov").await;

    let (status, wrong_password) = app
        .send(json(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "writer@zone.gov", "password": "Wr0ng!pass" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_email) = app
        .send(json(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "ghost@zone.gov", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);

    let (status, body) = app
        .send(json(Method::POST, "/auth/login", None, json!({ "email": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&body), vec!["email", "password"]);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/logout")
                .header(header::COOKIE, format!("{TOKEN_COOKIE}=stale"))
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("router is infallible");

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .expect("logout should overwrite the cookie")
        .to_string();
    assert!(cookie.starts_with(&format!("{TOKEN_COOKIE}=;")));
    assert!(cookie.contains("Max-Age=0"));
}

// --- Self service ---

#[tokio::test]
async fn test_me_returns_own_profile() {
    let app = TestApp::new();
    let (account, token) = app.login_as(Role::Writer, "writer@zone.gov").await;

    let (status, body) = app.send(get("/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], account.email);
    assert_eq!(body["data"]["role"], "WRITER");

    let (status, body) = app.send(get("/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let (_, token) = app.login_as(Role::Writer, "writer@zone.gov").await;

    let (status, body) = app
        .send(json(
            Method::PUT,
            "/auth/password",
            Some(&token),
            json!({ "currentPassword": "Wr0ng!pass", "newPassword": "N3w!secret" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&body), vec!["currentPassword"]);

    let (status, body) = app
        .send(json(
            Method::PUT,
            "/auth/password",
            Some(&token),
            json!({ "currentPassword": PASSWORD, "newPassword": "weak" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&body), vec!["newPassword"]);

    let (status, body) = app
        .send(json(
            Method::PUT,
            "/auth/password",
            Some(&token),
            json!({ "currentPassword": PASSWORD, "newPassword": "N3w!secret" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated successfully");

    let (status, _) = app
        .send(json(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "writer@zone.gov", "password": PASSWORD }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(json(
            Method::POST,
            "/auth/login",
            None,
            json!({ "email": "writer@zone.gov", "password": "N3w!secret" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    // The session that changed the password is still valid.
    let (status, _) = app.send(get("/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
}
