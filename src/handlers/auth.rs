use axum::{Json, extract::State};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    AppState,
    auth::{self, AuthUser, TOKEN_COOKIE},
    config::Env,
    error::{AppError, AppResult},
    extract::JsonBody,
    lifecycle::{found, validated},
    models::{AccountChanges, AccountProfile, Envelope, LoginResponse, MessageResponse},
    password,
    validation::{self, ChangePasswordRequest, FieldError, LoginRequest},
};

/// login
///
/// [Public Route] Exchanges email and password for a session token. The token is returned
/// in the body and mirrored into the `portal_token` cookie (HttpOnly, SameSite=Strict).
///
/// Unknown email and wrong password produce the same 401 so the endpoint cannot be used to
/// probe for accounts. A deactivated account is told so (403) only after the password
/// checks out.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account deactivated")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    let (email, password) = validated(validation::login(&payload))?;
    let invalid = || AppError::Unauthenticated("Invalid credentials".to_string());

    let account = state
        .repo
        .find_account_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password_blocking(password, account.password_hash.clone()).await? {
        tracing::info!(account_id = %account.id, "login rejected: wrong password");
        return Err(invalid());
    }
    if !account.active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let token = auth::issue_token(&account, &state.config)?;
    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.env == Env::Production)
        .path("/");

    tracing::info!(account_id = %account.id, role = %account.role, "login succeeded");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            user: AccountProfile::from(account),
        }),
    ))
}

/// logout
///
/// [Public Route] Clears the session cookie. Bearer tokens stay valid until they expire.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(Cookie::build((TOKEN_COOKIE, "")).path("/")),
        Json(MessageResponse::new("Logged out")),
    )
}

/// me
///
/// [Authenticated Route] Returns the caller's own profile.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Own profile", body = Envelope<AccountProfile>),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn me(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<AccountProfile>>> {
    let account = found(state.repo.find_account(user.id).await?, "Account")?;
    Ok(Json(Envelope::data(account.into())))
}

/// change_password
///
/// [Authenticated Route] Changes the caller's own password after re-checking the current
/// one. Existing sessions are unaffected.
#[utoipa::path(
    put,
    path = "/auth/password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation failed or current password incorrect"),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let (current, new) = validated(validation::change_password(&payload))?;
    let account = found(state.repo.find_account(user.id).await?, "Account")?;

    if !password::verify_password_blocking(current, account.password_hash.clone()).await? {
        return Err(AppError::Validation(vec![FieldError::new(
            "currentPassword",
            "Current password is incorrect",
        )]));
    }

    let changes = AccountChanges {
        password_hash: Some(password::hash_password_blocking(new).await?),
        ..AccountChanges::default()
    };
    found(state.repo.update_account(user.id, changes).await?, "Account")?;

    tracing::info!(account_id = %user.id, "password changed");
    Ok(Json(MessageResponse::new("Password updated successfully")))
}
