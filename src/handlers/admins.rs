use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    extract::JsonBody,
    lifecycle::{found, paged, parse_id, validated},
    models::{
        Account, AccountChanges, AccountProfile, CountResponse, Envelope, NewAccount,
        PasswordResetResponse,
    },
    pagination::{Page, PageQuery},
    password,
    policy::{Operation, Resource},
    validation::{self, CreateAccountRequest, UpdateAccountRequest},
};

const ENTITY: &str = "Account";

/// Account management only reaches ADMIN and WRITER accounts. SUPER_ADMIN accounts are
/// provisioned out of band and cannot be edited, toggled, reset or removed here.
fn guard_managed(target: &Account) -> AppResult<()> {
    if target.role.is_assignable() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Super admin accounts cannot be managed".to_string(),
        ))
    }
}

async fn managed_account(state: &AppState, raw_id: &str) -> AppResult<Account> {
    let id = parse_id(raw_id, ENTITY)?;
    let account = found(state.repo.find_account(id).await?, ENTITY)?;
    guard_managed(&account)?;
    Ok(account)
}

async fn apply(state: &AppState, id: Uuid, changes: AccountChanges) -> AppResult<AccountProfile> {
    let account = found(state.repo.update_account(id, changes).await?, ENTITY)?;
    Ok(account.into())
}

/// create_admin
///
/// [Super Admin Route] Creates an ADMIN or WRITER account.
#[utoipa::path(
    post,
    path = "/admins/create",
    tag = "admins",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = Envelope<AccountProfile>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not a super admin"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn create_admin(
    user: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<Envelope<AccountProfile>>)> {
    user.require(Resource::Account, Operation::Create)?;
    let draft = validated(validation::create_account(&payload))?;

    let account = state
        .repo
        .create_account(NewAccount {
            name: draft.name,
            email: draft.email,
            password_hash: password::hash_password_blocking(draft.password).await?,
            role: draft.role,
        })
        .await?;

    tracing::info!(account_id = %account.id, role = %account.role, actor_id = %user.id, "account created");
    Ok((
        StatusCode::CREATED,
        Json(Envelope::with_message(
            "Admin created successfully",
            account.into(),
        )),
    ))
}

/// list_admins
///
/// [Super Admin Route] Paginated listing of live accounts, deactivated ones included.
#[utoipa::path(
    get,
    path = "/admins",
    tag = "admins",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of accounts", body = Page<AccountProfile>),
        (status = 403, description = "Not a super admin")
    )
)]
pub async fn list_admins(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<AccountProfile>>> {
    user.require(Resource::Account, Operation::List)?;
    let window = query.window();
    let rows = state.repo.list_accounts(window).await?;
    Ok(Json(paged(window, rows)))
}

/// count_admins
///
/// [Super Admin Route]
#[utoipa::path(
    get,
    path = "/admins/count",
    tag = "admins",
    responses(
        (status = 200, description = "Number of live accounts", body = CountResponse),
        (status = 403, description = "Not a super admin")
    )
)]
pub async fn count_admins(
    user: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<CountResponse>> {
    user.require(Resource::Account, Operation::Count)?;
    let count = state.repo.count_accounts().await?;
    Ok(Json(CountResponse { count }))
}

/// get_admin
///
/// [Super Admin Route]
#[utoipa::path(
    get,
    path = "/admins/{id}",
    tag = "admins",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = Envelope<AccountProfile>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_admin(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Envelope<AccountProfile>>> {
    user.require(Resource::Account, Operation::Get)?;
    let id = parse_id(&raw_id, ENTITY)?;
    let account = found(state.repo.find_account(id).await?, ENTITY)?;
    Ok(Json(Envelope::data(account.into())))
}

/// update_admin
///
/// [Super Admin Route] Partial update of an ADMIN or WRITER account. A new password is
/// hashed before it is stored.
#[utoipa::path(
    put,
    path = "/admins/{id}",
    tag = "admins",
    params(("id" = String, Path, description = "Account id")),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = Envelope<AccountProfile>),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not a super admin, or target is a super admin"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn update_admin(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateAccountRequest>,
) -> AppResult<Json<Envelope<AccountProfile>>> {
    user.require(Resource::Account, Operation::Update)?;
    let target = managed_account(&state, &raw_id).await?;
    let patch = validated(validation::update_account(&payload))?;

    let mut changes = patch.changes;
    if let Some(plain) = patch.password {
        changes.password_hash = Some(password::hash_password_blocking(plain).await?);
    }

    let profile = apply(&state, target.id, changes).await?;
    tracing::info!(account_id = %target.id, actor_id = %user.id, "account updated");
    Ok(Json(Envelope::with_message(
        "Admin updated successfully",
        profile,
    )))
}

/// delete_admin
///
/// [Super Admin Route] Soft-deletes the account and deactivates it. The email becomes
/// available again for a new account.
#[utoipa::path(
    delete,
    path = "/admins/{id}",
    tag = "admins",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not a super admin, or target is a super admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn delete_admin(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<StatusCode> {
    user.require(Resource::Account, Operation::Delete)?;
    let target = managed_account(&state, &raw_id).await?;

    if !state.repo.soft_delete_account(target.id).await? {
        return Err(AppError::not_found(ENTITY));
    }

    tracing::info!(account_id = %target.id, actor_id = %user.id, "account soft-deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_active(
    user: AuthUser,
    state: AppState,
    raw_id: String,
    active: bool,
) -> AppResult<Json<Envelope<AccountProfile>>> {
    user.require(Resource::Account, Operation::ToggleActive)?;
    let target = managed_account(&state, &raw_id).await?;

    let changes = AccountChanges {
        active: Some(active),
        ..AccountChanges::default()
    };
    let profile = apply(&state, target.id, changes).await?;

    tracing::info!(account_id = %target.id, active, actor_id = %user.id, "account active flag changed");
    let message = if active {
        "Admin activated successfully"
    } else {
        "Admin deactivated successfully"
    };
    Ok(Json(Envelope::with_message(message, profile)))
}

/// activate_admin
///
/// [Super Admin Route]
#[utoipa::path(
    patch,
    path = "/admins/{id}/activate",
    tag = "admins",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Activated", body = Envelope<AccountProfile>),
        (status = 403, description = "Not a super admin, or target is a super admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn activate_admin(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Envelope<AccountProfile>>> {
    set_active(user, state, raw_id, true).await
}

/// deactivate_admin
///
/// [Super Admin Route] A deactivated account keeps its data but can no longer log in,
/// and tokens it already holds stop working.
#[utoipa::path(
    patch,
    path = "/admins/{id}/deactivate",
    tag = "admins",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Deactivated", body = Envelope<AccountProfile>),
        (status = 403, description = "Not a super admin, or target is a super admin"),
        (status = 404, description = "Not found")
    )
)]
pub async fn deactivate_admin(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Envelope<AccountProfile>>> {
    set_active(user, state, raw_id, false).await
}

/// reset_admin_password
///
/// [Super Admin Route] Replaces the account's password with a generated one and returns
/// the plaintext once. Disabled unless plaintext resets are allowed by configuration.
#[utoipa::path(
    post,
    path = "/admins/{id}/reset-password",
    tag = "admins",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Password reset", body = PasswordResetResponse),
        (status = 403, description = "Not permitted or disabled by configuration"),
        (status = 404, description = "Not found")
    )
)]
pub async fn reset_admin_password(
    user: AuthUser,
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> AppResult<Json<PasswordResetResponse>> {
    user.require(Resource::Account, Operation::ResetCredential)?;
    if !state.config.plaintext_reset {
        return Err(AppError::Forbidden(
            "Password reset is disabled".to_string(),
        ));
    }
    let target = managed_account(&state, &raw_id).await?;

    let new_password = password::generate_password();
    let changes = AccountChanges {
        password_hash: Some(password::hash_password_blocking(new_password.clone()).await?),
        ..AccountChanges::default()
    };
    apply(&state, target.id, changes).await?;

    tracing::info!(account_id = %target.id, actor_id = %user.id, "password reset");
    Ok(Json(PasswordResetResponse {
        message: "Password reset successfully".to_string(),
        new_password,
    }))
}
