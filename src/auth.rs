use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{Account, Role},
    policy::{self, Caller, Operation, Resource},
    repository::RepositoryState,
};

/// Name of the cookie that mirrors the bearer token for browser clients.
pub const TOKEN_COOKIE: &str = "portal_token";

/// Claims
///
/// Payload of every session token. Signed with HS256 using `AppConfig::jwt_secret`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    /// Role at issue time. Informational only: authorization always uses the stored role.
    pub role: Role,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// issue_token
///
/// Signs a token for `account` valid for `config.token_ttl_hours`.
pub fn issue_token(account: &Account, config: &AppConfig) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: account.id,
        role: account.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.token_ttl_hours)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// resolve_identity
///
/// Verifies the signature and expiry of `token`. Every failure is `Unauthenticated`; the
/// kind is only logged.
pub fn resolve_identity(token: &str, secret: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                kind => tracing::debug!(?kind, "rejected invalid token"),
            }
            AppError::Unauthenticated("Invalid or expired token".to_string())
        })
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers take it as an argument and
/// hand it to the policy helpers below.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn caller(&self) -> Caller {
        Caller {
            id: self.id,
            role: self.role,
        }
    }

    /// Checks a role-only rule from the access table.
    pub fn require(&self, resource: Resource, operation: Operation) -> AppResult<()> {
        policy::authorize(resource, operation, Some(self.caller()), None)
    }

    /// require_role_or_owner
    ///
    /// Checks a rule that also admits the record's owner (`owner_id`), such as article
    /// update and delete.
    pub fn require_role_or_owner(
        &self,
        resource: Resource,
        operation: Operation,
        owner_id: Uuid,
    ) -> AppResult<()> {
        policy::authorize(resource, operation, Some(self.caller()), Some(owner_id))
    }
}

/// Bearer header first, then the cookie mirror.
fn extract_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| {
        CookieJar::from_headers(&parts.headers)
            .get(TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

/// AuthUser Extractor Implementation
///
/// 1. Token extraction (header, then cookie).
/// 2. Signature and expiry verification.
/// 3. Account lookup: the account must still exist, not be soft-deleted, and be active.
///    The role used from here on is the stored one, so demotions apply immediately.
///
/// Rejection: `AppError::Unauthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = extract_token(parts)
            .ok_or_else(|| AppError::Unauthenticated("Authentication required".to_string()))?;

        let claims = resolve_identity(&token, &config.jwt_secret)?;

        let account = repo
            .find_account(claims.sub)
            .await?
            .filter(|account| account.active)
            .ok_or_else(|| AppError::Unauthenticated("Account is not available".to_string()))?;

        Ok(AuthUser {
            id: account.id,
            role: account.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(role: Role) -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@zone.gov".to_string(),
            password_hash: String::new(),
            role,
            active: true,
            soft_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_tokens_resolve() {
        let config = AppConfig::default();
        let acct = account(Role::Writer);
        let token = issue_token(&acct, &config).expect("signing should succeed");

        let claims = resolve_identity(&token, &config.jwt_secret).expect("token should verify");
        assert_eq!(claims.sub, acct.id);
        assert_eq!(claims.role, Role::Writer);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let config = AppConfig::default();
        let token = issue_token(&account(Role::Admin), &config).expect("signing should succeed");
        let err = resolve_identity(&token, "another-secret").unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let config = AppConfig {
            token_ttl_hours: -1,
            ..AppConfig::default()
        };
        let token = issue_token(&account(Role::Admin), &config).expect("signing should succeed");
        assert!(resolve_identity(&token, &config.jwt_secret).is_err());
    }
}
