use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations (backed by Postgres enum types) ---

/// Role
///
/// The RBAC field carried by every account and embedded in issued tokens.
/// Maps to the `account_role` Postgres enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "account_role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Writer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Writer => "WRITER",
        }
    }

    /// Case-insensitive parse of the wire name.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "ADMIN" => Some(Role::Admin),
            "WRITER" => Some(Role::Writer),
            _ => None,
        }
    }

    /// Roles a SUPER_ADMIN may hand out through account management.
    pub fn is_assignable(&self) -> bool {
        matches!(self, Role::Admin | Role::Writer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category
///
/// Editorial bucket of a news article. Maps to the `news_category` Postgres enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "news_category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Trending,
    Today,
    Weekly,
    #[default]
    General,
}

impl Category {
    pub fn parse(raw: &str) -> Option<Category> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TRENDING" => Some(Category::Trending),
            "TODAY" => Some(Category::Today),
            "WEEKLY" => Some(Category::Weekly),
            "GENERAL" => Some(Category::General),
            _ => None,
        }
    }
}

/// Language
///
/// Content language of a news article (English or Amharic). Nullable on the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "news_language", rename_all = "UPPERCASE")]
pub enum Language {
    En,
    Am,
}

impl Language {
    pub fn parse(raw: &str) -> Option<Language> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "EN" => Some(Language::En),
            "AM" => Some(Language::Am),
            _ => None,
        }
    }
}

// --- Core Records (Mapped to Database) ---

/// Account
///
/// A staff account row from the `accounts` table. Never serialized directly: the password
/// hash must not leave the server, so responses go through [`AccountProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub soft_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// AccountProfile
///
/// The public shape of an [`Account`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountProfile {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role,
            active: account.active,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Attachment
///
/// A stored binary: the public locator plus the key needed to release it later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub storage_key: String,
}

/// Article
///
/// A news article from the `news` table. `images` is a JSONB column holding the ordered
/// attachment set; `deleted_at` marks a soft-deleted row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub category: Category,
    pub language: Option<Language>,
    #[sqlx(json)]
    pub images: Vec<Attachment>,
    #[ts(type = "string | null")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Document
///
/// A public document from the `documents` table. Hard-deleted; `storage_key` stays internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub file_url: String,
    pub file_type: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub storage_key: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ContactMessage
///
/// A message submitted through the public contact form (`contact_messages` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub responded: bool,
    #[ts(type = "string | null")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Normalized Write Payloads (output of the validation layer) ---

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial account update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub category: Category,
    pub language: Option<Language>,
    pub images: Vec<Attachment>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Category>,
    pub language: Option<Language>,
    /// `Some` replaces the whole image set.
    pub images: Option<Vec<Attachment>>,
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub file_url: String,
    pub file_type: String,
    pub storage_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentChanges {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    /// `Some((attachment, mime))` swaps the stored file.
    pub file: Option<(Attachment, String)>,
}

#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

// --- Listing Filters (equality predicates) ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub category: Option<Category>,
    pub language: Option<Language>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactFilter {
    pub responded: Option<bool>,
}

// --- Response Shapes ---

/// Envelope
///
/// Standard success body: an optional human-readable message next to the payload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            data,
        }
    }
}

/// MessageResponse
///
/// Body of operations that have nothing to return but a confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// LoginResponse
///
/// Output of `POST /auth/login`: the bearer token and the caller's profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
    pub user: AccountProfile,
}

/// CountResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CountResponse {
    pub count: i64,
}

/// PasswordResetResponse
///
/// The freshly generated plaintext is returned exactly once; it is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetResponse {
    pub message: String,
    pub new_password: String,
}
