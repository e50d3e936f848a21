//! Per-operation input schemas.
//!
//! Every public function here takes a raw request payload and returns either the normalized
//! payload or a non-empty list of [`FieldError`]s, never both. Nothing in this module touches
//! the repository or the attachment store.

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    config::CategoryFallback,
    models::{
        AccountChanges, ArticleChanges, Category, DocumentChanges, Language, NewContactMessage,
        Role,
    },
    password,
};

/// FieldError
///
/// One rejected field. `field` uses the API's camelCase naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type Validated<T> = Result<T, Vec<FieldError>>;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

// --- Custom rules ---

/// `local@domain.tld`. Empty input is left to the `required` rule so it is reported once.
fn email_shape(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() || EMAIL_SHAPE.is_match(email.trim()) {
        return Ok(());
    }
    Err(ValidationError::new("email").with_message(Cow::Borrowed("Invalid email format")))
}

fn strong_password(candidate: &str) -> Result<(), ValidationError> {
    if password::meets_policy(candidate) {
        return Ok(());
    }
    Err(ValidationError::new("password_policy").with_message(Cow::Borrowed(
        "Password must be at least 8 characters long, include uppercase, lowercase, number, and special character",
    )))
}

fn assignable_role(raw: &str) -> Result<(), ValidationError> {
    match Role::parse(raw) {
        Some(role) if role.is_assignable() => Ok(()),
        _ => Err(ValidationError::new("role")
            .with_message(Cow::Borrowed("Role must be 'ADMIN' or 'WRITER'"))),
    }
}

// --- Raw Request Payloads ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreateAccountRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name is required (max 255 characters)"))]
    pub name: String,
    #[serde(default)]
    #[validate(
        length(min = 1, max = 320, message = "Email is required (max 320 characters)"),
        custom(function = "email_shape")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "strong_password"))]
    pub password: String,
    #[serde(default)]
    #[validate(custom(function = "assignable_role"))]
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct UpdateAccountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        length(min = 1, max = 320, message = "Email must be 1-320 characters"),
        custom(function = "email_shape")
    )]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "strong_password"))]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "assignable_role"))]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[serde(default)]
    #[validate(custom(function = "strong_password"))]
    pub new_password: String,
}

/// Article payloads arrive as multipart text fields or JSON; everything is a string here
/// and enum parsing happens during normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreateArticleRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "First name is required (max 255 characters)"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Last name is required (max 255 characters)"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(
        length(min = 1, max = 320, message = "Email is required (max 320 characters)"),
        custom(function = "email_shape")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Subject is required (max 255 characters)"))]
    pub subject: String,
    #[serde(default)]
    #[validate(length(min = 10, message = "Message must be at least 10 characters"))]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct CreateDocumentRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Title is required (max 255 characters)"))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Category is required (max 255 characters)"
    ))]
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[ts(export)]
pub struct UpdateDocumentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "Category must be 1-255 characters"))]
    pub category: Option<String>,
}

// --- Normalized Outputs ---

#[derive(Debug, Clone, PartialEq)]
pub struct AccountDraft {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Account update before hashing: the plaintext password (if any) is kept apart so the
/// caller can hash it off the async executor.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub changes: AccountChanges,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub category: Category,
    pub language: Option<Language>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
}

// --- Operation Entry Points ---

pub fn login(req: &LoginRequest) -> Validated<(String, String)> {
    run(req)?;
    Ok((normalize_email(&req.email), req.password.clone()))
}

pub fn create_account(req: &CreateAccountRequest) -> Validated<AccountDraft> {
    run(req)?;
    let role = Role::parse(&req.role).ok_or_else(|| vec![FieldError::new("role", "Invalid role")])?;
    Ok(AccountDraft {
        name: req.name.trim().to_string(),
        email: normalize_email(&req.email),
        password: req.password.clone(),
        role,
    })
}

pub fn update_account(req: &UpdateAccountRequest) -> Validated<AccountPatch> {
    run(req)?;
    Ok(AccountPatch {
        changes: AccountChanges {
            name: req.name.as_deref().map(|n| n.trim().to_string()),
            email: req.email.as_deref().map(normalize_email),
            password_hash: None,
            role: req.role.as_deref().and_then(Role::parse),
            active: req.active,
        },
        password: req.password.clone().filter(|p| !p.is_empty()),
    })
}

pub fn change_password(req: &ChangePasswordRequest) -> Validated<(String, String)> {
    run(req)?;
    Ok((req.current_password.clone(), req.new_password.clone()))
}

pub fn create_article(
    req: &CreateArticleRequest,
    fallback: CategoryFallback,
) -> Validated<ArticleDraft> {
    let mut errors = collect(req.validate());
    let category = resolve_category(req.category.as_deref(), fallback, &mut errors)
        .unwrap_or_default();
    let language = resolve_language(req.language.as_deref(), fallback, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(ArticleDraft {
        title: req.title.clone(),
        content: req.content.clone(),
        category,
        language,
    })
}

/// Only present fields end up in the changes; an unrecognised category under the lenient
/// fallback keeps whatever the article already has.
pub fn update_article(
    req: &UpdateArticleRequest,
    fallback: CategoryFallback,
) -> Validated<ArticleChanges> {
    let mut errors = collect(req.validate());
    let category = resolve_category(req.category.as_deref(), fallback, &mut errors);
    let language = resolve_language(req.language.as_deref(), fallback, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(ArticleChanges {
        title: req.title.clone(),
        content: req.content.clone(),
        category,
        language,
        images: None,
    })
}

pub fn create_contact(req: &CreateContactRequest) -> Validated<NewContactMessage> {
    run(req)?;
    Ok(NewContactMessage {
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        email: normalize_email(&req.email),
        subject: req.subject.trim().to_string(),
        message: req.message.clone(),
    })
}

pub fn create_document(req: &CreateDocumentRequest) -> Validated<DocumentDraft> {
    run(req)?;
    Ok(DocumentDraft {
        title: req.title.trim().to_string(),
        description: req
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        category: req.category.trim().to_string(),
    })
}

/// A blank description clears the stored one. The replacement file, if any, is attached
/// by the caller after upload.
pub fn update_document(req: &UpdateDocumentRequest) -> Validated<DocumentChanges> {
    run(req)?;
    Ok(DocumentChanges {
        title: req.title.as_deref().map(|t| t.trim().to_string()),
        description: req
            .description
            .as_deref()
            .map(|d| Some(d.trim()).filter(|d| !d.is_empty()).map(str::to_string)),
        category: req.category.as_deref().map(|c| c.trim().to_string()),
        file: None,
    })
}

// --- Query-string Filters ---

/// Listing filters are strict in both fallback modes: an unknown value would otherwise
/// silently widen the result set.
pub fn category_filter(raw: Option<&str>) -> Validated<Option<Category>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => Category::parse(value)
            .map(Some)
            .ok_or_else(|| vec![FieldError::new("category", "Unknown category")]),
    }
}

pub fn language_filter(raw: Option<&str>) -> Validated<Option<Language>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => Language::parse(value)
            .map(Some)
            .ok_or_else(|| vec![FieldError::new("language", "Language must be 'EN' or 'AM'")]),
    }
}

/// `responded=true|false`; anything else means "no filter".
pub fn responded_filter(raw: Option<&str>) -> Option<bool> {
    match raw {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

// --- Helpers ---

fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

fn resolve_category(
    raw: Option<&str>,
    fallback: CategoryFallback,
    errors: &mut Vec<FieldError>,
) -> Option<Category> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match (Category::parse(raw), fallback) {
        (Some(category), _) => Some(category),
        (None, CategoryFallback::Default) => None,
        (None, CategoryFallback::Reject) => {
            errors.push(FieldError::new(
                "category",
                "Category must be one of TRENDING, TODAY, WEEKLY, GENERAL",
            ));
            None
        }
    }
}

fn resolve_language(
    raw: Option<&str>,
    fallback: CategoryFallback,
    errors: &mut Vec<FieldError>,
) -> Option<Language> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match (Language::parse(raw), fallback) {
        (Some(language), _) => Some(language),
        (None, CategoryFallback::Default) => None,
        (None, CategoryFallback::Reject) => {
            errors.push(FieldError::new("language", "Language must be 'EN' or 'AM'"));
            None
        }
    }
}

fn run<T: Validate>(req: &T) -> Result<(), Vec<FieldError>> {
    let errors = collect(req.validate());
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Flattens `validator` output into the API's field list, sorted for stable responses.
fn collect(result: Result<(), ValidationErrors>) -> Vec<FieldError> {
    let Err(errors) = result else {
        return Vec::new();
    };

    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = camel_case(&field);
            errs.iter()
                .map(|e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {field}"));
                    FieldError {
                        field: field.clone(),
                        message,
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    fields.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    fields
}

fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for ch in snake.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_converts_snake_names() {
        assert_eq!(camel_case("first_name"), "firstName");
        assert_eq!(camel_case("email"), "email");
        assert_eq!(camel_case("new_password"), "newPassword");
    }

    #[test]
    fn responded_filter_ignores_garbage() {
        assert_eq!(responded_filter(Some("true")), Some(true));
        assert_eq!(responded_filter(Some("false")), Some(false));
        assert_eq!(responded_filter(Some("yes")), None);
        assert_eq!(responded_filter(None), None);
    }
}
