use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Account, AccountChanges, Article, ArticleChanges, ArticleFilter, ContactFilter,
        ContactMessage, Document, DocumentChanges, DocumentFilter, NewAccount, NewArticle,
        NewContactMessage, NewDocument,
    },
    pagination::PageRequest,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract behind every resource. Handlers only see `Arc<dyn Repository>`,
/// so the Postgres implementation and the in-memory one used by the test suite are
/// interchangeable.
///
/// Visibility is enforced here, not by callers: every `find_*`/`list_*` method excludes
/// soft-deleted rows, and every list is ordered by `created_at` descending and windowed.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>>;
    /// Case-insensitive match against live accounts only.
    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>>;
    /// Fails with `Conflict` when a live account already holds the email.
    async fn create_account(&self, account: NewAccount) -> AppResult<Account>;
    async fn list_accounts(&self, window: PageRequest) -> AppResult<(Vec<Account>, i64)>;
    async fn count_accounts(&self) -> AppResult<i64>;
    /// Partial update; `None` fields are left untouched. Returns `None` for unknown or
    /// soft-deleted ids.
    async fn update_account(&self, id: Uuid, changes: AccountChanges)
    -> AppResult<Option<Account>>;
    /// Marks the account deleted and inactive. Returns false if nothing was live.
    async fn soft_delete_account(&self, id: Uuid) -> AppResult<bool>;

    // --- Articles ---
    async fn create_article(&self, article: NewArticle) -> AppResult<Article>;
    async fn list_articles(
        &self,
        filter: ArticleFilter,
        window: PageRequest,
    ) -> AppResult<(Vec<Article>, i64)>;
    async fn find_article(&self, id: Uuid) -> AppResult<Option<Article>>;
    async fn update_article(&self, id: Uuid, changes: ArticleChanges)
    -> AppResult<Option<Article>>;
    async fn soft_delete_article(&self, id: Uuid) -> AppResult<bool>;

    // --- Documents (hard delete) ---
    async fn create_document(&self, document: NewDocument) -> AppResult<Document>;
    async fn list_documents(
        &self,
        filter: DocumentFilter,
        window: PageRequest,
    ) -> AppResult<(Vec<Document>, i64)>;
    async fn find_document(&self, id: Uuid) -> AppResult<Option<Document>>;
    async fn update_document(
        &self,
        id: Uuid,
        changes: DocumentChanges,
    ) -> AppResult<Option<Document>>;
    async fn delete_document(&self, id: Uuid) -> AppResult<bool>;

    // --- Contact Messages ---
    async fn create_contact(&self, message: NewContactMessage) -> AppResult<ContactMessage>;
    async fn list_contacts(
        &self,
        filter: ContactFilter,
        window: PageRequest,
    ) -> AppResult<(Vec<ContactMessage>, i64)>;
    async fn find_contact(&self, id: Uuid) -> AppResult<Option<ContactMessage>>;
    /// Sets `responded = true`. Already-responded messages are returned unchanged.
    async fn mark_contact_responded(&self, id: Uuid) -> AppResult<Option<ContactMessage>>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
