use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        Account, AccountChanges, Article, ArticleChanges, ArticleFilter, ContactFilter,
        ContactMessage, Document, DocumentChanges, DocumentFilter, NewAccount, NewArticle,
        NewContactMessage, NewDocument,
    },
    pagination::PageRequest,
};

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    articles: Vec<Article>,
    documents: Vec<Document>,
    contacts: Vec<ContactMessage>,
}

/// MemoryRepository
///
/// A process-local [`Repository`] with the same visibility, ordering and uniqueness rules
/// as the Postgres one. Used by the integration tests and handy for running the API
/// without a database.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully-formed account, bypassing the email check. Lets tests provision the
    /// first SUPER_ADMIN and craft soft-deleted rows.
    pub async fn insert_account(&self, account: Account) {
        self.tables.write().await.accounts.push(account);
    }

    /// Returns every stored article, soft-deleted ones included.
    pub async fn all_articles(&self) -> Vec<Article> {
        self.tables.read().await.articles.clone()
    }
}

/// Newest first (later inserts win timestamp ties), then the window. Returns the page
/// together with the pre-window total.
fn window<T>(
    rows: impl Iterator<Item = T>,
    created_at: impl Fn(&T) -> chrono::DateTime<Utc>,
    window: PageRequest,
) -> (Vec<T>, i64) {
    let mut rows: Vec<(usize, T)> = rows.enumerate().collect();
    rows.sort_by_key(|(idx, row)| std::cmp::Reverse((created_at(row), *idx)));
    let total = rows.len() as i64;
    let page = rows
        .into_iter()
        .skip(window.offset() as usize)
        .take(window.limit as usize)
        .map(|(_, row)| row)
        .collect();
    (page, total)
}

fn email_taken(accounts: &[Account], email: &str, except: Option<Uuid>) -> bool {
    accounts.iter().any(|a| {
        !a.soft_deleted && a.email.eq_ignore_ascii_case(email) && Some(a.id) != except
    })
}

fn conflict() -> AppError {
    AppError::Conflict("Email already exists".to_string())
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- Accounts ---

    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .iter()
            .find(|a| a.id == id && !a.soft_deleted)
            .cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .iter()
            .find(|a| !a.soft_deleted && a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        let mut tables = self.tables.write().await;
        if email_taken(&tables.accounts, &account.email, None) {
            return Err(conflict());
        }
        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            name: account.name,
            email: account.email,
            password_hash: account.password_hash,
            role: account.role,
            active: true,
            soft_deleted: false,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.push(created.clone());
        Ok(created)
    }

    async fn list_accounts(&self, page: PageRequest) -> AppResult<(Vec<Account>, i64)> {
        let tables = self.tables.read().await;
        let live = tables.accounts.iter().filter(|a| !a.soft_deleted).cloned();
        Ok(window(live, |a| a.created_at, page))
    }

    async fn count_accounts(&self) -> AppResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.iter().filter(|a| !a.soft_deleted).count() as i64)
    }

    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> AppResult<Option<Account>> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email {
            if email_taken(&tables.accounts, email, Some(id)) {
                return Err(conflict());
            }
        }
        let Some(account) = tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id && !a.soft_deleted)
        else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            account.name = name;
        }
        if let Some(email) = changes.email {
            account.email = email;
        }
        if let Some(hash) = changes.password_hash {
            account.password_hash = hash;
        }
        if let Some(role) = changes.role {
            account.role = role;
        }
        if let Some(active) = changes.active {
            account.active = active;
        }
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }

    async fn soft_delete_account(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .accounts
            .iter_mut()
            .find(|a| a.id == id && !a.soft_deleted)
        {
            Some(account) => {
                account.soft_deleted = true;
                account.active = false;
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Articles ---

    async fn create_article(&self, article: NewArticle) -> AppResult<Article> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let created = Article {
            id: Uuid::new_v4(),
            title: article.title,
            content: article.content,
            author_id: article.author_id,
            category: article.category,
            language: article.language,
            images: article.images,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        tables.articles.push(created.clone());
        Ok(created)
    }

    async fn list_articles(
        &self,
        filter: ArticleFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Article>, i64)> {
        let tables = self.tables.read().await;
        let matching = tables
            .articles
            .iter()
            .filter(|a| a.deleted_at.is_none())
            .filter(|a| filter.category.is_none_or(|c| a.category == c))
            .filter(|a| filter.language.is_none_or(|l| a.language == Some(l)))
            .cloned();
        Ok(window(matching, |a| a.created_at, page))
    }

    async fn find_article(&self, id: Uuid) -> AppResult<Option<Article>> {
        let tables = self.tables.read().await;
        Ok(tables
            .articles
            .iter()
            .find(|a| a.id == id && a.deleted_at.is_none())
            .cloned())
    }

    async fn update_article(
        &self,
        id: Uuid,
        changes: ArticleChanges,
    ) -> AppResult<Option<Article>> {
        let mut tables = self.tables.write().await;
        let Some(article) = tables
            .articles
            .iter_mut()
            .find(|a| a.id == id && a.deleted_at.is_none())
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            article.title = title;
        }
        if let Some(content) = changes.content {
            article.content = content;
        }
        if let Some(category) = changes.category {
            article.category = category;
        }
        if let Some(language) = changes.language {
            article.language = Some(language);
        }
        if let Some(images) = changes.images {
            article.images = images;
        }
        article.updated_at = Utc::now();
        Ok(Some(article.clone()))
    }

    async fn soft_delete_article(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables
            .articles
            .iter_mut()
            .find(|a| a.id == id && a.deleted_at.is_none())
        {
            Some(article) => {
                let now = Utc::now();
                article.deleted_at = Some(now);
                article.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // --- Documents ---

    async fn create_document(&self, document: NewDocument) -> AppResult<Document> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let created = Document {
            id: Uuid::new_v4(),
            title: document.title,
            description: document.description,
            category: document.category,
            file_url: document.file_url,
            file_type: document.file_type,
            storage_key: document.storage_key,
            created_at: now,
            updated_at: now,
        };
        tables.documents.push(created.clone());
        Ok(created)
    }

    async fn list_documents(
        &self,
        filter: DocumentFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<Document>, i64)> {
        let tables = self.tables.read().await;
        let matching = tables
            .documents
            .iter()
            .filter(|d| filter.category.as_ref().is_none_or(|c| &d.category == c))
            .cloned();
        Ok(window(matching, |d| d.created_at, page))
    }

    async fn find_document(&self, id: Uuid) -> AppResult<Option<Document>> {
        let tables = self.tables.read().await;
        Ok(tables.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn update_document(
        &self,
        id: Uuid,
        changes: DocumentChanges,
    ) -> AppResult<Option<Document>> {
        let mut tables = self.tables.write().await;
        let Some(document) = tables.documents.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            document.title = title;
        }
        if let Some(description) = changes.description {
            document.description = description;
        }
        if let Some(category) = changes.category {
            document.category = category;
        }
        if let Some((attachment, mime)) = changes.file {
            document.file_url = attachment.url;
            document.storage_key = attachment.storage_key;
            document.file_type = mime;
        }
        document.updated_at = Utc::now();
        Ok(Some(document.clone()))
    }

    async fn delete_document(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.documents.len();
        tables.documents.retain(|d| d.id != id);
        Ok(tables.documents.len() < before)
    }

    // --- Contact Messages ---

    async fn create_contact(&self, message: NewContactMessage) -> AppResult<ContactMessage> {
        let mut tables = self.tables.write().await;
        let created = ContactMessage {
            id: Uuid::new_v4(),
            first_name: message.first_name,
            last_name: message.last_name,
            email: message.email,
            subject: message.subject,
            message: message.message,
            responded: false,
            deleted_at: None,
            created_at: Utc::now(),
        };
        tables.contacts.push(created.clone());
        Ok(created)
    }

    async fn list_contacts(
        &self,
        filter: ContactFilter,
        page: PageRequest,
    ) -> AppResult<(Vec<ContactMessage>, i64)> {
        let tables = self.tables.read().await;
        let matching = tables
            .contacts
            .iter()
            .filter(|m| m.deleted_at.is_none())
            .filter(|m| filter.responded.is_none_or(|r| m.responded == r))
            .cloned();
        Ok(window(matching, |m| m.created_at, page))
    }

    async fn find_contact(&self, id: Uuid) -> AppResult<Option<ContactMessage>> {
        let tables = self.tables.read().await;
        Ok(tables
            .contacts
            .iter()
            .find(|m| m.id == id && m.deleted_at.is_none())
            .cloned())
    }

    async fn mark_contact_responded(&self, id: Uuid) -> AppResult<Option<ContactMessage>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .contacts
            .iter_mut()
            .find(|m| m.id == id && m.deleted_at.is_none())
            .map(|m| {
                m.responded = true;
                m.clone()
            }))
    }
}
