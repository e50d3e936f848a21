use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use uuid::Uuid;

use super::Repository;
use crate::{
    error::AppResult,
    models::{
        Account, AccountChanges, Article, ArticleChanges, ArticleFilter, ContactFilter,
        ContactMessage, Document, DocumentChanges, DocumentFilter, NewAccount, NewArticle,
        NewContactMessage, NewDocument,
    },
    pagination::PageRequest,
};

const ACCOUNT_COLUMNS: &str =
    "id, name, email, password_hash, role, active, soft_deleted, created_at, updated_at";
const ARTICLE_COLUMNS: &str =
    "id, title, content, author_id, category, language, images, deleted_at, created_at, updated_at";
const DOCUMENT_COLUMNS: &str =
    "id, title, description, category, file_url, file_type, storage_key, created_at, updated_at";
const CONTACT_COLUMNS: &str =
    "id, first_name, last_name, email, subject, message, responded, deleted_at, created_at";

/// PostgresRepository
///
/// The production implementation of [`Repository`], backed by a shared `PgPool`. Queries
/// are built at runtime with bound parameters (`query_as` / `QueryBuilder`) so the crate
/// builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_article_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: ArticleFilter) {
    builder.push(" WHERE deleted_at IS NULL");
    if let Some(category) = filter.category {
        builder.push(" AND category = ");
        builder.push_bind(category);
    }
    if let Some(language) = filter.language {
        builder.push(" AND language = ");
        builder.push_bind(language);
    }
}

fn push_document_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &DocumentFilter) {
    builder.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        builder.push(" AND category = ");
        builder.push_bind(category.clone());
    }
}

fn push_contact_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: ContactFilter) {
    builder.push(" WHERE deleted_at IS NULL");
    if let Some(responded) = filter.responded {
        builder.push(" AND responded = ");
        builder.push_bind(responded);
    }
}

fn push_window(builder: &mut QueryBuilder<'_, Postgres>, window: PageRequest) {
    builder.push(" ORDER BY created_at DESC LIMIT ");
    builder.push_bind(window.limit);
    builder.push(" OFFSET ");
    builder.push_bind(window.offset());
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Accounts ---

    async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        let sql =
            format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 AND NOT soft_deleted");
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE LOWER(email) = LOWER($1) AND NOT soft_deleted"
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    /// create_account
    ///
    /// Relies on the partial unique index `uq_accounts_email_live`; a violation surfaces as
    /// `AppError::Conflict` through the `sqlx::Error` conversion.
    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        let sql = format!(
            "INSERT INTO accounts (id, name, email, password_hash, role, active, soft_deleted, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, TRUE, FALSE, NOW(), NOW())
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Account>(&sql)
            .bind(Uuid::new_v4())
            .bind(account.name)
            .bind(account.email)
            .bind(account.password_hash)
            .bind(account.role)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn list_accounts(&self, window: PageRequest) -> AppResult<(Vec<Account>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE NOT soft_deleted")
                .fetch_one(&self.pool)
                .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE NOT soft_deleted"
        ));
        push_window(&mut builder, window);
        let rows = builder
            .build_query_as::<Account>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn count_accounts(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE NOT soft_deleted")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// update_account
    ///
    /// `COALESCE` keeps the stored value for every `None` field.
    async fn update_account(
        &self,
        id: Uuid,
        changes: AccountChanges,
    ) -> AppResult<Option<Account>> {
        let sql = format!(
            "UPDATE accounts
             SET name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 password_hash = COALESCE($4, password_hash),
                 role = COALESCE($5, role),
                 active = COALESCE($6, active),
                 updated_at = NOW()
             WHERE id = $1 AND NOT soft_deleted
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(changes.name)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.role)
            .bind(changes.active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn soft_delete_account(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET soft_deleted = TRUE, active = FALSE, updated_at = NOW()
             WHERE id = $1 AND NOT soft_deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Articles ---

    async fn create_article(&self, article: NewArticle) -> AppResult<Article> {
        let sql = format!(
            "INSERT INTO news (id, title, content, author_id, category, language, images, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
             RETURNING {ARTICLE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Article>(&sql)
            .bind(Uuid::new_v4())
            .bind(article.title)
            .bind(article.content)
            .bind(article.author_id)
            .bind(article.category)
            .bind(article.language)
            .bind(Json(article.images))
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// list_articles
    ///
    /// Filters are equality predicates on top of the unconditional `deleted_at IS NULL`.
    async fn list_articles(
        &self,
        filter: ArticleFilter,
        window: PageRequest,
    ) -> AppResult<(Vec<Article>, i64)> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM news");
        push_article_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ARTICLE_COLUMNS} FROM news"));
        push_article_filter(&mut builder, filter);
        push_window(&mut builder, window);
        let rows = builder
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn find_article(&self, id: Uuid) -> AppResult<Option<Article>> {
        let sql =
            format!("SELECT {ARTICLE_COLUMNS} FROM news WHERE id = $1 AND deleted_at IS NULL");
        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    async fn update_article(
        &self,
        id: Uuid,
        changes: ArticleChanges,
    ) -> AppResult<Option<Article>> {
        let sql = format!(
            "UPDATE news
             SET title = COALESCE($2, title),
                 content = COALESCE($3, content),
                 category = COALESCE($4, category),
                 language = COALESCE($5, language),
                 images = COALESCE($6, images),
                 updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {ARTICLE_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.content)
            .bind(changes.category)
            .bind(changes.language)
            .bind(changes.images.map(Json))
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn soft_delete_article(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE news SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Documents ---

    async fn create_document(&self, document: NewDocument) -> AppResult<Document> {
        let sql = format!(
            "INSERT INTO documents (id, title, description, category, file_url, file_type, storage_key, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
             RETURNING {DOCUMENT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Document>(&sql)
            .bind(Uuid::new_v4())
            .bind(document.title)
            .bind(document.description)
            .bind(document.category)
            .bind(document.file_url)
            .bind(document.file_type)
            .bind(document.storage_key)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn list_documents(
        &self,
        filter: DocumentFilter,
        window: PageRequest,
    ) -> AppResult<(Vec<Document>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM documents");
        push_document_filter(&mut count, &filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {DOCUMENT_COLUMNS} FROM documents"));
        push_document_filter(&mut builder, &filter);
        push_window(&mut builder, window);
        let rows = builder
            .build_query_as::<Document>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn find_document(&self, id: Uuid) -> AppResult<Option<Document>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1");
        let document = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    async fn update_document(
        &self,
        id: Uuid,
        changes: DocumentChanges,
    ) -> AppResult<Option<Document>> {
        let (file_url, file_type, storage_key) = match changes.file {
            Some((attachment, mime)) => (
                Some(attachment.url),
                Some(mime),
                Some(attachment.storage_key),
            ),
            None => (None, None, None),
        };

        let sql = format!(
            "UPDATE documents
             SET title = COALESCE($2, title),
                 description = CASE WHEN $3 THEN $4 ELSE description END,
                 category = COALESCE($5, category),
                 file_url = COALESCE($6, file_url),
                 file_type = COALESCE($7, file_type),
                 storage_key = COALESCE($8, storage_key),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {DOCUMENT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Document>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description.is_some())
            .bind(changes.description.flatten())
            .bind(changes.category)
            .bind(file_url)
            .bind(file_type)
            .bind(storage_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_document(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Contact Messages ---

    async fn create_contact(&self, message: NewContactMessage) -> AppResult<ContactMessage> {
        let sql = format!(
            "INSERT INTO contact_messages (id, first_name, last_name, email, subject, message, responded, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, FALSE, NOW())
             RETURNING {CONTACT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, ContactMessage>(&sql)
            .bind(Uuid::new_v4())
            .bind(message.first_name)
            .bind(message.last_name)
            .bind(message.email)
            .bind(message.subject)
            .bind(message.message)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn list_contacts(
        &self,
        filter: ContactFilter,
        window: PageRequest,
    ) -> AppResult<(Vec<ContactMessage>, i64)> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM contact_messages");
        push_contact_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CONTACT_COLUMNS} FROM contact_messages"));
        push_contact_filter(&mut builder, filter);
        push_window(&mut builder, window);
        let rows = builder
            .build_query_as::<ContactMessage>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn find_contact(&self, id: Uuid) -> AppResult<Option<ContactMessage>> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_messages WHERE id = $1 AND deleted_at IS NULL"
        );
        let message = sqlx::query_as::<_, ContactMessage>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }

    async fn mark_contact_responded(&self, id: Uuid) -> AppResult<Option<ContactMessage>> {
        let sql = format!(
            "UPDATE contact_messages SET responded = TRUE
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {CONTACT_COLUMNS}"
        );
        let message = sqlx::query_as::<_, ContactMessage>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }
}
