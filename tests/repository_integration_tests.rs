//! Postgres-backed repository tests. They need a reachable database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use sqlx::PgPool;
use uuid::Uuid;
use zone_portal::{
    AppError,
    models::{
        AccountChanges, ArticleChanges, ArticleFilter, Attachment, Category, ContactFilter,
        DocumentChanges, Language, NewAccount, NewArticle, NewContactMessage, NewDocument, Role,
    },
    pagination::PageRequest,
    repository::{PostgresRepository, Repository},
};

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@zone.test", Uuid::new_v4().simple())
}

fn new_account(email: &str, role: Role) -> NewAccount {
    NewAccount {
        name: "Repository Test".to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$placeholder".to_string(),
        role,
    }
}

fn image(key: &str) -> Attachment {
    Attachment {
        url: format!("http://cdn.test/{key}"),
        storage_key: key.to_string(),
    }
}

// --- Accounts ---

#[tokio::test]
#[ignore]
async fn test_account_email_unique_among_live_accounts() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let email = unique_email("dup");

    let first = repo.create_account(new_account(&email, Role::Admin)).await.unwrap();

    let clash = repo
        .create_account(new_account(&email.to_uppercase(), Role::Writer))
        .await;
    assert!(matches!(clash, Err(AppError::Conflict(_))));

    assert!(repo.soft_delete_account(first.id).await.unwrap());
    assert!(repo.find_account(first.id).await.unwrap().is_none());
    assert!(repo.find_account_by_email(&email).await.unwrap().is_none());

    let second = repo.create_account(new_account(&email, Role::Writer)).await.unwrap();
    assert_ne!(second.id, first.id);
    assert!(!repo.soft_delete_account(first.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_account_partial_update() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let account = repo
        .create_account(new_account(&unique_email("upd"), Role::Writer))
        .await
        .unwrap();

    let updated = repo
        .update_account(
            account.id,
            AccountChanges {
                active: Some(false),
                role: Some(Role::Admin),
                ..AccountChanges::default()
            },
        )
        .await
        .unwrap()
        .expect("live account");

    assert!(!updated.active);
    assert_eq!(updated.role, Role::Admin);
    assert_eq!(updated.name, account.name);
    assert_eq!(updated.password_hash, account.password_hash);
    assert!(updated.updated_at >= account.updated_at);

    let found = repo
        .find_account_by_email(&account.email.to_uppercase())
        .await
        .unwrap();
    assert_eq!(found.map(|a| a.id), Some(account.id));
}

// --- Articles ---

#[tokio::test]
#[ignore]
async fn test_article_images_round_trip_and_soft_delete() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = repo
        .create_account(new_account(&unique_email("author"), Role::Writer))
        .await
        .unwrap();

    let article = repo
        .create_article(NewArticle {
            title: "Repository article".to_string(),
            content: "Body".to_string(),
            author_id: author.id,
            category: Category::Today,
            language: Some(Language::Am),
            images: vec![image("news/1.png"), image("news/2.png")],
        })
        .await
        .unwrap();
    assert_eq!(article.images.len(), 2);
    assert_eq!(article.images[1].storage_key, "news/2.png");

    let updated = repo
        .update_article(
            article.id,
            ArticleChanges {
                images: Some(vec![image("news/3.png")]),
                ..ArticleChanges::default()
            },
        )
        .await
        .unwrap()
        .expect("live article");
    assert_eq!(updated.images, vec![image("news/3.png")]);
    assert_eq!(updated.category, Category::Today);

    let filter = ArticleFilter {
        category: Some(Category::Today),
        language: Some(Language::Am),
    };
    let (rows, _) = repo
        .list_articles(filter, PageRequest::new(1, 50))
        .await
        .unwrap();
    assert!(rows.iter().any(|a| a.id == article.id));

    assert!(repo.soft_delete_article(article.id).await.unwrap());
    assert!(repo.find_article(article.id).await.unwrap().is_none());
    assert!(
        repo.update_article(article.id, ArticleChanges::default())
            .await
            .unwrap()
            .is_none()
    );
    let (rows, _) = repo
        .list_articles(filter, PageRequest::new(1, 50))
        .await
        .unwrap();
    assert!(rows.iter().all(|a| a.id != article.id));
}

// --- Documents ---

#[tokio::test]
#[ignore]
async fn test_document_hard_delete() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let document = repo
        .create_document(NewDocument {
            title: "Plan".to_string(),
            description: Some("Draft".to_string()),
            category: format!("cat-{}", Uuid::new_v4().simple()),
            file_url: "http://cdn.test/docs/a.pdf".to_string(),
            file_type: "application/pdf".to_string(),
            storage_key: "docs/a.pdf".to_string(),
        })
        .await
        .unwrap();

    let updated = repo
        .update_document(
            document.id,
            DocumentChanges {
                description: Some(None),
                file: Some((image("docs/b.pdf"), "application/pdf".to_string())),
                ..DocumentChanges::default()
            },
        )
        .await
        .unwrap()
        .expect("document exists");
    assert_eq!(updated.storage_key, "docs/b.pdf");
    assert_eq!(updated.title, "Plan");
    assert_eq!(updated.description, None);

    assert!(repo.delete_document(document.id).await.unwrap());
    assert!(repo.find_document(document.id).await.unwrap().is_none());
    assert!(!repo.delete_document(document.id).await.unwrap());
}

// --- Contact Messages ---

#[tokio::test]
#[ignore]
async fn test_contact_mark_responded_is_idempotent() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let message = repo
        .create_contact(NewContactMessage {
            first_name: "Abebe".to_string(),
            last_name: "Kebede".to_string(),
            email: unique_email("citizen"),
            subject: "Roads".to_string(),
            message: "Please fix the road near the school.".to_string(),
        })
        .await
        .unwrap();
    assert!(!message.responded);

    for _ in 0..2 {
        let marked = repo
            .mark_contact_responded(message.id)
            .await
            .unwrap()
            .expect("message exists");
        assert!(marked.responded);
    }

    let (rows, _) = repo
        .list_contacts(
            ContactFilter {
                responded: Some(false),
            },
            PageRequest::new(1, 50),
        )
        .await
        .unwrap();
    assert!(rows.iter().all(|m| m.id != message.id));
    assert!(repo.mark_contact_responded(Uuid::new_v4()).await.unwrap().is_none());
}
