use chrono::Utc;
use uuid::Uuid;
use zone_portal::{
    config::CategoryFallback,
    models::{
        Account, AccountProfile, Article, Attachment, Category, Document, Envelope, Language,
        PasswordResetResponse, Role,
    },
    pagination::{Page, PageRequest},
    validation::{
        self, CreateAccountRequest, CreateArticleRequest, CreateContactRequest,
        CreateDocumentRequest, UpdateAccountRequest, UpdateArticleRequest, UpdateDocumentRequest,
    },
};

fn fields(errors: Vec<validation::FieldError>) -> Vec<String> {
    errors.into_iter().map(|e| e.field).collect()
}

// --- Serialization shapes ---

#[test]
fn test_account_profile_never_carries_the_hash() {
    let account = Account {
        id: Uuid::new_v4(),
        name: "Staff".to_string(),
        email: "staff@zone.gov".to_string(),
        password_hash: "$argon2id$secret".to_string(),
        role: Role::SuperAdmin,
        active: true,
        soft_deleted: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let json_output = serde_json::to_string(&AccountProfile::from(account)).unwrap();
    assert!(!json_output.contains("argon2"));
    assert!(json_output.contains(r#""role":"SUPER_ADMIN""#));
    assert!(json_output.contains(r#""createdAt""#));
}

#[test]
fn test_article_uses_camel_case_and_wire_enums() {
    let article = Article {
        id: Uuid::new_v4(),
        title: "T".to_string(),
        content: "C".to_string(),
        author_id: Uuid::new_v4(),
        category: Category::Trending,
        language: Some(Language::Am),
        images: vec![Attachment {
            url: "http://cdn/news/a.png".to_string(),
            storage_key: "news/a.png".to_string(),
        }],
        deleted_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let value = serde_json::to_value(&article).unwrap();
    assert_eq!(value["category"], "TRENDING");
    assert_eq!(value["language"], "AM");
    assert_eq!(value["images"][0]["storageKey"], "news/a.png");
    assert!(value["authorId"].is_string());
    assert!(value["deletedAt"].is_null());
}

#[test]
fn test_document_hides_storage_key() {
    let document = Document {
        id: Uuid::new_v4(),
        title: "Budget".to_string(),
        description: None,
        category: "Finance".to_string(),
        file_url: "/uploads/docs/x.pdf".to_string(),
        file_type: "application/pdf".to_string(),
        storage_key: "docs/x.pdf".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let value = serde_json::to_value(&document).unwrap();
    assert!(value.get("storageKey").is_none());
    assert_eq!(value["fileUrl"], "/uploads/docs/x.pdf");
    assert_eq!(value["fileType"], "application/pdf");
}

#[test]
fn test_envelopes_and_pages() {
    let bare = serde_json::to_value(Envelope::data(1)).unwrap();
    assert!(bare.get("message").is_none());
    assert_eq!(bare["data"], 1);

    let page = Page::new(PageRequest::new(2, 3), 7, vec!["a"]);
    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["totalPages"], 3);
    assert_eq!(value["page"], 2);

    let reset = PasswordResetResponse {
        message: "ok".to_string(),
        new_password: "Xy7!abcdefgh".to_string(),
    };
    let value = serde_json::to_value(&reset).unwrap();
    assert_eq!(value["newPassword"], "Xy7!abcdefgh");
}

// --- Validation ---

#[test]
fn test_account_create_normalizes() {
    let draft = validation::create_account(&CreateAccountRequest {
        name: "  Selam ".to_string(),
        email: " Selam@Zone.Gov ".to_string(),
        password: "Str0ng!Pass".to_string(),
        role: "writer".to_string(),
    })
    .expect("payload is valid");

    assert_eq!(draft.name, "Selam");
    assert_eq!(draft.email, "selam@zone.gov");
    assert_eq!(draft.role, Role::Writer);
}

#[test]
fn test_account_update_only_checks_present_fields() {
    let patch = validation::update_account(&UpdateAccountRequest {
        active: Some(false),
        ..UpdateAccountRequest::default()
    })
    .expect("an active-only patch is valid");
    assert_eq!(patch.changes.active, Some(false));
    assert!(patch.changes.name.is_none());
    assert!(patch.password.is_none());

    let errors = validation::update_account(&UpdateAccountRequest {
        email: Some("broken".to_string()),
        password: Some("short".to_string()),
        ..UpdateAccountRequest::default()
    })
    .unwrap_err();
    assert_eq!(fields(errors), vec!["email", "password"]);
}

#[test]
fn test_article_fallback_modes() {
    let req = CreateArticleRequest {
        title: "T".to_string(),
        content: "C".to_string(),
        category: Some("nonsense".to_string()),
        language: Some("fr".to_string()),
    };

    let lenient = validation::create_article(&req, CategoryFallback::Default).unwrap();
    assert_eq!(lenient.category, Category::General);
    assert_eq!(lenient.language, None);

    let strict = validation::create_article(&req, CategoryFallback::Reject).unwrap_err();
    assert_eq!(fields(strict), vec!["category", "language"]);

    let absent = validation::create_article(
        &CreateArticleRequest {
            category: None,
            language: None,
            ..req.clone()
        },
        CategoryFallback::Reject,
    )
    .unwrap();
    assert_eq!(absent.category, Category::General);
}

#[test]
fn test_article_update_is_partial() {
    let changes = validation::update_article(
        &UpdateArticleRequest {
            language: Some("en".to_string()),
            ..UpdateArticleRequest::default()
        },
        CategoryFallback::Default,
    )
    .unwrap();
    assert_eq!(changes.language, Some(Language::En));
    assert!(changes.title.is_none());
    assert!(changes.category.is_none());
    assert!(changes.images.is_none());

    let errors = validation::update_article(
        &UpdateArticleRequest {
            title: Some(String::new()),
            ..UpdateArticleRequest::default()
        },
        CategoryFallback::Default,
    )
    .unwrap_err();
    assert_eq!(fields(errors), vec!["title"]);
}

#[test]
fn test_contact_requires_all_fields() {
    let errors = validation::create_contact(&CreateContactRequest::default()).unwrap_err();
    assert_eq!(
        fields(errors),
        vec!["email", "firstName", "lastName", "message", "subject"]
    );
}

#[test]
fn test_document_payloads() {
    let draft = validation::create_document(&CreateDocumentRequest {
        title: "Plan".to_string(),
        description: Some("   ".to_string()),
        category: " Planning ".to_string(),
    })
    .unwrap();
    assert_eq!(draft.category, "Planning");
    assert!(draft.description.is_none());

    let errors = validation::create_document(&CreateDocumentRequest {
        title: "x".repeat(256),
        ..CreateDocumentRequest::default()
    })
    .unwrap_err();
    assert_eq!(fields(errors), vec!["category", "title"]);

    let changes = validation::update_document(&UpdateDocumentRequest::default()).unwrap();
    assert!(changes.title.is_none() && changes.category.is_none() && changes.file.is_none());
    assert!(changes.description.is_none());

    let blank = validation::update_document(&UpdateDocumentRequest {
        description: Some("  ".to_string()),
        ..UpdateDocumentRequest::default()
    })
    .unwrap();
    assert_eq!(blank.description, Some(None));

    let text = validation::update_document(&UpdateDocumentRequest {
        description: Some(" Zoning map ".to_string()),
        ..UpdateDocumentRequest::default()
    })
    .unwrap();
    assert_eq!(text.description, Some(Some("Zoning map".to_string())));
}

#[test]
fn test_list_filters_are_strict() {
    assert_eq!(
        validation::category_filter(Some("weekly")).unwrap(),
        Some(Category::Weekly)
    );
    assert_eq!(validation::category_filter(Some("  ")).unwrap(), None);
    assert!(validation::category_filter(Some("sports")).is_err());
    assert_eq!(validation::language_filter(None).unwrap(), None);
    assert!(validation::language_filter(Some("fr")).is_err());
}
