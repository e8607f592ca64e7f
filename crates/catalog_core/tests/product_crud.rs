use catalog_core::db::open_db_in_memory;
use catalog_core::{
    ErrorKind, IdGenerator, NewProduct, ProductId, ProductLinks, ProductListQuery, ProductPatch,
    ProductRepository, ProductTag, ProductUrls, ProductUser, ProductValidationError, RepoError,
    SqliteProductRepository, DEFAULT_LIST_LIMIT,
};
use rusqlite::Connection;
use std::cell::Cell;
use std::collections::HashSet;

#[derive(Default)]
struct SequentialIds {
    next: Cell<u32>,
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> ProductId {
        let current = self.next.get();
        self.next.set(current + 1);
        format!("p{current:04}")
    }
}

#[test]
fn create_generates_unique_ids_when_absent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let mut ids = HashSet::new();
    for likes in 0..20 {
        let created = repo.create_product(new_product(likes, &[])).unwrap();
        assert!(!created.id.is_empty());
        ids.insert(created.id);
    }

    assert_eq!(ids.len(), 20);
}

#[test]
fn create_keeps_caller_supplied_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let mut fields = new_product(7, &["nature"]);
    fields.id = Some("Dwu85P9SOIk".to_string());
    let created = repo.create_product(fields).unwrap();

    assert_eq!(created.id, "Dwu85P9SOIk");
    assert_eq!(created.likes, 7);
    assert_eq!(created.tags, vec![ProductTag::new("nature")]);
}

#[test]
fn create_without_likes_fails_validation_and_persists_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let mut fields = new_product(1, &[]);
    fields.likes = None;
    let err = repo.create_product(fields).unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ProductValidationError::MissingField("likes"))
    ));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(repo
        .list_products(&ProductListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn create_reports_path_of_empty_nested_required_field() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let mut fields = new_product(1, &[]);
    fields.urls.as_mut().unwrap().thumb.clear();
    let err = repo.create_product(fields).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ProductValidationError::MissingField("urls.thumb"))
    ));

    let mut fields = new_product(1, &[]);
    fields.user.as_mut().unwrap().username.clear();
    let err = repo.create_product(fields).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ProductValidationError::MissingField("user.username"))
    ));
}

#[test]
fn create_rejects_tag_without_title() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let err = repo
        .create_product(new_product(1, &["city", ""]))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ProductValidationError::MissingTagTitle { index: 1 })
    ));
}

#[test]
fn create_rejects_malformed_explicit_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let mut fields = new_product(1, &[]);
    fields.id = Some("not a valid id".to_string());
    let err = repo.create_product(fields).unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ProductValidationError::InvalidId(_))
    ));
}

#[test]
fn create_with_duplicate_id_is_storage_error_and_keeps_original() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let mut first = new_product(1, &[]);
    first.id = Some("same-id".to_string());
    let original = repo.create_product(first).unwrap();

    let mut second = new_product(99, &[]);
    second.id = Some("same-id".to_string());
    let err = repo.create_product(second).unwrap_err();

    assert!(matches!(err, RepoError::DuplicateId(ref id) if id == "same-id"));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(repo.get_product("same-id").unwrap(), Some(original));
}

#[test]
fn get_after_create_returns_equal_product() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let created = repo
        .create_product(new_product(12, &["nature", "forest"]))
        .unwrap();
    let loaded = repo.get_product(&created.id).unwrap().unwrap();

    assert_eq!(loaded, created);
}

#[test]
fn get_unused_id_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    assert!(repo.get_product("never-created").unwrap().is_none());
}

#[test]
fn get_malformed_id_is_storage_error() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let err = repo.get_product("bad id!").unwrap_err();
    assert!(matches!(err, RepoError::InvalidId(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn list_orders_by_ascending_id() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    for likes in 0..10 {
        repo.create_product(new_product(likes, &[])).unwrap();
    }

    let listed: Vec<String> = repo
        .list_products(&ProductListQuery::default())
        .unwrap()
        .into_iter()
        .map(|product| product.id)
        .collect();
    let mut sorted = listed.clone();
    sorted.sort();

    assert_eq!(listed.len(), 10);
    assert_eq!(listed, sorted);
}

#[test]
fn list_applies_offset_then_limit() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::with_id_generator(&conn, SequentialIds::default()).unwrap();

    for likes in 0..10 {
        repo.create_product(new_product(likes, &[])).unwrap();
    }

    let page = repo.list_products(&ProductListQuery::page(5, 3)).unwrap();
    let ids: Vec<&str> = page.iter().map(|product| product.id.as_str()).collect();
    assert_eq!(ids, vec!["p0005", "p0006", "p0007"]);

    let tail = repo.list_products(&ProductListQuery::page(8, 5)).unwrap();
    assert_eq!(tail.len(), 2);

    let past_end = repo.list_products(&ProductListQuery::page(20, 5)).unwrap();
    assert!(past_end.is_empty());
}

#[test]
fn list_defaults_to_twenty_five_per_page() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    for likes in 0..30 {
        repo.create_product(new_product(likes, &[])).unwrap();
    }

    let unset = repo.list_products(&ProductListQuery::default()).unwrap();
    assert_eq!(unset.len(), DEFAULT_LIST_LIMIT as usize);

    let zero = repo.list_products(&ProductListQuery::page(0, 0)).unwrap();
    assert_eq!(zero.len(), DEFAULT_LIST_LIMIT as usize);
}

#[test]
fn list_by_tag_returns_only_exact_title_matches() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let a = repo.create_product(new_product(1, &["nature"])).unwrap();
    let _b = repo.create_product(new_product(2, &["city"])).unwrap();

    let nature = repo
        .list_products(&ProductListQuery::with_tag("nature"))
        .unwrap();
    assert_eq!(nature, vec![a]);

    let wrong_case = repo
        .list_products(&ProductListQuery::with_tag("Nature"))
        .unwrap();
    assert!(wrong_case.is_empty());

    let prefix = repo
        .list_products(&ProductListQuery::with_tag("natu"))
        .unwrap();
    assert!(prefix.is_empty());
}

#[test]
fn list_by_tag_keeps_id_order_and_pages_within_matches() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::with_id_generator(&conn, SequentialIds::default()).unwrap();

    for likes in 0..8 {
        let tags: &[&str] = if likes % 2 == 0 {
            &["city", "night"]
        } else {
            &["nature"]
        };
        repo.create_product(new_product(likes, tags)).unwrap();
    }

    let query = ProductListQuery {
        offset: 1,
        limit: Some(2),
        tag: Some("night".to_string()),
    };
    let ids: Vec<String> = repo
        .list_products(&query)
        .unwrap()
        .into_iter()
        .map(|product| product.id)
        .collect();

    assert_eq!(ids, vec!["p0002".to_string(), "p0004".to_string()]);
}

#[test]
fn edit_changes_only_the_given_field() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let created = repo.create_product(new_product(1, &["nature"])).unwrap();
    let change = ProductPatch {
        likes: Some(42),
        ..ProductPatch::default()
    };
    let edited = repo.edit_product(&created.id, change).unwrap();

    let mut expected = created.clone();
    expected.likes = 42;
    assert_eq!(edited, expected);
    assert_eq!(repo.get_product(&created.id).unwrap(), Some(expected));
}

#[test]
fn edit_replaces_nested_records_wholesale() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let mut fields = new_product(1, &["nature"]);
    fields.user.as_mut().unwrap().last_name = Some("Lovelace".to_string());
    let created = repo.create_product(fields).unwrap();

    let replacement = ProductUser {
        id: "u2".to_string(),
        first_name: "Grace".to_string(),
        last_name: None,
        portfolio_url: None,
        username: "grace".to_string(),
    };
    let change = ProductPatch {
        user: Some(replacement.clone()),
        tags: Some(Vec::new()),
        ..ProductPatch::default()
    };
    let edited = repo.edit_product(&created.id, change).unwrap();

    assert_eq!(edited.user, replacement);
    assert!(edited.tags.is_empty());
    assert_eq!(edited.urls, created.urls);
}

#[test]
fn edit_can_clear_optional_text() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let created = repo.create_product(new_product(1, &[])).unwrap();
    assert!(created.description.is_some());

    let change = ProductPatch {
        description: Some(None),
        alt_description: Some(Some("green hills".to_string())),
        ..ProductPatch::default()
    };
    let edited = repo.edit_product(&created.id, change).unwrap();

    assert_eq!(edited.description, None);
    assert_eq!(edited.alt_description.as_deref(), Some("green hills"));
}

#[test]
fn edit_unknown_id_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let err = repo
        .edit_product("missing", ProductPatch::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(ref id) if id == "missing"));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn edit_producing_invalid_record_fails_and_keeps_stored_state() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let created = repo.create_product(new_product(1, &[])).unwrap();
    let change = ProductPatch {
        links: Some(ProductLinks {
            self_link: String::new(),
            html: "https://example.com/p".to_string(),
        }),
        ..ProductPatch::default()
    };
    let err = repo.edit_product(&created.id, change).unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(ProductValidationError::MissingField("links.self"))
    ));
    assert_eq!(repo.get_product(&created.id).unwrap(), Some(created));
}

#[test]
fn edit_ignores_id_carried_by_json_patch() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let created = repo.create_product(new_product(1, &[])).unwrap();
    let change: ProductPatch =
        serde_json::from_value(serde_json::json!({ "id": "hijacked", "likes": 5 })).unwrap();
    let edited = repo.edit_product(&created.id, change).unwrap();

    assert_eq!(edited.id, created.id);
    assert_eq!(edited.likes, 5);
    assert!(repo.get_product("hijacked").unwrap().is_none());
}

#[test]
fn destroy_removes_product_and_is_zero_count_afterwards() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let created = repo.create_product(new_product(1, &[])).unwrap();

    let first = repo.destroy_product(&created.id).unwrap();
    assert_eq!(first.deleted_count, 1);
    assert!(first.deleted());
    assert!(repo.get_product(&created.id).unwrap().is_none());

    let second = repo.destroy_product(&created.id).unwrap();
    assert_eq!(second.deleted_count, 0);
    assert!(!second.deleted());
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteProductRepository::try_new(&conn).err().unwrap();

    assert!(matches!(err, RepoError::MissingRequiredTable("products")));
}

#[test]
fn read_rejects_document_that_violates_schema() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO products (id, document) VALUES ('broken', '{\"id\":\"broken\"}');",
        [],
    )
    .unwrap();
    let repo = SqliteProductRepository::try_new(&conn).unwrap();

    let err = repo.get_product("broken").unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert_eq!(err.kind(), ErrorKind::Storage);
}

fn new_product(likes: i64, tags: &[&str]) -> NewProduct {
    NewProduct {
        description: Some("Morning light".to_string()),
        likes: Some(likes),
        urls: Some(ProductUrls {
            regular: "https://images.example.com/regular.jpg".to_string(),
            small: "https://images.example.com/small.jpg".to_string(),
            thumb: "https://images.example.com/thumb.jpg".to_string(),
        }),
        links: Some(ProductLinks {
            self_link: "https://api.example.com/photos/1".to_string(),
            html: "https://example.com/photos/1".to_string(),
        }),
        user: Some(ProductUser {
            id: "u1".to_string(),
            first_name: "Ada".to_string(),
            last_name: None,
            portfolio_url: None,
            username: "ada".to_string(),
        }),
        tags: tags.iter().map(|title| ProductTag::new(*title)).collect(),
        ..NewProduct::default()
    }
}
