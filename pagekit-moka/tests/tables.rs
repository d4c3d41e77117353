//! Tests for table bookkeeping in the Moka backend.

use pagekit_backend::{Backend, BackendError};
use pagekit_core::{CacheEntry, LISTS_EXPIRE_TABLE, ListExpiry, Payload};
use pagekit_moka::MokaBackend;
use serde_json::json;

#[tokio::test]
async fn test_entry_roundtrip() {
    let backend = MokaBackend::builder().table("entries").build();
    let entry = CacheEntry::new("/api/x/", Payload::Json(json!({"v": 1})), 1_000);

    backend.write_entry("entries", entry.clone()).await.unwrap();

    let read = backend.read_entry("entries", "/api/x/").await.unwrap();
    assert_eq!(read, Some(entry));
    assert_eq!(backend.read_entry("entries", "/api/y/").await.unwrap(), None);
}

#[tokio::test]
async fn test_undeclared_table_is_an_error() {
    let backend = MokaBackend::builder().table("entries").build();

    let err = backend.read_entry("missing", "key").await.unwrap_err();
    assert!(matches!(err, BackendError::MissingTable(ref name) if name == "missing"));
    assert!(!backend.has_table("missing"));
}

#[tokio::test]
async fn test_replace_list_overwrites_rows_and_expiry() {
    let backend = MokaBackend::request_db(["countries"]);

    backend
        .replace_list(
            "countries",
            ListExpiry::new("countries", 100),
            vec![json!({"id": 1}), json!({"id": 2})],
        )
        .await
        .unwrap();
    backend
        .replace_list("countries", ListExpiry::new("countries", 200), vec![json!({"id": 3})])
        .await
        .unwrap();

    assert_eq!(
        backend.read_list("countries").await.unwrap(),
        vec![json!({"id": 3})]
    );
    assert_eq!(
        backend.read_list_expiry("countries").await.unwrap(),
        Some(ListExpiry::new("countries", 200))
    );
}

#[tokio::test]
async fn test_replace_list_into_undeclared_table_changes_nothing() {
    let backend = MokaBackend::request_db(Vec::<&str>::new());

    let err = backend
        .replace_list("countries", ListExpiry::new("countries", 100), vec![json!(1)])
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::MissingTable(_)));
    assert!(backend.has_table(LISTS_EXPIRE_TABLE));
    assert_eq!(backend.read_list_expiry("countries").await.unwrap(), None);
}

#[tokio::test]
async fn test_empty_list_table_reads_no_rows() {
    let backend = MokaBackend::request_db(["countries"]);
    assert!(backend.read_list("countries").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clear_empties_every_table() {
    let backend = MokaBackend::request_db(["countries"]);
    backend
        .write_entry("ajaxDefaultDataTable", CacheEntry::new("k", Payload::Text("v".into()), 10))
        .await
        .unwrap();
    backend
        .replace_list("countries", ListExpiry::new("countries", 10), vec![json!(1)])
        .await
        .unwrap();

    backend.clear().await.unwrap();

    assert_eq!(backend.read_entry("ajaxDefaultDataTable", "k").await.unwrap(), None);
    assert_eq!(backend.read_list_expiry("countries").await.unwrap(), None);
    assert!(backend.read_list("countries").await.unwrap().is_empty());
}

#[test]
fn test_backend_names() {
    assert_eq!(MokaBackend::request_db(["a"]).name(), "request-db");
    assert_eq!(MokaBackend::shared_db().name(), "shared-db");
    assert_eq!(MokaBackend::builder().build().name(), "moka");
}
