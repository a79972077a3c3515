use std::io::Write;

use haven_db::import_jsonl;
use serde_json::json;

use crate::integration::common::TestDb;

#[tokio::test]
async fn insert_and_list_documents() {
    let db = TestDb::start().await;
    let repo = &db.repo;

    let first = repo
        .insert("airbnb", "listings", &json!({"listing_id": "1", "wifi": ["Wifi"]}))
        .await
        .unwrap();
    let second = repo
        .insert("airbnb", "listings", &json!({"listing_id": "2"}))
        .await
        .unwrap();
    assert_ne!(first, second);

    let docs = repo.list("airbnb", "listings", 10).await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, first);
    assert_eq!(docs[0].database_name, "airbnb");
    assert_eq!(docs[0].collection, "listings");
    assert_eq!(docs[0].payload, json!({"listing_id": "1", "wifi": ["Wifi"]}));

    let limited = repo.list("airbnb", "listings", 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn count_is_scoped_to_collection() {
    let db = TestDb::start().await;
    let repo = &db.repo;

    repo.insert("airbnb", "listings", &json!({"a": 1})).await.unwrap();
    repo.insert("airbnb", "listings", &json!({"a": 2})).await.unwrap();
    repo.insert("airbnb", "search", &json!({"a": 3})).await.unwrap();
    repo.insert("other", "listings", &json!({"a": 4})).await.unwrap();

    assert_eq!(repo.count("airbnb", "listings").await.unwrap(), 2);
    assert_eq!(repo.count("airbnb", "search").await.unwrap(), 1);
    assert_eq!(repo.count("other", "listings").await.unwrap(), 1);
    assert_eq!(repo.count("missing", "listings").await.unwrap(), 0);
}

#[tokio::test]
async fn import_file_into_postgres() {
    let db = TestDb::start().await;
    let repo = &db.repo;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"listing_id":"10","place_description":["Quiet %%% cabin"]}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"listing_id":"11"}}"#).unwrap();

    let summary = import_jsonl(repo, file.path(), "airbnb", "parsed").await.unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.skipped_blank, 1);
    assert_eq!(repo.count("airbnb", "parsed").await.unwrap(), 2);
    let docs = repo.list("airbnb", "parsed", 10).await.unwrap();
    assert_eq!(docs[1].payload, json!({"listing_id": "11"}));
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let db = TestDb::start().await;

    db.repo.migrate().await.unwrap();
    db.repo.insert("airbnb", "listings", &json!({})).await.unwrap();

    assert_eq!(db.repo.count("airbnb", "listings").await.unwrap(), 1);
}
