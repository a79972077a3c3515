//! JSON-Lines import: one document per non-blank line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use haven_core::error::AppError;
use haven_core::traits::DocumentStore;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped_blank: usize,
}

/// Insert every line of `path` into `database_name`/`collection`.
///
/// Lines are inserted as they are read. An invalid line stops the import
/// with the documents before it already stored.
pub async fn import_jsonl<S: DocumentStore>(
    store: &S,
    path: &Path,
    database_name: &str,
    collection: &str,
) -> Result<ImportSummary, AppError> {
    let reader = BufReader::new(File::open(path)?);
    let mut summary = ImportSummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            summary.skipped_blank += 1;
            continue;
        }

        let document: Value = serde_json::from_str(&line).map_err(|e| {
            AppError::ParseError(format!("{}:{}: {e}", path.display(), index + 1))
        })?;
        store.insert(database_name, collection, &document).await?;
        summary.inserted += 1;
    }

    tracing::info!(
        inserted = summary.inserted,
        database = database_name,
        collection,
        "Data imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use haven_core::testutil::MockDocumentStore;
    use serde_json::json;

    fn write_lines(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn inserts_each_line_in_order() {
        let file = write_lines("{\"listing_id\":\"1\"}\n\n{\"listing_id\":\"2\",\"wifi\":[\"Wifi\"]}\n");
        let store = MockDocumentStore::new();

        let summary = import_jsonl(&store, file.path(), "airbnb", "listings").await.unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                inserted: 2,
                skipped_blank: 1,
            }
        );
        assert_eq!(
            store.documents(),
            vec![
                json!({"listing_id": "1"}),
                json!({"listing_id": "2", "wifi": ["Wifi"]})
            ]
        );
        let inserted = store.inserted.lock().unwrap();
        assert!(inserted.iter().all(|(db, coll, _)| db == "airbnb" && coll == "listings"));
    }

    #[tokio::test]
    async fn invalid_line_stops_import_with_position() {
        let file = write_lines("{\"listing_id\":\"1\"}\n{not json\n{\"listing_id\":\"3\"}\n");
        let store = MockDocumentStore::new();

        let err = import_jsonl(&store, file.path(), "airbnb", "listings").await.unwrap_err();

        assert!(matches!(err, AppError::ParseError(_)));
        assert!(err.to_string().contains(":2: "), "{err}");
        assert_eq!(store.documents(), vec![json!({"listing_id": "1"})]);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let file = write_lines("{\"listing_id\":\"1\"}\n");
        let store = MockDocumentStore::with_insert_error(AppError::DatabaseError("down".into()));

        let err = import_jsonl(&store, file.path(), "airbnb", "listings").await.unwrap_err();

        assert!(matches!(err, AppError::DatabaseError(_)));
        assert!(store.documents().is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let store = MockDocumentStore::new();
        let err = import_jsonl(&store, Path::new("/nonexistent/haven.jsonl"), "a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IoError(_)));
    }
}
