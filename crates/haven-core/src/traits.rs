use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;

/// Fetches a page body from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Document store that accepts one JSON document at a time, addressed by a
/// database name and a collection name.
pub trait DocumentStore: Send + Sync + Clone {
    /// Insert one document. Returns the generated UUID.
    fn insert(
        &self,
        database: &str,
        collection: &str,
        document: &serde_json::Value,
    ) -> impl Future<Output = Result<Uuid, AppError>> + Send;
}
