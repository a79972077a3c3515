pub mod config;
pub mod document_repository;
pub mod loader;

pub use config::DatabaseConfig;
pub use document_repository::{DocumentRepository, StoredDocument};
pub use loader::{ImportSummary, import_jsonl};
