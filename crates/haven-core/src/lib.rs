//! Core types, traits, and the listing extractor for Haven.

pub mod audit;
pub mod diagnostics;
pub mod error;
pub mod extract;
pub mod jsonl;
pub mod listing_ids;
pub mod models;
pub mod navigate;
pub mod pacer;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use audit::{AuditSink, FailureCategory, FailureLists};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity, TracingSink};
pub use error::AppError;
pub use extract::{ListingExtractor, extract};
pub use models::{FieldMap, FieldValue, ParsedListing, SearchRecord};
pub use traits::{DocumentStore, Fetcher};
