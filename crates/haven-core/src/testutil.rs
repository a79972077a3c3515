//! Test utilities: mock implementations of the core traits and listing
//! document fixtures.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use uuid::Uuid;

use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::AppError;
use crate::traits::{DocumentStore, Fetcher};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns queued responses and records requested URLs.
#[derive(Clone, Default)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a page without the injected data script.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockDocumentStore
// ---------------------------------------------------------------------------

/// Mock document store that records inserts.
#[derive(Clone, Default)]
pub struct MockDocumentStore {
    pub inserted: Arc<Mutex<Vec<(String, String, Value)>>>,
    insert_error: Arc<Mutex<Option<AppError>>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose next insert fails with `error`.
    pub fn with_insert_error(error: AppError) -> Self {
        Self {
            inserted: Arc::new(Mutex::new(Vec::new())),
            insert_error: Arc::new(Mutex::new(Some(error))),
        }
    }

    pub fn documents(&self) -> Vec<Value> {
        self.inserted
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, doc)| doc.clone())
            .collect()
    }
}

impl DocumentStore for MockDocumentStore {
    async fn insert(
        &self,
        database: &str,
        collection: &str,
        document: &Value,
    ) -> Result<Uuid, AppError> {
        if let Some(e) = self.insert_error.lock().unwrap().take() {
            return Err(e);
        }
        self.inserted.lock().unwrap().push((
            database.to_string(),
            collection.to_string(),
            document.clone(),
        ));
        Ok(Uuid::new_v4())
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Diagnostics sink that keeps everything it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }

    pub fn has_kind(&self, kind: DiagnosticKind) -> bool {
        self.count_kind(kind) > 0
    }

    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    pub fn find_kind(&self, kind: DiagnosticKind) -> Option<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.kind == kind)
            .cloned()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().unwrap().push(diagnostic);
    }
}

// ---------------------------------------------------------------------------
// Listing document fixtures
// ---------------------------------------------------------------------------

/// Wrap a presentation object in the page bootstrap structure, as read back
/// from a `<listing_id>.jsonl` file.
pub fn wrap_presentation(presentation: Value) -> Value {
    json!([{
        "root > core-guest-spa": [
            ["FlashMessages", {}],
            ["GuestSpa", {
                "niobeMinimalClientData": [
                    ["StaysPdpSections", {"variables": {}}],
                    ["StaysPdpSections:{\"id\":\"1\"}", {
                        "data": {"presentation": presentation}
                    }]
                ]
            }]
        ]
    }])
}

/// Presentation whose section list is `sections`.
pub fn presentation_with_sections(sections: Vec<Value>) -> Value {
    json!({
        "__typename": "RootPresentationContainer",
        "stayProductDetailPage": {
            "sections": {"sections": sections}
        }
    })
}

/// A complete raw document with house rules, amenities and descriptions,
/// plus unrelated sections around them.
pub fn full_listing_document() -> Value {
    wrap_presentation(presentation_with_sections(vec![
        json!({"sectionId": "TITLE_DEFAULT", "section": {"__typename": "PdpTitleSection", "title": "Cabin"}}),
        json!({
            "sectionId": "POLICIES_DEFAULT",
            "section": {
                "__typename": "PoliciesSection",
                "houseRulesSections": [
                    {"title": "Checking in and out", "items": [
                        {"title": "Check-in after 4:00 PM"},
                        {"title": "Checkout before 11:00 AM"}
                    ]},
                    {"title": "During your stay", "items": [
                        {"title": "2 guests maximum"},
                        {"title": "Additional rules", "html": {"htmlText": "Please remove shoes.\nLights off at 11."}}
                    ]}
                ]
            }
        }),
        json!({
            "sectionId": "AMENITIES_DEFAULT",
            "section": {
                "__typename": "AmenitiesSection",
                "seeAllAmenitiesGroups": [
                    {"title": "Bathroom", "amenities": [{"title": "Hair dryer"}, {"title": "Hot water"}]},
                    {"title": "Internet and office", "amenities": [{"title": "Wifi"}]}
                ]
            }
        }),
        json!({
            "sectionId": "DESCRIPTION_MODAL",
            "section": {
                "__typename": "PdpDescriptionSection",
                "items": [
                    {"html": {"htmlText": "A quiet cabin by the river."}},
                    {"title": "The space", "html": {"htmlText": "One bedroom.\nWood stove."}}
                ]
            }
        }),
    ]))
}
