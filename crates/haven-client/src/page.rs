//! Listing page download: fetch `/rooms/<id>`, pull the injected bootstrap
//! JSON out of the page, and store it as `<id>.jsonl`.

use std::path::PathBuf;

use haven_core::audit::{FailureCategory, FailureLists};
use haven_core::error::AppError;
use haven_core::jsonl::{listing_file, write_single_line};
use haven_core::pacer::RequestPacer;
use haven_core::traits::Fetcher;
use scraper::{Html, Selector};
use serde_json::Value;

pub const LISTING_URL_BASE: &str = "https://www.airbnb.com/rooms/";

/// The script tag holding the page's data-injector payload.
pub const INJECTED_DATA_SELECTOR: &str = r#"script[data-injector-instances="true"][id="data-injector-instances"][type="application/json"]"#;

/// Extra attempts for a page whose fetch failed with a transient error.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

pub fn listing_url(listing_id: &str) -> String {
    format!("{LISTING_URL_BASE}{listing_id}")
}

/// Parse the injected bootstrap JSON out of a listing page.
///
/// `Ok(None)` means the page has no such script tag, which is what a
/// removed or unknown listing looks like.
pub fn extract_injected_json(html: &str) -> Result<Option<Value>, AppError> {
    let document = Html::parse_document(html);
    let selector =
        Selector::parse(INJECTED_DATA_SELECTOR).map_err(|e| AppError::ParseError(e.to_string()))?;

    let Some(script) = document.select(&selector).next() else {
        return Ok(None);
    };
    let text = script.text().collect::<String>();
    let value = serde_json::from_str(&text)
        .map_err(|e| AppError::ParseError(format!("injected JSON is invalid: {e}")))?;
    Ok(Some(value))
}

/// Outcome of one download run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub saved: usize,
    pub skipped: usize,
    /// Ids of listings that were not saved, by reason.
    pub failures: FailureLists,
}

impl Default for DownloadSummary {
    fn default() -> Self {
        Self {
            saved: 0,
            skipped: 0,
            failures: FailureLists::with_categories(&FailureCategory::DOWNLOAD),
        }
    }
}

impl DownloadSummary {
    pub fn failed(&self) -> usize {
        self.failures.count(FailureCategory::PageFailed)
    }

    pub fn missing_tag(&self) -> usize {
        self.failures.count(FailureCategory::NoScriptTag)
    }

    pub fn total(&self) -> usize {
        self.saved + self.skipped + self.failed() + self.missing_tag()
    }
}

/// Downloads listing pages one at a time into `<output_dir>/<id>.jsonl`.
///
/// Listings that already have a file are skipped, so an interrupted run can
/// simply be restarted. Transient fetch errors are retried up to
/// `max_retries` times; any other failure, or a page without the data
/// script, is logged and the run moves on.
pub struct ListingPageDownloader<F: Fetcher> {
    fetcher: F,
    output_dir: PathBuf,
    pacer: RequestPacer,
    max_retries: u32,
}

impl<F: Fetcher> ListingPageDownloader<F> {
    pub fn new(fetcher: F, output_dir: impl Into<PathBuf>, pacer: RequestPacer) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            pacer,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub async fn download_all(&mut self, listing_ids: &[String]) -> Result<DownloadSummary, AppError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut summary = DownloadSummary::default();
        let total = listing_ids.len();

        for (count, listing_id) in listing_ids.iter().enumerate() {
            tracing::info!(%listing_id, "Starting ({}/{})", count + 1, total);

            let path = listing_file(&self.output_dir, listing_id);
            if path.exists() {
                tracing::info!(%listing_id, "Already downloaded");
                summary.skipped += 1;
                continue;
            }

            let html = match self.fetch_with_retry(listing_id).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::error!(%listing_id, error = %e, "Failed to fetch listing page");
                    summary.failures.record(FailureCategory::PageFailed, listing_id);
                    continue;
                }
            };

            match extract_injected_json(&html) {
                Ok(Some(json)) => {
                    write_single_line(&path, &json)?;
                    tracing::info!(%listing_id, path = %path.display(), "Saved");
                    summary.saved += 1;
                }
                Ok(None) => {
                    tracing::error!(%listing_id, "No matching script tag found");
                    summary.failures.record(FailureCategory::NoScriptTag, listing_id);
                }
                Err(e) => {
                    tracing::error!(%listing_id, error = %e, "Could not parse listing page");
                    summary.failures.record(FailureCategory::PageFailed, listing_id);
                }
            }
        }

        Ok(summary)
    }

    async fn fetch_with_retry(&mut self, listing_id: &str) -> Result<String, AppError> {
        let url = listing_url(listing_id);
        let mut attempt = 0;
        loop {
            self.pacer.wait().await;
            match self.fetcher.fetch(&url).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(%listing_id, error = %e, attempt, "Retrying listing page");
                }
                result => return result,
            }
        }
    }
}
