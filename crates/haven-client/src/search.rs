//! Search API dump: page through the geo-search endpoint, keep each listing
//! once, and append flattened rows to a CSV file.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use haven_core::error::AppError;
use haven_core::models::{SearchRecord, plain_string};
use haven_core::navigate::get_array;
use haven_core::pacer::{RequestPacer, SEARCH_REQUEST_INTERVAL};
use haven_core::path;
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::fetcher::classify;

pub const DEFAULT_API_HOST: &str = "airbnb13.p.rapidapi.com";
pub const DEFAULT_BASE_URL: &str = "https://airbnb13.p.rapidapi.com/search-geo";

/// Query and credentials for one search dump.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: String,
    pub api_host: String,
    pub base_url: String,
    pub location: String,
    pub checkin: String,
    pub checkout: String,
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub pets: u32,
    pub currency: String,
    /// Minimum pause between two page requests.
    pub cooldown: Duration,
}

impl SearchConfig {
    pub fn new(
        api_key: impl Into<String>,
        location: impl Into<String>,
        checkin: impl Into<String>,
        checkout: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            location: location.into(),
            checkin: checkin.into(),
            checkout: checkout.into(),
            adults: 1,
            children: 0,
            infants: 0,
            pets: 0,
            currency: "CAD".to_string(),
            cooldown: SEARCH_REQUEST_INTERVAL,
        }
    }

    /// `airbnb_results_<checkin>_<checkout>.csv`
    pub fn default_csv_name(&self) -> String {
        format!("airbnb_results_{}_{}.csv", self.checkin, self.checkout)
    }

    pub fn page_url(&self, page: u32) -> Result<Url, AppError> {
        let params = [
            ("location", self.location.clone()),
            ("checkin", self.checkin.clone()),
            ("checkout", self.checkout.clone()),
            ("adults", self.adults.to_string()),
            ("children", self.children.to_string()),
            ("infants", self.infants.to_string()),
            ("pets", self.pets.to_string()),
            ("page", page.to_string()),
            ("currency", self.currency.clone()),
        ];
        Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| AppError::ConfigError(format!("Invalid search base URL: {e}")))
    }
}

/// Source of search result pages. Page numbers start at 1.
pub trait SearchSource: Send + Sync {
    fn fetch_page(&self, page: u32) -> impl Future<Output = Result<Vec<Value>, AppError>> + Send;
}

/// Search API client over reqwest.
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    config: SearchConfig,
    timeout_secs: u64,
}

impl SearchClient {
    pub fn new(config: SearchConfig) -> Result<Self, AppError> {
        if config.api_key.is_empty() {
            return Err(AppError::ConfigError("search API key is empty".into()));
        }
        let timeout = Duration::from_secs(60);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        Ok(Self {
            client,
            config,
            timeout_secs: timeout.as_secs(),
        })
    }
}

impl SearchSource for SearchClient {
    async fn fetch_page(&self, page: u32) -> Result<Vec<Value>, AppError> {
        let url = self.config.page_url(page)?;
        let response = self
            .client
            .get(url)
            .header("x-rapidapi-key", &self.config.api_key)
            .header("x-rapidapi-host", &self.config.api_host)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| classify(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::ParseError(format!("search response is not JSON: {e}")))?;
        Ok(results_of(&body))
    }
}

/// The `results` array of a search response; missing means no results.
pub fn results_of(body: &Value) -> Vec<Value> {
    get_array(body, &path!["results"]).to_vec()
}

/// Appends [`SearchRecord`] rows to a CSV file. The header row is written
/// only when the file starts out empty.
pub struct SearchCsvWriter {
    writer: csv::Writer<File>,
}

impl SearchCsvWriter {
    pub fn append(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_empty = file.metadata()?.len() == 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(is_empty)
            .from_writer(file);
        Ok(Self { writer })
    }

    pub fn write(&mut self, record: &SearchRecord) -> Result<(), AppError> {
        self.writer.serialize(record)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), AppError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub pages: u32,
    pub records: usize,
}

/// Pages through a [`SearchSource`] until a page is empty or brings no
/// listing that has not been seen before.
pub struct SearchDumper<S: SearchSource> {
    source: S,
    pacer: RequestPacer,
}

impl<S: SearchSource> SearchDumper<S> {
    pub fn new(source: S, pacer: RequestPacer) -> Self {
        Self { source, pacer }
    }

    pub async fn run(&mut self, writer: &mut SearchCsvWriter) -> Result<DumpSummary, AppError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut summary = DumpSummary::default();
        let mut page = 1;

        loop {
            self.pacer.wait().await;
            tracing::info!(page, "Fetching page");
            let results = self.source.fetch_page(page).await?;
            if results.is_empty() {
                tracing::info!(page, "Empty page. Stopping.");
                break;
            }

            let fresh: Vec<&Value> = results
                .iter()
                .filter(|result| match result.get("id").map(plain_string) {
                    Some(id) if !id.is_empty() => seen.insert(id),
                    _ => {
                        tracing::warn!(page, "Search result without id skipped");
                        false
                    }
                })
                .collect();

            if fresh.is_empty() {
                tracing::info!(page, "Duplicate results detected. Stopping.");
                break;
            }

            for result in &fresh {
                writer.write(&SearchRecord::from_result(result))?;
            }
            writer.flush()?;

            summary.pages += 1;
            summary.records += fresh.len();
            tracing::info!(page, new = fresh.len(), total = summary.records, "Page saved");
            page += 1;
        }

        tracing::info!(pages = summary.pages, records = summary.records, "Data collection completed");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use serde_json::json;

    #[derive(Clone, Default)]
    struct FakeSource {
        pages: Arc<Mutex<Vec<Result<Vec<Value>, AppError>>>>,
        requested: Arc<Mutex<Vec<u32>>>,
    }

    impl FakeSource {
        fn new(pages: Vec<Result<Vec<Value>, AppError>>) -> Self {
            Self {
                pages: Arc::new(Mutex::new(pages)),
                requested: Arc::default(),
            }
        }
    }

    impl SearchSource for FakeSource {
        async fn fetch_page(&self, page: u32) -> Result<Vec<Value>, AppError> {
            self.requested.lock().unwrap().push(page);
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                Ok(Vec::new())
            } else {
                pages.remove(0)
            }
        }
    }

    fn listing(id: u64) -> Value {
        json!({"id": id.to_string(), "name": format!("Listing {id}"), "price": {"currency": "CAD", "rate": 100}})
    }

    #[test]
    fn page_url_carries_query() {
        let config = SearchConfig::new("key", "Squamish, BC, Canada", "2024-07-01", "2024-07-04");
        let url = config.page_url(3).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("location".into(), "Squamish, BC, Canada".into())));
        assert!(pairs.contains(&("page".into(), "3".into())));
        assert!(pairs.contains(&("currency".into(), "CAD".into())));
        assert_eq!(url.host_str(), Some(DEFAULT_API_HOST));
        assert_eq!(config.default_csv_name(), "airbnb_results_2024-07-01_2024-07-04.csv");
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let config = SearchConfig::new("", "Squamish", "2024-07-01", "2024-07-04");
        assert!(matches!(SearchClient::new(config), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn results_default_to_empty() {
        assert!(results_of(&json!({"error": false})).is_empty());
        assert_eq!(results_of(&json!({"results": [1, 2]})).len(), 2);
    }

    #[tokio::test]
    async fn stops_on_page_of_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("dump.csv");
        let source = FakeSource::new(vec![
            Ok(vec![listing(1), listing(2)]),
            Ok(vec![listing(2), listing(3), listing(3)]),
            Ok(vec![listing(1), listing(3)]),
            Ok(vec![listing(4)]),
        ]);
        let mut writer = SearchCsvWriter::append(&csv_path).unwrap();
        let mut dumper = SearchDumper::new(source.clone(), RequestPacer::unpaced());

        let summary = dumper.run(&mut writer).await.unwrap();
        drop(writer);

        assert_eq!(summary, DumpSummary { pages: 2, records: 3 });
        assert_eq!(*source.requested.lock().unwrap(), vec![1, 2, 3]);

        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.headers().unwrap().len(), 25);
        assert_eq!(&reader.headers().unwrap()[1], "userId");
        let ids: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![Ok(vec![listing(1)]), Ok(Vec::new())]);
        let mut writer = SearchCsvWriter::append(dir.path().join("dump.csv")).unwrap();
        let mut dumper = SearchDumper::new(source, RequestPacer::unpaced());

        let summary = dumper.run(&mut writer).await.unwrap();

        assert_eq!(summary, DumpSummary { pages: 1, records: 1 });
    }

    #[tokio::test]
    async fn api_error_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![Err(AppError::ApiError {
            status: 403,
            message: "You are not subscribed to this API.".into(),
        })]);
        let mut writer = SearchCsvWriter::append(dir.path().join("dump.csv")).unwrap();
        let mut dumper = SearchDumper::new(source, RequestPacer::unpaced());

        let err = dumper.run(&mut writer).await.unwrap_err();

        assert!(matches!(err, AppError::ApiError { status: 403, .. }));
    }

    #[tokio::test]
    async fn header_written_once_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("dump.csv");

        for id in [1, 2] {
            let mut writer = SearchCsvWriter::append(&csv_path).unwrap();
            let mut dumper = SearchDumper::new(
                FakeSource::new(vec![Ok(vec![listing(id)])]),
                RequestPacer::unpaced(),
            );
            dumper.run(&mut writer).await.unwrap();
        }

        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content.matches("userId").count(), 1);
        assert_eq!(content.lines().count(), 3);
    }
}
