use std::time::Duration;

use haven_core::error::AppError;
use haven_core::traits::Fetcher;
use reqwest::Client;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; Haven/0.1; +listing-research)";

/// HTTP fetcher using reqwest.
///
/// Downloads page bodies with a fixed User-Agent and timeout. Any non-2xx
/// status is an [`AppError::HttpError`] carrying the status code.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))
    }
}

/// Map a transport error onto the matching [`AppError`] variant.
pub(crate) fn classify(error: reqwest::Error, timeout_secs: u64) -> AppError {
    if error.is_timeout() {
        AppError::Timeout(timeout_secs)
    } else if error.is_connect() {
        AppError::NetworkError(format!("Connection failed: {error}"))
    } else {
        AppError::HttpError(error.to_string())
    }
}
