//! Fixed-interval request pacing for polite sequential fetching.
//!
//! Listing pages are fetched with a short pause between requests; the
//! search API's free tier allows one request per minute. Both go through a
//! [`RequestPacer`], which sleeps just long enough that consecutive calls
//! are at least `interval` apart.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use haven_core::pacer::RequestPacer;
//!
//! # async fn run() {
//! let mut pacer = RequestPacer::new(Duration::from_millis(200));
//! for id in ["1", "2", "3"] {
//!     pacer.wait().await;
//!     println!("fetching {id}");
//! }
//! # }
//! ```

use std::time::Duration;

use tokio::time::Instant;

/// Pause after a listing page request.
pub const PAGE_REQUEST_INTERVAL: Duration = Duration::from_millis(200);

/// Pause between search API pages.
pub const SEARCH_REQUEST_INTERVAL: Duration = Duration::from_secs(61);

#[derive(Debug, Clone)]
pub struct RequestPacer {
    interval: Duration,
    last: Option<Instant>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Pacer that never sleeps.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Time left before the next request may go out.
    pub fn remaining(&self) -> Duration {
        match self.last {
            Some(last) => self.interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Sleep until `interval` has passed since the previous call, then
    /// record now as the latest request.
    pub async fn wait(&mut self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            tracing::debug!(sleep_ms = %remaining.as_millis(), "Pacing request");
            tokio::time::sleep(remaining).await;
        }
        self.last = Some(Instant::now());
    }
}
