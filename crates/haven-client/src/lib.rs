pub mod fetcher;
pub mod page;
pub mod search;

pub use fetcher::ReqwestFetcher;
pub use page::{DownloadSummary, ListingPageDownloader, extract_injected_json, listing_url};
pub use search::{
    DumpSummary, SearchClient, SearchConfig, SearchCsvWriter, SearchDumper, SearchSource,
};
