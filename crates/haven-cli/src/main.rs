use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use haven_client::page::DEFAULT_MAX_RETRIES;
use haven_client::{
    ListingPageDownloader, ReqwestFetcher, SearchClient, SearchConfig, SearchCsvWriter,
    SearchDumper,
};
use haven_core::jsonl::{JsonlWriter, listing_files, listing_id_from_path, read_listing_document};
use haven_core::listing_ids::read_listing_ids;
use haven_core::pacer::{PAGE_REQUEST_INTERVAL, RequestPacer, SEARCH_REQUEST_INTERVAL};
use haven_core::{AuditSink, DiagnosticSink, FailureCategory, ListingExtractor, TracingSink};
use haven_db::{DatabaseConfig, DocumentRepository, import_jsonl};

const OUTPUT_PREFIX: &str = "description_amenities_house_rules";

#[derive(Parser)]
#[command(name = "haven", version, about = "Airbnb listing collection and extraction")]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true, env = "HAVEN_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump search API results for a location and date range to CSV
    DumpSearch {
        /// Free-text location, e.g. "Squamish, BC, Canada"
        #[arg(short, long)]
        location: String,

        /// Check-in date (YYYY-MM-DD)
        #[arg(long)]
        checkin: String,

        /// Check-out date (YYYY-MM-DD)
        #[arg(long)]
        checkout: String,

        #[arg(long, default_value = "CAD")]
        currency: String,

        #[arg(long, default_value_t = 1)]
        adults: u32,

        /// RapidAPI key
        #[arg(long, env = "RAPIDAPI_KEY", hide_env_values = true)]
        api_key: String,

        /// Seconds to wait between page requests
        #[arg(long, default_value_t = SEARCH_REQUEST_INTERVAL.as_secs())]
        cooldown_secs: u64,

        /// Output CSV (defaults to airbnb_results_<checkin>_<checkout>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download listing pages for the ids in a CSV file
    Download {
        /// CSV file with an `id` column
        #[arg(short, long)]
        ids: PathBuf,

        /// Directory receiving <listing_id>.jsonl files and failure lists
        #[arg(short, long, env = "HAVEN_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Milliseconds to wait between page requests
        #[arg(long, default_value_t = PAGE_REQUEST_INTERVAL.as_millis() as u64)]
        delay_ms: u64,

        /// Extra attempts for a page after a timeout, network error or 5xx
        #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
        max_retries: u32,
    },

    /// Extract house rules, amenities and descriptions from downloaded pages
    Parse {
        /// Directory holding <listing_id>.jsonl files
        #[arg(short, long, env = "HAVEN_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Directory receiving the timestamped output file and failure lists
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,
    },

    /// Import a JSON-Lines file into the document store (requires DATABASE_URL)
    Import {
        /// JSON-Lines file to import
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, default_value = "airbnb")]
        db_name: String,

        #[arg(short, long)]
        collection: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    // Dropping the guard flushes buffered file logs
    let _guard = init_tracing(cli.log_file.as_deref())?;

    match cli.command {
        Commands::DumpSearch {
            location,
            checkin,
            checkout,
            currency,
            adults,
            api_key,
            cooldown_secs,
            output,
        } => {
            let mut config = SearchConfig::new(api_key, location, checkin, checkout);
            config.currency = currency;
            config.adults = adults;
            config.cooldown = Duration::from_secs(cooldown_secs);
            let output = output.unwrap_or_else(|| PathBuf::from(config.default_csv_name()));
            cmd_dump_search(config, &output).await?;
        }
        Commands::Download {
            ids,
            data_dir,
            delay_ms,
            max_retries,
        } => {
            cmd_download(&ids, &data_dir, Duration::from_millis(delay_ms), max_retries).await?;
        }
        Commands::Parse {
            data_dir,
            output_dir,
        } => {
            cmd_parse(&data_dir, &output_dir)?;
        }
        Commands::Import {
            file,
            db_name,
            collection,
        } => {
            cmd_import(&file, &db_name, &collection).await?;
        }
    }

    Ok(())
}

/// stderr logging filtered by `RUST_LOG` (default `haven=info`), plus an
/// optional plain-text copy appended to `log_file` from a background writer.
///
/// The returned guard must stay alive until exit.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file has no file name: {}", path.display()))?;
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("haven=info".parse()?))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();
    Ok(guard)
}

async fn cmd_dump_search(config: SearchConfig, output: &Path) -> Result<()> {
    let pacer = RequestPacer::new(config.cooldown);
    let client = SearchClient::new(config).context("Failed to create search client")?;
    let mut writer = SearchCsvWriter::append(output)
        .with_context(|| format!("Failed to open CSV: {}", output.display()))?;

    let summary = SearchDumper::new(client, pacer)
        .run(&mut writer)
        .await
        .context("Search dump failed")?;

    println!(
        "Saved {} listings from {} pages to {}",
        summary.records,
        summary.pages,
        output.display()
    );
    Ok(())
}

async fn cmd_download(
    ids: &Path,
    data_dir: &Path,
    delay: Duration,
    max_retries: u32,
) -> Result<()> {
    let listing_ids = read_listing_ids(ids)
        .with_context(|| format!("Failed to read listing ids: {}", ids.display()))?;
    tracing::info!(count = listing_ids.len(), "Listing ids loaded");

    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let mut downloader = ListingPageDownloader::new(fetcher, data_dir, RequestPacer::new(delay))
        .with_max_retries(max_retries);
    let summary = downloader.download_all(&listing_ids).await?;
    summary
        .failures
        .write_to(data_dir)
        .context("Failed to write failure lists")?;

    println!(
        "Processed {} listings: {} downloaded, {} already present, {} failed, {} without data",
        summary.total(),
        summary.saved,
        summary.skipped,
        summary.failed(),
        summary.missing_tag()
    );
    Ok(())
}

fn cmd_parse(data_dir: &Path, output_dir: &Path) -> Result<()> {
    let output = output_dir.join(output_file_name(chrono::Local::now()));
    let extractor = ListingExtractor::with_sink(AuditSink::new(TracingSink));
    let summary = parse_directory(&extractor, data_dir, &output)?;
    extractor
        .sink()
        .failures()
        .write_to(output_dir)
        .context("Failed to write failure lists")?;

    tracing::info!(
        parsed = summary.parsed,
        unreadable = summary.unreadable,
        output = %output.display(),
        "Parsing complete"
    );
    Ok(())
}

async fn cmd_import(file: &Path, db_name: &str, collection: &str) -> Result<()> {
    let config = DatabaseConfig::from_env()?;
    let repo = DocumentRepository::connect(&config)
        .await
        .context("Failed to connect to database")?;
    repo.migrate().await?;

    let summary = import_jsonl(&repo, file, db_name, collection)
        .await
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!(
        "Imported {} documents into {}/{}",
        summary.inserted, db_name, collection
    );
    Ok(())
}

/// `description_amenities_house_rules_<YYYYmmdd_HHMMSS>.jsonl`
fn output_file_name<Tz: chrono::TimeZone>(now: chrono::DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{OUTPUT_PREFIX}_{}.jsonl", now.format("%Y%m%d_%H%M%S"))
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ParseSummary {
    parsed: usize,
    unreadable: usize,
}

/// Extract every `<listing_id>.jsonl` in `data_dir` into one output file.
///
/// A file that cannot be read is logged, recorded as a failure and skipped.
fn parse_directory<S: DiagnosticSink>(
    extractor: &ListingExtractor<AuditSink<S>>,
    data_dir: &Path,
    output: &Path,
) -> Result<ParseSummary> {
    let files = listing_files(data_dir)
        .with_context(|| format!("Failed to list {}", data_dir.display()))?;
    let mut writer = JsonlWriter::append(output)
        .with_context(|| format!("Failed to open output: {}", output.display()))?;
    let mut summary = ParseSummary::default();

    for (count, path) in files.iter().enumerate() {
        let Some(listing_id) = listing_id_from_path(path) else {
            continue;
        };
        tracing::info!(%listing_id, "Parsing ({}/{})", count + 1, files.len());

        let document = match read_listing_document(path) {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(%listing_id, error = %e, "Unreadable listing file");
                extractor
                    .sink()
                    .record(FailureCategory::UnreadableFile, &listing_id);
                summary.unreadable += 1;
                continue;
            }
        };

        let listing = extractor.extract(&document, &listing_id);
        writer.write_record(&listing)?;
    }

    summary.parsed = writer.written();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use haven_core::jsonl::{listing_file, read_jsonl, write_single_line};
    use haven_core::testutil::{RecordingSink, full_listing_document};
    use serde_json::json;

    #[test]
    fn output_name_is_timestamped() {
        let now = chrono::Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            output_file_name(now),
            "description_amenities_house_rules_20240309_070501.jsonl"
        );
    }

    #[test]
    fn parse_directory_writes_one_line_per_readable_file() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let document = full_listing_document();
        let first_line = document.as_array().unwrap()[0].clone();
        write_single_line(&listing_file(data.path(), "101"), &first_line).unwrap();
        write_single_line(&listing_file(data.path(), "102"), &json!({"unrelated": true})).unwrap();
        std::fs::write(listing_file(data.path(), "103"), "{truncated\n").unwrap();
        std::fs::write(data.path().join("notes.txt"), "ignored").unwrap();

        let output = out.path().join("parsed.jsonl");
        let extractor = ListingExtractor::with_sink(AuditSink::new(RecordingSink::new()));
        let summary = parse_directory(&extractor, data.path(), &output).unwrap();

        assert_eq!(
            summary,
            ParseSummary {
                parsed: 2,
                unreadable: 1,
            }
        );

        let records = read_jsonl(&output).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["listing_id"], "101");
        assert_eq!(records[0]["internet_and_office_amenities"], json!(["Wifi"]));
        assert_eq!(records[1], json!({"listing_id": "102"}));
    }

    #[test]
    fn parse_records_failed_ids_per_category() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        let document = full_listing_document();
        let first_line = document.as_array().unwrap()[0].clone();
        write_single_line(&listing_file(data.path(), "101"), &first_line).unwrap();
        write_single_line(&listing_file(data.path(), "102"), &json!({"unrelated": true})).unwrap();
        std::fs::write(listing_file(data.path(), "103"), "{truncated\n").unwrap();

        let extractor = ListingExtractor::with_sink(AuditSink::new(RecordingSink::new()));
        parse_directory(&extractor, data.path(), &out.path().join("parsed.jsonl")).unwrap();
        extractor.sink().failures().write_to(out.path()).unwrap();

        let list = |name: &str| read_jsonl(&out.path().join(name)).unwrap();
        assert_eq!(list("cannot_get_presentation_list.txt"), vec![json!(["102"])]);
        assert_eq!(list("unreadable_listing_file_list.txt"), vec![json!(["103"])]);
        assert_eq!(list("cannot_get_selected_sections_list.txt"), vec![json!([])]);
        assert_eq!(
            list("cannot_get_item_from_selected_section_list.txt"),
            vec![json!([])]
        );
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "haven",
            "dump-search",
            "--location",
            "Squamish",
            "--checkin",
            "2024-07-01",
            "--checkout",
            "2024-07-04",
            "--api-key",
            "k",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::DumpSearch { cooldown_secs: 61, adults: 1, .. }
        ));

        let cli = Cli::try_parse_from(["haven", "download", "--ids", "ids.csv"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Download { delay_ms: 200, max_retries: 2, .. }
        ));

        let cli = Cli::try_parse_from(["haven", "import", "-f", "x.jsonl", "-c", "listings"]).unwrap();
        assert!(matches!(cli.command, Commands::Import { ref db_name, .. } if db_name == "airbnb"));
    }
}
