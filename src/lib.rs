pub mod browser_client;
pub mod business_date;
pub mod combined;
pub mod config;
pub mod fetcher;
pub mod indicator_scraper;
pub mod numeric;
pub mod pipeline;
pub mod rate_scraper;
pub mod report;
pub mod requests;
mod scrape_error;
pub mod scraping_context;
pub mod table_extractor;
mod text_manipulators;

pub use fetcher::DocumentFetcher;
pub use pipeline::PipelineRun;
pub use scrape_error::{ScrapeError, SourceOutcome};
pub use scraping_context::ScrapingContext;
