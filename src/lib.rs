//! epcscrape: listing scraper for European Payments Council documents, emitting structured records.

pub mod cli;
pub mod config;
pub mod model;
pub mod scraper;
pub mod sink;

// Re-exports for the CLI and host integrations.
pub use model::{Document, ListingEntry};
pub use scraper::{
    Browser, EuPayScraper, HttpBrowser, HttpBrowserBuilder, MissingDateBehavior,
    MissingTextBehavior, RunOptions, RunSummary, ScraperError, StopReason, Timing,
};
pub use sink::{DocumentSink, JsonArraySink, JsonLinesSink};
