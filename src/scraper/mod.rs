//! Listing scraper: page enumeration, listing extraction, detail text, and the run loop that feeds
//! a [`DocumentSink`].

mod browser;
mod consent;
mod dates;
mod detail;
mod error;
mod http;
mod listing;
mod pages;
mod strategy;

pub use browser::{visit, wait_until, Browser, Control, FormMethod, FormTarget, WaitPolicy};
pub use consent::{dismiss_consent, ConsentOutcome, CONSENT_BUTTON_TEXT};
pub use dates::{parse_date, SENTINEL_DATE_TEXT};
pub use detail::{extract_text, fetch_text};
pub use error::ScraperError;
pub use http::{HttpBrowser, HttpBrowserBuilder};
pub use listing::{
    collect_entries, extract_entries, ArticleOutcome, ListingOptions, ListingPage,
    MissingDateBehavior, SkipReason, SkippedArticle,
};
pub use pages::{ListingPages, EPC_SEARCH_URL};
pub use strategy::{first_match, Strategy};

use crate::sink::DocumentSink;
use chrono::Utc;
use std::time::Duration;

/// How to handle a document whose detail page has no recognizable text (or cannot be loaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingTextBehavior {
    /// Log and move on; the document is lost for this run (default).
    Skip,
    /// Abort the run with the error.
    Fail,
}

/// Delays and bounded waits. Defaults: 2 s after listing navigation, 3 s after detail navigation,
/// 5 s for the consent button, 20 s for the listing container, polling every second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub navigation_delay: Duration,
    pub detail_delay: Duration,
    pub consent_wait: WaitPolicy,
    pub container_wait: WaitPolicy,
}

impl Default for Timing {
    fn default() -> Self {
        let poll = Duration::from_secs(1);
        Self {
            navigation_delay: Duration::from_secs(2),
            detail_delay: Duration::from_secs(3),
            consent_wait: WaitPolicy::new(Duration::from_secs(5), poll),
            container_wait: WaitPolicy::new(Duration::from_secs(20), poll),
        }
    }
}

/// Run parameters supplied by the host: where to start, when to stop, and how to treat gaps.
pub struct RunOptions<'a> {
    pub base_url: String,
    pub start_page: u32,
    /// Stop after this many documents reached the sink.
    pub max_documents: Option<usize>,
    /// Stop after this many listing pages.
    pub max_pages: Option<u32>,
    /// Link of the newest document delivered by a previous run; the run stops when it reaches it.
    pub last_known_link: Option<String>,
    /// End the run (instead of failing) on a listing page with no container or no articles.
    pub stop_on_empty_page: bool,
    pub missing_text: MissingTextBehavior,
    pub missing_date: MissingDateBehavior,
    pub timing: Timing,
    /// Called after each delivered document with (documents delivered, current page index).
    pub progress: Option<&'a dyn Fn(usize, u32)>,
}

impl Default for RunOptions<'_> {
    fn default() -> Self {
        Self {
            base_url: EPC_SEARCH_URL.to_string(),
            start_page: 0,
            max_documents: None,
            max_pages: None,
            last_known_link: None,
            stop_on_empty_page: true,
            missing_text: MissingTextBehavior::Skip,
            missing_date: MissingDateBehavior::Sentinel,
            timing: Timing::default(),
            progress: None,
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    MaxDocuments,
    MaxPages,
    LastKnownDocument,
    /// Listing page `page` had no results.
    EmptyPage { page: u32 },
    /// The page index ran out.
    PagesExhausted,
}

/// A document whose detail page could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LostDocument {
    pub link: String,
    pub error: String,
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_visited: u32,
    pub delivered: usize,
    pub skipped: Vec<SkippedArticle>,
    pub lost: Vec<LostDocument>,
    pub stop: StopReason,
}

/// Drives a [`Browser`] through the EPC search listing and hands each document to a sink.
pub struct EuPayScraper<'a, B: Browser + ?Sized> {
    browser: &'a mut B,
}

impl<'a, B: Browser + ?Sized> EuPayScraper<'a, B> {
    pub fn new(browser: &'a mut B) -> Self {
        Self { browser }
    }

    /// Walk listing pages from `options.start_page` until a stop condition holds.
    ///
    /// Errors: listing-page failures other than an empty page, a detail failure under
    /// [`MissingTextBehavior::Fail`], and sink errors.
    pub fn run(
        &mut self,
        sink: &mut dyn DocumentSink,
        options: &RunOptions<'_>,
    ) -> Result<RunSummary, ScraperError> {
        tracing::info!(
            base = %options.base_url,
            start_page = options.start_page,
            max_documents = ?options.max_documents,
            "Parser entering listing"
        );
        let listing_options = ListingOptions {
            settle: options.timing.navigation_delay,
            consent_wait: options.timing.consent_wait,
            container_wait: options.timing.container_wait,
            missing_date: options.missing_date,
        };
        let mut summary = RunSummary {
            pages_visited: 0,
            delivered: 0,
            skipped: Vec::new(),
            lost: Vec::new(),
            stop: StopReason::PagesExhausted,
        };

        if options.max_documents == Some(0) {
            summary.stop = StopReason::MaxDocuments;
            return Ok(summary);
        }

        for (page_index, page_url) in ListingPages::new(&options.base_url, options.start_page)? {
            if options.max_pages.is_some_and(|max| summary.pages_visited >= max) {
                summary.stop = StopReason::MaxPages;
                break;
            }

            let page = match collect_entries(&mut *self.browser, &page_url, &listing_options) {
                Ok(page) => page,
                Err(e) if e.is_element_not_found() && options.stop_on_empty_page => {
                    tracing::info!(page = page_index, url = %page_url, error = %e, "Listing exhausted");
                    summary.stop = StopReason::EmptyPage { page: page_index };
                    break;
                }
                Err(e) => return Err(e),
            };
            summary.pages_visited += 1;
            tracing::info!(
                page = page_index,
                entries = page.entries.len(),
                skipped = page.skipped.len(),
                "Listing page collected"
            );
            summary.skipped.extend(page.skipped);

            for entry in page.entries {
                if options.last_known_link.as_deref() == Some(entry.link.as_str()) {
                    tracing::info!(link = %entry.link, "Reached last known document");
                    summary.stop = StopReason::LastKnownDocument;
                    return Ok(summary);
                }

                let text = match fetch_text(
                    &mut *self.browser,
                    &entry.link,
                    options.timing.detail_delay,
                    options.timing.consent_wait,
                ) {
                    Ok(text) => text,
                    Err(e) => match options.missing_text {
                        MissingTextBehavior::Skip => {
                            tracing::warn!(link = %entry.link, error = %e, "Document text unavailable; skipped");
                            summary.lost.push(LostDocument {
                                link: entry.link,
                                error: e.to_string(),
                            });
                            continue;
                        }
                        MissingTextBehavior::Fail => return Err(e),
                    },
                };

                let document = entry.with_text(text).into_document(Utc::now());
                sink.accept(document)?;
                summary.delivered += 1;
                if let Some(progress) = options.progress {
                    progress(summary.delivered, page_index);
                }

                if options.max_documents.is_some_and(|max| summary.delivered >= max) {
                    summary.stop = StopReason::MaxDocuments;
                    return Ok(summary);
                }
            }
        }

        tracing::info!(
            pages = summary.pages_visited,
            delivered = summary.delivered,
            stop = ?summary.stop,
            "Parser run finished"
        );
        Ok(summary)
    }
}
