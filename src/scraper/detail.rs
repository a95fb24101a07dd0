//! Detail-page body text.

use crate::scraper::browser::{visit, Browser, WaitPolicy};
use crate::scraper::error::ScraperError;
use crate::scraper::strategy::{block_text, first_match, non_empty, select_first, Strategy};
use scraper::{ElementRef, Html};
use std::time::Duration;

/// Document-library pages: lead paragraph of the details block, else the whole block.
fn details_container(root: ElementRef<'_>) -> Option<String> {
    let container = select_first(root, ".content-container-details")?;
    select_first(container, "p")
        .map(block_text)
        .and_then(non_empty)
        .or_else(|| non_empty(block_text(container)))
}

/// Older two-column layout.
fn two_column(root: ElementRef<'_>) -> Option<String> {
    select_first(root, ".col-md-6").map(block_text).and_then(non_empty)
}

/// News pages.
fn article_content(root: ElementRef<'_>) -> Option<String> {
    select_first(root, "article .content")
        .map(block_text)
        .and_then(non_empty)
}

const TEXT_STRATEGIES: [Strategy<String>; 3] = [
    Strategy::new("content-container-details", details_container),
    Strategy::new("col-md-6", two_column),
    Strategy::new("article-content", article_content),
];

/// Body text of a detail page. [`ScraperError::ElementNotFound`] when no layout matches.
pub fn extract_text(html: &str, url: &str) -> Result<String, ScraperError> {
    let doc = Html::parse_document(html);
    match first_match(&TEXT_STRATEGIES, doc.root_element()) {
        Some((strategy, text)) => {
            tracing::debug!(url = %url, strategy, chars = text.len(), "Detail text extracted");
            Ok(text)
        }
        None => Err(ScraperError::element_not_found("document text", url)),
    }
}

/// Open a document's detail page and read its text.
pub fn fetch_text<B: Browser + ?Sized>(
    browser: &mut B,
    link: &str,
    settle: Duration,
    consent_wait: WaitPolicy,
) -> Result<String, ScraperError> {
    visit(browser, link, settle, consent_wait)?;
    extract_text(browser.page_source(), link)
}
