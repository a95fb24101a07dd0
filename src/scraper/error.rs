//! Shared error type for the listing scraper and browser backends.

use thiserror::Error;

/// Errors raised while driving the browser or extracting required page structure.
///
/// Optional-field problems (type, tags, dates) never surface here; they become
/// [`SkipReason`](crate::scraper::SkipReason) values instead.
#[derive(Debug, Error)]
pub enum ScraperError {
    /// Required page structure (listing container, articles, detail body) is absent.
    #[error("Element not found: {what} at {url}")]
    ElementNotFound { what: String, url: String },

    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    /// The control only works through page script, which this browser does not run.
    #[error("Control {control:?} on {url} needs a script engine")]
    ScriptOnlyControl { control: String, url: String },

    /// The host sink refused a document.
    #[error("Document sink rejected {link}: {message}")]
    Sink { link: String, message: String },
}

impl ScraperError {
    pub(crate) fn element_not_found(what: impl Into<String>, url: impl Into<String>) -> Self {
        ScraperError::ElementNotFound {
            what: what.into(),
            url: url.into(),
        }
    }

    /// True for missing required page structure; the caller decides whether that ends the run.
    pub fn is_element_not_found(&self) -> bool {
        matches!(self, ScraperError::ElementNotFound { .. })
    }

    pub fn is_script_only(&self) -> bool {
        matches!(self, ScraperError::ScriptOnlyControl { .. })
    }
}
