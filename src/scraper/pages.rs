//! Listing-page enumeration: `{base}?page=0`, `{base}?page=1`, ...

use crate::scraper::error::ScraperError;
use reqwest::Url;

/// Search listing of the European Payments Council.
pub const EPC_SEARCH_URL: &str = "https://www.europeanpaymentscouncil.eu/search";

/// Explicit cursor over listing pages. Yields `(page_index, url)`.
///
/// The site gives no page count, so the sequence only ends when the index would overflow;
/// the run loop owns the real stop conditions.
#[derive(Debug, Clone)]
pub struct ListingPages {
    base: Url,
    next: Option<u32>,
}

impl ListingPages {
    pub fn new(base: &str, start_page: u32) -> Result<Self, ScraperError> {
        let base = Url::parse(base).map_err(|e| ScraperError::InvalidUrl {
            input: base.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            base,
            next: Some(start_page),
        })
    }

    /// URL of listing page `page`.
    pub fn url_for(&self, page: u32) -> String {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("page", &page.to_string());
        url.to_string()
    }
}

impl Iterator for ListingPages {
    type Item = (u32, String);

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.next?;
        self.next = page.checked_add(1);
        Some((page, self.url_for(page)))
    }
}
