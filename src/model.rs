//! Data model: the transient listing row and the document record handed to the host.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One article read from a listing page. Lives only until it is converted into a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    /// Absolute URL; identity of the document within a run.
    pub link: String,
    pub doc_type: Option<String>,
    pub published: NaiveDate,
    /// The row had no date element and `published` is the sentinel date.
    pub date_is_fallback: bool,
    pub tags: Option<String>,
    /// Filled in from the detail page.
    pub text: Option<String>,
    pub discovered_at: DateTime<Utc>,
}

impl ListingEntry {
    /// Attach the detail-page text.
    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    /// Build the host record. `abstract` is never extracted.
    pub fn into_document(self, loaded_at: DateTime<Utc>) -> Document {
        let mut other = BTreeMap::new();
        other.insert("doc_type".to_string(), self.doc_type);
        other.insert("tags".to_string(), self.tags);
        Document {
            id: None,
            title: self.title,
            abstract_text: None,
            text: self.text.unwrap_or_default(),
            link: self.link,
            published: self.published,
            other,
            discovered_at: self.discovered_at,
            loaded_at,
        }
    }
}

/// Document record in the shape the host pipeline stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Assigned by the host.
    pub id: Option<u64>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub text: String,
    pub link: String,
    pub published: NaiveDate,
    /// Extra metadata: `doc_type` and `tags`, either may be null.
    pub other: BTreeMap<String, Option<String>>,
    pub discovered_at: DateTime<Utc>,
    pub loaded_at: DateTime<Utc>,
}
