//! Listing-page extraction: one [`ArticleOutcome`] per `article` element.
//!
//! Two row layouts are live on the search page:
//! - knowledge-base rows: `.kb-title a`, `.kb-type`, `.kb-intro .date`, `.kb-tags`
//! - news rows: `.well h2 a`, `.news-type` / `.label-alt`, `.field--created`
//!
//! A bad row never aborts the page; it becomes a skipped outcome with a reason.

use crate::model::ListingEntry;
use crate::scraper::browser::{visit, wait_until, Browser, WaitPolicy};
use crate::scraper::dates::{parse_date, SENTINEL_DATE_TEXT};
use crate::scraper::error::ScraperError;
use crate::scraper::strategy::{
    first_match, inline_text, non_empty, parse_selector, select_first, Strategy,
};
use chrono::{DateTime, Local, NaiveDate, Utc};
use reqwest::Url;
use scraper::{ElementRef, Html};
use std::fmt;
use std::time::Duration;

/// Listing container that signals the results have rendered.
const LISTING_CONTAINER: &str = ".view-content";

/// How to handle a row without any date element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingDateBehavior {
    /// Keep the row dated [`SENTINEL_DATE_TEXT`] and flag it (default).
    Sentinel,
    /// Drop the row.
    Skip,
}

/// Why a row was not turned into an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    MissingLink,
    InvalidLink { href: String },
    MissingDate,
    UnparseableDate { text: String },
}

impl SkipReason {
    /// Short stable code for logs and summaries.
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::MissingTitle => "missing_title",
            SkipReason::MissingLink => "missing_link",
            SkipReason::InvalidLink { .. } => "invalid_link",
            SkipReason::MissingDate => "missing_date",
            SkipReason::UnparseableDate { .. } => "unparseable_date",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidLink { href } => write!(f, "invalid link {:?}", href),
            SkipReason::UnparseableDate { text } => write!(f, "unparseable date {:?}", text),
            other => f.write_str(other.code()),
        }
    }
}

/// A row that was dropped, with the best-known link for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArticle {
    /// 0-based position of the `article` on its page.
    pub index: usize,
    pub link: Option<String>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleOutcome {
    Kept(ListingEntry),
    Skipped(SkippedArticle),
}

/// Everything read from one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    pub skipped: Vec<SkippedArticle>,
}

/// Timing and policy for reading a listing page.
#[derive(Debug, Clone, Copy)]
pub struct ListingOptions {
    pub settle: Duration,
    pub consent_wait: WaitPolicy,
    pub container_wait: WaitPolicy,
    pub missing_date: MissingDateBehavior,
}

/// Per-page inputs that are fixed for every row.
struct RowContext<'a> {
    page_url: &'a Url,
    today: NaiveDate,
    discovered_at: DateTime<Utc>,
    missing_date: MissingDateBehavior,
}

/// Title element and its anchor href, as found by a title strategy.
struct TitleMatch {
    title: String,
    href: Option<String>,
}

fn title_from(el: ElementRef<'_>) -> TitleMatch {
    let href = select_first(el, "a[href]")
        .and_then(|a| a.value().attr("href"))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty());
    TitleMatch {
        title: inline_text(el),
        href,
    }
}

fn kb_title(article: ElementRef<'_>) -> Option<TitleMatch> {
    select_first(article, ".kb-title").map(title_from)
}

/// Heading of the first `.well` only; a later well never supplies the title.
fn well_heading(article: ElementRef<'_>) -> Option<TitleMatch> {
    let well = select_first(article, ".well")?;
    select_first(well, "h2").map(title_from)
}

const TITLE_STRATEGIES: [Strategy<TitleMatch>; 2] = [
    Strategy::new("kb-title", kb_title),
    Strategy::new("well-h2", well_heading),
];

fn text_of(article: ElementRef<'_>, sel: &str) -> Option<String> {
    select_first(article, sel).map(inline_text).and_then(non_empty)
}

// Type strategies match on the element alone: the first label class present decides the type,
// and a blank one means no type rather than trying the next class.
fn kb_type(article: ElementRef<'_>) -> Option<String> {
    select_first(article, ".kb-type").map(inline_text)
}

fn news_type(article: ElementRef<'_>) -> Option<String> {
    select_first(article, ".news-type").map(inline_text)
}

fn label_alt(article: ElementRef<'_>) -> Option<String> {
    select_first(article, ".label-alt").map(inline_text)
}

const TYPE_STRATEGIES: [Strategy<String>; 3] = [
    Strategy::new("kb-type", kb_type),
    Strategy::new("news-type", news_type),
    Strategy::new("label-alt", label_alt),
];

// Date strategies return the element text even when empty: a present-but-blank date is
// unparseable, not missing.
fn kb_intro_date(article: ElementRef<'_>) -> Option<String> {
    let intro = select_first(article, ".kb-intro")?;
    // An intro without its date span is a broken row, not a missing date.
    Some(select_first(intro, ".date").map(inline_text).unwrap_or_default())
}

fn field_created(article: ElementRef<'_>) -> Option<String> {
    select_first(article, ".field--created").map(inline_text)
}

const DATE_STRATEGIES: [Strategy<String>; 2] = [
    Strategy::new("kb-intro-date", kb_intro_date),
    Strategy::new("field-created", field_created),
];

/// Open a listing page, wait for results, and read every article on it.
///
/// Fails with [`ScraperError::ElementNotFound`] when the listing container never shows up or the
/// page has no articles. Individual rows never fail the page.
pub fn collect_entries<B: Browser + ?Sized>(
    browser: &mut B,
    page_url: &str,
    options: &ListingOptions,
) -> Result<ListingPage, ScraperError> {
    visit(browser, page_url, options.settle, options.consent_wait)?;

    let container = parse_selector(LISTING_CONTAINER)?;
    let appeared = wait_until(browser, options.container_wait, |doc| {
        doc.select(&container).next().map(|_| ())
    });
    if appeared.is_none() {
        return Err(ScraperError::element_not_found(
            "listing container",
            browser.current_url(),
        ));
    }

    let current = browser.current_url();
    let base = if current.is_empty() { page_url } else { current };
    extract_entries(
        browser.page_source(),
        base,
        options.missing_date,
        Local::now().date_naive(),
        Utc::now(),
    )
}

/// Read every article from listing markup. `page_url` resolves relative links.
pub fn extract_entries(
    html: &str,
    page_url: &str,
    missing_date: MissingDateBehavior,
    today: NaiveDate,
    discovered_at: DateTime<Utc>,
) -> Result<ListingPage, ScraperError> {
    let page = Url::parse(page_url).map_err(|e| ScraperError::InvalidUrl {
        input: page_url.to_string(),
        reason: e.to_string(),
    })?;
    let doc = Html::parse_document(html);
    let article_sel = parse_selector("article")?;
    let articles: Vec<ElementRef<'_>> = doc.select(&article_sel).collect();
    if articles.is_empty() {
        return Err(ScraperError::element_not_found("article list", page_url));
    }

    let ctx = RowContext {
        page_url: &page,
        today,
        discovered_at,
        missing_date,
    };
    let mut out = ListingPage::default();
    for (index, article) in articles.into_iter().enumerate() {
        match extract_article(article, index, &ctx) {
            ArticleOutcome::Kept(entry) => out.entries.push(entry),
            ArticleOutcome::Skipped(skipped) => {
                tracing::debug!(
                    page = %page_url,
                    index,
                    link = skipped.link.as_deref().unwrap_or("<none>"),
                    reason = %skipped.reason,
                    "Skipping article"
                );
                out.skipped.push(skipped);
            }
        }
    }
    tracing::debug!(
        page = %page_url,
        kept = out.entries.len(),
        skipped = out.skipped.len(),
        "Listing page read"
    );
    Ok(out)
}

fn extract_article(article: ElementRef<'_>, index: usize, ctx: &RowContext<'_>) -> ArticleOutcome {
    let skip = |link: Option<String>, reason: SkipReason| {
        ArticleOutcome::Skipped(SkippedArticle {
            index,
            link,
            reason,
        })
    };

    let Some((_, title)) = first_match(&TITLE_STRATEGIES, article) else {
        return skip(None, SkipReason::MissingTitle);
    };
    let Some(href) = title.href else {
        return skip(None, SkipReason::MissingLink);
    };
    let link = match ctx.page_url.join(&href) {
        Ok(url) => url.to_string(),
        Err(_) => return skip(None, SkipReason::InvalidLink { href }),
    };
    if title.title.is_empty() {
        return skip(Some(link), SkipReason::MissingTitle);
    }

    let doc_type = first_match(&TYPE_STRATEGIES, article).and_then(|(_, t)| non_empty(t));

    let (date_text, date_is_fallback) = match first_match(&DATE_STRATEGIES, article) {
        Some((_, text)) => (text, false),
        None => match ctx.missing_date {
            MissingDateBehavior::Sentinel => {
                tracing::debug!(link = %link, "No date element; using sentinel date");
                (SENTINEL_DATE_TEXT.to_string(), true)
            }
            MissingDateBehavior::Skip => return skip(Some(link), SkipReason::MissingDate),
        },
    };
    let Some(published) = parse_date(&date_text, ctx.today) else {
        return skip(Some(link), SkipReason::UnparseableDate { text: date_text });
    };

    let tags = text_of(article, ".kb-tags");

    ArticleOutcome::Kept(ListingEntry {
        title: title.title,
        link,
        doc_type,
        published,
        date_is_fallback,
        tags,
        text: None,
        discovered_at: ctx.discovered_at,
    })
}
