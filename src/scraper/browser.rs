//! Browser seam. The scraper only ever talks to a [`Browser`]; the host decides what backs it.

use crate::scraper::consent::{dismiss_consent, ConsentOutcome};
use crate::scraper::error::ScraperError;
use scraper::Html;
use std::time::{Duration, Instant};

/// How a clickable control submits, when it is wired to a plain HTML form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormTarget {
    /// Absolute action URL.
    pub action: String,
    pub method: FormMethod,
    /// Name/value pairs the form would submit (including the control's own name/value).
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// A control located on the current page that the browser should activate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// Visible text of the control.
    pub text: String,
    /// Form submission, if the control belongs to one. `None` means the page handles it in script.
    pub form: Option<FormTarget>,
}

/// Blocking browser-control handle, owned exclusively by the scraper for a run.
pub trait Browser {
    /// Load `url` and make it the current page.
    fn navigate(&mut self, url: &str) -> Result<(), ScraperError>;

    /// URL of the current page (after redirects). Empty before the first navigation.
    fn current_url(&self) -> &str;

    /// Markup of the current page.
    fn page_source(&self) -> &str;

    /// Re-read the current page.
    fn refresh(&mut self) -> Result<(), ScraperError>;

    /// Activate a control found on the current page.
    fn click(&mut self, control: &Control) -> Result<(), ScraperError>;

    /// Let dynamic page content settle.
    fn pause(&mut self, duration: Duration);
}

/// Bounded wait: the page is checked once, then re-checked after each `poll` until `timeout` is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll: Duration,
}

impl WaitPolicy {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self { timeout, poll }
    }

    /// Number of re-checks after the first one.
    fn polls(&self) -> u32 {
        let poll_ms = self.poll.as_millis().max(1);
        (self.timeout.as_millis() / poll_ms).min(u32::MAX as u128) as u32
    }
}

/// Check the current page with `check` until it yields a value or the wait is spent.
///
/// Between checks the browser pauses for `policy.poll` and refreshes. The wait ends after
/// `timeout / poll` re-checks or once `timeout` has elapsed, whichever comes first. A failed
/// refresh counts as a failed check. Returns `None` on timeout.
pub fn wait_until<B, T, F>(browser: &mut B, policy: WaitPolicy, mut check: F) -> Option<T>
where
    B: Browser + ?Sized,
    F: FnMut(&Html) -> Option<T>,
{
    let deadline = Instant::now().checked_add(policy.timeout);
    let polls = policy.polls();
    let mut attempt = 0;
    loop {
        let doc = Html::parse_document(browser.page_source());
        if let Some(found) = check(&doc) {
            return Some(found);
        }
        let expired = deadline.is_some_and(|d| Instant::now() >= d);
        if attempt >= polls || expired {
            return None;
        }
        attempt += 1;
        browser.pause(policy.poll);
        if let Err(e) = browser.refresh() {
            tracing::debug!(url = %browser.current_url(), attempt, error = %e, "Refresh failed while waiting");
        }
    }
}

/// Navigate, let the page settle, then clear the cookie dialog if one shows up.
pub fn visit<B: Browser + ?Sized>(
    browser: &mut B,
    url: &str,
    settle: Duration,
    consent_wait: WaitPolicy,
) -> Result<ConsentOutcome, ScraperError> {
    browser.navigate(url)?;
    tracing::debug!(url = %url, "Entered web page");
    browser.pause(settle);
    Ok(dismiss_consent(browser, consent_wait))
}

/// In-memory browser for tests: fixed pages per URL, no network, no real sleeping.
#[cfg(test)]
pub(crate) mod fake {
    use super::{Browser, Control};
    use crate::scraper::error::ScraperError;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Debug, Default)]
    pub struct FakeBrowser {
        /// Successive versions of each page; refresh advances to the next one, the last one sticks.
        pages: HashMap<String, Vec<String>>,
        current_url: String,
        source: String,
        version: usize,
        failing_refreshes: usize,
        script_only: bool,
        pub navigations: Vec<String>,
        pub clicks: Vec<Control>,
        pub refreshes: usize,
        pub pauses: Vec<Duration>,
    }

    impl FakeBrowser {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(self, url: &str, html: &str) -> Self {
            self.with_versions(url, &[html])
        }

        pub fn with_versions(mut self, url: &str, versions: &[&str]) -> Self {
            self.pages.insert(
                url.to_string(),
                versions.iter().map(|v| v.to_string()).collect(),
            );
            self
        }

        /// Make the next `n` refreshes fail with HTTP 503, leaving the page as it was.
        pub fn with_failing_refreshes(mut self, n: usize) -> Self {
            self.failing_refreshes = n;
            self
        }

        /// Refuse clicks on controls without a form, like a browser with no script engine.
        pub fn without_script_engine(mut self) -> Self {
            self.script_only = true;
            self
        }

        fn load(&mut self) {
            if let Some(versions) = self.pages.get(&self.current_url) {
                let i = self.version.min(versions.len().saturating_sub(1));
                self.source = versions.get(i).cloned().unwrap_or_default();
            }
        }
    }

    impl Browser for FakeBrowser {
        fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
            self.navigations.push(url.to_string());
            if !self.pages.contains_key(url) {
                return Err(ScraperError::HttpStatus {
                    status: 404,
                    url: url.to_string(),
                });
            }
            self.current_url = url.to_string();
            self.version = 0;
            self.load();
            Ok(())
        }

        fn current_url(&self) -> &str {
            &self.current_url
        }

        fn page_source(&self) -> &str {
            &self.source
        }

        fn refresh(&mut self) -> Result<(), ScraperError> {
            self.refreshes += 1;
            if self.failing_refreshes > 0 {
                self.failing_refreshes -= 1;
                return Err(ScraperError::HttpStatus {
                    status: 503,
                    url: self.current_url.clone(),
                });
            }
            self.version += 1;
            self.load();
            Ok(())
        }

        fn click(&mut self, control: &Control) -> Result<(), ScraperError> {
            self.clicks.push(control.clone());
            if self.script_only && control.form.is_none() {
                return Err(ScraperError::ScriptOnlyControl {
                    control: control.text.clone(),
                    url: self.current_url.clone(),
                });
            }
            Ok(())
        }

        fn pause(&mut self, duration: Duration) {
            self.pauses.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakeBrowser;
    use super::*;
    use crate::scraper::strategy::parse_selector;

    const URL: &str = "https://example.test/page";

    fn has_listing(doc: &Html) -> Option<()> {
        let sel = parse_selector(".view-content").ok()?;
        doc.select(&sel).next().map(|_| ())
    }

    #[test]
    fn wait_policy_poll_count() {
        let p = WaitPolicy::new(Duration::from_secs(20), Duration::from_millis(500));
        assert_eq!(p.polls(), 40);
        let p = WaitPolicy::new(Duration::ZERO, Duration::from_millis(500));
        assert_eq!(p.polls(), 0);
    }

    #[test]
    fn wait_until_finds_element_after_refresh() -> Result<(), ScraperError> {
        let mut browser = FakeBrowser::new().with_versions(
            URL,
            &[
                "<html><body>loading</body></html>",
                "<html><body><div class=\"view-content\"></div></body></html>",
            ],
        );
        browser.navigate(URL)?;
        let policy = WaitPolicy::new(Duration::from_secs(5), Duration::from_secs(1));
        let found = wait_until(&mut browser, policy, has_listing);
        assert!(found.is_some());
        assert_eq!(browser.refreshes, 1);
        Ok(())
    }

    #[test]
    fn wait_until_gives_up_after_timeout() -> Result<(), ScraperError> {
        let mut browser = FakeBrowser::new().with_page(URL, "<html><body></body></html>");
        browser.navigate(URL)?;
        let policy = WaitPolicy::new(Duration::from_secs(3), Duration::from_secs(1));
        let found = wait_until(&mut browser, policy, has_listing);
        assert!(found.is_none());
        assert_eq!(browser.refreshes, 3);
        assert_eq!(browser.pauses, vec![Duration::from_secs(1); 3]);
        Ok(())
    }

    #[test]
    fn failed_refresh_counts_as_a_failed_check() -> Result<(), ScraperError> {
        let mut browser = FakeBrowser::new()
            .with_versions(
                URL,
                &[
                    "<html><body>loading</body></html>",
                    "<html><body><div class=\"view-content\"></div></body></html>",
                ],
            )
            .with_failing_refreshes(1);
        browser.navigate(URL)?;
        let policy = WaitPolicy::new(Duration::from_secs(5), Duration::from_secs(1));
        let found = wait_until(&mut browser, policy, has_listing);
        assert!(found.is_some());
        assert_eq!(browser.refreshes, 2);
        Ok(())
    }

    #[test]
    fn refresh_errors_end_in_timeout_not_error() -> Result<(), ScraperError> {
        let mut browser = FakeBrowser::new()
            .with_page(URL, "<html><body></body></html>")
            .with_failing_refreshes(10);
        browser.navigate(URL)?;
        let policy = WaitPolicy::new(Duration::from_secs(3), Duration::from_secs(1));
        assert!(wait_until(&mut browser, policy, has_listing).is_none());
        assert_eq!(browser.refreshes, 3);
        Ok(())
    }

    /// Refresh takes real time here, so the wall-clock bound ends the wait before the poll count does.
    #[derive(Default)]
    struct SlowBrowser {
        refreshes: u32,
    }

    impl Browser for SlowBrowser {
        fn navigate(&mut self, _url: &str) -> Result<(), ScraperError> {
            Ok(())
        }
        fn current_url(&self) -> &str {
            URL
        }
        fn page_source(&self) -> &str {
            "<html><body></body></html>"
        }
        fn refresh(&mut self) -> Result<(), ScraperError> {
            self.refreshes += 1;
            std::thread::sleep(Duration::from_millis(40));
            Ok(())
        }
        fn click(&mut self, _control: &Control) -> Result<(), ScraperError> {
            Ok(())
        }
        fn pause(&mut self, _duration: Duration) {}
    }

    #[test]
    fn wait_is_bounded_by_elapsed_time() {
        let mut browser = SlowBrowser::default();
        // 100 polls allowed by count, but each refresh takes 40ms against a 100ms budget.
        let policy = WaitPolicy::new(Duration::from_millis(100), Duration::from_millis(1));
        let started = Instant::now();
        assert!(wait_until(&mut browser, policy, has_listing).is_none());
        assert!(browser.refreshes < 10, "refreshes: {}", browser.refreshes);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn visit_pauses_after_navigation() -> Result<(), ScraperError> {
        let mut browser = FakeBrowser::new().with_page(URL, "<html><body></body></html>");
        let policy = WaitPolicy::new(Duration::from_secs(5), Duration::from_secs(1));
        let outcome = visit(&mut browser, URL, Duration::from_secs(2), policy)?;
        assert_eq!(outcome, ConsentOutcome::NotPresent);
        assert_eq!(browser.navigations, vec![URL.to_string()]);
        assert_eq!(browser.pauses.first(), Some(&Duration::from_secs(2)));
        Ok(())
    }
}
