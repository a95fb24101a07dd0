//! Blocking HTTP browser: reqwest with a cookie jar, a browser-like User-Agent, and no script engine.
//!
//! Pages are whatever the server returns for a GET. Refresh re-fetches, so bounded waits poll the
//! server. Clicking a control submits its form when it has one; script-only controls are refused.

use crate::scraper::browser::{Browser, Control, FormMethod};
use crate::scraper::error::ScraperError;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// [`Browser`] backed by plain HTTP requests.
#[derive(Debug)]
pub struct HttpBrowser {
    inner: reqwest::blocking::Client,
    current_url: String,
    source: String,
}

impl HttpBrowser {
    /// Build a browser with default User-Agent and timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> HttpBrowserBuilder {
        HttpBrowserBuilder::default()
    }

    fn load(
        &mut self,
        request: reqwest::blocking::RequestBuilder,
        url: &str,
    ) -> Result<(), ScraperError> {
        let response = request.send().map_err(|e| ScraperError::Network {
            url: url.to_string(),
            source: e,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let final_url = response.url().to_string();
        let body = response
            .text()
            .map_err(|e| ScraperError::BodyRead { source: e })?;
        self.current_url = final_url;
        self.source = body;
        Ok(())
    }
}

impl Browser for HttpBrowser {
    fn navigate(&mut self, url: &str) -> Result<(), ScraperError> {
        let request = self.inner.get(url);
        self.load(request, url)
    }

    fn current_url(&self) -> &str {
        &self.current_url
    }

    fn page_source(&self) -> &str {
        &self.source
    }

    fn refresh(&mut self) -> Result<(), ScraperError> {
        if self.current_url.is_empty() {
            return Ok(());
        }
        let url = self.current_url.clone();
        self.navigate(&url)
    }

    fn click(&mut self, control: &Control) -> Result<(), ScraperError> {
        let Some(form) = &control.form else {
            return Err(ScraperError::ScriptOnlyControl {
                control: control.text.clone(),
                url: self.current_url.clone(),
            });
        };
        let request = match form.method {
            FormMethod::Post => self.inner.post(&form.action).form(&form.fields),
            FormMethod::Get => self.inner.get(&form.action).query(&form.fields),
        };
        self.load(request, &form.action)
    }

    fn pause(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Builder for [`HttpBrowser`] with optional User-Agent and timeout.
#[derive(Debug)]
pub struct HttpBrowserBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl Default for HttpBrowserBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpBrowserBuilder {
    /// Set a custom User-Agent. If not set, a desktop Chrome string is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<HttpBrowser, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(HttpBrowser {
            inner,
            current_url: String::new(),
            source: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_browser_has_no_page() -> Result<(), reqwest::Error> {
        let mut browser = HttpBrowser::builder()
            .user_agent("epcscrape-test")
            .timeout_secs(5)
            .build()?;
        assert_eq!(browser.current_url(), "");
        assert_eq!(browser.page_source(), "");
        assert!(browser.refresh().is_ok());
        Ok(())
    }

    #[test]
    fn script_only_click_is_refused() -> Result<(), reqwest::Error> {
        let mut browser = HttpBrowser::new()?;
        let control = Control {
            text: "Accept All Cookies".to_string(),
            form: None,
        };
        let err = browser.click(&control).unwrap_err();
        assert!(err.is_script_only());
        assert_eq!(browser.current_url(), "");
        Ok(())
    }
}
