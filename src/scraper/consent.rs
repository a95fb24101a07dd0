//! Cookie-consent dialog dismissal. Best-effort: every failure is logged at debug and swallowed.

use crate::scraper::browser::{wait_until, Browser, Control, FormMethod, FormTarget, WaitPolicy};
use crate::scraper::strategy::{inline_text, parse_selector};
use reqwest::Url;
use scraper::{ElementRef, Html};

/// Exact visible text of the accept button.
pub const CONSENT_BUTTON_TEXT: &str = "Accept All Cookies";

/// What happened when the dialog was looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Dismissed,
    NotPresent,
    NotClickable,
    /// The button has no form and the browser cannot run the page's script; nothing was sent.
    ScriptOnly,
    ClickFailed,
}

/// Click "Accept All Cookies" if the dialog is on the current page.
///
/// Idempotent: on a page without the dialog nothing is clicked and nothing is reloaded.
pub fn dismiss_consent<B: Browser + ?Sized>(browser: &mut B, wait: WaitPolicy) -> ConsentOutcome {
    let present = {
        let doc = Html::parse_document(browser.page_source());
        find_consent_button(&doc).is_some()
    };
    if !present {
        tracing::debug!(url = %browser.current_url(), "Consent dialog not found");
        return ConsentOutcome::NotPresent;
    }

    let page_url = browser.current_url().to_string();
    let control = match wait_until(browser, wait, |doc| {
        find_consent_button(doc)
            .filter(|button| is_clickable(*button))
            .map(|button| control_for(button, &page_url))
    }) {
        Some(control) => control,
        None => {
            tracing::debug!(url = %page_url, "Consent button never became clickable");
            return ConsentOutcome::NotClickable;
        }
    };

    match browser.click(&control) {
        Ok(()) => {
            tracing::debug!(url = %page_url, "Passed cookie consent dialog");
            ConsentOutcome::Dismissed
        }
        Err(e) if e.is_script_only() => {
            tracing::debug!(url = %page_url, "Consent button is handled in script; dialog left in place");
            ConsentOutcome::ScriptOnly
        }
        Err(e) => {
            tracing::debug!(url = %page_url, error = %e, "Consent click failed");
            ConsentOutcome::ClickFailed
        }
    }
}

fn find_consent_button(doc: &Html) -> Option<ElementRef<'_>> {
    let sel = parse_selector("button").ok()?;
    doc.select(&sel)
        .find(|b| inline_text(*b) == CONSENT_BUTTON_TEXT)
}

/// Enabled and not hidden, by itself or by an ancestor.
fn is_clickable(button: ElementRef<'_>) -> bool {
    if button.value().attr("disabled").is_some() {
        return false;
    }
    std::iter::once(button)
        .chain(button.ancestors().filter_map(ElementRef::wrap))
        .all(|el| !is_hidden(el))
}

fn is_hidden(el: ElementRef<'_>) -> bool {
    let v = el.value();
    if v.attr("hidden").is_some() || v.attr("aria-hidden") == Some("true") {
        return true;
    }
    v.attr("style")
        .map(|s| {
            let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
            let compact = compact.to_lowercase();
            compact.contains("display:none") || compact.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

/// Describe the button for [`Browser::click`], including its form if it has one.
fn control_for(button: ElementRef<'_>, page_url: &str) -> Control {
    let form = button
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "form");
    Control {
        text: inline_text(button),
        form: form.and_then(|f| form_target(f, button, page_url)),
    }
}

fn form_target(form: ElementRef<'_>, button: ElementRef<'_>, page_url: &str) -> Option<FormTarget> {
    let action = button
        .value()
        .attr("formaction")
        .or_else(|| form.value().attr("action"))
        .unwrap_or("");
    let action = Url::parse(page_url).ok()?.join(action).ok()?.to_string();
    let method = match button
        .value()
        .attr("formmethod")
        .or_else(|| form.value().attr("method"))
    {
        Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
        _ => FormMethod::Get,
    };
    let mut fields: Vec<(String, String)> = parse_selector("input[name]")
        .ok()
        .map(|sel| {
            form.select(&sel)
                .filter(|i| {
                    !matches!(
                        i.value().attr("type"),
                        Some("submit") | Some("button") | Some("checkbox") | Some("radio")
                    ) || i.value().attr("checked").is_some()
                })
                .filter_map(|i| {
                    let name = i.value().attr("name")?;
                    Some((
                        name.to_string(),
                        i.value().attr("value").unwrap_or("").to_string(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();
    if let Some(name) = button.value().attr("name") {
        fields.push((
            name.to_string(),
            button.value().attr("value").unwrap_or("").to_string(),
        ));
    }
    Some(FormTarget {
        action,
        method,
        fields,
    })
}
