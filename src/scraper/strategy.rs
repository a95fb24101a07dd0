//! Ordered extraction strategies. Page layouts on the site vary, so each field is read by trying
//! alternative DOM shapes in priority order; the first strategy that yields a value wins.

use crate::scraper::error::ScraperError;
use scraper::{ElementRef, Node, Selector};

/// Elements whose contents never show up as page text.
const HIDDEN_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Elements rendered on their own line.
const BLOCK_TAGS: [&str; 22] = [
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "li", "ol", "p", "section", "tr", "ul",
];

/// Parse a CSS selector or return a selector error (avoids panics from Selector::parse).
pub fn parse_selector(sel: &str) -> Result<Selector, ScraperError> {
    Selector::parse(sel).map_err(|e| ScraperError::InvalidSelector {
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

/// One way of reading a value out of an element subtree.
pub struct Strategy<T> {
    pub name: &'static str,
    extract: fn(ElementRef<'_>) -> Option<T>,
}

impl<T> Strategy<T> {
    pub const fn new(name: &'static str, extract: fn(ElementRef<'_>) -> Option<T>) -> Self {
        Self { name, extract }
    }

    pub fn apply(&self, scope: ElementRef<'_>) -> Option<T> {
        (self.extract)(scope)
    }
}

/// Run `strategies` in order against `scope`; returns the winning strategy's name and value.
pub fn first_match<T>(strategies: &[Strategy<T>], scope: ElementRef<'_>) -> Option<(&'static str, T)> {
    strategies
        .iter()
        .find_map(|s| s.apply(scope).map(|value| (s.name, value)))
}

/// First descendant of `scope` matching `sel`. An unparsable selector matches nothing.
pub fn select_first<'a>(scope: ElementRef<'a>, sel: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(sel).ok()?;
    scope.select(&selector).next()
}

/// Text of `el` as a browser would lay it out: line breaks around block elements, no script or
/// style bodies.
fn rendered_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    render_into(el, &mut out);
    out
}

fn render_into(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => {
                let name = element.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    render_into(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Visible text of an element on one line: whitespace runs collapsed, trimmed.
pub fn inline_text(el: ElementRef<'_>) -> String {
    rendered_text(el)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text of a block element: each line collapsed and trimmed, blank lines dropped.
pub fn block_text(el: ElementRef<'_>) -> String {
    rendered_text(el)
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Some(text)` unless the text is empty.
pub fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
