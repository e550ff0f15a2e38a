//! Turns one rendered result page into validated entries.
//!
//! Every field lookup is optional: a missing element yields an empty string and
//! the row is still considered. The only gate is the mobile-number filter.

use std::collections::HashSet;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use imenik_common::{DirectorySelectors, Entry, ImenikError, Result};

use crate::normalize::{is_mobile_number, normalize_city, normalize_name, normalize_street};

pub struct PageExtractor {
    container: Selector,
    full_name: Selector,
    address: Selector,
    phone: Selector,
    pagination: Selector,
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ImenikError::InvalidSelector(format!("{css}: {e:?}")))
}

impl PageExtractor {
    pub fn new(selectors: &DirectorySelectors) -> Result<Self> {
        Ok(Self {
            container: parse_selector(&selectors.result_container)?,
            full_name: parse_selector(&selectors.full_name)?,
            address: parse_selector(&selectors.address)?,
            phone: parse_selector(&selectors.phone)?,
            pagination: parse_selector(&selectors.pagination)?,
        })
    }

    /// Extract, normalize and filter every result row on the page.
    pub fn extract(&self, html: &str) -> Vec<Entry> {
        let document = Html::parse_document(html);
        let mut rows = 0usize;

        let entries: Vec<Entry> = document
            .select(&self.container)
            .map(|row| {
                rows += 1;
                self.extract_row(row)
            })
            .filter(|entry| is_mobile_number(&entry.telephone_number))
            .collect();

        debug!(rows, kept = entries.len(), "Extracted result rows");
        entries
    }

    fn extract_row(&self, row: ElementRef<'_>) -> Entry {
        let (street, city) = row
            .select(&self.address)
            .next()
            .map(address_lines)
            .unwrap_or_default();

        let telephone_number = row
            .select(&self.phone)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        let full_name = row
            .select(&self.full_name)
            .next()
            .map(collapsed_text)
            .unwrap_or_default();

        Entry {
            telephone_number,
            street: normalize_street(&street),
            city: normalize_city(&city),
            full_name: normalize_name(&full_name),
        }
    }

    /// Pagination targets as `path[?query]`, deduplicated, in document order.
    pub fn pagination_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let Ok(base) = Url::parse("http://directory.invalid/") else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in document.select(&self.pagination) {
            let Some(href) = anchor.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                continue;
            }
            let Ok(resolved) = base.join(href) else {
                continue;
            };

            let target = match resolved.query() {
                Some(query) => format!("{}?{}", resolved.path(), query),
                None => resolved.path().to_string(),
            };
            if seen.insert(target.clone()) {
                links.push(target);
            }
        }

        links
    }
}

/// Text content with whitespace runs collapsed, as a rendered page shows it.
fn collapsed_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Elements that start and end a rendered line of their own.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "blockquote", "dd", "div", "dl", "dt", "h1", "h2", "h3", "h4", "h5", "h6", "li",
    "ol", "p", "section", "table", "tr", "ul",
];

/// Lines as a browser renders them: breaks only at `<br>` and block
/// boundaries, every other whitespace run collapsed to one space.
fn rendered_lines(el: ElementRef<'_>) -> Vec<String> {
    fn flush(current: &mut String, lines: &mut Vec<String>) {
        let line = current.split_whitespace().collect::<Vec<_>>().join(" ");
        if !line.is_empty() {
            lines.push(line);
        }
        current.clear();
    }

    fn walk(el: ElementRef<'_>, current: &mut String, lines: &mut Vec<String>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => current.push_str(text),
                Node::Element(element) => {
                    let Some(child_el) = ElementRef::wrap(child) else {
                        continue;
                    };
                    let tag = element.name();
                    if tag == "br" {
                        flush(current, lines);
                    } else if BLOCK_ELEMENTS.contains(&tag) {
                        flush(current, lines);
                        walk(child_el, current, lines);
                        flush(current, lines);
                    } else {
                        walk(child_el, current, lines);
                    }
                }
                _ => {}
            }
        }
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    walk(el, &mut current, &mut lines);
    flush(&mut current, &mut lines);
    lines
}

/// Street from the first line; city from the second with its postal code dropped.
fn address_lines(el: ElementRef<'_>) -> (String, String) {
    let lines = rendered_lines(el);

    let street = lines.first().cloned().unwrap_or_default();
    let city = lines
        .get(1)
        .and_then(|line| line.split_once(' '))
        .map(|(_postal_code, rest)| rest.to_string())
        .unwrap_or_default();

    (street, city)
}
