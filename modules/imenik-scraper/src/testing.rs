// Test mocks for the scrape pipeline.
//
// MockFetcher (PageFetcher): HashMap-based URL→HTML, records every fetch,
// fails registered URLs, and yields once per fetch so concurrent sessions
// interleave the way they do against a real browser.
//
// Plus HTML builders for a directory that matches `DirectorySelectors::default()`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use imenik_common::{DirectorySelectors, Entry, ImenikError, Result};

use crate::browser::{Browser, FetchingBrowser, PageFetcher};
use crate::session::NameScraper;

// ---------------------------------------------------------------------------
// Test constants
// ---------------------------------------------------------------------------

pub const BASE_URL: &str = "https://imenik.test/";

/// URL the search form on [`search_page`] submits to for `term`.
pub fn search_url(term: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(term.as_bytes()).collect();
    format!("https://imenik.test/trazi?ime={encoded}")
}

/// Absolute URL of result page `page` (2-based) for `term`.
pub fn page_url(term: &str, page: u32) -> String {
    format!("{}&str={page}", search_url(term))
}

// ---------------------------------------------------------------------------
// HTML builders
// ---------------------------------------------------------------------------

pub fn search_page() -> String {
    r#"<html><body>
         <form id="search" action="/trazi" method="get">
           <input type="text" name="ime" placeholder="Ime i prezime">
           <button type="submit">Traži</button>
         </form>
       </body></html>"#
        .to_string()
}

/// Result row as `(name, "street\npostal city", phone)`.
pub type Row<'a> = (&'a str, &'a str, &'a str);

/// A result page with `rows` and links to result pages `2..=pages` for `term`.
pub fn results_page(term: &str, rows: &[Row<'_>], pages: u32) -> String {
    let rows: String = rows
        .iter()
        .map(|(name, address, phone)| {
            format!(
                r#"<div class="result">
                     <h3 class="result-name">{name}</h3>
                     <p class="result-address">{}</p>
                     <span class="result-phone">{phone}</span>
                   </div>"#,
                address.replace('\n', "<br>")
            )
        })
        .collect();

    let links: String = (2..=pages)
        .map(|p| {
            let href = page_url(term, p).replacen("https://imenik.test", "", 1);
            format!(r#"<a href="{}">{p}</a>"#, href.replace('&', "&amp;"))
        })
        .collect();

    format!(
        r#"<html><body><main>{rows}</main><nav class="pagination">{links}</nav></body></html>"#
    )
}

pub fn entry(name: &str, street: &str, city: &str, phone: &str) -> Entry {
    Entry {
        telephone_number: phone.to_string(),
        street: street.to_string(),
        city: city.to_string(),
        full_name: name.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// HashMap-based page fetcher. Returns `Err` for unregistered or failing URLs.
/// Builder pattern: `.on_page()`, `.on_search()`, `.fail_on()`.
pub struct MockFetcher {
    pages: HashMap<String, String>,
    failures: HashSet<String>,
    fetches: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    /// A directory whose root serves [`search_page`].
    pub fn new() -> Self {
        Self {
            pages: HashMap::from([(BASE_URL.to_string(), search_page())]),
            failures: HashSet::new(),
            fetches: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn on_page(mut self, url: &str, html: String) -> Self {
        self.pages.insert(url.to_string(), html);
        self
    }

    /// Register a single result page for `term`.
    pub fn on_search(self, term: &str, rows: &[Row<'_>]) -> Self {
        let html = results_page(term, rows, 1);
        self.on_page(&search_url(term), html)
    }

    pub fn fail_on(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches().iter().filter(|u| u.as_str() == url).count()
    }

    /// Searches submitted, i.e. sessions that got past the search form.
    pub fn searches(&self) -> Vec<String> {
        let prefix = search_url("");
        self.fetches()
            .into_iter()
            .filter(|u| u.starts_with(&prefix) && !u.contains("&str="))
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str, _wait_for: Option<&str>) -> Result<String> {
        self.fetches.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::task::yield_now().await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failures.contains(url) {
            return Err(ImenikError::Navigation(format!("{url}: connection reset")));
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ImenikError::Navigation(format!("{url}: no mock page registered")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Wiring helpers
// ---------------------------------------------------------------------------

pub fn mock_browser(fetcher: Arc<MockFetcher>) -> Arc<dyn Browser> {
    Arc::new(FetchingBrowser::new(fetcher))
}

pub fn mock_scraper(fetcher: Arc<MockFetcher>) -> NameScraper {
    NameScraper::new(mock_browser(fetcher), BASE_URL, &DirectorySelectors::default())
        .expect("default selectors parse")
}
